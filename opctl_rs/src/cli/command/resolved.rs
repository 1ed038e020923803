//! ResolvedOptions - what a leaf handler receives.

use std::path::{Path, PathBuf};

use clap::ArgMatches;
use clap::parser::ValueSource;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use super::global::GlobalOptions;
use super::options::{OptionSpec, OptionType};
use crate::cli::registry::CommandPath;

/// Validated, merged options for one invocation of a leaf command.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    /// Path of the invoked command (without the program name)
    pub path: CommandPath,

    /// Global options
    pub global: GlobalOptions,

    matches: ArgMatches,
    cwd: PathBuf,
    cancellation: CancellationToken,
}

impl ResolvedOptions {
    pub(crate) fn new(
        path: CommandPath,
        global: GlobalOptions,
        matches: ArgMatches,
        cwd: PathBuf,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            path,
            global,
            matches,
            cwd,
            cancellation,
        }
    }

    /// Effective working directory, after `--cwd`.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.matches.try_get_one::<String>(name).ok().flatten().cloned()
    }

    pub fn get_flag(&self, name: &str) -> bool {
        self.matches
            .try_get_one::<bool>(name)
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false)
    }

    pub fn get_number(&self, name: &str) -> Option<f64> {
        self.matches.try_get_one::<f64>(name).ok().flatten().copied()
    }

    pub fn get_strings(&self, name: &str) -> Vec<String> {
        self.matches
            .try_get_many::<String>(name)
            .ok()
            .flatten()
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    }

    /// True when the user actually typed the option (defaults don't count).
    pub fn provided(&self, name: &str) -> bool {
        self.matches.try_contains_id(name).unwrap_or(false)
            && self.matches.value_source(name) == Some(ValueSource::CommandLine)
    }

    /// Cancelled when the user interrupts the process (Ctrl+C).
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Telemetry-safe view of the options the user supplied.
    ///
    /// Booleans and numbers are kept, strings are redacted.
    pub fn snapshot(&self, specs: &[OptionSpec]) -> Map<String, Value> {
        let mut out = Map::new();
        for spec in specs {
            if !self.provided(&spec.name) {
                continue;
            }
            let value = match spec.kind {
                OptionType::Boolean => Value::Bool(self.get_flag(&spec.name)),
                OptionType::Number => self
                    .get_number(&spec.name)
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                OptionType::String | OptionType::Array => Value::String("<redacted>".into()),
            };
            out.insert(spec.name.clone(), value);
        }
        out
    }
}
