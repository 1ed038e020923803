//! Global options shared across all commands.

use std::path::{Path, PathBuf};

use clap::ArgMatches;

use crate::errors::CommandLineArgsError;
use crate::logging::LogLevel;

/// Global options that apply to every command.
///
/// Single-value options keep every occurrence so the pipeline can reject
/// repeats instead of silently picking one.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Run as if started in this directory (`--cwd`)
    pub cwd: Vec<PathBuf>,

    /// Path to the project configuration file (`-c/--config`)
    pub config: Vec<PathBuf>,

    /// Selected environment; also picks the `.env.<name>` overlay (`-e/--env`)
    pub env: Vec<String>,

    /// Requested verbosity (`--log-level`)
    pub log_level: Option<LogLevel>,

    /// Show the version number (`-v/--version`)
    pub version: bool,

    /// Deprecated, only `false` is meaningful (and rejected)
    pub experimental_json_config: bool,

    /// Hidden: automatic resource provisioning
    pub experimental_provision: bool,
}

impl GlobalOptions {
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.first().map(PathBuf::as_path)
    }

    pub fn config(&self) -> Option<&Path> {
        self.config.first().map(PathBuf::as_path)
    }

    pub fn env(&self) -> Option<&str> {
        self.env.first().map(String::as_str)
    }

    /// Read the global options out of the innermost matched command.
    pub(crate) fn from_matches(matches: &ArgMatches) -> Result<Self, CommandLineArgsError> {
        let strings = |id: &str| -> Vec<String> {
            matches
                .try_get_many::<String>(id)
                .ok()
                .flatten()
                .map(|values| values.cloned().collect())
                .unwrap_or_default()
        };
        let flag = |id: &str| -> Option<bool> {
            matches.try_get_one::<bool>(id).ok().flatten().copied()
        };

        let log_level = match strings("log-level").last() {
            Some(raw) => Some(raw.parse::<LogLevel>().map_err(CommandLineArgsError::new)?),
            None => None,
        };

        Ok(Self {
            cwd: strings("cwd").into_iter().map(PathBuf::from).collect(),
            config: strings("config").into_iter().map(PathBuf::from).collect(),
            env: strings("env"),
            log_level,
            version: flag("version").unwrap_or(false),
            experimental_json_config: flag("experimental-json-config").unwrap_or(true),
            experimental_provision: flag("experimental-provision").unwrap_or(false),
        })
    }
}
