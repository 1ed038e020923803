//! Built-in commands, registered through the same registry as everything else.
//!
//! - [`telemetry`] - `telemetry status|enable|disable` (alias `metrics`)
//! - [`whoami`] - identity from environment credentials

mod telemetry;
mod whoami;

use std::future::Future;

use crate::cli::command::{CommandDefinition, ResolvedOptions};
use crate::cli::dispatch::Runtime;
use crate::cli::parser::CliParser;
use crate::cli::registry::CommandRegistry;
use crate::errors::RegistrationError;

pub const ROOT_DESCRIPTION: &str = "Operate your services from the command line";

/// Registry holding the built-in commands, not yet sealed, so callers can
/// define more before calling `register_all`.
pub fn builtin_registry(rt: &Runtime) -> Result<CommandRegistry, RegistrationError> {
    let mut registry = CommandRegistry::new(ROOT_DESCRIPTION);
    registry.define(telemetry::entries(rt))?;
    registry.define(whoami::entries(rt))?;
    registry.register_namespace("telemetry")?;
    registry.register_namespace("whoami")?;
    Ok(registry)
}

/// Built-ins only, sealed and ready to parse.
pub fn builtin_parser(rt: &Runtime) -> Result<CliParser, RegistrationError> {
    let mut registry = builtin_registry(rt)?;
    registry.register_all()?;
    CliParser::new(registry, rt.program.clone(), rt.version.clone())
}

/// Leaf definition whose handler gets its own clone of the runtime.
fn runtime_command<F, Fut>(rt: &Runtime, description: &str, run: F) -> CommandDefinition
where
    F: Fn(Runtime, ResolvedOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let rt = rt.clone();
    CommandDefinition::new(description, move |opts| run(rt.clone(), opts))
}
