//! Interactivity checks for handlers that may prompt.

use std::io::IsTerminal;

use crate::env::{EnvStore, is_ci};
use crate::errors::UserError;

/// True when both stdin and stdout are terminals and we are not in CI.
pub fn is_interactive(env: &dyn EnvStore) -> bool {
    !is_ci(env) && std::io::stdin().is_terminal() && console::user_attended()
}

/// Fail fast instead of prompting when nobody can answer.
///
/// `what` names the missing input, e.g. "a project name".
pub fn require_interactive(env: &dyn EnvStore, what: &str) -> Result<(), UserError> {
    if is_interactive(env) {
        return Ok(());
    }
    Err(UserError::fatal(
        format!("Must specify {what} in non-interactive mode."),
        1,
    ))
}
