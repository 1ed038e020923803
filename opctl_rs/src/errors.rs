//! Error types raised by the registry, the parser and command handlers.
//!
//! Handlers return `anyhow::Error`, so any of these can travel through the
//! pipeline boxed and be recovered by downcasting at the top-level boundary
//! (see [`crate::taxonomy`]).

use std::fmt;

use thiserror::Error;

/// Exit code used when a classified failure does not carry its own.
pub const GENERIC_FAILURE_EXIT_CODE: i32 = 1;

/// Code the remote API uses to flag an authentication failure.
pub const AUTHENTICATION_ERROR_CODE: u32 = 10000;

/// Where users are pointed when something looks like a bug.
pub const ISSUE_TRACKER_URL: &str = "https://github.com/opctl/opctl/issues/new/choose";

// ============================================================================
// User-facing errors
// ============================================================================

/// Invalid command line: bad flag, repeated single-value option, unknown command.
///
/// Rendered with contextual help for the command that was being invoked.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CommandLineArgsError {
    message: String,
    telemetry_message: Option<String>,
}

impl CommandLineArgsError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            telemetry_message: None,
        }
    }

    /// Attach a message that is safe to send with telemetry.
    pub fn with_telemetry_message(mut self, message: impl Into<String>) -> Self {
        self.telemetry_message = Some(message.into());
        self
    }

    /// Mark the display message itself as safe to send with telemetry.
    pub fn telemetry_safe(mut self) -> Self {
        self.telemetry_message = Some(self.message.clone());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn telemetry_message(&self) -> Option<&str> {
        self.telemetry_message.as_deref()
    }
}

/// A failure caused by the user's input or environment, not by opctl itself.
///
/// Never reported to the exception backend and never followed by the
/// "possible bug" hint. `UserError::fatal` carries an explicit exit code.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct UserError {
    message: String,
    telemetry_message: Option<String>,
    exit_code: Option<i32>,
}

impl UserError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            telemetry_message: None,
            exit_code: None,
        }
    }

    pub fn fatal(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
            ..Self::new(message)
        }
    }

    pub fn with_telemetry_message(mut self, message: impl Into<String>) -> Self {
        self.telemetry_message = Some(message.into());
        self
    }

    pub fn telemetry_safe(mut self) -> Self {
        self.telemetry_message = Some(self.message.clone());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn telemetry_message(&self) -> Option<&str> {
        self.telemetry_message.as_deref()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}

/// A fatal error whose message is already the final display string
/// (typically JSON for machine consumers). Printed verbatim.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct JsonFriendlyFatalError {
    message: String,
    exit_code: i32,
}

impl JsonFriendlyFatalError {
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

// ============================================================================
// Structured API / parse errors
// ============================================================================

/// A note attached to a structured error, printed below its headline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub text: String,
}

impl Note {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A structured error produced while parsing a file or a response.
#[derive(Debug, Clone, Error)]
#[error("{text}")]
pub struct ParseError {
    pub text: String,
    pub notes: Vec<Note>,
    pub file: Option<String>,
}

impl ParseError {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            notes: Vec::new(),
            file: None,
        }
    }

    pub fn with_note(mut self, text: impl Into<String>) -> Self {
        self.notes.push(Note::new(text));
        self
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// An error returned by the remote API client.
#[derive(Debug, Clone, Error)]
#[error("{text}")]
pub struct ApiError {
    pub text: String,
    pub notes: Vec<Note>,
    pub code: Option<u32>,
    pub status: Option<u16>,
    pub reportable: bool,
    pub account_tag: Option<String>,
}

impl ApiError {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            notes: Vec::new(),
            code: None,
            status: None,
            reportable: false,
            account_tag: None,
        }
    }

    pub fn with_code(mut self, code: u32) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_note(mut self, text: impl Into<String>) -> Self {
        self.notes.push(Note::new(text));
        self
    }

    pub fn with_account_tag(mut self, tag: impl Into<String>) -> Self {
        self.account_tag = Some(tag.into());
        self
    }

    pub fn reportable(mut self, reportable: bool) -> Self {
        self.reportable = reportable;
        self
    }

    pub fn is_authentication_error(&self) -> bool {
        self.code == Some(AUTHENTICATION_ERROR_CODE)
    }
}

// ============================================================================
// Build failures
// ============================================================================

/// One diagnostic collected by the bundler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMessage {
    pub text: String,
    pub location: Option<String>,
}

impl BuildMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for BuildMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({})", self.text, location),
            None => f.write_str(&self.text),
        }
    }
}

/// The bundler gave up; `errors` holds everything it collected.
#[derive(Debug, Clone, Error)]
#[error("Build failed with {} error(s)", errors.len())]
pub struct BuildFailure {
    pub errors: Vec<BuildMessage>,
    pub warnings: Vec<BuildMessage>,
}

// ============================================================================
// Wrappers and programming errors
// ============================================================================

/// A failure surfaced through a long-running command's event stream.
///
/// The interesting part is `cause`: classification looks through the wrapper.
#[derive(Debug)]
pub struct LifecycleError {
    event: String,
    cause: anyhow::Error,
}

impl LifecycleError {
    pub fn new(event: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            event: event.into(),
            cause: cause.into(),
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn into_cause(self) -> anyhow::Error {
        self.cause
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.event, self.cause)
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.cause)
    }
}

/// Misuse of the command registry. These are bugs in opctl, not user errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("command path must not be empty")]
    EmptyPath,
    #[error("duplicate definition for \"{0}\"")]
    Duplicate(String),
    #[error("missing namespace definition for \"{0}\"")]
    MissingNamespace(String),
    #[error("\"{0}\" is a command and cannot have subcommands")]
    LeafParent(String),
    #[error("alias \"{alias}\" points at undefined command \"{target}\"")]
    DanglingAlias { alias: String, target: String },
    #[error("alias \"{alias}\" must live next to its target \"{target}\"")]
    AliasScope { alias: String, target: String },
    #[error("nothing was defined under namespace \"{0}\"")]
    UnknownNamespace(String),
    #[error("namespace \"{0}\" has already been registered")]
    AlreadyRegistered(String),
    #[error("cannot define \"{0}\" after the registry has been sealed")]
    DefineAfterSeal(String),
    #[error("register_all() has already been called")]
    AlreadySealed,
    #[error("commands must be sealed with register_all() before parsing")]
    NotSealed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_user_error_carries_exit_code() {
        let err = UserError::fatal("Must specify a project name.", 3);
        assert_eq!(err.exit_code(), Some(3));
        assert_eq!(err.to_string(), "Must specify a project name.");
        assert_eq!(err.telemetry_message(), None);
    }

    #[test]
    fn test_telemetry_safe_reuses_message() {
        let err = CommandLineArgsError::new("Unknown command: nope.").telemetry_safe();
        assert_eq!(err.telemetry_message(), Some("Unknown command: nope."));
    }

    #[test]
    fn test_authentication_code() {
        assert!(
            ApiError::new("Authentication error")
                .with_code(AUTHENTICATION_ERROR_CODE)
                .is_authentication_error()
        );
        assert!(!ApiError::new("Not found").with_code(7003).is_authentication_error());
    }

    #[test]
    fn test_lifecycle_error_exposes_cause_as_source() {
        let err = LifecycleError::new("dev session", UserError::new("port in use"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("port in use"));
        assert!(err.into_cause().is::<UserError>());
    }
}
