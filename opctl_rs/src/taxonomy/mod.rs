//! Error taxonomy and recovery policy.
//!
//! Every failure that reaches the top-level boundary is classified into one
//! [`ErrorKind`] by [`classify`], then [`recover`] prints what the user should
//! see, captures an exception report when the kind allows it, and produces a
//! [`ClassifiedError`] for telemetry and the exit code.

mod classify;
mod recovery;

pub use classify::{Failure, classify};
pub use recovery::{HelpSource, RecoveryContext, recover};

/// The finite set of failure kinds, in classification precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Argument,
    Authentication,
    Api,
    PreFormattedFatal,
    UnsupportedTerminal,
    BuildFailure,
    User,
    Internal,
}

impl ErrorKind {
    /// Label sent as `error_type` with the errored telemetry event.
    pub fn telemetry_label(&self) -> &'static str {
        match self {
            ErrorKind::Argument => "CommandLineArgsError",
            ErrorKind::Authentication => "AuthenticationError",
            ErrorKind::Api => "APIError",
            ErrorKind::PreFormattedFatal => "JsonFriendlyFatalError",
            ErrorKind::UnsupportedTerminal => "UnsupportedTerminalError",
            ErrorKind::BuildFailure => "BuildFailure",
            ErrorKind::User => "UserError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

/// What the boundary decided about a failure. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub reportable: bool,
    pub telemetry_error_type: Option<&'static str>,
    pub telemetry_message: Option<String>,
    pub exit_code: i32,
}

impl ClassifiedError {
    pub fn from_failure(failure: &Failure) -> Self {
        let kind = failure.kind();
        Self {
            kind,
            message: failure.message(),
            reportable: failure.is_reportable(),
            telemetry_error_type: Some(kind.telemetry_label()),
            telemetry_message: failure.telemetry_message(),
            exit_code: failure.exit_code(),
        }
    }
}
