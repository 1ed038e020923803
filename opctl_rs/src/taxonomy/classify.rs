//! Turning an arbitrary `anyhow::Error` into exactly one [`Failure`].

use std::error::Error as StdError;

use super::ErrorKind;
use crate::errors::{
    ApiError, BuildFailure, CommandLineArgsError, JsonFriendlyFatalError, LifecycleError,
    ParseError, UserError,
};

const RAW_MODE_UNSUPPORTED: &str = "raw mode is not supported";

/// A classified failure, carrying the payload its recovery needs.
#[derive(Debug)]
pub enum Failure {
    Argument(CommandLineArgsError),
    Authentication(ApiError),
    Api(ApiError),
    Parse(ParseError),
    PreFormatted(JsonFriendlyFatalError),
    UnsupportedTerminal(anyhow::Error),
    Build(BuildFailure),
    User {
        error: UserError,
        source: anyhow::Error,
    },
    Internal {
        error: anyhow::Error,
        reportable: bool,
    },
}

impl Failure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Failure::Argument(_) => ErrorKind::Argument,
            Failure::Authentication(_) => ErrorKind::Authentication,
            Failure::Api(_) | Failure::Parse(_) => ErrorKind::Api,
            Failure::PreFormatted(_) => ErrorKind::PreFormattedFatal,
            Failure::UnsupportedTerminal(_) => ErrorKind::UnsupportedTerminal,
            Failure::Build(_) => ErrorKind::BuildFailure,
            Failure::User { .. } => ErrorKind::User,
            Failure::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Whether the exception backend should receive this failure.
    pub fn is_reportable(&self) -> bool {
        match self {
            Failure::Api(err) => err.reportable,
            Failure::Internal { reportable, .. } => *reportable,
            _ => false,
        }
    }

    /// Process exit code; a failure never exits 0, even when it carries 0.
    pub fn exit_code(&self) -> i32 {
        let carried = match self {
            Failure::PreFormatted(err) => Some(err.exit_code()),
            Failure::User { error, .. } => error.exit_code(),
            _ => None,
        };
        carried
            .filter(|code| *code != 0)
            .unwrap_or(crate::errors::GENERIC_FAILURE_EXIT_CODE)
    }

    /// Telemetry-safe message; only argument and declared user errors carry one.
    pub fn telemetry_message(&self) -> Option<String> {
        match self {
            Failure::Argument(err) => err.telemetry_message().map(str::to_string),
            Failure::User { error, .. } => error.telemetry_message().map(str::to_string),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Failure::Argument(err) => err.message().to_string(),
            Failure::Authentication(err) | Failure::Api(err) => err.text.clone(),
            Failure::Parse(err) => err.text.clone(),
            Failure::PreFormatted(err) => err.message().to_string(),
            Failure::UnsupportedTerminal(err) => err.to_string(),
            Failure::Build(err) => err.to_string(),
            Failure::User { error, .. } => error.message().to_string(),
            Failure::Internal { error, .. } => error.to_string(),
        }
    }
}

/// Classify `error`, first match wins:
///
/// 1. argument error
/// 2. authentication error (API error with the auth code)
/// 3. API / parse error
/// 4. pre-formatted fatal error
/// 5. unsupported terminal ("raw mode is not supported")
/// 6. build failure, directly or anywhere in the cause chain
/// 7. declared user error
/// 8. anything else is internal
///
/// Lifecycle wrappers are peeled off first so the root condition decides.
pub fn classify(error: anyhow::Error) -> Failure {
    let error = unwrap_lifecycle(error);

    if let Some(err) = error.downcast_ref::<CommandLineArgsError>() {
        return Failure::Argument(err.clone());
    }
    if let Some(err) = error.downcast_ref::<ApiError>() {
        if err.is_authentication_error() {
            return Failure::Authentication(err.clone());
        }
        return Failure::Api(err.clone());
    }
    if let Some(err) = error.downcast_ref::<ParseError>() {
        return Failure::Parse(err.clone());
    }
    if let Some(err) = error.downcast_ref::<JsonFriendlyFatalError>() {
        return Failure::PreFormatted(err.clone());
    }
    if error
        .chain()
        .any(|cause| cause.to_string().to_ascii_lowercase().contains(RAW_MODE_UNSUPPORTED))
    {
        return Failure::UnsupportedTerminal(error);
    }
    if let Some(err) = find_in_chain::<BuildFailure>(&error) {
        return Failure::Build(err.clone());
    }
    if let Some(err) = error.downcast_ref::<UserError>() {
        return Failure::User {
            error: err.clone(),
            source: error,
        };
    }

    let reportable = !error
        .chain()
        .any(|cause| cause.downcast_ref::<ApiError>().is_some_and(|api| !api.reportable));
    Failure::Internal { error, reportable }
}

fn unwrap_lifecycle(mut error: anyhow::Error) -> anyhow::Error {
    loop {
        match error.downcast::<LifecycleError>() {
            Ok(wrapper) => {
                tracing::trace!(event = wrapper.event(), "unwrapping lifecycle error");
                error = wrapper.into_cause();
            }
            Err(other) => return other,
        }
    }
}

fn find_in_chain<T: StdError + 'static>(error: &anyhow::Error) -> Option<&T> {
    error.chain().find_map(|cause| cause.downcast_ref::<T>())
}
