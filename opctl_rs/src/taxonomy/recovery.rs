//! Per-kind user output and reporting.

use console::style;

use super::{ClassifiedError, Failure};
use crate::env::EnvStore;
use crate::errors::{BuildMessage, ISSUE_TRACKER_URL, Note};
use crate::identity::{EnvAuth, IdentityLookup, auth_from_env};
use crate::output::Output;
use crate::reporter::{ExceptionReport, ExceptionReporter};

/// Renders help for the command an argv was aimed at.
pub trait HelpSource: Send + Sync {
    fn contextual_help(&self, argv: &[String]) -> String;
}

/// Everything recovery may touch.
pub struct RecoveryContext<'a> {
    pub output: &'a Output,
    pub help: Option<&'a dyn HelpSource>,
    pub argv: &'a [String],
    pub env: &'a dyn EnvStore,
    pub identity: &'a dyn IdentityLookup,
    pub reporter: &'a dyn ExceptionReporter,
}

/// Print the failure the way its kind demands, capture a report when allowed,
/// and return the classification for telemetry and the exit code.
pub async fn recover(failure: Failure, cx: &RecoveryContext<'_>) -> ClassifiedError {
    let classified = ClassifiedError::from_failure(&failure);
    let output = cx.output;

    match &failure {
        Failure::Argument(err) => {
            output.error(err.message());
            if let Some(help) = cx.help {
                output.log(help.contextual_help(cx.argv).trim_end());
            }
        }
        Failure::Authentication(err) => {
            print_structured(output, &err.text, &err.notes, None);
            if let Some(EnvAuth::ApiToken { .. }) = auth_from_env(cx.env) {
                output.error_plain(
                    &style(
                        "📎 It looks like you are authenticating via a custom API token set in an environment variable.\n\
                         Please ensure it has the correct permissions for this operation.",
                    )
                    .yellow()
                    .to_string(),
                );
            }
            match cx.identity.whoami().await {
                Ok(Some(identity)) => identity.print(output, err.account_tag.as_deref()),
                Ok(None) => output.log("You are not authenticated."),
                Err(lookup) => tracing::debug!("whoami lookup failed: {lookup:#}"),
            }
        }
        Failure::Api(err) => {
            print_structured(output, &err.text, &with_issue_note(&err.notes), None);
        }
        Failure::Parse(err) => {
            print_structured(
                output,
                &err.text,
                &with_issue_note(&err.notes),
                err.file.as_deref(),
            );
        }
        Failure::PreFormatted(err) => output.error_plain(err.message()),
        Failure::UnsupportedTerminal(_) => {
            output.error(&format!(
                "This terminal doesn't support raw mode.\n\
                 opctl uses raw mode to read input and draw to the terminal, and won't work correctly without it.\n\
                 Try running your previous command in a terminal that supports raw mode{}",
                terminal_suggestion(std::env::consts::OS)
            ));
        }
        Failure::Build(err) => print_build_failure(output, &err.errors, &err.warnings),
        Failure::User { error, source } => {
            output.error(error.message());
            tracing::debug!("{source:?}");
        }
        Failure::Internal { error, .. } => {
            output.error(&error.to_string());
            tracing::debug!("{error:?}");
            output.error_plain(
                &style(format!(
                    "This is a possible bug in opctl. If you think so, please open an issue at: {ISSUE_TRACKER_URL}"
                ))
                .yellow()
                .to_string(),
            );
        }
    }

    if classified.reportable {
        let label = classified.kind.telemetry_label();
        let report = match failure {
            Failure::Internal { error, .. } => ExceptionReport::from_error(label, &error),
            Failure::Api(err) => ExceptionReport::from_error(label, &anyhow::Error::new(err)),
            other => ExceptionReport::from_error(label, &anyhow::anyhow!(other.message())),
        };
        cx.reporter.capture(report);
    }

    classified
}

fn with_issue_note(notes: &[Note]) -> Vec<Note> {
    let mut notes = notes.to_vec();
    notes.push(Note::new(format!(
        "If you think this is a bug, please open an issue at: {ISSUE_TRACKER_URL}"
    )));
    notes
}

fn print_structured(output: &Output, text: &str, notes: &[Note], file: Option<&str>) {
    output.error(text);
    if let Some(file) = file {
        output.error_plain(&format!("\n    {file}"));
    }
    if !notes.is_empty() {
        output.error_plain("");
        for note in notes {
            output.error_plain(&format!("  {}", note.text));
        }
    }
}

fn print_build_failure(output: &Output, errors: &[BuildMessage], warnings: &[BuildMessage]) {
    let plural = if errors.len() == 1 { "" } else { "s" };
    output.error(&format!("Build failed with {} error{plural}:", errors.len()));
    for error in errors {
        output.error_plain(&format!("  {error}"));
    }
    for warning in warnings {
        output.warn(&warning.to_string());
    }
}

fn terminal_suggestion(os: &str) -> &'static str {
    match os {
        "windows" => ", such as Command Prompt or Powershell.",
        "macos" => ", such as Terminal.app or iTerm.",
        _ => ".",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MemoryEnv;
    use crate::errors::{
        ApiError, AUTHENTICATION_ERROR_CODE, BuildFailure, CommandLineArgsError, UserError,
    };
    use crate::identity::EnvIdentity;
    use crate::reporter::JsonlReporter;
    use crate::taxonomy::{ErrorKind, classify};
    use std::sync::Arc;

    struct FixedHelp;

    impl HelpSource for FixedHelp {
        fn contextual_help(&self, argv: &[String]) -> String {
            format!("Usage: opctl {}\n", argv.join(" "))
        }
    }

    async fn run(
        err: anyhow::Error,
        env: MemoryEnv,
    ) -> (ClassifiedError, crate::output::CapturedOutput, JsonlReporter) {
        let (output, captured) = Output::captured();
        let env: Arc<dyn EnvStore> = Arc::new(env);
        let identity = EnvIdentity::new(Arc::clone(&env));
        let reporter = JsonlReporter::new(None);
        let argv = vec!["kv".to_string()];
        let cx = RecoveryContext {
            output: &output,
            help: Some(&FixedHelp),
            argv: &argv,
            env: env.as_ref(),
            identity: &identity,
            reporter: &reporter,
        };
        let classified = recover(classify(err), &cx).await;
        (classified, captured, reporter)
    }

    #[tokio::test]
    async fn test_argument_error_prints_contextual_help() {
        let (classified, captured, reporter) = run(
            CommandLineArgsError::new("Unknown command: bogus.").into(),
            MemoryEnv::new(),
        )
        .await;
        assert_eq!(classified.kind, ErrorKind::Argument);
        assert!(captured.stderr().contains("Unknown command: bogus."));
        assert!(captured.stdout().contains("Usage: opctl kv"));
        assert!(reporter.reports().is_empty());
    }

    #[tokio::test]
    async fn test_internal_error_hints_bug_and_reports() {
        let (classified, captured, reporter) = run(anyhow::anyhow!("boom"), MemoryEnv::new()).await;
        assert_eq!(classified.kind, ErrorKind::Internal);
        assert!(classified.reportable);
        let stderr = captured.stderr();
        assert!(stderr.contains("boom"));
        assert!(stderr.contains("possible bug"));
        assert_eq!(reporter.reports().len(), 1);
        assert_eq!(reporter.reports()[0].error_type, "InternalError");
    }

    #[tokio::test]
    async fn test_user_error_has_no_bug_hint() {
        let (classified, captured, reporter) =
            run(UserError::new("bad input").into(), MemoryEnv::new()).await;
        assert_eq!(classified.kind, ErrorKind::User);
        assert!(!classified.reportable);
        assert!(captured.stderr().contains("bad input"));
        assert!(!captured.stderr().contains("possible bug"));
        assert!(reporter.reports().is_empty());
    }

    #[tokio::test]
    async fn test_auth_error_with_env_token_prints_hint_and_identity() {
        let env = MemoryEnv::from_pairs([("OPCTL_API_TOKEN", "tok")]);
        let err = ApiError::new("Authentication error").with_code(AUTHENTICATION_ERROR_CODE);
        let (classified, captured, _) = run(err.into(), env).await;
        assert_eq!(classified.kind, ErrorKind::Authentication);
        assert_eq!(classified.telemetry_error_type, Some("AuthenticationError"));
        assert!(captured.stderr().contains("custom API token"));
        assert!(captured.stdout().contains("You are logged in with an API Token."));
    }

    #[tokio::test]
    async fn test_api_error_points_at_issue_tracker() {
        let err = ApiError::new("A request to the API failed.").with_note("zone not found");
        let (classified, captured, reporter) = run(err.into(), MemoryEnv::new()).await;
        assert_eq!(classified.kind, ErrorKind::Api);
        let stderr = captured.stderr();
        assert!(stderr.contains("zone not found"));
        assert!(stderr.contains(ISSUE_TRACKER_URL));
        assert!(reporter.reports().is_empty());
    }

    #[tokio::test]
    async fn test_build_failure_lists_diagnostics() {
        let err = BuildFailure {
            errors: vec![
                BuildMessage::new("Could not resolve \"lodash\"").at("src/index.ts:1:20"),
                BuildMessage::new("Unexpected token"),
            ],
            warnings: vec![BuildMessage::new("Unused import")],
        };
        let (classified, captured, _) = run(err.into(), MemoryEnv::new()).await;
        assert_eq!(classified.kind, ErrorKind::BuildFailure);
        let stderr = captured.stderr();
        assert!(stderr.contains("Build failed with 2 errors:"));
        assert!(stderr.contains("src/index.ts:1:20"));
        assert!(stderr.contains("Unused import"));
    }

    #[test]
    fn test_terminal_suggestion_by_platform() {
        assert_eq!(terminal_suggestion("windows"), ", such as Command Prompt or Powershell.");
        assert_eq!(terminal_suggestion("macos"), ", such as Terminal.app or iTerm.");
        assert_eq!(terminal_suggestion("linux"), ".");
    }
}
