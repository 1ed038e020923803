//! Top-level boundary shared by the binary and the integration tests.
//!
//! Parses, dispatches, classifies any failure, emits exactly one of the
//! "completed"/"errored" events and always runs the shutdown sequence.

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use super::commands::builtin_parser;
use super::dispatch::{InvocationContext, LifecycleState, Pipeline, RunState, Runtime, dispatch};
use super::parser::{CliParser, ParseOutcome};
use crate::lifecycle::{DRAIN_TIMEOUT, DrainOutcome, SignalChannel, shutdown};
use crate::taxonomy::{ClassifiedError, RecoveryContext, classify, recover};
use crate::telemetry::{CommandProperties, EventName};

/// How a run ended.
#[derive(Debug)]
pub struct RunOutcome {
    pub exit_code: i32,
    /// Set when dispatch (or, failing that, shutdown) failed.
    pub failure: Option<ClassifiedError>,
    /// `None` when the shutdown sequence itself failed.
    pub drain: Option<DrainOutcome>,
    /// Telemetry events queued during the run, in order.
    pub emitted: Vec<EventName>,
    pub final_state: LifecycleState,
}

/// Run `argv` (without the program name) against the built-in commands.
pub async fn main(argv: Vec<String>, rt: &Runtime) -> RunOutcome {
    match builtin_parser(rt) {
        Ok(parser) => run(argv, &parser, rt).await,
        Err(err) => {
            rt.output.error(&format!("{err}"));
            RunOutcome {
                exit_code: crate::errors::GENERIC_FAILURE_EXIT_CODE,
                failure: None,
                drain: None,
                emitted: Vec::new(),
                final_state: LifecycleState::Idle,
            }
        }
    }
}

/// Run `argv` against a sealed parser.
pub async fn run(argv: Vec<String>, parser: &CliParser, rt: &Runtime) -> RunOutcome {
    let mut signal = if rt.handle_signals {
        SignalChannel::listen(rt.cancellation.clone())
    } else {
        SignalChannel::detached(rt.cancellation.clone())
    };
    let pipeline = Pipeline::standard();
    let mut run = RunState::new();

    let result = dispatch_argv(&argv, parser, &pipeline, &mut run, rt).await;
    let mut failure = match result {
        Ok(()) => {
            let properties = command_properties(&run).with_duration(run.started_at.elapsed());
            if let Some(dispatcher) = run.dispatcher.as_mut() {
                dispatcher.send_command_event(EventName::Completed, properties);
            }
            run.transition(LifecycleState::Completed);
            None
        }
        Err(err) => {
            let cx = RecoveryContext {
                output: &rt.output,
                help: Some(parser),
                argv: &argv,
                env: rt.env.as_ref(),
                identity: rt.identity.as_ref(),
                reporter: rt.reporter.as_ref(),
            };
            let classified = recover(classify(err), &cx).await;

            let properties = CommandProperties {
                error_type: classified.telemetry_error_type.map(str::to_string),
                error_message: classified.telemetry_message.clone(),
                ..command_properties(&run)
            }
            .with_duration(run.started_at.elapsed());
            if let Some(dispatcher) = run.dispatcher.as_mut() {
                dispatcher.send_command_event(EventName::Errored, properties);
            }
            run.transition(LifecycleState::Errored);
            Some(classified)
        }
    };

    run.transition(LifecycleState::Draining);
    let (requests, abort) = match run.dispatcher.as_mut() {
        Some(dispatcher) => (dispatcher.take_requests(), dispatcher.abort_signal()),
        None => (Vec::new(), CancellationToken::new()),
    };
    let drain = match shutdown(
        &mut signal,
        rt.reporter.as_ref(),
        requests,
        abort,
        DRAIN_TIMEOUT,
    )
    .await
    {
        Ok(outcome) => Some(outcome),
        Err(err) => {
            tracing::error!("shutdown failed: {err:#}");
            if failure.is_none() {
                rt.output.error(&format!("{err:#}"));
                failure = Some(ClassifiedError::from_failure(&classify(err)));
            }
            None
        }
    };
    run.transition(LifecycleState::Exited);

    RunOutcome {
        exit_code: failure.as_ref().map_or(0, |f| f.exit_code),
        failure,
        drain,
        emitted: run
            .dispatcher
            .as_ref()
            .map(|d| d.emitted().to_vec())
            .unwrap_or_default(),
        final_state: run.state(),
    }
}

async fn dispatch_argv(
    argv: &[String],
    parser: &CliParser,
    pipeline: &Pipeline,
    run: &mut RunState,
    rt: &Runtime,
) -> anyhow::Result<()> {
    match parser.parse(argv)? {
        ParseOutcome::Display(text) => {
            rt.output.log(text.trim_end());
            Ok(())
        }
        ParseOutcome::Invoke(invocation) => {
            let cwd = std::env::current_dir().context("failed to resolve the current directory")?;
            let mut ctx = InvocationContext::new(argv.to_vec(), invocation, cwd);
            dispatch(parser, pipeline, &mut ctx, run, rt).await
        }
    }
}

fn command_properties(run: &RunState) -> CommandProperties {
    CommandProperties {
        command: run.command.clone(),
        args: run.args.clone(),
        ..CommandProperties::default()
    }
}
