//! Dispatch pipeline for a parsed invocation.
//!
//! Runs the global middleware (see [`middleware`]) in order, then the leaf
//! handler. Namespaces print their own help and the bare program prints root
//! help, both after the same middleware.

mod middleware;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

pub use middleware::{
    CwdOverride, EnvMerge, LifecycleHook, LoggerLevel, Middleware, Pipeline, SessionRecording,
    SingleValueGuard,
};

use crate::cli::command::{Metadata, ResolvedOptions};
use crate::cli::parser::{CliParser, ParsedInvocation, Target};
use crate::config::config_home;
use crate::env::{EnvStore, ProcessEnv};
use crate::identity::{EnvIdentity, IdentityLookup};
use crate::logging::{LogHandle, LogLevel};
use crate::output::Output;
use crate::reporter::{ExceptionReporter, JsonlReporter};
use crate::telemetry::{DebugSink, MetricsDispatcher, TelemetrySink};

/// Process-wide collaborators, shared by every stage of a run.
#[derive(Clone)]
pub struct Runtime {
    pub program: String,
    pub version: String,
    pub output: Output,
    pub env: Arc<dyn EnvStore>,
    pub log: LogHandle,
    pub reporter: Arc<dyn ExceptionReporter>,
    pub telemetry_sink: Arc<dyn TelemetrySink>,
    pub identity: Arc<dyn IdentityLookup>,
    pub config_home: PathBuf,
    pub output_file: Option<PathBuf>,
    pub debug_log_path: Option<PathBuf>,
    pub cancellation: CancellationToken,
    /// Whether `--cwd` changes the real process working directory.
    pub apply_process_cwd: bool,
    /// Whether Ctrl+C is wired to `cancellation`.
    pub handle_signals: bool,
}

impl Runtime {
    /// Runtime with in-memory defaults: debug telemetry sink, in-memory
    /// reporter, no session output file. The binary uses [`Runtime::from_env`].
    pub fn new(output: Output, env: Arc<dyn EnvStore>) -> Self {
        Self {
            program: "opctl".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            output,
            config_home: config_home(env.as_ref()),
            identity: Arc::new(EnvIdentity::new(Arc::clone(&env))),
            env,
            log: LogHandle::detached(LogLevel::default()),
            reporter: Arc::new(JsonlReporter::new(None)),
            telemetry_sink: Arc::new(DebugSink),
            output_file: None,
            debug_log_path: None,
            cancellation: CancellationToken::new(),
            apply_process_cwd: false,
            handle_signals: false,
        }
    }

    /// Runtime wired to the real process environment.
    pub fn from_env(output: Output, log: LogHandle) -> Self {
        Self::from_store(output, log, Arc::new(ProcessEnv))
    }

    /// Runtime configured from `env`, with process-level behavior (signal
    /// handling, real `--cwd`) switched on.
    ///
    /// Telemetry is best-effort: a sink that cannot be built falls back to
    /// [`DebugSink`] instead of failing the run.
    pub fn from_store(output: Output, log: LogHandle, env: Arc<dyn EnvStore>) -> Self {
        let sink: Arc<dyn TelemetrySink> = match crate::telemetry::sink_from_env(env.as_ref()) {
            Ok(sink) => Arc::from(sink),
            Err(err) => {
                tracing::debug!("telemetry sink unavailable, events will only be logged: {err:#}");
                Arc::new(DebugSink)
            }
        };
        let reporter: Arc<dyn ExceptionReporter> = Arc::new(JsonlReporter::from_env(env.as_ref()));
        Self {
            output_file: crate::session::output_file(env.as_ref()),
            debug_log_path: Some(crate::logging::debug_log_path(env.as_ref())),
            apply_process_cwd: true,
            handle_signals: true,
            log,
            reporter,
            telemetry_sink: sink,
            ..Self::new(output, env)
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry_sink = sink;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ExceptionReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityLookup>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_config_home(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_home = dir.into();
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    pub fn with_log(mut self, log: LogHandle) -> Self {
        self.log = log;
        self
    }
}

/// Ephemeral per-run view of the invocation, mutated by middleware.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub argv: Vec<String>,
    pub invocation: ParsedInvocation,
    /// Effective working directory after `--cwd`.
    pub cwd: PathBuf,
    /// Keys injected from the env overlay file.
    pub injected_env: Vec<String>,
    /// Project config the lifecycle hook resolved, if any.
    pub config_path: Option<PathBuf>,
}

impl InvocationContext {
    pub fn new(argv: Vec<String>, invocation: ParsedInvocation, cwd: PathBuf) -> Self {
        Self {
            argv,
            invocation,
            cwd,
            injected_env: Vec::new(),
            config_path: None,
        }
    }

    pub(crate) fn resolved_options(&self, cancellation: CancellationToken) -> ResolvedOptions {
        ResolvedOptions::new(
            self.invocation.path.clone(),
            self.invocation.global.clone(),
            self.invocation.matches.clone(),
            self.cwd.clone(),
            cancellation,
        )
    }
}

/// `idle -> started -> (completed | errored) -> draining -> exited`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Started,
    Completed,
    Errored,
    Draining,
    Exited,
}

/// State owned by one top-level run and threaded through every stage.
pub struct RunState {
    pub started_at: Instant,
    pub recorded_once: bool,
    pub dispatcher: Option<MetricsDispatcher>,
    pub command: Option<String>,
    pub args: Option<Map<String, Value>>,
    state: LifecycleState,
    deprecation_warned: HashSet<String>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            recorded_once: false,
            dispatcher: None,
            command: None,
            args: None,
            state: LifecycleState::Idle,
            deprecation_warned: HashSet::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Move to `next`; only forward transitions are applied.
    pub fn transition(&mut self, next: LifecycleState) {
        use LifecycleState::*;
        let allowed = matches!(
            (self.state, next),
            (Idle, Started)
                | (Idle, Draining)
                | (Started, Completed)
                | (Started, Errored)
                | (Completed, Draining)
                | (Errored, Draining)
                | (Draining, Exited)
        );
        if allowed {
            tracing::trace!(from = ?self.state, to = ?next, "lifecycle");
            self.state = next;
        } else {
            tracing::trace!(from = ?self.state, to = ?next, "ignored lifecycle transition");
        }
    }

    /// True the first time a path is seen.
    fn should_warn_deprecated(&mut self, path: &str) -> bool {
        self.deprecation_warned.insert(path.to_string())
    }
}

/// Run the pipeline and then the target of `ctx`.
pub async fn dispatch(
    parser: &CliParser,
    pipeline: &Pipeline,
    ctx: &mut InvocationContext,
    run: &mut RunState,
    rt: &Runtime,
) -> anyhow::Result<()> {
    pipeline.run(ctx, run, rt)?;

    match &ctx.invocation.target {
        Target::Command(def) => {
            warn_if_deprecated(&def.metadata, ctx, run, rt);
            let handler = Arc::clone(&def.handler);
            handler(ctx.resolved_options(rt.cancellation.clone())).await
        }
        Target::Namespace(metadata) => {
            warn_if_deprecated(metadata, ctx, run, rt);
            rt.output.log(parser.help_for(&ctx.invocation.path).trim_end());
            Ok(())
        }
        Target::Root => {
            rt.output.log(parser.help_for(&ctx.invocation.path).trim_end());
            Ok(())
        }
    }
}

/// One `[deprecated]` warning per path and run.
fn warn_if_deprecated(
    metadata: &Metadata,
    ctx: &InvocationContext,
    run: &mut RunState,
    rt: &Runtime,
) {
    let path = &ctx.invocation.path;
    if !metadata.deprecated || !run.should_warn_deprecated(&path.key()) {
        return;
    }
    let message = metadata
        .deprecation_message
        .clone()
        .unwrap_or_else(|| format!("`{} {}` is deprecated.", rt.program, path));
    rt.output.warn(&format!("[deprecated] {message}"));
}
