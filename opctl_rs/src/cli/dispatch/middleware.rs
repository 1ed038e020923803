//! Global middleware, applied to every invocation in a fixed order.
//!
//! 1. [`CwdOverride`] - `--cwd`
//! 2. [`EnvMerge`] - `.env` / `.env.<name>` overlay, live variables win
//! 3. [`SessionRecording`] - best-effort session line in the output file
//! 4. [`SingleValueGuard`] - `--config` / `--env` at most once
//! 5. [`LoggerLevel`] - `--log-level`
//! 6. [`LifecycleHook`] - config snapshot, metrics dispatcher, "started" event (once)

use anyhow::Context;

use super::{InvocationContext, LifecycleState, RunState, Runtime};
use crate::cli::parser::Target;
use crate::config::ProjectConfig;
use crate::env_file;
use crate::errors::{CommandLineArgsError, UserError};
use crate::session::{self, SessionEntry};
use crate::telemetry::{CommandProperties, DispatcherOptions, EventName, MetricsDispatcher};

/// Command paths allowed to take `--config` more than once.
const MULTI_CONFIG_COMMANDS: &[&str] = &["dev", "pages dev"];

/// One stage of the pipeline. Returning an error aborts the chain.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        ctx: &mut InvocationContext,
        run: &mut RunState,
        rt: &Runtime,
    ) -> anyhow::Result<()>;
}

/// Ordered middleware chain.
pub struct Pipeline {
    stages: Vec<Box<dyn Middleware>>,
}

impl Pipeline {
    /// The standard chain every invocation goes through.
    pub fn standard() -> Self {
        Self {
            stages: vec![
                Box::new(CwdOverride),
                Box::new(EnvMerge),
                Box::new(SessionRecording),
                Box::new(SingleValueGuard),
                Box::new(LoggerLevel),
                Box::new(LifecycleHook),
            ],
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run(
        &self,
        ctx: &mut InvocationContext,
        run: &mut RunState,
        rt: &Runtime,
    ) -> anyhow::Result<()> {
        for stage in &self.stages {
            tracing::trace!(stage = stage.name(), "middleware");
            stage.apply(ctx, run, rt)?;
        }
        Ok(())
    }
}

fn demand_single_value(name: &str, count: usize) -> Result<(), CommandLineArgsError> {
    if count > 1 {
        return Err(CommandLineArgsError::new(format!(
            "Cannot specify `--{name}` more than once"
        ))
        .telemetry_safe());
    }
    Ok(())
}

pub struct CwdOverride;

impl Middleware for CwdOverride {
    fn name(&self) -> &'static str {
        "cwd-override"
    }

    fn apply(
        &self,
        ctx: &mut InvocationContext,
        _run: &mut RunState,
        rt: &Runtime,
    ) -> anyhow::Result<()> {
        let global = &ctx.invocation.global;
        demand_single_value("cwd", global.cwd.len())?;
        let Some(dir) = global.cwd() else {
            return Ok(());
        };

        let target = ctx.cwd.join(dir);
        if !target.is_dir() {
            return Err(UserError::new(format!(
                "The directory passed to --cwd does not exist: {}",
                target.display()
            ))
            .with_telemetry_message("--cwd directory does not exist")
            .into());
        }
        if rt.apply_process_cwd {
            std::env::set_current_dir(&target)
                .with_context(|| format!("failed to change directory to {}", target.display()))?;
        }
        tracing::debug!(cwd = %target.display(), "working directory override");
        ctx.cwd = target;
        Ok(())
    }
}

pub struct EnvMerge;

impl Middleware for EnvMerge {
    fn name(&self) -> &'static str {
        "env-merge"
    }

    fn apply(
        &self,
        ctx: &mut InvocationContext,
        _run: &mut RunState,
        rt: &Runtime,
    ) -> anyhow::Result<()> {
        let overlay = env_file::load(&ctx.cwd, ctx.invocation.global.env())
            .context("failed to read environment overlay file")?;
        let Some(overlay) = overlay else {
            return Ok(());
        };

        for (key, value) in overlay.vars {
            if rt.env.contains(&key) {
                continue;
            }
            rt.env.set(&key, &value);
            ctx.injected_env.push(key);
        }
        tracing::debug!(
            file = %overlay.path.display(),
            injected = ctx.injected_env.len(),
            "merged environment overlay"
        );
        Ok(())
    }
}

pub struct SessionRecording;

impl Middleware for SessionRecording {
    fn name(&self) -> &'static str {
        "session-recording"
    }

    fn apply(
        &self,
        ctx: &mut InvocationContext,
        _run: &mut RunState,
        rt: &Runtime,
    ) -> anyhow::Result<()> {
        let Some(path) = &rt.output_file else {
            return Ok(());
        };
        let entry = SessionEntry::new(&rt.version, &ctx.argv, rt.debug_log_path.as_deref());
        if let Err(err) = session::append(path, &entry) {
            tracing::debug!("failed to record session: {err:#}");
        }
        Ok(())
    }
}

pub struct SingleValueGuard;

impl Middleware for SingleValueGuard {
    fn name(&self) -> &'static str {
        "single-value-guard"
    }

    fn apply(
        &self,
        ctx: &mut InvocationContext,
        _run: &mut RunState,
        _rt: &Runtime,
    ) -> anyhow::Result<()> {
        let global = &ctx.invocation.global;
        let path = ctx.invocation.path.key();
        if !MULTI_CONFIG_COMMANDS.contains(&path.as_str()) {
            demand_single_value("config", global.config.len())?;
        }
        demand_single_value("env", global.env.len())?;

        if !global.experimental_json_config {
            return Err(CommandLineArgsError::new(
                "JSON configuration files are supported by default; `--experimental-json-config=false` is no longer accepted.",
            )
            .telemetry_safe()
            .into());
        }
        Ok(())
    }
}

pub struct LoggerLevel;

impl Middleware for LoggerLevel {
    fn name(&self) -> &'static str {
        "logger-level"
    }

    fn apply(
        &self,
        ctx: &mut InvocationContext,
        _run: &mut RunState,
        rt: &Runtime,
    ) -> anyhow::Result<()> {
        if let Some(level) = ctx.invocation.global.log_level {
            rt.log.set_level(level);
        }
        Ok(())
    }
}

/// Fires once per top-level run, guarded by `RunState::recorded_once`.
pub struct LifecycleHook;

impl Middleware for LifecycleHook {
    fn name(&self) -> &'static str {
        "lifecycle-hook"
    }

    fn apply(
        &self,
        ctx: &mut InvocationContext,
        run: &mut RunState,
        rt: &Runtime,
    ) -> anyhow::Result<()> {
        if run.recorded_once {
            return Ok(());
        }
        run.recorded_once = true;

        let options = match ProjectConfig::read(ctx.invocation.global.config(), &ctx.cwd) {
            Ok(snapshot) => DispatcherOptions {
                send_metrics: snapshot.config.send_metrics,
                has_assets: snapshot.config.has_assets(),
                config_path: snapshot.path,
            },
            Err(err) => {
                tracing::debug!("config unavailable, telemetry disabled for this run: {err:#}");
                DispatcherOptions {
                    send_metrics: Some(false),
                    ..DispatcherOptions::default()
                }
            }
        };
        ctx.config_path = options.config_path.clone();

        let mut dispatcher = MetricsDispatcher::new(
            options,
            rt.telemetry_sink.clone(),
            rt.env.as_ref(),
            &rt.config_home,
            &rt.version,
        );

        let command = if ctx.invocation.path.is_root() {
            rt.program.clone()
        } else {
            format!("{} {}", rt.program, ctx.invocation.path)
        };
        let args = match &ctx.invocation.target {
            Target::Command(def) => ctx
                .resolved_options(rt.cancellation.clone())
                .snapshot(&def.args),
            Target::Namespace(_) | Target::Root => serde_json::Map::new(),
        };

        rt.reporter.add_breadcrumb(&command);
        dispatcher.send_command_event(
            EventName::Started,
            CommandProperties {
                command: Some(command.clone()),
                args: Some(args.clone()),
                ..CommandProperties::default()
            },
        );

        run.command = Some(command);
        run.args = Some(args);
        run.dispatcher = Some(dispatcher);
        run.transition(LifecycleState::Started);
        Ok(())
    }
}
