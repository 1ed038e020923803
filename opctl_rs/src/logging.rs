//! Diagnostic logging.
//!
//! A `tracing` subscriber writing to stderr, with the level behind a reload
//! handle so the pipeline can apply `--log-level` after startup.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, reload};

use crate::env::EnvStore;

/// Names accepted by `--log-level` and `OPCTL_LOG_LEVEL`.
pub const LOG_LEVELS: &[&str] = &["none", "error", "warn", "info", "log", "debug"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    None,
    Error,
    Warn,
    Info,
    #[default]
    Log,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::None => "none",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Log => "log",
            LogLevel::Debug => "debug",
        }
    }

    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::None => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info | LogLevel::Log => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(LogLevel::None),
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "log" => Ok(LogLevel::Log),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!(
                "Invalid log level '{}'. Use one of: {}.",
                other,
                LOG_LEVELS.join(", ")
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle for changing the active log level.
///
/// A detached handle (tests, or a second `init`) only tracks the level.
#[derive(Clone)]
pub struct LogHandle {
    reload: Option<reload::Handle<LevelFilter, Registry>>,
    level: Arc<Mutex<LogLevel>>,
}

impl LogHandle {
    pub fn detached(level: LogLevel) -> Self {
        Self {
            reload: None,
            level: Arc::new(Mutex::new(level)),
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level.lock().map(|l| *l).unwrap_or_default()
    }

    pub fn set_level(&self, level: LogLevel) {
        if let Ok(mut current) = self.level.lock() {
            *current = level;
        }
        if let Some(handle) = &self.reload
            && let Err(err) = handle.reload(level.filter())
        {
            let _ = writeln!(std::io::stderr(), "[opctl][warn] failed to change log level: {err}");
        }
    }
}

/// Install the global subscriber. `RUST_LOG`, when set, narrows output further.
pub fn init(initial: LogLevel) -> LogHandle {
    let (level_layer, reload_handle) = reload::Layer::new(initial.filter());
    let env_filter = EnvFilter::try_from_default_env().ok();

    let installed = tracing_subscriber::registry()
        .with(level_layer)
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .is_ok();

    if installed {
        LogHandle {
            reload: Some(reload_handle),
            level: Arc::new(Mutex::new(initial)),
        }
    } else {
        LogHandle::detached(initial)
    }
}

/// Initial level from `OPCTL_LOG_LEVEL`, falling back to `log`.
pub fn level_from_env(env: &dyn EnvStore) -> LogLevel {
    env.get("OPCTL_LOG_LEVEL")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default()
}

/// Where the debug log for this run lives (`OPCTL_LOG_PATH` overrides).
pub fn debug_log_path(env: &dyn EnvStore) -> PathBuf {
    if let Some(path) = env.get("OPCTL_LOG_PATH") {
        return PathBuf::from(path);
    }
    let stamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S_%3f");
    crate::config::config_home(env)
        .join("logs")
        .join(format!("opctl-{stamp}.log"))
}
