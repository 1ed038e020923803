//! Metrics dispatcher: builds events and fires them off without waiting.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::event::{CommandProperties, CommonProperties, EventName, TelemetryEvent};
use super::permission;
use super::sink::TelemetrySink;
use crate::env::{EnvStore, is_ci};

/// Inputs resolved from the (best-effort) project config.
#[derive(Debug, Clone, Default)]
pub struct DispatcherOptions {
    pub send_metrics: Option<bool>,
    pub has_assets: bool,
    pub config_path: Option<PathBuf>,
}

/// Why telemetry is on or off for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Environment,
    ProjectConfig,
    UserPermission,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryDecision {
    pub enabled: bool,
    pub source: DecisionSource,
}

/// `OPCTL_SEND_METRICS` wins, then the project's `send_metrics`, then the
/// persisted user permission; with no decision anywhere telemetry is on.
pub fn decide(
    send_metrics: Option<bool>,
    env: &dyn EnvStore,
    config_home: &Path,
) -> TelemetryDecision {
    if let Some(raw) = env.get("OPCTL_SEND_METRICS") {
        let enabled = !matches!(raw.to_ascii_lowercase().as_str(), "false" | "0" | "no");
        return TelemetryDecision {
            enabled,
            source: DecisionSource::Environment,
        };
    }
    if let Some(enabled) = send_metrics {
        return TelemetryDecision {
            enabled,
            source: DecisionSource::ProjectConfig,
        };
    }
    match permission::read(config_home).permission {
        Some(p) => TelemetryDecision {
            enabled: p.enabled,
            source: DecisionSource::UserPermission,
        },
        None => TelemetryDecision {
            enabled: true,
            source: DecisionSource::Default,
        },
    }
}

pub struct MetricsDispatcher {
    enabled: bool,
    sink: Arc<dyn TelemetrySink>,
    session_id: String,
    common: CommonProperties,
    requests: Vec<JoinHandle<()>>,
    emitted: Vec<EventName>,
    abort: CancellationToken,
}

impl MetricsDispatcher {
    pub fn new(
        options: DispatcherOptions,
        sink: Arc<dyn TelemetrySink>,
        env: &dyn EnvStore,
        config_home: &Path,
        tool_version: &str,
    ) -> Self {
        let decision = decide(options.send_metrics, env, config_home);
        tracing::debug!(
            enabled = decision.enabled,
            source = ?decision.source,
            "metrics dispatcher"
        );
        Self {
            enabled: decision.enabled,
            sink,
            session_id: Uuid::new_v4().to_string(),
            common: CommonProperties {
                tool_version: tool_version.to_string(),
                os: std::env::consts::OS,
                is_ci: is_ci(env),
                is_interactive: crate::interactive::is_interactive(env),
                has_assets: options.has_assets,
                config_path: options.config_path.map(|p| p.display().to_string()),
            },
            requests: Vec::new(),
            emitted: Vec::new(),
            abort: CancellationToken::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Queue an event. Returns immediately; the send runs on its own task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn send_command_event(&mut self, name: EventName, properties: CommandProperties) {
        if !self.enabled {
            tracing::debug!(event = name.wire_name(), "telemetry disabled, dropping event");
            return;
        }
        let event = TelemetryEvent {
            name,
            event: name.wire_name(),
            session_id: self.session_id.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            common: self.common.clone(),
            properties,
        };
        let sink = Arc::clone(&self.sink);
        let abort = self.abort.clone();
        self.requests.push(tokio::spawn(async move {
            if let Err(err) = sink.send(event).await
                && !abort.is_cancelled()
            {
                tracing::debug!(event = name.wire_name(), "telemetry send failed: {err:#}");
            }
        }));
        self.emitted.push(name);
    }

    /// Events queued so far, in order.
    pub fn emitted(&self) -> &[EventName] {
        &self.emitted
    }

    /// Sends that have not settled yet.
    pub fn in_flight(&self) -> usize {
        self.requests.iter().filter(|h| !h.is_finished()).count()
    }

    /// Hand over every queued send for draining.
    pub fn take_requests(&mut self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.requests)
    }

    /// Set once the drain stops waiting; late completions stay quiet.
    pub fn abort_signal(&self) -> CancellationToken {
        self.abort.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MemoryEnv;
    use tempfile::TempDir;

    #[test]
    fn test_environment_overrides_everything() {
        let dir = TempDir::new().unwrap();
        permission::write(dir.path(), true).unwrap();
        let env = MemoryEnv::from_pairs([("OPCTL_SEND_METRICS", "false")]);
        let decision = decide(Some(true), &env, dir.path());
        assert!(!decision.enabled);
        assert_eq!(decision.source, DecisionSource::Environment);
    }

    #[test]
    fn test_project_config_beats_user_permission() {
        let dir = TempDir::new().unwrap();
        permission::write(dir.path(), true).unwrap();
        let decision = decide(Some(false), &MemoryEnv::new(), dir.path());
        assert!(!decision.enabled);
        assert_eq!(decision.source, DecisionSource::ProjectConfig);
    }

    #[test]
    fn test_defaults_to_enabled() {
        let dir = TempDir::new().unwrap();
        let decision = decide(None, &MemoryEnv::new(), dir.path());
        assert_eq!(
            decision,
            TelemetryDecision {
                enabled: true,
                source: DecisionSource::Default
            }
        );
    }
}
