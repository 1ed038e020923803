use serde::Serialize;
use serde_json::{Map, Value};

/// Lifecycle events emitted once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventName {
    Started,
    Completed,
    Errored,
}

impl EventName {
    /// Event name as sent over the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            EventName::Started => "opctl command started",
            EventName::Completed => "opctl command completed",
            EventName::Errored => "opctl command errored",
        }
    }
}

/// Per-command properties supplied by the pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommandProperties {
    pub command: Option<String>,
    pub args: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CommandProperties {
    pub fn with_duration(mut self, elapsed: std::time::Duration) -> Self {
        let ms = elapsed.as_millis();
        self.duration_ms = Some(ms);
        self.duration_seconds = Some(ms as f64 / 1000.0);
        self.duration_minutes = Some(ms as f64 / 1000.0 / 60.0);
        self
    }
}

/// Properties attached to every event of a run.
#[derive(Debug, Clone, Serialize)]
pub struct CommonProperties {
    pub tool_version: String,
    pub os: &'static str,
    pub is_ci: bool,
    pub is_interactive: bool,
    pub has_assets: bool,
    pub config_path: Option<String>,
}

/// One telemetry event, ready to send.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryEvent {
    pub name: EventName,
    pub event: &'static str,
    pub session_id: String,
    pub timestamp: String,
    #[serde(flatten)]
    pub common: CommonProperties,
    pub properties: CommandProperties,
}
