//! Usage telemetry.
//!
//! - [`event`] - event names and payloads
//! - [`dispatcher`] - fire-and-forget sends tracked as in-flight requests
//! - [`sink`] - transports (HTTP, debug log)
//! - [`permission`] - the user's persisted opt-in/out

pub mod dispatcher;
pub mod event;
pub mod permission;
pub mod sink;

pub use dispatcher::{
    DecisionSource, DispatcherOptions, MetricsDispatcher, TelemetryDecision, decide,
};
pub use event::{CommandProperties, EventName, TelemetryEvent};
pub use sink::{DebugSink, HttpSink, TelemetrySink, sink_from_env};
