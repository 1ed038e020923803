//! Where telemetry events go.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::FutureExt;
use futures::future::BoxFuture;

use super::event::TelemetryEvent;
use crate::env::{EnvStore, proxy_from_env};

/// Transport for telemetry events. Sends are fire-and-forget from the
/// pipeline's point of view; a failed send is logged and dropped.
pub trait TelemetrySink: Send + Sync {
    fn send(&self, event: TelemetryEvent) -> BoxFuture<'static, Result<()>>;
}

/// POSTs events as JSON to a metrics endpoint.
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>, env: &dyn EnvStore) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("opctl/", env!("CARGO_PKG_VERSION")));
        if let Some(proxy) = proxy_from_env(env) {
            builder = builder.proxy(
                reqwest::Proxy::all(&proxy).with_context(|| format!("invalid proxy url {proxy}"))?,
            );
        }
        Ok(Self {
            client: builder.build().context("failed to build telemetry client")?,
            endpoint: endpoint.into(),
        })
    }
}

impl TelemetrySink for HttpSink {
    fn send(&self, event: TelemetryEvent) -> BoxFuture<'static, Result<()>> {
        let request = self.client.post(&self.endpoint).json(&event);
        async move {
            request
                .send()
                .await
                .context("telemetry request failed")?
                .error_for_status()
                .context("telemetry endpoint rejected event")?;
            Ok(())
        }
        .boxed()
    }
}

/// Logs events at debug level instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugSink;

impl TelemetrySink for DebugSink {
    fn send(&self, event: TelemetryEvent) -> BoxFuture<'static, Result<()>> {
        async move {
            let body = serde_json::to_string(&event)?;
            tracing::debug!(event = event.event, %body, "telemetry event");
            Ok(())
        }
        .boxed()
    }
}

/// Sink for this process: HTTP when `OPCTL_METRICS_URL` is set, otherwise debug logging.
pub fn sink_from_env(env: &dyn EnvStore) -> Result<Box<dyn TelemetrySink>> {
    match env.get("OPCTL_METRICS_URL").filter(|u| !u.is_empty()) {
        Some(url) => Ok(Box::new(HttpSink::new(url, env)?)),
        None => Ok(Box::new(DebugSink)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MemoryEnv;

    #[test]
    fn test_malformed_proxy_is_an_error() {
        let env = MemoryEnv::from_pairs([
            ("OPCTL_METRICS_URL", "https://metrics.example.com/events"),
            ("HTTPS_PROXY", "http://[::1"),
        ]);
        let err = sink_from_env(&env).err().expect("proxy should be rejected");
        assert!(format!("{err:#}").contains("invalid proxy url"));
    }

    #[test]
    fn test_proxy_ignored_without_metrics_url() {
        let env = MemoryEnv::from_pairs([("HTTPS_PROXY", "http://[::1")]);
        assert!(sink_from_env(&env).is_ok());
    }
}
