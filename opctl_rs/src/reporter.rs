//! Exception reporting backend.
//!
//! Collects breadcrumbs and reports for the current run and flushes them on
//! `close()`. With `OPCTL_CRASH_REPORT_PATH` set, reports are appended there
//! as JSON lines; otherwise they stay in memory.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExceptionReport {
    pub error_type: String,
    pub message: String,
    pub chain: Vec<String>,
    pub breadcrumbs: Vec<String>,
    pub timestamp: String,
}

impl ExceptionReport {
    pub fn from_error(error_type: &str, error: &anyhow::Error) -> Self {
        Self {
            error_type: error_type.to_string(),
            message: error.to_string(),
            chain: error.chain().skip(1).map(|c| c.to_string()).collect(),
            breadcrumbs: Vec::new(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

pub trait ExceptionReporter: Send + Sync {
    fn add_breadcrumb(&self, message: &str);

    fn capture(&self, report: ExceptionReport);

    /// Flush pending reports. Called once during shutdown.
    fn close(&self) -> BoxFuture<'_, Result<()>>;
}

#[derive(Debug, Default)]
struct ReporterState {
    breadcrumbs: Vec<String>,
    reports: Vec<ExceptionReport>,
    flushed: usize,
    closed: bool,
}

/// Reporter that buffers in memory and optionally appends to a JSONL file.
#[derive(Debug, Default)]
pub struct JsonlReporter {
    path: Option<PathBuf>,
    state: Mutex<ReporterState>,
}

impl JsonlReporter {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            state: Mutex::new(ReporterState::default()),
        }
    }

    pub fn from_env(env: &dyn crate::env::EnvStore) -> Self {
        Self::new(
            env.get("OPCTL_CRASH_REPORT_PATH")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        )
    }

    pub fn breadcrumbs(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.breadcrumbs.clone())
            .unwrap_or_default()
    }

    pub fn reports(&self) -> Vec<ExceptionReport> {
        self.state
            .lock()
            .map(|s| s.reports.clone())
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().map(|s| s.closed).unwrap_or(false)
    }
}

impl ExceptionReporter for JsonlReporter {
    fn add_breadcrumb(&self, message: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.breadcrumbs.push(message.to_string());
        }
    }

    fn capture(&self, mut report: ExceptionReport) {
        if let Ok(mut state) = self.state.lock() {
            report.breadcrumbs = state.breadcrumbs.clone();
            state.reports.push(report);
        }
    }

    fn close(&self) -> BoxFuture<'_, Result<()>> {
        async move {
            let pending: Vec<ExceptionReport> = {
                let mut state = self
                    .state
                    .lock()
                    .map_err(|_| anyhow::anyhow!("reporter state poisoned"))?;
                state.closed = true;
                let pending = state.reports[state.flushed..].to_vec();
                state.flushed = state.reports.len();
                pending
            };
            let Some(path) = &self.path else {
                return Ok(());
            };
            if pending.is_empty() {
                return Ok(());
            }

            let mut body = String::new();
            for report in &pending {
                body.push_str(&serde_json::to_string(report)?);
                body.push('\n');
            }
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .with_context(|| format!("failed to open crash report {}", path.display()))?;
            file.write_all(body.as_bytes())
                .await
                .with_context(|| format!("failed to write crash report {}", path.display()))?;
            file.flush().await?;
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reports_carry_breadcrumbs_and_flush_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crash.jsonl");
        let reporter = JsonlReporter::new(Some(path.clone()));
        reporter.add_breadcrumb("opctl kv list");
        reporter.capture(ExceptionReport::from_error("Error", &anyhow::anyhow!("boom")));
        reporter.close().await.unwrap();
        reporter.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        let report: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(report["message"], "boom");
        assert_eq!(report["breadcrumbs"][0], "opctl kv list");
        assert!(reporter.is_closed());
    }

    #[tokio::test]
    async fn test_close_fails_on_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let reporter = JsonlReporter::new(Some(dir.path().join("missing").join("crash.jsonl")));
        reporter.capture(ExceptionReport::from_error("Error", &anyhow::anyhow!("boom")));
        assert!(reporter.close().await.is_err());
    }
}
