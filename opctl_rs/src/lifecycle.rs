//! Shutdown sequence: run once at process end, success or failure.
//!
//! Closes the signal channel, then closes the exception reporter and drains
//! the in-flight telemetry sends against one [`DRAIN_TIMEOUT`] deadline. Sends
//! still pending at the deadline are abandoned, never killed; the abort token
//! tells them their result no longer matters.

use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::reporter::ExceptionReporter;

/// Upper bound on how long exit waits for telemetry.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Cooperative termination channel: Ctrl+C cancels the run's token.
pub struct SignalChannel {
    token: CancellationToken,
    listener: Option<JoinHandle<()>>,
}

impl SignalChannel {
    /// Listen for Ctrl+C. Must be called from within a tokio runtime.
    pub fn listen(token: CancellationToken) -> Self {
        let signal_token = token.clone();
        let listener = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("interrupt received, cancelling command");
                signal_token.cancel();
            }
        });
        Self {
            token,
            listener: Some(listener),
        }
    }

    /// A channel with no OS listener attached.
    pub fn detached(token: CancellationToken) -> Self {
        Self {
            token,
            listener: None,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_open(&self) -> bool {
        self.listener.is_some()
    }

    pub fn close(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every send settled before the deadline.
    Settled,
    /// The deadline won; `abandoned` sends were still pending.
    TimedOut { abandoned: usize },
}

/// Run the shutdown sequence.
///
/// Closing the reporter and draining requests share one `timeout` deadline.
/// A reporter close failure is returned only after the drain has run.
pub async fn shutdown(
    signal: &mut SignalChannel,
    reporter: &dyn ExceptionReporter,
    mut requests: Vec<JoinHandle<()>>,
    abort: CancellationToken,
    timeout: Duration,
) -> anyhow::Result<DrainOutcome> {
    signal.close();
    let deadline = tokio::time::Instant::now() + timeout;
    let closed = match tokio::time::timeout_at(deadline, reporter.close()).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("exception reporter did not close within {timeout:?}")),
    };

    let total = requests.len();
    let drained = tokio::time::timeout_at(deadline, join_all(requests.iter_mut())).await;
    abort.cancel();

    let outcome = match drained {
        Ok(_) => DrainOutcome::Settled,
        Err(_) => DrainOutcome::TimedOut {
            abandoned: requests.iter().filter(|h| !h.is_finished()).count(),
        },
    };
    tracing::debug!(requests = total, ?outcome, "telemetry drain finished");

    closed?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{ExceptionReport, JsonlReporter};
    use futures::FutureExt;
    use futures::future::BoxFuture;

    struct FailingReporter;

    impl ExceptionReporter for FailingReporter {
        fn add_breadcrumb(&self, _message: &str) {}

        fn capture(&self, _report: ExceptionReport) {}

        fn close(&self) -> BoxFuture<'_, anyhow::Result<()>> {
            async { Err(anyhow::anyhow!("reporter unreachable")) }.boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_gives_up_at_timeout() {
        let mut signal = SignalChannel::detached(CancellationToken::new());
        let reporter = JsonlReporter::new(None);
        let stuck = tokio::spawn(futures::future::pending::<()>());
        let abort = CancellationToken::new();

        let started = tokio::time::Instant::now();
        let outcome = shutdown(&mut signal, &reporter, vec![stuck], abort.clone(), DRAIN_TIMEOUT)
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert_eq!(outcome, DrainOutcome::TimedOut { abandoned: 1 });
        assert!(elapsed >= DRAIN_TIMEOUT);
        assert!(elapsed < DRAIN_TIMEOUT + Duration::from_millis(100));
        assert!(abort.is_cancelled());
        assert!(reporter.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_returns_once_sends_settle() {
        let mut signal = SignalChannel::detached(CancellationToken::new());
        let reporter = JsonlReporter::new(None);
        let quick = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
        });
        let failed = tokio::spawn(async {});

        let started = tokio::time::Instant::now();
        let outcome = shutdown(
            &mut signal,
            &reporter,
            vec![quick, failed],
            CancellationToken::new(),
            DRAIN_TIMEOUT,
        )
        .await
        .unwrap();

        assert_eq!(outcome, DrainOutcome::Settled);
        assert!(started.elapsed() < DRAIN_TIMEOUT);
    }

    /// Reporter whose close never finishes.
    struct StalledReporter;

    impl ExceptionReporter for StalledReporter {
        fn add_breadcrumb(&self, _message: &str) {}

        fn capture(&self, _report: ExceptionReport) {}

        fn close(&self) -> BoxFuture<'_, anyhow::Result<()>> {
            futures::future::pending().boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_reporter_shares_drain_deadline() {
        let mut signal = SignalChannel::detached(CancellationToken::new());
        let stuck = tokio::spawn(futures::future::pending::<()>());
        let abort = CancellationToken::new();

        let started = tokio::time::Instant::now();
        let err = shutdown(&mut signal, &StalledReporter, vec![stuck], abort.clone(), DRAIN_TIMEOUT)
            .await
            .unwrap_err();

        let elapsed = started.elapsed();
        assert!(err.to_string().contains("did not close"));
        assert!(elapsed >= DRAIN_TIMEOUT);
        assert!(elapsed < DRAIN_TIMEOUT + Duration::from_millis(100));
        assert!(abort.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_failure_surfaces_after_drain() {
        let mut signal = SignalChannel::detached(CancellationToken::new());
        let abort = CancellationToken::new();
        let err = shutdown(&mut signal, &FailingReporter, Vec::new(), abort.clone(), DRAIN_TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("reporter unreachable"));
        assert!(abort.is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_channel_closes_listener() {
        let mut signal = SignalChannel::listen(CancellationToken::new());
        assert!(signal.is_open());
        signal.close();
        assert!(!signal.is_open());
        assert!(!signal.token().is_cancelled());
    }
}
