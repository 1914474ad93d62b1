//! Graceful shutdown coordination via `CancellationToken`.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default grace period for in-flight sessions.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared shutdown signal for listeners and sessions.
#[derive(Clone, Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a coordinator that has not fired yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of the underlying token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Fire the shutdown signal.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has been signalled.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fire on SIGINT or SIGTERM. Resolves once the signal arrived.
    pub async fn shutdown_on_signal(&self) {
        wait_for_signal().await;
        info!("shutdown signal received");
        self.shutdown();
    }

    /// Signal shutdown, then wait up to `timeout` for `handles`.
    ///
    /// Tasks still running after the grace period are aborted. Returns how
    /// many were aborted.
    pub async fn graceful_shutdown(
        &self,
        handles: Vec<JoinHandle<()>>,
        timeout: Option<Duration>,
    ) -> usize {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);
        self.shutdown();
        info!(
            task_count = handles.len(),
            timeout_secs = timeout.as_secs(),
            "waiting for tasks to complete"
        );

        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        if tokio::time::timeout(timeout, futures::future::join_all(handles))
            .await
            .is_ok()
        {
            return 0;
        }

        let stragglers = aborts.iter().filter(|h| !h.is_finished()).count();
        warn!(stragglers, "shutdown timed out after {timeout:?}, aborting");
        for handle in &aborts {
            handle.abort();
        }
        stragglers
    }
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                let _ = sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_live() {
        assert!(!ShutdownCoordinator::new().is_shutting_down());
    }

    #[test]
    fn clones_share_the_signal() {
        let coord = ShutdownCoordinator::new();
        let other = coord.clone();
        let token = coord.token();
        other.shutdown();
        assert!(coord.is_shutting_down());
        assert!(token.is_cancelled());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let coord = ShutdownCoordinator::new();
        coord.shutdown();
        coord.shutdown();
        assert!(coord.is_shutting_down());
    }

    #[tokio::test]
    async fn graceful_shutdown_waits_for_cooperative_tasks() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        let handle = tokio::spawn(async move { token.cancelled().await });

        let aborted = coord.graceful_shutdown(vec![handle], None).await;
        assert_eq!(aborted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn graceful_shutdown_aborts_stragglers() {
        let coord = ShutdownCoordinator::new();
        let stuck = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(300)).await;
        });
        let quick = tokio::spawn(async {});

        let aborted = coord
            .graceful_shutdown(vec![stuck, quick], Some(Duration::from_millis(100)))
            .await;
        assert_eq!(aborted, 1);
        assert!(coord.is_shutting_down());
    }
}
