//! Shutdown coordination for the change indexer.
//!
//! Turns SIGINT/SIGTERM into a cancellation of the ingestion loop and waits until the
//! loop reports that its consumer is closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::orchestrator::{LoopState, Orchestrator};

/// Whether a call to [`ShutdownCoordinator::shutdown`] started the shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownRequest {
    /// This call cancelled the loop.
    Initiated,
    /// The loop had already been asked to stop.
    AlreadyRequested,
}

/// Coordinates a graceful stop of the ingestion loop.
///
/// Clones share the same request flag, so concurrent requests (a signal arriving while
/// the main task is also shutting down) cancel the loop once and all wait for the same
/// close.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    cancellation: CancellationToken,
    state: watch::Receiver<LoopState>,
    requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Create a coordinator from a cancellation token and the loop's state channel.
    pub fn new(cancellation: CancellationToken, state: watch::Receiver<LoopState>) -> Self {
        Self {
            cancellation,
            state,
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a coordinator for the given orchestrator.
    pub fn for_orchestrator(orchestrator: &Orchestrator) -> Self {
        Self::new(
            orchestrator.cancellation_token(),
            orchestrator.subscribe_state(),
        )
    }

    /// Whether a shutdown has been requested, through this coordinator or the token.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst) || self.cancellation.is_cancelled()
    }

    /// Stop the loop and wait until it has closed its consumer.
    ///
    /// Only the first request cancels the loop; every request waits for the close.
    /// Returns immediately if the loop is already closed, or once the loop has been
    /// dropped.
    pub async fn shutdown(&self) -> ShutdownRequest {
        let already_cancelled = self.cancellation.is_cancelled();
        let first = !self.requested.swap(true, Ordering::SeqCst) && !already_cancelled;

        let request = if first {
            info!("Shutdown requested, waiting for the ingestion loop to close");
            self.cancellation.cancel();
            ShutdownRequest::Initiated
        } else {
            debug!("Shutdown already requested");
            self.cancellation.cancel();
            ShutdownRequest::AlreadyRequested
        };

        self.wait_for_close().await;
        request
    }

    /// Wait for SIGINT or SIGTERM, then shut down.
    pub async fn listen_for_signals(self) -> ShutdownRequest {
        wait_for_shutdown_signal().await;
        self.shutdown().await
    }

    async fn wait_for_close(&self) {
        let mut state = self.state.clone();
        match state.wait_for(LoopState::is_closed).await {
            Ok(_) => info!("Ingestion loop closed"),
            Err(_) => debug!("Ingestion loop dropped before reporting closed"),
        };
    }
}

/// Wait for a termination signal.
///
/// SIGINT (Ctrl-C) is handled everywhere, SIGTERM on Unix. If the SIGTERM handler cannot
/// be installed, only SIGINT is awaited.
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to install SIGTERM handler, listening for SIGINT only"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received SIGINT"),
        Err(e) => warn!(error = %e, "Failed to listen for SIGINT"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn coordinator() -> (ShutdownCoordinator, watch::Sender<LoopState>, CancellationToken) {
        let token = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(LoopState::Polling);
        (
            ShutdownCoordinator::new(token.clone(), state_rx),
            state_tx,
            token,
        )
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_closed() {
        let (coordinator, state_tx, token) = coordinator();

        let handle = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.shutdown().await }
        });

        // Simulate the loop observing the cancellation and draining.
        timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
        assert!(!handle.is_finished());

        state_tx.send(LoopState::Draining).unwrap();
        state_tx.send(LoopState::Closed).unwrap();

        let request = timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request, ShutdownRequest::Initiated);
        assert!(coordinator.is_requested());
    }

    #[tokio::test]
    async fn test_second_request_is_not_initiator() {
        let (coordinator, state_tx, _token) = coordinator();
        state_tx.send(LoopState::Closed).unwrap();

        assert_eq!(coordinator.shutdown().await, ShutdownRequest::Initiated);
        assert_eq!(
            coordinator.clone().shutdown().await,
            ShutdownRequest::AlreadyRequested
        );
    }

    #[tokio::test]
    async fn test_shutdown_returns_when_loop_is_dropped() {
        let (coordinator, state_tx, _token) = coordinator();
        drop(state_tx);

        let request = timeout(Duration::from_secs(1), coordinator.shutdown())
            .await
            .unwrap();
        assert_eq!(request, ShutdownRequest::Initiated);
    }

    #[tokio::test]
    async fn test_cancelled_token_counts_as_requested() {
        let (coordinator, state_tx, token) = coordinator();
        assert!(!coordinator.is_requested());

        token.cancel();
        assert!(coordinator.is_requested());

        state_tx.send(LoopState::Closed).unwrap();
        assert_eq!(
            coordinator.shutdown().await,
            ShutdownRequest::AlreadyRequested
        );
    }
}
