//! Process supervision: shutdown signalling shared by every background task.

use tokio::sync::watch;
use tracing::{info, warn};

/// Shutdown signal manager.
///
/// Background loops (sweeper, heartbeat, HTTP servers) hold a receiver from
/// [`subscribe`](Self::subscribe) and stop when it flips to `true`.
pub struct Supervisor {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    /// Get a receiver that will be notified on shutdown.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        if !self.is_shutting_down() {
            info!("Supervisor: initiating graceful shutdown");
        }
        let _ = self.shutdown_tx.send(true);
    }

    /// Check if shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Resolve once shutdown has been requested.
    pub async fn wait(&self) {
        shutdown_signal(self.subscribe()).await
    }

    /// Wait for Ctrl+C, then trigger shutdown.
    pub async fn shutdown_on_ctrl_c(&self) {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                    return;
                }
                info!("Ctrl+C received");
                self.shutdown();
            }
            _ = self.wait() => {}
        }
    }
}

/// Resolve when the receiver sees `true` or its sender is dropped.
pub async fn shutdown_signal(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_shutdown_flag() {
        let sup = Supervisor::new();
        assert!(!sup.is_shutting_down());
        sup.shutdown();
        assert!(sup.is_shutting_down());
        sup.shutdown();
        assert!(*sup.subscribe().borrow());
    }

    #[tokio::test]
    async fn test_wait_resolves_after_shutdown() {
        let sup = std::sync::Arc::new(Supervisor::new());
        let waiter = {
            let sup = sup.clone();
            tokio::spawn(async move { sup.wait().await })
        };
        let signal = tokio::spawn(shutdown_signal(sup.subscribe()));

        sup.shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), signal)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_already_down() {
        let sup = Supervisor::new();
        sup.shutdown();
        tokio::time::timeout(Duration::from_millis(50), sup.wait())
            .await
            .unwrap();
    }
}
