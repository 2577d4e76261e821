//! Cooperative interrupt handling
//!
//! The crawl driver polls a [`ShutdownSignal`] between pages and races it
//! against the throttle sleep. An in-flight fetch always completes first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::warn;

/// Shared handle to a shutdown signal
pub type SharedShutdown = Arc<ShutdownSignal>;

/// One-shot interrupt flag shared between the signal listener and the driver
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    /// New shared signal, not yet requested
    pub fn shared() -> SharedShutdown {
        Arc::new(Self::default())
    }

    /// Request shutdown; waiters are woken once
    pub fn request(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Whether shutdown has been requested
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown is requested
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a request in between is not lost
        notified.as_mut().enable();
        if self.is_requested() {
            return;
        }
        notified.await;
    }

    /// Spawn a task that requests shutdown on Ctrl+C
    pub fn listen_for_ctrl_c(self: &Arc<Self>) -> JoinHandle<()> {
        let signal = Arc::clone(self);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl+C received, saving progress before exiting");
                signal.request();
            }
        })
    }
}
