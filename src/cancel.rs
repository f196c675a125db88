//! Cancellation for in-flight conversions.
//!
//! A [`CancelHandle`] / [`CancelToken`] pair wraps a `tokio::sync::watch`
//! channel. Cancelling terminates a running renderer process; the render is
//! then reported as a timeout.

use tokio::sync::watch;

/// Sender side: call [`CancelHandle::cancel`] to stop the conversion.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Receiver side, passed into the conversion.
///
/// A token whose handle has been dropped without cancelling never fires.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        // No receivers left means nothing to cancel.
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    /// A token that can never be cancelled.
    pub fn never() -> Self {
        cancel_pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
