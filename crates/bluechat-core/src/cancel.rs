//! Cooperative cancellation for session workers
//!
//! The manager keeps the [`CancelHandle`]; the worker task keeps the [`CancelToken`] and
//! races it against its pending I/O. Firing the handle, or simply dropping it, wakes the
//! worker, which then drops the endpoint or socket it owns.

use tokio::sync::watch;

/// Manager-side half of a cancellation pair
#[derive(Debug)]
pub(crate) struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Worker-side half of a cancellation pair
#[derive(Debug)]
pub(crate) struct CancelToken {
    rx: watch::Receiver<bool>,
}

pub(crate) fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    /// Request cancellation; does not wait for the worker to exit
    pub(crate) fn cancel(self) {
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    /// Resolves once cancellation was requested or the handle was discarded
    pub(crate) async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }

    #[cfg(test)]
    pub(crate) fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }
}
