//! Exactly-once settlement of a callback-driven request.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Write side of a single-result channel. Clones share one slot; the first
/// `settle` wins and every later call is ignored.
pub(crate) struct Settle<T> {
    sender: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Settle<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T> Settle<T> {
    /// Returns false if the request was already settled.
    pub(crate) fn settle(&self, value: T) -> bool {
        match self.sender.lock().take() {
            Some(sender) => {
                // A dropped receiver means the caller stopped waiting.
                let _ = sender.send(value);
                true
            }
            None => false,
        }
    }
}

/// Create a settlement slot and the receiver to await.
pub(crate) fn settlement<T>() -> (Settle<T>, oneshot::Receiver<T>) {
    let (sender, receiver) = oneshot::channel();
    (
        Settle {
            sender: Arc::new(Mutex::new(Some(sender))),
        },
        receiver,
    )
}
