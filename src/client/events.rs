//! Named-event fan-out for `emit`.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default max buffered events per subscriber.
const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Unique identifier for an event subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Events delivered to subscribers.
#[derive(Clone, Debug, PartialEq)]
pub enum BusEvent {
    Emitted { name: String, value: Value },

    /// Subscription was dropped; no further events follow.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    Unsubscribed,
}

struct Subscription {
    name: String,
    sender: Sender<BusEvent>,
}

impl Subscription {
    /// Returns false if the buffer is full or the receiver is gone.
    fn try_send(&self, event: BusEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }
}

/// Handle for receiving events of one name.
pub struct EventSubscription {
    pub id: SubscriptionId,
    pub receiver: Receiver<BusEvent>,
}

impl EventSubscription {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<BusEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<BusEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<BusEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Broadcasts emitted events to subscribers of the same name.
pub struct EventBus {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    next_id: AtomicU64,
    buffer_size: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer_size,
        }
    }

    /// Subscribe to events emitted under `name`.
    pub fn subscribe(&self, name: &str) -> EventSubscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(self.buffer_size);

        self.subscriptions.write().insert(
            id,
            Subscription {
                name: name.to_string(),
                sender,
            },
        );

        EventSubscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(sub) = self.subscriptions.write().remove(&id) {
            let _ = sub.sender.try_send(BusEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Deliver an event to every subscriber of `name`. Drops subscribers that
    /// cannot keep up.
    pub fn emit(&self, name: &str, value: Value) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter().filter(|(_, sub)| sub.name == name) {
                let event = BusEvent::Emitted {
                    name: name.to_string(),
                    value: value.clone(),
                };
                if !sub.try_send(event) {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    tracing::debug!(event = name, subscription = id.0, "dropping slow subscriber");
                    let _ = sub.sender.try_send(BusEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
