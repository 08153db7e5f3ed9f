//! Store client boundary.
//!
//! The real-time store client is an external collaborator: it owns the
//! connection, pub/sub delivery and the wire protocol. This module describes
//! the callback-style surface the async layer consumes:
//! - Login with a `(success, data)` callback
//! - Record and list handles with `when_ready` / `on_error`
//! - One-shot snapshot, existence and RPC callbacks
//! - Named events and store-issued unique ids
//!
//! [`MemoryClient`] implements the same surface in-process, with failure and
//! latency injection, so tests can run against independent fake stores.
//!
//! # Example
//!
//! ```ignore
//! let client = MemoryClient::new();
//! client.insert("users/1", json!({"name": "ada"}));
//!
//! let handle = client.get_record("users/1");
//! handle.when_ready(Box::new(|| println!("ready")));
//! handle.on_error(Box::new(|err| eprintln!("failed: {}", err)));
//! ```

mod events;
mod memory;
mod types;

pub use events::{BusEvent, DropReason, EventBus, EventSubscription, SubscriptionId};
pub use memory::{MemoryClient, MemoryRecord, NO_RPC_PROVIDER, RECORD_NOT_FOUND};
pub use types::{
    Callback, ClientErrorEvent, ClientErrorListener, ErrorListener, ListCursor, ListHandle,
    LoginCallback, ReadyCallback, RecordCursor, RecordHandle, RpcHandler, StoreClient,
};
