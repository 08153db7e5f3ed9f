//! # Record Async
//!
//! Awaitable access to a callback-based, subscription-oriented real-time
//! record store client, plus concurrent joins over record references.
//!
//! ## Core Concepts
//!
//! - **Bridge**: each callback primitive becomes a single-settlement future
//! - **Paths**: dot-separated reads and writes into record payloads
//! - **Joins**: order-preserving fan-out over list entries and record fields
//! - **Client**: the store client is an explicit handle, never a global
//!
//! ## Example
//!
//! ```ignore
//! use record_async::{AsyncStore, JoinOptions, MemoryClient};
//!
//! let store = AsyncStore::new(Arc::new(MemoryClient::new()));
//! store.login(json!({"username": "test"})).await?;
//!
//! let list = store.get_list("my_list").await?;
//! let entries = store
//!     .join_list(&list, &JoinOptions::snapshots().with_fields(["sibling"]))
//!     .await?;
//! ```

pub mod bridge;
pub mod client;
pub mod error;
pub mod join;
pub mod path;
pub mod rpc;
pub mod store;
pub mod types;

// Re-exports
pub use bridge::RecordBridge;
pub use client::{
    BusEvent, ClientErrorEvent, DropReason, EventBus, EventSubscription, ListCursor, ListHandle,
    MemoryClient, MemoryRecord, RecordCursor, RecordHandle, StoreClient, NO_RPC_PROVIDER,
    RECORD_NOT_FOUND,
};
pub use error::{Error, Result};
pub use join::JoinEngine;
pub use path::{PathAccessor, PathMode};
pub use rpc::RpcBridge;
pub use store::{AsyncStore, StoreConfig};
pub use types::*;
