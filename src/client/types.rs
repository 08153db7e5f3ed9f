//! Callback-style store client surface.

use crate::error::Result;
use serde_json::Value;
use std::sync::Arc;

/// Fired once when a handle has loaded its initial value.
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// Persistent error listener on a handle. May fire more than once.
pub type ErrorListener = Box<dyn Fn(&str) + Send + Sync>;

/// One-shot completion callback carrying the store's error message on failure.
pub type Callback<T> = Box<dyn FnOnce(std::result::Result<T, String>) + Send>;

/// Login completion: `(success, data)`. On failure `data` is the rejection payload.
pub type LoginCallback = Box<dyn FnOnce(bool, Value) + Send>;

/// Handler serving an RPC name.
pub type RpcHandler = Arc<dyn Fn(Value) -> std::result::Result<Value, String> + Send + Sync>;

pub type ClientErrorListener = Box<dyn Fn(&ClientErrorEvent) + Send + Sync>;

/// Connection-level error reported by the store client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientErrorEvent {
    pub error: String,
    pub event: String,
    pub topic: String,
}

/// Live, subscribed handle to one record.
pub trait RecordHandle: Send + Sync {
    /// The record's ref.
    fn name(&self) -> &str;

    /// Current payload.
    fn get(&self) -> Value;

    /// Write `value` at a dot-separated path (empty path replaces the payload).
    fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Register a callback for readiness. Fires immediately if already ready.
    fn when_ready(&self, callback: ReadyCallback);

    fn on_error(&self, listener: ErrorListener);

    /// Release the subscription backing this handle.
    fn discard(&self);
}

/// A record whose payload is an ordered sequence of record refs.
pub trait ListHandle: RecordHandle {
    /// Current refs, in list order. Fails on an entry that is not a string.
    fn entries(&self) -> Result<Vec<String>>;

    fn set_entries(&self, entries: Vec<String>);

    fn add_entry(&self, entry: &str) -> Result<()>;

    fn remove_entry(&self, entry: &str) -> Result<()>;
}

pub type RecordCursor = Arc<dyn RecordHandle>;
pub type ListCursor = Arc<dyn ListHandle>;

/// The store client operations consumed by the async layer.
pub trait StoreClient: Send + Sync {
    fn login(&self, credentials: Value, callback: LoginCallback);

    /// Request a record handle. Missing records are created implicitly.
    fn get_record(&self, name: &str) -> RecordCursor;

    fn get_list(&self, name: &str) -> ListCursor;

    fn snapshot(&self, name: &str, callback: Callback<Value>);

    fn has(&self, name: &str, callback: Callback<bool>);

    fn rpc_make(&self, name: &str, args: Value, callback: Callback<Value>);

    fn rpc_provide(&self, name: &str, handler: RpcHandler);

    fn rpc_unprovide(&self, name: &str);

    fn emit(&self, name: &str, value: Value);

    /// Store-issued unique token.
    fn get_uid(&self) -> String;

    fn on_client_error(&self, listener: ClientErrorListener);
}
