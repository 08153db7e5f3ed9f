//! In-process store client.
//!
//! Honours the callback contract of a real-time store client without a
//! network. Inside a Tokio runtime every callback is delivered from a
//! spawned task, never from inside the request itself. Outside a runtime
//! there is nothing to spawn on, so callbacks run inline before the request
//! returns; that mode only suits synchronous seeding and inspection.

use super::events::{EventBus, EventSubscription};
use super::types::{
    Callback, ClientErrorEvent, ClientErrorListener, ErrorListener, ListCursor, ListHandle,
    LoginCallback, ReadyCallback, RecordCursor, RecordHandle, RpcHandler, StoreClient,
};
use crate::error::{Error, Result};
use crate::path::PathAccessor;
use crate::types::Timestamp;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Error reported by `snapshot` for a record that was never written.
pub const RECORD_NOT_FOUND: &str = "RECORD_NOT_FOUND";

/// Error reported by `rpc_make` when nobody serves the name.
pub const NO_RPC_PROVIDER: &str = "NO_RPC_PROVIDER";

struct Shared {
    records: RwLock<HashMap<String, Value>>,
    /// Injected failures by ref.
    failures: RwLock<HashMap<String, String>>,
    /// Injected latency by ref (or RPC name).
    delays: RwLock<HashMap<String, Duration>>,
    providers: RwLock<HashMap<String, RpcHandler>>,
    login_denial: Mutex<Option<Value>>,
    error_listeners: RwLock<Vec<ClientErrorListener>>,
    open_subscriptions: AtomicUsize,
    uid_counter: AtomicU64,
    events: EventBus,
}

/// In-memory store client. Cheap to clone; clones share one store.
#[derive(Clone)]
pub struct MemoryClient {
    shared: Arc<Shared>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                records: RwLock::new(HashMap::new()),
                failures: RwLock::new(HashMap::new()),
                delays: RwLock::new(HashMap::new()),
                providers: RwLock::new(HashMap::new()),
                login_denial: Mutex::new(None),
                error_listeners: RwLock::new(Vec::new()),
                open_subscriptions: AtomicUsize::new(0),
                uid_counter: AtomicU64::new(0),
                events: EventBus::new(),
            }),
        }
    }

    // --- Seeding & Inspection ---

    pub fn insert(&self, name: &str, value: Value) {
        self.shared.records.write().insert(name.to_string(), value);
    }

    /// Store a list record holding `entries`.
    pub fn insert_list<S: AsRef<str>>(&self, name: &str, entries: &[S]) {
        let entries: Vec<Value> = entries.iter().map(|e| json!(e.as_ref())).collect();
        self.insert(name, Value::Array(entries));
    }

    pub fn remove(&self, name: &str) {
        self.shared.records.write().remove(name);
    }

    pub fn value(&self, name: &str) -> Option<Value> {
        self.shared.records.read().get(name).cloned()
    }

    /// Number of record/list handles handed out and not yet discarded.
    pub fn open_subscriptions(&self) -> usize {
        self.shared.open_subscriptions.load(Ordering::SeqCst)
    }

    // --- Fault Injection ---

    /// Make every request for `name` fail with `message`.
    pub fn fail_record(&self, name: &str, message: &str) {
        self.shared
            .failures
            .write()
            .insert(name.to_string(), message.to_string());
    }

    pub fn clear_failure(&self, name: &str) {
        self.shared.failures.write().remove(name);
    }

    /// Delay every callback for `name` by `delay`.
    pub fn set_delay(&self, name: &str, delay: Duration) {
        self.shared.delays.write().insert(name.to_string(), delay);
    }

    /// Reject subsequent logins with `reason`.
    pub fn deny_login(&self, reason: Value) {
        *self.shared.login_denial.lock() = Some(reason);
    }

    /// Report a connection-level error to registered listeners.
    pub fn raise_client_error(&self, error: &str, event: &str, topic: &str) {
        let event = ClientErrorEvent {
            error: error.to_string(),
            event: event.to_string(),
            topic: topic.to_string(),
        };
        for listener in self.shared.error_listeners.read().iter() {
            listener(&event);
        }
    }

    pub fn subscribe_event(&self, name: &str) -> EventSubscription {
        self.shared.events.subscribe(name)
    }

    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    // --- Internals ---

    fn failure(&self, name: &str) -> Option<String> {
        self.shared.failures.read().get(name).cloned()
    }

    /// Run `f` from a spawned task after the configured delay for `name`.
    /// Without a runtime `f` runs inline and the delay is ignored.
    fn deliver(&self, name: &str, f: impl FnOnce() + Send + 'static) {
        let delay = self.shared.delays.read().get(name).copied();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    match delay {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => tokio::task::yield_now().await,
                    }
                    f();
                });
            }
            Err(_) => f(),
        }
    }

    fn open_handle(&self, name: &str, initial: Value) -> Arc<MemoryRecord> {
        let failure = self.failure(name);
        if failure.is_none() {
            self.shared
                .records
                .write()
                .entry(name.to_string())
                .or_insert(initial);
        }

        self.shared.open_subscriptions.fetch_add(1, Ordering::SeqCst);
        let record = Arc::new(MemoryRecord::new(name, Arc::clone(&self.shared)));

        let pending = Arc::clone(&record);
        self.deliver(name, move || match failure {
            Some(message) => pending.mark_failed(&message),
            None => pending.mark_ready(),
        });

        record
    }
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreClient for MemoryClient {
    fn login(&self, credentials: Value, callback: LoginCallback) {
        let denial = self.shared.login_denial.lock().clone();
        self.deliver("login", move || match denial {
            Some(reason) => callback(false, reason),
            None => callback(true, json!({ "username": credentials.get("username") })),
        });
    }

    fn get_record(&self, name: &str) -> RecordCursor {
        self.open_handle(name, json!({}))
    }

    fn get_list(&self, name: &str) -> ListCursor {
        self.open_handle(name, json!([]))
    }

    fn snapshot(&self, name: &str, callback: Callback<Value>) {
        let failure = self.failure(name);
        let shared = Arc::clone(&self.shared);
        let key = name.to_string();
        self.deliver(name, move || {
            let result = match failure {
                Some(message) => Err(message),
                None => shared
                    .records
                    .read()
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| RECORD_NOT_FOUND.to_string()),
            };
            callback(result);
        });
    }

    fn has(&self, name: &str, callback: Callback<bool>) {
        let failure = self.failure(name);
        let shared = Arc::clone(&self.shared);
        let key = name.to_string();
        self.deliver(name, move || {
            let result = match failure {
                Some(message) => Err(message),
                None => Ok(shared.records.read().contains_key(&key)),
            };
            callback(result);
        });
    }

    fn rpc_make(&self, name: &str, args: Value, callback: Callback<Value>) {
        let handler = self.shared.providers.read().get(name).cloned();
        self.deliver(name, move || {
            let result = match handler {
                Some(handler) => handler(args),
                None => Err(NO_RPC_PROVIDER.to_string()),
            };
            callback(result);
        });
    }

    fn rpc_provide(&self, name: &str, handler: RpcHandler) {
        self.shared
            .providers
            .write()
            .insert(name.to_string(), handler);
    }

    fn rpc_unprovide(&self, name: &str) {
        self.shared.providers.write().remove(name);
    }

    fn emit(&self, name: &str, value: Value) {
        self.shared.events.emit(name, value);
    }

    fn get_uid(&self) -> String {
        let count = self.shared.uid_counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", base36(Timestamp::now().0), base36(count))
    }

    fn on_client_error(&self, listener: ClientErrorListener) {
        self.shared.error_listeners.write().push(listener);
    }
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

enum HandleState {
    Pending(Vec<ReadyCallback>),
    Ready,
    Failed(String),
}

/// Record or list handle served by [`MemoryClient`].
pub struct MemoryRecord {
    name: String,
    shared: Arc<Shared>,
    state: Mutex<HandleState>,
    error_listeners: Mutex<Vec<Arc<dyn Fn(&str) + Send + Sync>>>,
    discarded: AtomicBool,
}

impl MemoryRecord {
    fn new(name: &str, shared: Arc<Shared>) -> Self {
        Self {
            name: name.to_string(),
            shared,
            state: Mutex::new(HandleState::Pending(Vec::new())),
            error_listeners: Mutex::new(Vec::new()),
            discarded: AtomicBool::new(false),
        }
    }

    fn mark_ready(&self) {
        let callbacks = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, HandleState::Ready) {
                HandleState::Pending(callbacks) => callbacks,
                previous => {
                    *state = previous;
                    return;
                }
            }
        };
        for callback in callbacks {
            callback();
        }
    }

    fn mark_failed(&self, message: &str) {
        *self.state.lock() = HandleState::Failed(message.to_string());
        let listeners: Vec<_> = self.error_listeners.lock().iter().cloned().collect();
        for listener in listeners {
            listener(message);
        }
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded.load(Ordering::SeqCst)
    }
}

impl RecordHandle for MemoryRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self) -> Value {
        self.shared
            .records
            .read()
            .get(&self.name)
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn set(&self, path: &str, value: Value) -> Result<()> {
        let mut records = self.shared.records.write();
        let data = records.entry(self.name.clone()).or_insert(json!({}));
        PathAccessor::strict().write(data, path, value)
    }

    fn when_ready(&self, callback: ReadyCallback) {
        let ready_now = {
            let mut state = self.state.lock();
            match &mut *state {
                HandleState::Pending(callbacks) => {
                    callbacks.push(callback);
                    return;
                }
                HandleState::Ready => true,
                HandleState::Failed(_) => false,
            }
        };
        if ready_now {
            callback();
        }
    }

    fn on_error(&self, listener: ErrorListener) {
        let listener: Arc<dyn Fn(&str) + Send + Sync> = Arc::from(listener);
        self.error_listeners.lock().push(Arc::clone(&listener));

        let failed = match &*self.state.lock() {
            HandleState::Failed(message) => Some(message.clone()),
            _ => None,
        };
        if let Some(message) = failed {
            listener(&message);
        }
    }

    fn discard(&self) {
        if !self.discarded.swap(true, Ordering::SeqCst) {
            self.shared.open_subscriptions.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl ListHandle for MemoryRecord {
    fn entries(&self) -> Result<Vec<String>> {
        let Value::Array(items) = self.get() else {
            return Ok(Vec::new());
        };
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::String(entry) => Ok(entry),
                _ => Err(Error::ListEntry {
                    list: self.name.clone(),
                    index,
                }),
            })
            .collect()
    }

    fn set_entries(&self, entries: Vec<String>) {
        let entries = entries.into_iter().map(Value::String).collect();
        self.shared
            .records
            .write()
            .insert(self.name.clone(), Value::Array(entries));
    }

    fn add_entry(&self, entry: &str) -> Result<()> {
        let mut entries = self.entries()?;
        entries.push(entry.to_string());
        self.set_entries(entries);
        Ok(())
    }

    fn remove_entry(&self, entry: &str) -> Result<()> {
        let mut entries = self.entries()?;
        entries.retain(|e| e != entry);
        self.set_entries(entries);
        Ok(())
    }
}
