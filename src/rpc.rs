//! Remote procedure calls and progress events.

use crate::bridge::{settlement, wait};
use crate::client::StoreClient;
use crate::error::{Error, Result};
use crate::types::ProgressEvent;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Prefix for progress event names.
const PROGRESS_EVENT_PREFIX: &str = "progress_event";

/// Async RPC operations over a shared store client.
#[derive(Clone)]
pub struct RpcBridge {
    client: Arc<dyn StoreClient>,
}

impl RpcBridge {
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self { client }
    }

    /// Call a remote procedure. Failure surfaces as `Error::Rpc`.
    pub async fn call(&self, name: &str, args: Value) -> Result<Value> {
        debug!(rpc = name, "calling");
        let (settle, rx) = settlement();
        let owned = name.to_string();
        self.client.rpc_make(
            name,
            args,
            Box::new(move |result| {
                settle.settle(result.map_err(|message| Error::Rpc {
                    name: owned,
                    message,
                }));
            }),
        );
        wait(name, rx).await
    }

    /// Serve `name` with a synchronous handler.
    pub fn provide<F>(&self, name: &str, handler: F)
    where
        F: Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        debug!(rpc = name, "providing");
        self.client.rpc_provide(name, Arc::new(handler));
    }

    pub fn unprovide(&self, name: &str) {
        debug!(rpc = name, "unproviding");
        self.client.rpc_unprovide(name);
    }

    /// Create a progress event with a fresh name and publish its starting value.
    pub fn gen_progress_event(&self, starting_value: f64) -> ProgressEvent {
        let mut progress = ProgressEvent {
            id: format!("{}/{}", PROGRESS_EVENT_PREFIX, self.client.get_uid()),
            value: starting_value,
        };
        self.update_progress_event(&mut progress, starting_value);
        progress
    }

    /// Set and publish a new progress value.
    pub fn update_progress_event(&self, progress: &mut ProgressEvent, value: f64) {
        progress.value = value;
        self.client.emit(&progress.id, json!(value));
    }
}
