//! Main AsyncStore struct tying all components together.

use crate::bridge::RecordBridge;
use crate::client::{ClientErrorEvent, ListCursor, RecordCursor, StoreClient};
use crate::error::Result;
use crate::join::JoinEngine;
use crate::path::{PathAccessor, PathMode};
use crate::rpc::RpcBridge;
use crate::types::{
    ExistsOptions, FetchMode, GetOptions, JoinOptions, JoinResult, ProgressEvent, RecordRef,
    Resolved,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// How path reads treat falsy intermediate values.
    pub path_mode: PathMode,

    /// Forward store client errors to the log.
    pub log_client_errors: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path_mode: PathMode::Strict,
            log_client_errors: true,
        }
    }
}

/// Awaitable facade over a callback-based store client.
///
/// Provides a unified interface for:
/// - Login and unique id generation
/// - Record, list, snapshot and existence requests
/// - List and field joins
/// - Path reads and writes on payloads
/// - RPC calls and progress events
#[derive(Clone)]
pub struct AsyncStore {
    config: StoreConfig,
    client: Arc<dyn StoreClient>,
    records: RecordBridge,
    rpc: RpcBridge,
    joins: JoinEngine,
    paths: PathAccessor,
}

impl AsyncStore {
    /// Wrap a client with the default configuration.
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self::with_config(client, StoreConfig::default())
    }

    pub fn with_config(client: Arc<dyn StoreClient>, config: StoreConfig) -> Self {
        if config.log_client_errors {
            client.on_client_error(Box::new(|e: &ClientErrorEvent| {
                warn!(error = %e.error, event = %e.event, topic = %e.topic, "store client error");
            }));
        }

        let paths = PathAccessor::new(config.path_mode);
        let records = RecordBridge::new(Arc::clone(&client));
        let rpc = RpcBridge::new(Arc::clone(&client));
        let joins = JoinEngine::new(records.clone(), paths);

        Self {
            config,
            client,
            records,
            rpc,
            joins,
            paths,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn records(&self) -> &RecordBridge {
        &self.records
    }

    pub fn rpc(&self) -> &RpcBridge {
        &self.rpc
    }

    // --- Session & Ids ---

    pub async fn login(&self, credentials: Value) -> Result<Value> {
        self.records.login(credentials).await
    }

    pub fn generate_uid(&self) -> String {
        self.client.get_uid()
    }

    /// A fresh `"<table>/<uid>"` ref.
    pub fn generate_record_id(&self, table: &str) -> RecordRef {
        RecordRef::new(table, &self.generate_uid())
    }

    // --- Records ---

    pub async fn get_record(&self, name: &str, options: GetOptions) -> Result<RecordCursor> {
        self.records.get_record(name, options).await
    }

    pub async fn get_snapshot(&self, name: &str) -> Result<Value> {
        self.records.get_snapshot(name).await
    }

    pub async fn get_list(&self, name: &str) -> Result<ListCursor> {
        self.records.get_list_cursor(name).await
    }

    pub async fn exists(&self, name: &str, options: ExistsOptions) -> Result<bool> {
        self.records.exists(name, options).await
    }

    // --- Joins ---

    pub async fn join_list(&self, list: &ListCursor, options: &JoinOptions) -> Result<JoinResult> {
        self.joins.join_list(&**list, options).await
    }

    pub async fn join_fields(
        &self,
        payload: &Value,
        target_fields: &[String],
        mode: FetchMode,
    ) -> Result<HashMap<String, Resolved>> {
        self.joins.join_fields(payload, target_fields, mode).await
    }

    // --- Paths ---

    pub fn get_field<'v>(&self, payload: &'v Value, path: &str) -> Option<&'v Value> {
        self.paths.read(payload, path)
    }

    pub fn set_field(&self, payload: &mut Value, path: &str, value: Value) -> Result<()> {
        self.paths.write(payload, path, value)
    }

    // --- RPC ---

    pub async fn rpc_call(&self, name: &str, args: Value) -> Result<Value> {
        self.rpc.call(name, args).await
    }

    pub fn rpc_provide<F>(&self, name: &str, handler: F)
    where
        F: Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.rpc.provide(name, handler)
    }

    pub fn rpc_unprovide(&self, name: &str) {
        self.rpc.unprovide(name)
    }

    pub fn gen_progress_event(&self, starting_value: f64) -> ProgressEvent {
        self.rpc.gen_progress_event(starting_value)
    }

    pub fn update_progress_event(&self, progress: &mut ProgressEvent, value: f64) {
        self.rpc.update_progress_event(progress, value)
    }
}
