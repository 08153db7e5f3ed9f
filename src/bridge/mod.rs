//! Awaitable wrappers over the callback-style store client.
//!
//! Every operation settles exactly once: a handle that reports both
//! readiness and an error resolves with whichever arrived first. Cursor
//! operations open one subscription with the store and hand ownership of the
//! returned cursor to the caller, who must `discard` it.

mod settle;

pub(crate) use settle::{settlement, Settle};

use crate::client::{ListCursor, RecordCursor, RecordHandle, StoreClient};
use crate::error::{Error, Result};
use crate::types::{ExistsOptions, GetOptions};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Async record operations over a shared store client.
#[derive(Clone)]
pub struct RecordBridge {
    client: Arc<dyn StoreClient>,
}

impl RecordBridge {
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<dyn StoreClient> {
        &self.client
    }

    /// Log in. Rejection surfaces as `Error::Auth` with the store's payload.
    pub async fn login(&self, credentials: Value) -> Result<Value> {
        let (settle, rx) = settlement();
        self.client.login(
            credentials,
            Box::new(move |success, data| {
                settle.settle(if success { Ok(data) } else { Err(Error::Auth(data)) });
            }),
        );
        wait("login", rx).await
    }

    /// Open a cursor and wait until it is ready.
    ///
    /// A missing record is created implicitly by the store, so this makes no
    /// existence guarantee. See [`get_record`](Self::get_record).
    pub async fn get_record_cursor(&self, name: &str) -> Result<RecordCursor> {
        debug!(record = name, "opening record cursor");
        ready(name, self.client.get_record(name)).await
    }

    /// Open a cursor, optionally refusing records that do not exist yet.
    pub async fn get_record(&self, name: &str, options: GetOptions) -> Result<RecordCursor> {
        if options.must_exist {
            self.exists(name, ExistsOptions { reject_on_false: true })
                .await?;
        }
        self.get_record_cursor(name).await
    }

    pub async fn get_list_cursor(&self, name: &str) -> Result<ListCursor> {
        debug!(list = name, "opening list cursor");
        ready(name, self.client.get_list(name)).await
    }

    /// Fetch a detached copy of a record. Missing records are an error.
    pub async fn get_snapshot(&self, name: &str) -> Result<Value> {
        debug!(record = name, "requesting snapshot");
        let (settle, rx) = settlement();
        let owned = name.to_string();
        self.client.snapshot(
            name,
            Box::new(move |result| {
                settle.settle(result.map_err(|message| Error::record(&owned, message)));
            }),
        );
        wait(name, rx).await
    }

    /// Check existence. `false` is a normal answer unless `reject_on_false`
    /// is set, in which case it becomes `Error::NotFound`.
    pub async fn exists(&self, name: &str, options: ExistsOptions) -> Result<bool> {
        let (settle, rx) = settlement();
        let owned = name.to_string();
        self.client.has(
            name,
            Box::new(move |result| {
                settle.settle(result.map_err(|message| Error::record(&owned, message)));
            }),
        );

        let exists = wait(name, rx).await?;
        trace!(record = name, exists, "existence checked");
        if options.reject_on_false && !exists {
            return Err(Error::NotFound(name.to_string()));
        }
        Ok(exists)
    }
}

/// Wait for a handle's first `when_ready` or `on_error`, whichever fires first.
async fn ready<H>(name: &str, handle: Arc<H>) -> Result<Arc<H>>
where
    H: RecordHandle + ?Sized + 'static,
{
    let (settle, rx) = settlement();

    let on_ready: Settle<Result<Arc<H>>> = settle.clone();
    let ready_handle = Arc::clone(&handle);
    handle.when_ready(Box::new(move || {
        on_ready.settle(Ok(ready_handle));
    }));

    let owned = name.to_string();
    handle.on_error(Box::new(move |message: &str| {
        if settle.settle(Err(Error::record(&owned, message))) {
            debug!(record = %owned, error = message, "handle failed before ready");
        }
    }));

    wait(name, rx).await
}

pub(crate) async fn wait<T>(name: &str, rx: oneshot::Receiver<Result<T>>) -> Result<T> {
    rx.await.map_err(|_| Error::Unsettled(name.to_string()))?
}
