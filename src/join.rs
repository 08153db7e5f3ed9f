//! Concurrent resolution of record references.
//!
//! `join_list` fans out one fetch per list entry and collects the results by
//! entry index, so output order always matches input order no matter which
//! fetch completes first. The first failure observed fails the whole join.
//! Sibling fetches still in flight are dropped, not cancelled at the store:
//! any cursor subscription the store already opened for them stays open.

use crate::bridge::RecordBridge;
use crate::client::ListHandle;
use crate::error::{Error, Result};
use crate::path::PathAccessor;
use crate::types::{FetchMode, JoinOptions, JoinResult, JoinedEntry, ProgressFn, Resolved};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Resolves lists of references, and references held in record fields.
#[derive(Clone)]
pub struct JoinEngine {
    bridge: RecordBridge,
    paths: PathAccessor,
}

impl JoinEngine {
    pub fn new(bridge: RecordBridge, paths: PathAccessor) -> Self {
        Self { bridge, paths }
    }

    /// Resolve every entry of `list`.
    ///
    /// With `join_fields`, each resolved entry is additionally joined on
    /// those paths and paired with the result as a [`JoinedEntry`].
    pub async fn join_list(
        &self,
        list: &dyn ListHandle,
        options: &JoinOptions,
    ) -> Result<JoinResult> {
        let entries = list.entries()?;
        let mode = options.fetch_mode();
        debug!(
            list = list.name(),
            entries = entries.len(),
            ?mode,
            "joining list"
        );

        let resolved = self
            .fetch_all(&entries, mode, options.progress.as_ref())
            .await
            .inspect_err(|e| warn!(list = list.name(), error = %e, "list join failed"))?;

        let Some(fields) = &options.join_fields else {
            return Ok(JoinResult::Plain(resolved));
        };

        let payloads: Vec<Value> = resolved.iter().map(Resolved::data).collect();
        let mut rights: Vec<Option<HashMap<String, Resolved>>> = vec![None; payloads.len()];

        let mut pending: FuturesUnordered<_> = payloads
            .iter()
            .enumerate()
            .map(|(index, payload)| async move {
                (index, self.join_fields(payload, fields, mode).await)
            })
            .collect();

        while let Some((index, result)) = pending.next().await {
            rights[index] = Some(result.inspect_err(|e| {
                warn!(list = list.name(), error = %e, "field join failed")
            })?);
        }

        let joined = resolved
            .into_iter()
            .zip(rights.into_iter().flatten())
            .map(|(left, right)| JoinedEntry { left, right })
            .collect();
        Ok(JoinResult::Joined(joined))
    }

    /// Resolve the reference held at each path of `payload`.
    ///
    /// Returns one entry per distinct path; a repeated path is fetched once.
    /// Every path must hold a string reference, otherwise the join fails
    /// before any fetch starts. The first fetch failure to arrive fails the
    /// whole join.
    pub async fn join_fields(
        &self,
        payload: &Value,
        target_fields: &[String],
        mode: FetchMode,
    ) -> Result<HashMap<String, Resolved>> {
        let mut seen = HashSet::new();
        let refs = target_fields
            .iter()
            .filter(|path| seen.insert(path.as_str()))
            .map(|path| {
                self.paths
                    .read(payload, path)
                    .and_then(Value::as_str)
                    .map(|name| (path.as_str(), name))
                    .ok_or_else(|| Error::Reference { path: path.clone() })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut pending: FuturesUnordered<_> = refs
            .into_iter()
            .map(|(path, name)| async move { (path, self.fetch(name, mode).await) })
            .collect();

        let mut joined = HashMap::with_capacity(pending.len());
        while let Some((path, result)) = pending.next().await {
            joined.insert(path.to_string(), result?);
        }
        Ok(joined)
    }

    async fn fetch(&self, name: &str, mode: FetchMode) -> Result<Resolved> {
        match mode {
            FetchMode::Cursor => self
                .bridge
                .get_record_cursor(name)
                .await
                .map(Resolved::Cursor),
            FetchMode::Snapshot => self.bridge.get_snapshot(name).await.map(Resolved::Snapshot),
        }
    }

    /// Start every fetch at once and slot each result by its index.
    async fn fetch_all(
        &self,
        names: &[String],
        mode: FetchMode,
        progress: Option<&ProgressFn>,
    ) -> Result<Vec<Resolved>> {
        let total = names.len();
        let mut slots: Vec<Option<Resolved>> = vec![None; total];

        let mut pending: FuturesUnordered<_> = names
            .iter()
            .enumerate()
            .map(|(index, name)| async move { (index, self.fetch(name, mode).await) })
            .collect();

        while let Some((index, result)) = pending.next().await {
            slots[index] = Some(result?);
            if let Some(progress) = progress {
                progress(index, total);
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}
