//! Core types for the async record layer.

use crate::client::RecordCursor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier of a remote record, conventionally `"<table>/<uid>"`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef(pub String);

impl RecordRef {
    /// Build a ref from a table name and a store-issued unique suffix.
    pub fn new(table: &str, uid: &str) -> Self {
        RecordRef(format!("{}/{}", table, uid))
    }

    /// Table part (everything before the first `/`), if any.
    pub fn table(&self) -> Option<&str> {
        self.0.split_once('/').map(|(table, _)| table)
    }

    /// Unique part (everything after the first `/`), if any.
    pub fn uid(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, uid)| uid)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordRef({})", self.0)
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RecordRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordRef {
    fn from(s: &str) -> Self {
        RecordRef(s.to_string())
    }
}

impl From<RecordRef> for String {
    fn from(r: RecordRef) -> Self {
        r.0
    }
}

/// Milliseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Timestamp(millis)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// How a reference is materialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchMode {
    /// Live, subscribed cursor.
    #[default]
    Cursor,
    /// Detached point-in-time copy.
    Snapshot,
}

/// A materialized reference: either a live cursor or an immutable snapshot.
#[derive(Clone)]
pub enum Resolved {
    Cursor(RecordCursor),
    Snapshot(serde_json::Value),
}

impl Resolved {
    /// Current payload. For cursors this reads the live value.
    pub fn data(&self) -> serde_json::Value {
        match self {
            Resolved::Cursor(cursor) => cursor.get(),
            Resolved::Snapshot(value) => value.clone(),
        }
    }

    pub fn as_snapshot(&self) -> Option<&serde_json::Value> {
        match self {
            Resolved::Snapshot(value) => Some(value),
            Resolved::Cursor(_) => None,
        }
    }

    pub fn as_cursor(&self) -> Option<&RecordCursor> {
        match self {
            Resolved::Cursor(cursor) => Some(cursor),
            Resolved::Snapshot(_) => None,
        }
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Cursor(cursor) => write!(f, "Cursor({})", cursor.name()),
            Resolved::Snapshot(value) => write!(f, "Snapshot({})", value),
        }
    }
}

/// One entry of a field-joined list: the entry itself and its joined fields.
#[derive(Clone, Debug)]
pub struct JoinedEntry {
    pub left: Resolved,
    /// Resolved payload per requested path.
    pub right: HashMap<String, Resolved>,
}

/// Result of `join_list`, aligned index-for-index with the list entries.
#[derive(Clone, Debug)]
pub enum JoinResult {
    Plain(Vec<Resolved>),
    Joined(Vec<JoinedEntry>),
}

impl JoinResult {
    pub fn len(&self) -> usize {
        match self {
            JoinResult::Plain(items) => items.len(),
            JoinResult::Joined(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_plain(self) -> Option<Vec<Resolved>> {
        match self {
            JoinResult::Plain(items) => Some(items),
            JoinResult::Joined(_) => None,
        }
    }

    pub fn into_joined(self) -> Option<Vec<JoinedEntry>> {
        match self {
            JoinResult::Joined(items) => Some(items),
            JoinResult::Plain(_) => None,
        }
    }
}

/// Progress observer, invoked with `(index, total)` per completed fetch.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Options for `get_record`.
#[derive(Clone, Copy, Debug, Default)]
pub struct GetOptions {
    /// Reject with `NotFound` instead of implicitly creating the record.
    pub must_exist: bool,
}

/// Options for `exists`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExistsOptions {
    /// Turn a `false` answer into a `NotFound` error.
    pub reject_on_false: bool,
}

/// Options for `join_list`.
#[derive(Clone, Default)]
pub struct JoinOptions {
    /// Resolve snapshots instead of cursors.
    pub snapshot: bool,
    /// Paths to join on every resolved entry.
    pub join_fields: Option<Vec<String>>,
    pub progress: Option<ProgressFn>,
}

impl JoinOptions {
    /// Snapshot mode, no field joins.
    pub fn snapshots() -> Self {
        Self {
            snapshot: true,
            ..Default::default()
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.join_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_progress(
        mut self,
        progress: impl Fn(usize, usize) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn fetch_mode(&self) -> FetchMode {
        if self.snapshot {
            FetchMode::Snapshot
        } else {
            FetchMode::Cursor
        }
    }
}

impl fmt::Debug for JoinOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinOptions")
            .field("snapshot", &self.snapshot)
            .field("join_fields", &self.join_fields)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// A named progress value published on the store's event channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Event name, `"progress_event/<uid>"`.
    pub id: String,
    pub value: f64,
}
