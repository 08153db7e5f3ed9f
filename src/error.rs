//! Error types for the async record layer.

use thiserror::Error;

/// Main error type for bridge, path and join operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The store rejected a login attempt. Carries the rejection payload.
    #[error("Login rejected: {0}")]
    Auth(serde_json::Value),

    /// The store signalled an error for a record, list or snapshot fetch.
    #[error("Record error for {name}: {message}")]
    Record { name: String, message: String },

    /// A strict existence check found the record absent.
    #[error("exists(): Record {0} does not exist.")]
    NotFound(String),

    #[error("RPC {name} failed: {message}")]
    Rpc { name: String, message: String },

    /// A path write targeted a container that does not exist.
    #[error("Path error at '{path}': {message}")]
    Path { path: String, message: String },

    /// A joined field does not hold a record reference.
    #[error("Field '{path}' does not hold a record reference")]
    Reference { path: String },

    /// A list holds something other than a record reference.
    #[error("List {list} entry {index} is not a record reference")]
    ListEntry { list: String, index: usize },

    /// The store client dropped a callback without ever invoking it.
    #[error("Store client dropped the request for {0} without settling it")]
    Unsettled(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub(crate) fn record(name: &str, message: impl Into<String>) -> Self {
        Error::Record {
            name: name.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn path(path: &str, message: impl Into<String>) -> Self {
        Error::Path {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type for async record operations.
pub type Result<T> = std::result::Result<T, Error>;
