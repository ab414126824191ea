//! Cluster Coordination Error Hierarchy
//!
//! Defines error types for the topology mirror and the versioned-document
//! protocols, categorized by the failure taxonomy the components rely on:
//! fatal configuration errors, transient coordination errors, caller-facing
//! validation errors, and timeouts.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Coordination-service failures (session, connection, versioned writes)
    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Caller-facing request validation and lookup failures
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Document encoding/decoding failures
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// Unrecoverable failures the process cannot safely continue in
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Errors surfaced by the coordination-service capability.
///
/// `SessionExpired` and `ConnectionLoss` are transient: inside a watch
/// callback they are logged and dropped, relying on the service's
/// reconnect-then-replay semantics. `VersionConflict` and `NodeExists` are
/// the expected optimistic-write races and are retried by the document
/// protocol. Everything else is fatal to the operation that hit it.
#[derive(Debug, thiserror::Error)]
pub enum CoordinationError {
    #[error("Coordination session expired")]
    SessionExpired,

    #[error("Coordination connection lost")]
    ConnectionLoss,

    /// Conditional write lost the race against a concurrent writer
    #[error("Version conflict writing {path} (expected version {expected})")]
    VersionConflict { path: String, expected: i32 },

    /// Concurrent create of the same document
    #[error("Node already exists: {0}")]
    NodeExists(String),

    #[error("No such node: {0}")]
    NotFound(String),

    #[error("Coordination request to {path} timed out after {duration:?}")]
    Timeout { path: String, duration: Duration },

    /// Anything else the client reports; treated as fatal
    #[error("Coordination operation failed at {path}: {message}")]
    Operation { path: String, message: String },
}

impl CoordinationError {
    /// Session and connection loss are expected to heal on their own once
    /// the client reconnects; callers inside watch callbacks drop them.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoordinationError::SessionExpired | CoordinationError::ConnectionLoss
        )
    }

    /// The two races an optimistic writer retries with a fresh read.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CoordinationError::VersionConflict { .. } | CoordinationError::NodeExists(_)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Property name outside the known-cluster-properties allow-list
    #[error("Not a known cluster property: {0}")]
    UnknownProperty(String),

    /// Config-overlay path absent from the editable-property map
    #[error("'{0}' is not an editable property")]
    NotEditable(String),

    #[error("Could not find collection: {0}")]
    CollectionNotFound(String),

    #[error("Could not find shard {shard} in collection {collection}")]
    ShardNotFound { collection: String, shard: String },

    /// Leader discovery timed out (service-unavailable class)
    #[error(
        "No registered leader was found after waiting for {waited:?}, collection: {collection} slice: {shard}"
    )]
    LeaderNotFound {
        collection: String,
        shard: String,
        waited: Duration,
    },

    /// Live-node identifier without the expected `_` separator
    #[error("Node name does not contain expected '_' separator: {0}")]
    InvalidNodeName(String),

    /// Collection points at a config set that does not exist
    #[error("Specified config does not exist: {0}")]
    ConfigNotFound(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Malformed document at {path}: {source}")]
    MalformedDocument {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document is not valid UTF-8 JSON: {0}")]
    InvalidDocument(String),
}

// ============== Conversion Implementations ============== //
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(SerializationError::Json(e))
    }
}
