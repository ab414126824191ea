//! Capability surface of the remote hierarchical coordination service.
//!
//! The client implementation itself (connect/reconnect, sessions, ephemeral
//! nodes) lives outside this crate; everything here consumes it through the
//! [`CoordinationClient`] trait. Watches are one-shot: a read with
//! `watch = true` arms a watch on that path, and the next change to the path
//! delivers a single [`WatchEvent`] on the channel handed to the consumer.

mod node_name;
mod paths;
pub use node_name::*;
pub use paths::*;


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Document bytes together with the version the coordination service
/// assigned on the last successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedData {
    pub data: Vec<u8>,
    pub version: i32,
}

/// Which aspect of a watched path changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    /// The document content was written
    Data,
    /// The child list changed (node joined or left)
    Children,
}

/// A single firing of a one-shot watch. The watch on `path` is disarmed once
/// this event is delivered and must be re-armed by reading the path again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: String,
    pub kind: WatchKind,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CoordinationClient: Send + Sync + 'static {
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Create a node with the given content. Fails with
    /// [`crate::CoordinationError::NodeExists`] when the path is already
    /// present.
    async fn create(&self, path: &str, data: Vec<u8>, persistent: bool) -> Result<()>;

    /// Read a document; `watch` arms a one-shot data watch on the path.
    /// Fails with [`crate::CoordinationError::NotFound`] when absent.
    async fn get_data(&self, path: &str, watch: bool) -> Result<VersionedData>;

    /// List child names; `watch` arms a one-shot children watch on the path.
    async fn get_children(&self, path: &str, watch: bool) -> Result<Vec<String>>;

    /// Conditional write. `expected_version` of `None` writes
    /// unconditionally; otherwise the write fails with
    /// [`crate::CoordinationError::VersionConflict`] unless the document is
    /// still at that version. Returns the newly assigned version.
    async fn set_data(&self, path: &str, data: Vec<u8>, expected_version: Option<i32>) -> Result<i32>;
}

/// Create `path` with `data` unless it already exists. A concurrent create
/// by another process is treated as success.
pub async fn ensure_exists<C: CoordinationClient + ?Sized>(
    client: &C,
    path: &str,
    data: &[u8],
) -> Result<()> {
    if client.exists(path).await? {
        return Ok(());
    }
    match client.create(path, data.to_vec(), true).await {
        Ok(()) => Ok(()),
        Err(crate::Error::Coordination(crate::CoordinationError::NodeExists(_))) => Ok(()),
        Err(e) => Err(e),
    }
}
