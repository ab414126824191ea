use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;
use tracing::trace;

use super::DocCollection;
use super::Replica;
use super::Slice;
use crate::Result;
use crate::SerializationError;

/// The whole-cluster snapshot: every collection's shard/replica tree plus
/// the live-node membership, tagged with the topology document's write
/// version.
///
/// Immutable. The synchronizer replaces the published snapshot wholesale;
/// a live-nodes-only refresh constructs a new `ClusterState` that shares
/// the collection map with its predecessor, so node join/leave churn never
/// re-parses the topology document.
#[derive(Debug, Clone)]
pub struct ClusterState {
    version: i32,
    collections: Arc<HashMap<String, DocCollection>>,
    live_nodes: Arc<HashSet<String>>,
}

impl ClusterState {
    /// Parse the topology document. Pure given its inputs: no hidden state,
    /// which keeps snapshot construction independently testable. An empty
    /// document (freshly created root) yields an empty collection map.
    pub fn load(version: i32, data: &[u8], live_nodes: HashSet<String>) -> Result<ClusterState> {
        let collections = if data.is_empty() {
            HashMap::new()
        } else {
            let root: Value =
                serde_json::from_slice(data).map_err(|source| SerializationError::MalformedDocument {
                    path: crate::CLUSTER_STATE.to_string(),
                    source,
                })?;
            let map = root.as_object().ok_or_else(|| {
                SerializationError::InvalidDocument("topology document is not an object".to_string())
            })?;
            let mut collections = HashMap::with_capacity(map.len());
            for (name, value) in map {
                collections.insert(name.clone(), DocCollection::load(name, value)?);
            }
            collections
        };
        trace!(version, collections = collections.len(), "loaded cluster state");
        Ok(ClusterState {
            version,
            collections: Arc::new(collections),
            live_nodes: Arc::new(live_nodes),
        })
    }

    /// Serialize the collection tree back to the document form accepted by
    /// [`ClusterState::load`]. Version and live nodes are external inputs
    /// and are not part of the document.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let map: Map<String, Value> = self
            .collections
            .iter()
            .map(|(name, collection)| (name.clone(), collection.to_json()))
            .collect();
        Ok(serde_json::to_vec(&Value::Object(map))?)
    }

    /// Version of the topology document this snapshot was parsed from.
    /// Monotonically non-decreasing across published snapshots.
    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn collections(&self) -> &HashMap<String, DocCollection> {
        &self.collections
    }

    pub fn collection(&self, name: &str) -> Option<&DocCollection> {
        self.collections.get(name)
    }

    pub fn slices_map(&self, collection: &str) -> Option<&HashMap<String, Slice>> {
        self.collections.get(collection).map(|c| c.slices_map())
    }

    pub fn leader(&self, collection: &str, shard: &str) -> Option<&Replica> {
        self.collections.get(collection)?.leader(shard)
    }

    pub fn live_nodes(&self) -> &HashSet<String> {
        &self.live_nodes
    }

    pub fn live_nodes_contain(&self, node_name: &str) -> bool {
        self.live_nodes.contains(node_name)
    }

    /// New snapshot with a fresh live-node set, sharing the collection map
    /// with `self`. The one cheap refresh path: node join/leave is frequent
    /// relative to topology changes.
    pub fn with_live_nodes(&self, live_nodes: HashSet<String>) -> ClusterState {
        ClusterState {
            version: self.version,
            collections: Arc::clone(&self.collections),
            live_nodes: Arc::new(live_nodes),
        }
    }

    pub(crate) fn collections_handle(&self) -> &Arc<HashMap<String, DocCollection>> {
        &self.collections
    }
}

impl PartialEq for ClusterState {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.collections == other.collections
            && self.live_nodes == other.live_nodes
    }
}
