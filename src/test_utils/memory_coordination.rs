//! In-memory coordination service with one-shot watches, mirroring the
//! semantics the synchronizer and the optimistic protocol rely on:
//! versioned conditional writes, child listings, and watches that fire once
//! and stay disarmed until re-armed by a read.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::CoordinationClient;
use crate::CoordinationError;
use crate::Result;
use crate::VersionedData;
use crate::WatchEvent;
use crate::WatchKind;

#[derive(Debug, Clone)]
struct NodeEntry {
    data: Vec<u8>,
    version: i32,
}

#[derive(Default)]
struct Inner {
    nodes: HashMap<String, NodeEntry>,
    data_watches: HashSet<String>,
    child_watches: HashSet<String>,
}

pub struct MemoryCoordination {
    inner: Mutex<Inner>,
    events_tx: mpsc::UnboundedSender<WatchEvent>,
}

impl MemoryCoordination {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<WatchEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                inner: Mutex::new(Inner::default()),
                events_tx,
            }),
            events_rx,
        )
    }

    /// Unconditional create-or-overwrite, as an external writer (overseer,
    /// admin tool) would perform it. Fires watches like any other write.
    pub fn put(&self, path: &str, data: &[u8]) {
        let mut inner = self.inner.lock();
        let created = !inner.nodes.contains_key(path);
        let entry = inner.nodes.entry(path.to_string()).or_insert(NodeEntry {
            data: Vec::new(),
            version: -1,
        });
        entry.data = data.to_vec();
        entry.version += 1;
        drop(inner);
        self.fire_data(path);
        if created {
            self.fire_children_of_parent(path);
        }
    }

    /// Remove a node, firing the parent's children watch. Used to simulate
    /// a live node dropping off the registry.
    pub fn remove(&self, path: &str) {
        let existed = self.inner.lock().nodes.remove(path).is_some();
        if existed {
            self.fire_children_of_parent(path);
        }
    }

    /// Current version of a node, for assertions on version churn.
    pub fn version_of(&self, path: &str) -> Option<i32> {
        self.inner.lock().nodes.get(path).map(|e| e.version)
    }

    fn fire_data(&self, path: &str) {
        let armed = self.inner.lock().data_watches.remove(path);
        if armed {
            let _ = self.events_tx.send(WatchEvent {
                path: path.to_string(),
                kind: WatchKind::Data,
            });
        }
    }

    fn fire_children_of_parent(&self, path: &str) {
        let parent = match path.rfind('/') {
            Some(0) => "/".to_string(),
            Some(idx) => path[..idx].to_string(),
            None => return,
        };
        let armed = self.inner.lock().child_watches.remove(&parent);
        if armed {
            let _ = self.events_tx.send(WatchEvent {
                path: parent,
                kind: WatchKind::Children,
            });
        }
    }
}

#[async_trait]
impl CoordinationClient for MemoryCoordination {
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.inner.lock().nodes.contains_key(path))
    }

    async fn create(&self, path: &str, data: Vec<u8>, _persistent: bool) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            if inner.nodes.contains_key(path) {
                return Err(CoordinationError::NodeExists(path.to_string()).into());
            }
            inner.nodes.insert(path.to_string(), NodeEntry { data, version: 0 });
        }
        self.fire_children_of_parent(path);
        Ok(())
    }

    async fn get_data(&self, path: &str, watch: bool) -> Result<VersionedData> {
        let mut inner = self.inner.lock();
        let entry = inner
            .nodes
            .get(path)
            .cloned()
            .ok_or_else(|| CoordinationError::NotFound(path.to_string()))?;
        if watch {
            inner.data_watches.insert(path.to_string());
        }
        Ok(VersionedData {
            data: entry.data,
            version: entry.version,
        })
    }

    async fn get_children(&self, path: &str, watch: bool) -> Result<Vec<String>> {
        let mut inner = self.inner.lock();
        let prefix = if path == "/" { "/".to_string() } else { format!("{path}/") };
        let children = inner
            .nodes
            .keys()
            .filter_map(|p| {
                let rest = p.strip_prefix(&prefix)?;
                if rest.is_empty() || rest.contains('/') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect();
        if watch {
            inner.child_watches.insert(path.to_string());
        }
        Ok(children)
    }

    async fn set_data(&self, path: &str, data: Vec<u8>, expected_version: Option<i32>) -> Result<i32> {
        let new_version = {
            let mut inner = self.inner.lock();
            let entry = inner
                .nodes
                .get_mut(path)
                .ok_or_else(|| CoordinationError::NotFound(path.to_string()))?;
            if let Some(expected) = expected_version {
                if entry.version != expected {
                    return Err(CoordinationError::VersionConflict {
                        path: path.to_string(),
                        expected,
                    }
                    .into());
                }
            }
            entry.data = data;
            entry.version += 1;
            entry.version
        };
        self.fire_data(path);
        Ok(new_version)
    }
}
