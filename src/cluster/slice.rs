use std::collections::HashMap;

use serde_json::Map;
use serde_json::Value;

use super::Replica;
use super::PARENT_PROP;
use super::RANGE_PROP;
use super::REPLICAS_PROP;
use super::STATE_PROP;
use crate::Result;
use crate::SerializationError;

/// Shard state in which the slice serves its full hash-range.
pub const SLICE_ACTIVE: &str = "active";

/// A named partition of a collection's document space (a shard).
///
/// Holds the replica map keyed by core-node name. At most one replica
/// carries the leader flag at any observed snapshot; transiently zero may
/// hold it while an election is in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    name: String,
    range: Option<String>,
    state: String,
    parent: Option<String>,
    replicas: HashMap<String, Replica>,
    props: Map<String, Value>,
}

impl Slice {
    /// Parse a shard object. `props` is the full shard value including the
    /// `replicas` sub-object; everything but `replicas` is retained as raw
    /// properties. A missing state defaults to `active`.
    pub fn load(name: &str, props: &Map<String, Value>) -> Result<Slice> {
        let mut replicas = HashMap::new();
        if let Some(value) = props.get(REPLICAS_PROP) {
            let map = value.as_object().ok_or_else(|| {
                SerializationError::InvalidDocument(format!(
                    "shard {name}: '{REPLICAS_PROP}' is not an object"
                ))
            })?;
            for (core_node, replica_value) in map {
                let replica_props = replica_value.as_object().ok_or_else(|| {
                    SerializationError::InvalidDocument(format!(
                        "shard {name}: replica {core_node} is not an object"
                    ))
                })?;
                replicas.insert(core_node.clone(), Replica::load(core_node, replica_props)?);
            }
        }

        let mut slice_props = props.clone();
        slice_props.remove(REPLICAS_PROP);

        let state = slice_props
            .get(STATE_PROP)
            .and_then(Value::as_str)
            .unwrap_or(SLICE_ACTIVE)
            .to_string();

        Ok(Slice {
            name: name.to_string(),
            range: slice_props.get(RANGE_PROP).and_then(Value::as_str).map(String::from),
            state,
            parent: slice_props.get(PARENT_PROP).and_then(Value::as_str).map(String::from),
            replicas,
            props: slice_props,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hash-range of this shard, absent for implicitly routed collections.
    pub fn range(&self) -> Option<&str> {
        self.range.as_deref()
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SLICE_ACTIVE
    }

    /// Parent shard this one was split from, if any.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn replicas_map(&self) -> &HashMap<String, Replica> {
        &self.replicas
    }

    pub fn replicas(&self) -> impl Iterator<Item = &Replica> {
        self.replicas.values()
    }

    pub fn replica(&self, core_node_name: &str) -> Option<&Replica> {
        self.replicas.get(core_node_name)
    }

    /// The replica currently designated leader, if an election has settled.
    pub fn leader(&self) -> Option<&Replica> {
        self.replicas.values().find(|r| r.is_leader())
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut all = self.props.clone();
        let replicas: Map<String, Value> = self
            .replicas
            .iter()
            .map(|(name, replica)| (name.clone(), replica.to_json()))
            .collect();
        all.insert(REPLICAS_PROP.to_string(), Value::Object(replicas));
        Value::Object(all)
    }
}
