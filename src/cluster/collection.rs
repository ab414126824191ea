use std::collections::HashMap;
use std::collections::HashSet;

use serde_json::Map;
use serde_json::Value;

use super::Replica;
use super::Slice;
use super::AUTO_ADD_REPLICAS_PROP;
use super::MAX_SHARDS_PER_NODE_PROP;
use super::REPLICATION_FACTOR_PROP;
use super::ROUTER_PROP;
use super::SHARDS_PROP;
use crate::Result;
use crate::SerializationError;

/// Shard-assignment algorithm of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Router {
    /// Consistent hashing over the document id
    #[default]
    CompositeId,
    /// Shard chosen explicitly by the sender
    Implicit,
}

impl Router {
    pub fn as_str(&self) -> &'static str {
        match self {
            Router::CompositeId => "compositeId",
            Router::Implicit => "implicit",
        }
    }

    fn from_props(props: &Map<String, Value>) -> Router {
        let name = match props.get(ROUTER_PROP) {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Object(o)) => o.get("name").and_then(Value::as_str),
            _ => None,
        };
        match name {
            Some("implicit") => Router::Implicit,
            _ => Router::CompositeId,
        }
    }
}

/// A named collection and its shards.
///
/// The active-slice view is computed once at construction and never mutated
/// independently of the slice map.
#[derive(Debug, Clone, PartialEq)]
pub struct DocCollection {
    name: String,
    slices: HashMap<String, Slice>,
    active_slice_names: HashSet<String>,
    router: Router,
    replication_factor: Option<u32>,
    max_shards_per_node: Option<u32>,
    auto_add_replicas: bool,
    props: Map<String, Value>,
}

impl DocCollection {
    /// Parse a collection object: collection properties plus a nested
    /// `shards` object keyed by shard name.
    pub fn load(name: &str, value: &Value) -> Result<DocCollection> {
        let props = value.as_object().ok_or_else(|| {
            SerializationError::InvalidDocument(format!("collection {name} is not an object"))
        })?;
        let shards = props
            .get(SHARDS_PROP)
            .and_then(Value::as_object)
            .ok_or_else(|| {
                SerializationError::InvalidDocument(format!(
                    "collection {name}: missing '{SHARDS_PROP}' object"
                ))
            })?;

        let mut slices = HashMap::new();
        for (shard_name, shard_value) in shards {
            let shard_props = shard_value.as_object().ok_or_else(|| {
                SerializationError::InvalidDocument(format!(
                    "collection {name}: shard {shard_name} is not an object"
                ))
            })?;
            slices.insert(shard_name.clone(), Slice::load(shard_name, shard_props)?);
        }

        let mut collection_props = props.clone();
        collection_props.remove(SHARDS_PROP);

        let active_slice_names = slices
            .iter()
            .filter(|(_, slice)| slice.is_active())
            .map(|(name, _)| name.clone())
            .collect();

        Ok(DocCollection {
            name: name.to_string(),
            router: Router::from_props(&collection_props),
            replication_factor: int_prop(&collection_props, REPLICATION_FACTOR_PROP),
            max_shards_per_node: int_prop(&collection_props, MAX_SHARDS_PER_NODE_PROP),
            auto_add_replicas: bool_prop(&collection_props, AUTO_ADD_REPLICAS_PROP),
            slices,
            active_slice_names,
            props: collection_props,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slices_map(&self) -> &HashMap<String, Slice> {
        &self.slices
    }

    pub fn slices(&self) -> impl Iterator<Item = &Slice> {
        self.slices.values()
    }

    pub fn slice(&self, name: &str) -> Option<&Slice> {
        self.slices.get(name)
    }

    /// Slices whose state was `active` when this snapshot was constructed.
    pub fn active_slices(&self) -> impl Iterator<Item = &Slice> {
        self.active_slice_names.iter().filter_map(|name| self.slices.get(name))
    }

    pub fn router(&self) -> Router {
        self.router
    }

    pub fn replication_factor(&self) -> Option<u32> {
        self.replication_factor
    }

    pub fn max_shards_per_node(&self) -> Option<u32> {
        self.max_shards_per_node
    }

    pub fn auto_add_replicas(&self) -> bool {
        self.auto_add_replicas
    }

    pub fn leader(&self, shard: &str) -> Option<&Replica> {
        self.slices.get(shard)?.leader()
    }

    pub fn props(&self) -> &Map<String, Value> {
        &self.props
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut all = self.props.clone();
        let shards: Map<String, Value> = self
            .slices
            .iter()
            .map(|(name, slice)| (name.clone(), slice.to_json()))
            .collect();
        all.insert(SHARDS_PROP.to_string(), Value::Object(shards));
        Value::Object(all)
    }
}

// Numeric collection properties are written as JSON strings by some
// producers; accept both encodings.
fn int_prop(props: &Map<String, Value>, key: &str) -> Option<u32> {
    match props.get(key) {
        Some(Value::Number(n)) => n.as_u64().map(|v| v as u32),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

fn bool_prop(props: &Map<String, Value>, key: &str) -> bool {
    match props.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}
