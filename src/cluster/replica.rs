use std::fmt;

use serde_json::Map;
use serde_json::Value;

use super::BASE_URL_PROP;
use super::CORE_NAME_PROP;
use super::LEADER_PROP;
use super::NODE_NAME_PROP;
use super::STATE_PROP;
use crate::base_url_for_node_name;
use crate::Result;
use crate::SerializationError;
use crate::DEFAULT_URL_SCHEME;

/// Recovery state of one physical copy of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicaState {
    Active,
    Down,
    Recovering,
    RecoveryFailed,
    Sync,
}

impl ReplicaState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicaState::Active => "active",
            ReplicaState::Down => "down",
            ReplicaState::Recovering => "recovering",
            ReplicaState::RecoveryFailed => "recovery_failed",
            ReplicaState::Sync => "sync",
        }
    }

    pub fn parse(s: &str) -> Option<ReplicaState> {
        match s {
            "active" => Some(ReplicaState::Active),
            "down" => Some(ReplicaState::Down),
            "recovering" => Some(ReplicaState::Recovering),
            "recovery_failed" => Some(ReplicaState::RecoveryFailed),
            "sync" => Some(ReplicaState::Sync),
            _ => None,
        }
    }
}

impl fmt::Display for ReplicaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical copy of a shard, keyed in its [`super::Slice`] by the
/// stable core-node name. Immutable; topology changes produce new values.
#[derive(Debug, Clone, PartialEq)]
pub struct Replica {
    name: String,
    core: String,
    node_name: String,
    state: ReplicaState,
    leader: bool,
    base_url: String,
    props: Map<String, Value>,
}

impl Replica {
    /// Build a replica from its document properties. `name` is the
    /// core-node name (the key in the shard's `replicas` object).
    ///
    /// The base URL is taken from the document when present, otherwise
    /// derived from the node name with the default scheme.
    pub fn load(name: &str, props: &Map<String, Value>) -> Result<Replica> {
        let core = str_prop(props, CORE_NAME_PROP)
            .ok_or_else(|| missing(name, CORE_NAME_PROP))?
            .to_string();
        let node_name = str_prop(props, NODE_NAME_PROP)
            .ok_or_else(|| missing(name, NODE_NAME_PROP))?
            .to_string();
        let state_str = str_prop(props, STATE_PROP).ok_or_else(|| missing(name, STATE_PROP))?;
        let state = ReplicaState::parse(state_str).ok_or_else(|| {
            SerializationError::InvalidDocument(format!(
                "replica {name}: unknown state '{state_str}'"
            ))
        })?;
        let leader = match props.get(LEADER_PROP) {
            Some(Value::String(s)) => s == "true",
            Some(Value::Bool(b)) => *b,
            _ => false,
        };
        let base_url = match str_prop(props, BASE_URL_PROP) {
            Some(url) => url.to_string(),
            None => base_url_for_node_name(&node_name, DEFAULT_URL_SCHEME)?,
        };
        Ok(Replica {
            name: name.to_string(),
            core,
            node_name,
            state,
            leader,
            base_url,
            props: props.clone(),
        })
    }

    /// Stable logical id (core-node name).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn core(&self) -> &str {
        &self.core
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn state(&self) -> ReplicaState {
        self.state
    }

    pub fn is_leader(&self) -> bool {
        self.leader
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the core hosted by this replica.
    pub fn core_url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.core)
    }

    /// The raw property map, including properties this crate does not
    /// interpret.
    pub fn props(&self) -> &Map<String, Value> {
        &self.props
    }

    pub(crate) fn to_json(&self) -> Value {
        Value::Object(self.props.clone())
    }
}

fn str_prop<'a>(props: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    props.get(key).and_then(Value::as_str)
}

fn missing(replica: &str, prop: &str) -> SerializationError {
    SerializationError::InvalidDocument(format!("replica {replica}: missing '{prop}' property"))
}
