//! Immutable topology model: collections, shards (slices), replicas, live
//! nodes and aliases, as mirrored from the coordination service.
//!
//! Every type here is a value: a topology change constructs brand-new
//! instances, never an in-place mutation. Readers holding a snapshot always
//! see a self-consistent view.

mod aliases;
mod collection;
mod replica;
mod slice;
mod state;

pub use aliases::*;
pub use collection::*;
pub use replica::*;
pub use slice::*;
pub use state::*;


// Property names shared across the topology documents.
pub const BASE_URL_PROP: &str = "base_url";
pub const NODE_NAME_PROP: &str = "node_name";
pub const CORE_NAME_PROP: &str = "core";
pub const STATE_PROP: &str = "state";
pub const LEADER_PROP: &str = "leader";
pub const SHARDS_PROP: &str = "shards";
pub const REPLICAS_PROP: &str = "replicas";
pub const RANGE_PROP: &str = "range";
pub const PARENT_PROP: &str = "parent";
pub const ROUTER_PROP: &str = "router";
pub const REPLICATION_FACTOR_PROP: &str = "replicationFactor";
pub const MAX_SHARDS_PER_NODE_PROP: &str = "maxShardsPerNode";
pub const AUTO_ADD_REPLICAS_PROP: &str = "autoAddReplicas";
