//! Cluster-wide properties: a flat versioned key/value document mutated
//! through the optimistic document protocol, guarded by a fixed
//! known-properties allow-list.

mod cluster_properties;
pub use cluster_properties::*;
