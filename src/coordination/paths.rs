//! Well-known paths in the coordination service.

pub const CLUSTER_STATE: &str = "/clusterstate.json";
pub const LIVE_NODES: &str = "/live_nodes";
pub const ALIASES: &str = "/aliases.json";
pub const CLUSTER_PROPS: &str = "/clusterprops.json";
pub const COLLECTIONS: &str = "/collections";
pub const CONFIGS: &str = "/configs";

pub const CONFIG_NAME_PROP: &str = "configName";

/// Path of the per-collection document holding collection-level pointers
/// such as `configName`.
pub fn collection_path(collection: &str) -> String {
    format!("{COLLECTIONS}/{collection}")
}

/// Path of a named config set.
pub fn config_path(config_name: &str) -> String {
    format!("{CONFIGS}/{config_name}")
}
