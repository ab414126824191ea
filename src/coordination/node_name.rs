//! Live-node identifier codec.
//!
//! A live node registers itself under [`super::LIVE_NODES`] with a child
//! name of the form `host:port_urlencoded-context-path`. The base URL a
//! client uses to reach the node is reconstructed from that name.

use crate::ApiError;
use crate::Result;

pub const DEFAULT_URL_SCHEME: &str = "http";

/// Rebuild `{scheme}://{host:port}/{decoded-context}` from a live-node name.
///
/// Existence of the node in the cluster is not implied; this is a pure
/// string transformation.
pub fn base_url_for_node_name(node_name: &str, scheme: &str) -> Result<String> {
    let offset = node_name
        .find('_')
        .ok_or_else(|| ApiError::InvalidNodeName(node_name.to_string()))?;
    let host_and_port = &node_name[..offset];
    let context = urlencoding::decode(&node_name[offset + 1..])
        .map_err(|_| ApiError::InvalidNodeName(node_name.to_string()))?;
    if context.is_empty() {
        Ok(format!("{scheme}://{host_and_port}"))
    } else {
        Ok(format!("{scheme}://{host_and_port}/{context}"))
    }
}

/// Build the registry child name for a node serving `context` at
/// `host_and_port`.
pub fn node_name_for(host_and_port: &str, context: &str) -> String {
    format!("{}_{}", host_and_port, urlencoding::encode(context))
}
