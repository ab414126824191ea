use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::instrument;

use crate::update_document;
use crate::ApiError;
use crate::CoordinationClient;
use crate::CoordinationError;
use crate::Error;
use crate::Result;
use crate::CLUSTER_PROPS;

pub const LEGACY_CLOUD: &str = "legacyCloud";
pub const URL_SCHEME: &str = "urlScheme";
pub const AUTO_ADD_REPLICAS: &str = "autoAddReplicas";

lazy_static::lazy_static! {
    /// The only property names a caller may set or unset. Initialized once,
    /// read-only for the process lifetime.
    pub static ref KNOWN_CLUSTER_PROPS: HashSet<&'static str> =
        [LEGACY_CLOUD, URL_SCHEME, AUTO_ADD_REPLICAS].into_iter().collect();
}

/// Store for the flat cluster-properties document.
pub struct ClusterProperties<C: CoordinationClient> {
    client: Arc<C>,
}

impl<C: CoordinationClient> ClusterProperties<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Read the current property map; an absent document is an empty map.
    pub async fn properties(&self) -> Result<Map<String, Value>> {
        match self.client.get_data(CLUSTER_PROPS, false).await {
            Ok(versioned) => {
                if versioned.data.is_empty() {
                    return Ok(Map::new());
                }
                let doc: Value = serde_json::from_slice(&versioned.data)?;
                doc.as_object().cloned().ok_or_else(|| {
                    Error::Fatal("cluster properties document is not an object".to_string())
                })
            }
            Err(Error::Coordination(CoordinationError::NotFound(_))) => Ok(Map::new()),
            Err(e) => Err(e),
        }
    }

    /// The URL scheme nodes advertise, defaulting to `http`.
    pub async fn url_scheme(&self) -> Result<String> {
        Ok(self
            .properties()
            .await?
            .get(URL_SCHEME)
            .and_then(Value::as_str)
            .unwrap_or(crate::DEFAULT_URL_SCHEME)
            .to_string())
    }

    /// Set a cluster property, or remove it with `value = None`. Setting a
    /// key to the value it already holds, or removing an absent key, is an
    /// idempotent no-op that does not touch the remote document — the
    /// comparison is over the parsed map, so a document formatted
    /// differently by another writer is not rewritten.
    #[instrument(skip(self))]
    pub async fn set_property(&self, name: &str, value: Option<&str>) -> Result<()> {
        if !KNOWN_CLUSTER_PROPS.contains(name) {
            return Err(ApiError::UnknownProperty(name.to_string()).into());
        }
        debug!(name, ?value, "updating cluster property");

        let name = name.to_string();
        let value = value.map(String::from);
        update_document(self.client.as_ref(), CLUSTER_PROPS, move |current| {
            let mut props: Map<String, Value> = match current {
                Some(bytes) if !bytes.is_empty() => serde_json::from_slice(bytes)?,
                _ => Map::new(),
            };
            match &value {
                Some(v) => {
                    if props.get(&name).and_then(Value::as_str) == Some(v.as_str()) {
                        return Ok(None);
                    }
                    props.insert(name.clone(), Value::String(v.clone()));
                }
                None => {
                    if props.remove(&name).is_none() {
                        return Ok(None);
                    }
                }
            }
            Ok(Some(serde_json::to_vec(&Value::Object(props))?))
        })
        .await
    }
}
