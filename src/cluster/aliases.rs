use std::collections::HashMap;

use serde_json::Value;

use crate::Result;
use crate::SerializationError;

/// Collection alias table, replaced wholesale whenever the alias document
/// changes.
///
/// The document is an object of alias categories; the `collection`
/// category maps an alias to one or more comma-separated collection names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aliases {
    collection_aliases: HashMap<String, String>,
}

impl Aliases {
    /// Parse the alias document. An empty document (freshly created node)
    /// yields an empty table.
    pub fn load(data: &[u8]) -> Result<Aliases> {
        if data.is_empty() {
            return Ok(Aliases::default());
        }
        let root: Value =
            serde_json::from_slice(data).map_err(|source| SerializationError::MalformedDocument {
                path: crate::ALIASES.to_string(),
                source,
            })?;
        let mut collection_aliases = HashMap::new();
        if let Some(map) = root.get("collection").and_then(Value::as_object) {
            for (alias, target) in map {
                if let Some(target) = target.as_str() {
                    collection_aliases.insert(alias.clone(), target.to_string());
                }
            }
        }
        Ok(Aliases { collection_aliases })
    }

    pub fn collection_alias_map(&self) -> &HashMap<String, String> {
        &self.collection_aliases
    }

    /// The comma-separated collection list an alias points at.
    pub fn collection_alias(&self, alias: &str) -> Option<&str> {
        self.collection_aliases.get(alias).map(String::as_str)
    }

    /// Collections behind `name`: the alias targets when `name` is an
    /// alias, otherwise `name` itself.
    pub fn resolve<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        match self.collection_alias(name) {
            Some(targets) => targets.split(',').map(str::trim).collect(),
            None => vec![name],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.collection_aliases.is_empty()
    }
}
