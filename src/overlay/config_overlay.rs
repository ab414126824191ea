use serde_json::Map;
use serde_json::Value;

use super::check_editable;
use crate::ApiError;
use crate::Result;

const PROPS: &str = "props";
const USER_PROPS: &str = "userProps";
const NAME_KEY: &str = "name";

/// The config overlay document. Immutable: every edit operation returns a
/// new copy carrying the changed value and the same znode version. The
/// version is reconciled by the caller through the optimistic document
/// protocol; the overlay itself is a pure value transformer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOverlay {
    znode_version: i32,
    data: Map<String, Value>,
}

impl ConfigOverlay {
    pub fn new(data: Map<String, Value>, znode_version: i32) -> Self {
        Self { znode_version, data }
    }

    /// Parse the overlay document; empty bytes yield an empty overlay.
    pub fn load(data: &[u8], znode_version: i32) -> Result<ConfigOverlay> {
        if data.is_empty() {
            return Ok(ConfigOverlay::new(Map::new(), znode_version));
        }
        let doc: Value = serde_json::from_slice(data)?;
        let map = doc.as_object().cloned().unwrap_or_default();
        Ok(ConfigOverlay::new(map, znode_version))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&Value::Object(self.data.clone()))?)
    }

    pub fn znode_version(&self) -> i32 {
        self.znode_version
    }

    fn props(&self) -> Map<String, Value> {
        self.data
            .get(PROPS)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Set an editable property by dotted path, creating intermediate nodes
    /// as needed. Fails with `NotEditable` for paths outside the
    /// editable-property map.
    pub fn set_property(&self, path: &str, value: Value) -> Result<ConfigOverlay> {
        let (hierarchy, _) = check_editable(path, false)
            .ok_or_else(|| ApiError::NotEditable(path.to_string()))?;

        // copy-on-write of the props subtree only; untouched top-level
        // sections are shared at the entry level
        let mut props = self.props();
        let mut node = &mut props;
        for (i, part) in hierarchy.iter().enumerate() {
            if i == hierarchy.len() - 1 {
                node.insert(part.clone(), value);
                break;
            }
            let entry = node.entry(part.clone()).or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            node = entry.as_object_mut().expect("just ensured object");
        }

        let mut data = self.data.clone();
        data.insert(PROPS.to_string(), Value::Object(props));
        Ok(ConfigOverlay::new(data, self.znode_version))
    }

    /// Remove an editable property. Returns `self` unchanged when an
    /// intermediate node is missing.
    pub fn unset_property(&self, path: &str) -> Result<ConfigOverlay> {
        let (hierarchy, _) = check_editable(path, false)
            .ok_or_else(|| ApiError::NotEditable(path.to_string()))?;

        let mut props = self.props();
        let mut node = &mut props;
        for (i, part) in hierarchy.iter().enumerate() {
            if i == hierarchy.len() - 1 {
                node.remove(part);
                break;
            }
            match node.get_mut(part).and_then(Value::as_object_mut) {
                Some(next) => node = next,
                None => return Ok(self.clone()),
            }
        }

        let mut data = self.data.clone();
        data.insert(PROPS.to_string(), Value::Object(props));
        Ok(ConfigOverlay::new(data, self.znode_version))
    }

    /// Editability-checked read by XPath-style path (`a/b/@attr`). `None`
    /// for paths outside the editable map, missing values, and structured
    /// (non-scalar) values.
    pub fn get_xpath_property(&self, xpath: &str) -> Option<Value> {
        let (hierarchy, _) = check_editable(xpath, true)?;
        let props = self.data.get(PROPS)?.as_object()?;
        let mut node = props;
        for (i, part) in hierarchy.iter().enumerate() {
            if i == hierarchy.len() - 1 {
                let value = node.get(part)?;
                if value.is_object() || value.is_array() {
                    return None;
                }
                return Some(value.clone());
            }
            node = node.get(part)?.as_object()?;
        }
        None
    }

    pub fn user_props(&self) -> Map<String, Value> {
        self.data
            .get(USER_PROPS)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// User properties are an unconstrained bag, not checked against the
    /// editable map.
    pub fn set_user_property(&self, key: &str, value: Value) -> ConfigOverlay {
        let mut user_props = self.user_props();
        user_props.insert(key.to_string(), value);
        let mut data = self.data.clone();
        data.insert(USER_PROPS.to_string(), Value::Object(user_props));
        ConfigOverlay::new(data, self.znode_version)
    }

    pub fn unset_user_property(&self, key: &str) -> ConfigOverlay {
        if !self.user_props().contains_key(key) {
            return self.clone();
        }
        let mut user_props = self.user_props();
        user_props.remove(key);
        let mut data = self.data.clone();
        data.insert(USER_PROPS.to_string(), Value::Object(user_props));
        ConfigOverlay::new(data, self.znode_version)
    }

    /// Named-plugin section (request handlers, search components, ...)
    /// keyed by plugin name.
    pub fn named_plugins(&self, typ: &str) -> Map<String, Value> {
        self.data
            .get(typ)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Add or replace a plugin entry under `typ`, keyed by the `name` field
    /// of `info`.
    pub fn add_named_plugin(&self, info: Map<String, Value>, typ: &str) -> Result<ConfigOverlay> {
        let name = info
            .get(NAME_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::NotEditable(format!("{typ} entry without a '{NAME_KEY}'")))?
            .to_string();
        let mut section = self.named_plugins(typ);
        section.insert(name, Value::Object(info));
        let mut data = self.data.clone();
        data.insert(typ.to_string(), Value::Object(section));
        Ok(ConfigOverlay::new(data, self.znode_version))
    }

    pub fn delete_named_plugin(&self, name: &str, typ: &str) -> ConfigOverlay {
        let mut section = self.named_plugins(typ);
        if section.remove(name).is_none() {
            return self.clone();
        }
        let mut data = self.data.clone();
        data.insert(typ.to_string(), Value::Object(section));
        ConfigOverlay::new(data, self.znode_version)
    }
}
