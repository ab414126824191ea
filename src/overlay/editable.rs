//! The editable-property map: which overlay paths may be edited, the scalar
//! type expected at each, and whether the path may be addressed as an XML
//! attribute. Process-wide, read-only, initialized once.

use serde_json::json;
use serde_json::Value;

/// Expected scalar type of an editable property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropType {
    Str,
    Bool,
    Int,
    Float,
}

const TYPES: [PropType; 4] = [PropType::Str, PropType::Bool, PropType::Int, PropType::Float];

lazy_static::lazy_static! {
    /// Leaf codes: tens digit indexes [`TYPES`]; ones digit 0 marks an
    /// XML attribute, 1 an XML element.
    static ref EDITABLE_PROP_MAP: Value = json!({
        "updateHandler": {
            "autoCommit": {"maxDocs": 20, "maxTime": 20, "openSearcher": 11},
            "autoSoftCommit": {"maxDocs": 20, "maxTime": 20},
            "commitWithin": {"softCommit": 11},
            "commitIntervalLowerBound": 21,
            "indexWriter": {"closeWaitsForMerges": 11}
        },
        "query": {
            "filterCache": {
                "class": 0, "size": 0, "initialSize": 20,
                "autowarmCount": 20, "maxRamMB": 20, "regenerator": 0
            },
            "queryResultCache": {
                "class": 0, "size": 20, "initialSize": 20,
                "autowarmCount": 20, "maxRamMB": 20, "regenerator": 0
            },
            "documentCache": {
                "class": 0, "size": 20, "initialSize": 20,
                "autowarmCount": 20, "regenerator": 0
            },
            "fieldValueCache": {
                "class": 0, "size": 20, "initialSize": 20,
                "autowarmCount": 20, "regenerator": 0
            },
            "useFilterForSortedQuery": 1,
            "queryResultWindowSize": 1,
            "queryResultMaxDocsCached": 1,
            "enableLazyFieldLoading": 1,
            "boolTofilterOptimizer": 1,
            "maxBooleanClauses": 1
        },
        "jmx": {"agentId": 0, "serviceUrl": 0, "rootName": 0},
        "requestDispatcher": {
            "handleSelect": 0,
            "requestParsers": {
                "multipartUploadLimitInKB": 0,
                "formdataUploadLimitInKB": 0,
                "enableRemoteStreaming": 0,
                "addHttpRequestToContext": 0
            }
        }
    });
}

/// Resolve `path` against the editable-property map.
///
/// Dotted paths (`a.b.c`) are plain addressing; slash paths (`a/b/@c`) are
/// XPath-style, where a `@` segment addresses an XML attribute and is only
/// legal if the map marks the leaf as attribute-addressable. Returns the
/// normalized segment hierarchy and the leaf's expected type, or `None`
/// when the path is not editable.
pub fn check_editable(path: &str, is_xpath: bool) -> Option<(Vec<String>, PropType)> {
    let parts: Vec<&str> = path.split(if is_xpath { '/' } else { '.' }).collect();
    let mut node = &*EDITABLE_PROP_MAP;
    let mut hierarchy = Vec::with_capacity(parts.len());

    for (i, raw) in parts.iter().enumerate() {
        let is_attr = is_xpath && raw.starts_with('@');
        let part = if is_attr { &raw[1..] } else { raw };
        hierarchy.push(part.to_string());

        if i == parts.len() - 1 {
            let code = node.as_object()?.get(part)?.as_u64()?;
            let type_idx = (code / 10) as usize;
            let element_only = code % 10 != 0;
            if is_xpath && is_attr && element_only {
                return None;
            }
            return Some((hierarchy, *TYPES.get(type_idx)?));
        }
        node = node.as_object()?.get(part)?;
    }
    None
}

/// Whether `path` appears in the editable-property map at all.
pub fn is_editable(path: &str, is_xpath: bool) -> bool {
    check_editable(path, is_xpath).is_some()
}

/// Names of the editable entries directly under an XPath-style prefix.
/// Empty when the prefix is unknown or already addresses a leaf.
pub fn editable_sub_properties(xpath: &str) -> Vec<String> {
    let mut node = &*EDITABLE_PROP_MAP;
    for part in xpath.split('/').filter(|p| !p.is_empty()) {
        match node.get(part) {
            Some(next) => node = next,
            None => return Vec::new(),
        }
    }
    match node.as_object() {
        Some(map) => map.keys().cloned().collect(),
        None => Vec::new(),
    }
}
