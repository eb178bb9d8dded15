//! Shared field-mapping helpers
//!
//! The small vocabulary every expand/flatten pair speaks: location
//! normalization, tag maps, and optional sub-field assignment. Kept here so
//! the per-resource mapping code stays mechanical.

use crate::state::ResourceState;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Normalize an Azure location for comparison and storage: the API accepts
/// both `West Europe` and `westeurope` but echoes back the latter.
pub fn normalize_location(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Read and normalize the `location` field.
pub fn expand_location(state: &ResourceState) -> Option<String> {
    state.get_string("location").map(normalize_location)
}

/// Write a location returned by the API back into the state, normalized.
pub fn flatten_location(state: &mut ResourceState, location: Option<&str>) {
    if let Some(location) = location {
        state.set("location", normalize_location(location));
    }
}

/// Expand the `tags` map field into the wire shape.
pub fn expand_tags(state: &ResourceState) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    if let Some(Value::Object(map)) = state.get("tags") {
        for (key, value) in map {
            if let Some(value) = value.as_str() {
                tags.insert(key.clone(), value.to_string());
            }
        }
    }
    tags
}

/// Write tags returned by the API back into the state.
pub fn flatten_tags(state: &mut ResourceState, tags: &BTreeMap<String, String>) {
    let map: Map<String, Value> = tags
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    state.set("tags", Value::Object(map));
}

/// Set a sub-field of a nested block only when the value is present and
/// non-empty.
pub fn set_sub_field_optional(block: &mut Map<String, Value>, field: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        let value = value.into();
        let empty = match &value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        if !empty {
            block.insert(field.to_string(), value);
        }
    }
}

/// Read a string sub-field out of a nested block.
pub fn block_string<'a>(block: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    block.get(field).and_then(|v| v.as_str())
}

/// Read a bool sub-field out of a nested block, defaulting to false.
pub fn block_bool(block: &Map<String, Value>, field: &str) -> bool {
    block.get(field).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// The single block of a max-items-one list field, when configured.
pub fn single_block<'a>(state: &'a ResourceState, field: &str) -> Option<&'a Map<String, Value>> {
    state
        .get(field)
        .and_then(|v| v.as_array())
        .and_then(|list| list.first())
        .and_then(|v| v.as_object())
}

/// Every block of a list field.
pub fn blocks<'a>(state: &'a ResourceState, field: &str) -> Vec<&'a Map<String, Value>> {
    state
        .get(field)
        .and_then(|v| v.as_array())
        .map(|list| list.iter().filter_map(|v| v.as_object()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_location() {
        assert_eq!(normalize_location("West Europe"), "westeurope");
        assert_eq!(normalize_location("westeurope"), "westeurope");
        assert_eq!(normalize_location("North Central US"), "northcentralus");
    }

    #[test]
    fn test_tags_roundtrip() {
        let mut state = ResourceState::new();
        state.set("tags", json!({"env": "prod", "team": "platform"}));

        let tags = expand_tags(&state);
        assert_eq!(tags.get("env").map(String::as_str), Some("prod"));

        let mut read_back = ResourceState::new();
        flatten_tags(&mut read_back, &tags);
        assert_eq!(read_back.get("tags"), state.get("tags"));
    }

    #[test]
    fn test_single_block_takes_first_entry() {
        let mut state = ResourceState::new();
        state.set("sku", json!([{"name": "Developer", "capacity": 1}]));

        let block = single_block(&state, "sku").unwrap();
        assert_eq!(block_string(block, "name"), Some("Developer"));
        assert!(single_block(&state, "absent").is_none());
    }

    #[test]
    fn test_set_sub_field_optional_skips_empty() {
        let mut block = Map::new();
        set_sub_field_optional(&mut block, "a", Some(""));
        set_sub_field_optional(&mut block, "b", None::<String>);
        set_sub_field_optional(&mut block, "c", Some("v"));
        assert_eq!(block.len(), 1);
        assert_eq!(block_string(&block, "c"), Some("v"));
    }
}
