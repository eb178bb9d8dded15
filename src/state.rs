//! Resource State
//!
//! The mutable key/value container representing one managed resource
//! instance. The configuration engine creates a state before any lifecycle
//! call; handlers read identity fields out of it, and write observed
//! attributes (and the remote identifier) back into it.

use serde_json::{Map, Value};

/// Mutable named-field container for one managed resource instance.
///
/// Fields are arbitrary typed attributes keyed by schema field name. The
/// remote identifier lives outside the field map: it is assigned exactly once
/// per remote object (by a successful dispatch) and cleared only when the
/// remote object is found to be gone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceState {
    fields: Map<String, Value>,
    id: Option<String>,
}

impl ResourceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from an iterator of field pairs. Mostly a test/bootstrap
    /// convenience for the configuration engine.
    pub fn from_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            id: None,
        }
    }

    /// Get a field value by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Get a string field, if present and a string.
    pub fn get_string(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|v| v.as_str())
    }

    /// Get a non-empty string field, erroring with the field name otherwise.
    pub fn require_string(&self, field: &str) -> anyhow::Result<String> {
        match self.get_string(field) {
            Some(s) if !s.is_empty() => Ok(s.to_string()),
            _ => Err(anyhow::anyhow!("missing required field `{}`", field)),
        }
    }

    /// Get a boolean field, defaulting to `false` when absent.
    pub fn get_bool(&self, field: &str) -> bool {
        self.fields
            .get(field)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Get a list field, empty when absent.
    pub fn get_list(&self, field: &str) -> Vec<Value> {
        self.fields
            .get(field)
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default()
    }

    /// Set a field value.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Set a field only when the value is present and non-empty.
    pub fn set_optional(&mut self, field: &str, value: Option<impl Into<Value>>) {
        if let Some(value) = value {
            let value = value.into();
            let empty = match &value {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                _ => false,
            };
            if !empty {
                self.fields.insert(field.to_string(), value);
            }
        }
    }

    /// Remove a field, returning the previous value if any.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Number of fields currently held.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over all fields.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// The remote identifier, once known.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Record the remote identifier.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Forget the remote identifier. Used when a read finds the remote object
    /// gone, so the configuration engine re-creates it on the next run.
    pub fn clear_id(&mut self) {
        self.id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_set_roundtrip() {
        let mut state = ResourceState::new();
        state.set("name", "svc1");
        state.set("capacity", 2);

        assert_eq!(state.get_string("name"), Some("svc1"));
        assert_eq!(state.get("capacity"), Some(&json!(2)));
        assert_eq!(state.get("missing"), None);
    }

    #[test]
    fn test_require_string_rejects_missing_and_empty() {
        let mut state = ResourceState::new();
        assert!(state.require_string("name").is_err());

        state.set("name", "");
        assert!(state.require_string("name").is_err());

        state.set("name", "svc1");
        assert_eq!(state.require_string("name").unwrap(), "svc1");
    }

    #[test]
    fn test_set_optional_skips_empty_values() {
        let mut state = ResourceState::new();
        state.set_optional("a", None::<String>);
        state.set_optional("b", Some(""));
        state.set_optional("c", Some("value"));

        assert_eq!(state.get("a"), None);
        assert_eq!(state.get("b"), None);
        assert_eq!(state.get_string("c"), Some("value"));
    }

    #[test]
    fn test_id_lifecycle() {
        let mut state = ResourceState::new();
        assert_eq!(state.id(), None);

        state.set_id("/subscriptions/x/resourceGroups/rg1");
        assert_eq!(state.id(), Some("/subscriptions/x/resourceGroups/rg1"));

        state.clear_id();
        assert_eq!(state.id(), None);
    }

    #[test]
    fn test_from_fields() {
        let state = ResourceState::from_fields([
            ("name", json!("svc1")),
            ("resource_group_name", json!("rg1")),
        ]);
        assert_eq!(state.len(), 2);
        assert_eq!(state.get_string("resource_group_name"), Some("rg1"));
    }
}
