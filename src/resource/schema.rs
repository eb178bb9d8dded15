//! Flat field schemas for resource types
//!
//! Each resource type declares the fields its state may carry: whether they
//! are required, computed by the service, sensitive, or force a re-create on
//! change, plus an optional per-field validator. The provider validates a
//! state against the schema before any remote call.

use crate::state::ResourceState;
use serde_json::Value;
use std::collections::BTreeMap;

/// The value shape a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Int,
    Bool,
    /// List of arbitrary JSON values (nested blocks included).
    List,
    /// String-to-string map.
    Map,
}

impl FieldKind {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Int => value.is_i64() || value.is_u64(),
            FieldKind::Bool => value.is_boolean(),
            FieldKind::List => value.is_array(),
            FieldKind::Map => value.is_object(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Int => "int",
            FieldKind::Bool => "bool",
            FieldKind::List => "list",
            FieldKind::Map => "map",
        }
    }
}

/// Per-field validation hook. Returns a human-readable complaint on failure.
pub type Validator = fn(field: &str, value: &Value) -> Result<(), String>;

/// One field of a resource schema.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub kind: FieldKind,
    pub required: bool,
    /// Set by the service, never by configuration.
    pub computed: bool,
    pub sensitive: bool,
    /// Changing this field requires re-creating the resource.
    pub force_new: bool,
    pub validator: Option<Validator>,
}

impl FieldSchema {
    pub fn required(kind: FieldKind) -> Self {
        Self {
            kind,
            required: true,
            computed: false,
            sensitive: false,
            force_new: false,
            validator: None,
        }
    }

    pub fn optional(kind: FieldKind) -> Self {
        Self {
            required: false,
            ..Self::required(kind)
        }
    }

    pub fn computed(kind: FieldKind) -> Self {
        Self {
            required: false,
            computed: true,
            ..Self::required(kind)
        }
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }
}

/// The full field table for one resource type.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<&'static str, FieldSchema>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, schema: FieldSchema) -> Self {
        self.fields.insert(name, schema);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    /// Validate a state against this schema, collecting every violation
    /// rather than stopping at the first.
    pub fn validate(&self, state: &ResourceState) -> anyhow::Result<()> {
        let mut problems = Vec::new();

        for (name, field) in &self.fields {
            match state.get(name) {
                None | Some(Value::Null) => {
                    if field.required {
                        problems.push(format!("`{}` is required", name));
                    }
                }
                Some(value) => {
                    if !field.kind.accepts(value) {
                        problems.push(format!("`{}` must be a {}", name, field.kind.name()));
                        continue;
                    }
                    if let Some(validate) = field.validator {
                        if let Err(complaint) = validate(name, value) {
                            problems.push(complaint);
                        }
                    }
                }
            }
        }

        for (name, _) in state.fields() {
            if !self.fields.contains_key(name.as_str()) {
                problems.push(format!("unknown field `{}`", name));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("invalid configuration: {}", problems.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new()
            .field("name", FieldSchema::required(FieldKind::String))
            .field("capacity", FieldSchema::optional(FieldKind::Int))
            .field("gateway_url", FieldSchema::computed(FieldKind::String))
    }

    #[test]
    fn test_valid_state_passes() {
        let state = ResourceState::from_fields([("name", json!("svc1")), ("capacity", json!(2))]);
        schema().validate(&state).unwrap();
    }

    #[test]
    fn test_missing_required_field_is_reported() {
        let state = ResourceState::from_fields([("capacity", json!(2))]);
        let err = schema().validate(&state).unwrap_err();
        assert!(err.to_string().contains("`name` is required"));
    }

    #[test]
    fn test_wrong_kind_is_reported() {
        let state = ResourceState::from_fields([("name", json!("x")), ("capacity", json!("two"))]);
        let err = schema().validate(&state).unwrap_err();
        assert!(err.to_string().contains("`capacity` must be a int"));
    }

    #[test]
    fn test_unknown_field_is_reported() {
        let state = ResourceState::from_fields([("name", json!("x")), ("bogus", json!(1))]);
        let err = schema().validate(&state).unwrap_err();
        assert!(err.to_string().contains("unknown field `bogus`"));
    }

    #[test]
    fn test_validator_runs_on_present_fields() {
        fn no_spaces(field: &str, value: &Value) -> Result<(), String> {
            match value.as_str() {
                Some(s) if s.contains(' ') => Err(format!("`{}` may not contain spaces", field)),
                _ => Ok(()),
            }
        }

        let schema = Schema::new()
            .field("name", FieldSchema::required(FieldKind::String).with_validator(no_spaces));

        let ok = ResourceState::from_fields([("name", json!("svc1"))]);
        schema.validate(&ok).unwrap();

        let bad = ResourceState::from_fields([("name", json!("svc 1"))]);
        let err = schema.validate(&bad).unwrap_err();
        assert!(err.to_string().contains("may not contain spaces"));
    }
}
