//! Parameter schema normalization and validation.
//!
//! Tool specs declare parameters as a JSON object mapping parameter names
//! to shape descriptors. Normalization turns each entry into a validator:
//! a `{"type": "string"}` descriptor becomes a required string field, a
//! descriptor with another recognized `type` is enforced as declared, and
//! anything unrecognized degrades to an unconstrained field with a logged
//! warning.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::ToolError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
    /// Unrecognized descriptor: accepts any value, including absence.
    Any,
}

impl ParamKind {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Array => value.is_array(),
            ParamKind::Object => value.is_object(),
            ParamKind::Any => true,
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Array => "array",
            ParamKind::Object => "object",
            ParamKind::Any => "any",
        }
    }
}

/// One normalized parameter.
#[derive(Clone, Debug)]
pub struct ParamSpec {
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
}

impl ParamSpec {
    /// Normalizes one raw descriptor. `tool_name` and `key` only feed the
    /// warning message for unrecognized shapes.
    fn from_value(tool_name: &str, key: &str, raw: &Value) -> Self {
        let Some(descriptor) = raw.as_object() else {
            log::warn!(
                "unsupported schema definition for parameter '{key}' of tool '{tool_name}'; \
                 defaulting to any"
            );
            return Self::any();
        };
        let description = descriptor
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let required = descriptor
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let kind = match descriptor.get("type").and_then(Value::as_str) {
            Some("string") => ParamKind::String,
            Some("number") | Some("integer") => ParamKind::Number,
            Some("boolean") => ParamKind::Boolean,
            Some("array") => ParamKind::Array,
            Some("object") => ParamKind::Object,
            _ => {
                log::warn!(
                    "unsupported schema definition for parameter '{key}' of tool '{tool_name}'; \
                     defaulting to any"
                );
                return Self {
                    kind: ParamKind::Any,
                    description,
                    required: false,
                };
            }
        };
        Self {
            kind,
            description,
            required,
        }
    }

    fn any() -> Self {
        Self {
            kind: ParamKind::Any,
            description: String::new(),
            required: false,
        }
    }
}

/// A normalized parameter schema: validates a mapping from parameter name
/// to value. Unknown extra keys are accepted.
#[derive(Clone, Debug, Default)]
pub struct ParamSchema {
    fields: BTreeMap<String, ParamSpec>,
}

impl ParamSchema {
    /// Builds a schema from the raw `params` value of a tool spec. A
    /// non-object value (including null) yields an empty schema.
    pub fn normalize(tool_name: &str, raw: &Value) -> Self {
        let mut fields = BTreeMap::new();
        if let Some(map) = raw.as_object() {
            for (key, descriptor) in map {
                fields.insert(key.clone(), ParamSpec::from_value(tool_name, key, descriptor));
            }
        } else if !raw.is_null() {
            log::warn!("parameter schema of tool '{tool_name}' is not an object; ignoring");
        }
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parameter names with their descriptions, for prompt rendering.
    pub fn described_params(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(name, spec)| (name.clone(), spec.description.clone()))
            .collect()
    }

    /// Validates an argument mapping, listing every offending field.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<(), ToolError> {
        let mut offending = Vec::new();
        for (name, spec) in &self.fields {
            match args.get(name) {
                None => {
                    if spec.required {
                        offending.push(format!("{name} (missing)"));
                    }
                }
                Some(value) => {
                    if !spec.kind.accepts(value) {
                        offending.push(format!("{name} (expected {})", spec.kind.expected()));
                    }
                }
            }
        }
        if offending.is_empty() {
            Ok(())
        } else {
            Err(ToolError::InvalidArguments { fields: offending })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_descriptor_becomes_required_string_field() {
        let schema = ParamSchema::normalize(
            "t",
            &json!({ "city": { "type": "string", "description": "City name" } }),
        );
        assert!(schema.validate(json!({ "city": "Oslo" }).as_object().unwrap()).is_ok());

        let err = schema.validate(json!({}).as_object().unwrap()).unwrap_err();
        match err {
            ToolError::InvalidArguments { fields } => {
                assert_eq!(fields, vec!["city (missing)".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_types_are_listed_per_field() {
        let schema = ParamSchema::normalize(
            "t",
            &json!({
                "count": { "type": "number" },
                "name": { "type": "string" }
            }),
        );
        let err = schema
            .validate(json!({ "count": "three", "name": 7 }).as_object().unwrap())
            .unwrap_err();
        match err {
            ToolError::InvalidArguments { fields } => {
                assert_eq!(fields.len(), 2);
                assert!(fields.iter().any(|f| f.contains("count")));
                assert!(fields.iter().any(|f| f.contains("name")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unrecognized_shapes_accept_anything() {
        let schema = ParamSchema::normalize("t", &json!({ "blob": 42 }));
        assert!(schema.validate(json!({}).as_object().unwrap()).is_ok());
        assert!(schema.validate(json!({ "blob": [1, 2] }).as_object().unwrap()).is_ok());
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let schema = ParamSchema::normalize(
            "t",
            &json!({ "detail": { "type": "string", "required": false } }),
        );
        assert!(schema.validate(json!({}).as_object().unwrap()).is_ok());
        assert!(schema.validate(json!({ "detail": 1 }).as_object().unwrap()).is_err());
    }

    #[test]
    fn unknown_extra_keys_are_accepted() {
        let schema = ParamSchema::normalize("t", &json!({ "a": { "type": "string" } }));
        assert!(schema
            .validate(json!({ "a": "x", "extra": true }).as_object().unwrap())
            .is_ok());
    }
}
