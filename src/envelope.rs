//! Uniform tool result envelope.
//!
//! Serialises as `{"status": "success", ...data}` or
//! `{"status": "error", "error_message": "..."}`. The `status` field is always
//! emitted first.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Error, Result};

/// Result shape returned by every tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Envelope {
    /// Tool-specific data, flattened next to `status`.
    Success(Map<String, Value>),
    /// Human-readable failure description.
    Error { error_message: String },
}

impl Envelope {
    /// Wrap any serialisable record. The record must serialise to a JSON
    /// object; its fields become top-level envelope fields.
    pub fn success(data: impl Serialize) -> Result<Self> {
        match serde_json::to_value(data)? {
            Value::Object(mut fields) => {
                // Data never overrides the discriminant.
                fields.remove("status");
                Ok(Envelope::Success(fields))
            }
            other => Err(Error::internal(format!(
                "envelope data must be an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Envelope::Error {
            error_message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    pub fn is_error(&self) -> bool {
        !self.is_success()
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Envelope::Error { error_message } => Some(error_message),
            Envelope::Success(_) => None,
        }
    }

    /// Look up a top-level data field of a success envelope.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Envelope::Success(fields) => fields.get(name),
            Envelope::Error { .. } => None,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        match self {
            Envelope::Success(fields) => {
                out.insert("status".into(), Value::from("success"));
                out.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Envelope::Error { error_message } => {
                out.insert("status".into(), Value::from("error"));
                out.insert("error_message".into(), Value::from(error_message.as_str()));
            }
        }
        Value::Object(out)
    }

    /// Two-space indented JSON, as carried inside protocol content blocks.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_value()).unwrap_or_default()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Serialize)]
    struct Bmi {
        bmi: f64,
    }

    #[test]
    fn test_success_flattens_data() {
        let env = Envelope::success(Bmi { bmi: 24.69 }).unwrap();
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"status": "success", "bmi": 24.69})
        );
    }

    #[test]
    fn test_status_serialised_first() {
        let env = Envelope::success(json!({"a": 1, "b": 2})).unwrap();
        let text = serde_json::to_string(&env).unwrap();
        assert!(text.starts_with(r#"{"status":"success""#), "{text}");
    }

    #[test]
    fn test_error_shape() {
        let env = Envelope::error("Drug name is required");
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"status": "error", "error_message": "Drug name is required"})
        );
        assert_eq!(env.error_message(), Some("Drug name is required"));
        assert!(env.is_error());
    }

    #[test]
    fn test_non_object_data_rejected() {
        assert!(Envelope::success(json!([1, 2])).is_err());
        assert!(Envelope::success("text").is_err());
    }

    #[test]
    fn test_data_cannot_override_status() {
        let env = Envelope::success(json!({"status": "error", "x": 1})).unwrap();
        assert!(env.is_success());
        assert_eq!(env.to_value(), json!({"status": "success", "x": 1}));
    }

    #[test]
    fn test_deserialize_both_shapes() {
        let ok: Envelope = serde_json::from_value(json!({"status": "success", "n": 3})).unwrap();
        assert_eq!(ok.field("n"), Some(&json!(3)));
        let err: Envelope =
            serde_json::from_value(json!({"status": "error", "error_message": "boom"})).unwrap();
        assert_eq!(err, Envelope::error("boom"));
    }

    #[test]
    fn test_to_value_matches_serde() {
        let env = Envelope::success(json!({"query": "q", "articles": []})).unwrap();
        assert_eq!(env.to_value(), serde_json::to_value(&env).unwrap());
    }

    #[test]
    fn test_pretty_json_uses_two_space_indent() {
        let pretty = Envelope::error("x").to_pretty_json();
        assert_eq!(pretty, "{\n  \"status\": \"error\",\n  \"error_message\": \"x\"\n}");
    }
}
