//! Call and response envelopes exchanged with the hosting transport.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::FieldError;

/// Error codes carried in [`ErrorBody::code`].
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const UNKNOWN_OPERATION: &str = "UNKNOWN_OPERATION";
    pub const CANCELLED: &str = "CANCELLED";
    pub const HANDLER_ERROR: &str = "HANDLER_ERROR";
}

/// Incoming call: `{ "name": ..., "args": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl CallEnvelope {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Parse an untyped envelope. Either all of it is valid or it is rejected.
    ///
    /// A missing or null `args` means `{}`.
    pub fn from_value(value: Value) -> Result<Self, Vec<FieldError>> {
        let Value::Object(mut map) = value else {
            return Err(vec![FieldError::new("$", "call envelope must be an object")]);
        };

        let mut errors = Vec::new();

        let name = match map.remove("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => Some(name),
            Some(Value::String(_)) => {
                errors.push(FieldError::new("name", "must not be empty"));
                None
            }
            Some(_) => {
                errors.push(FieldError::new("name", "must be a string"));
                None
            }
            None => {
                errors.push(FieldError::new("name", "is required"));
                None
            }
        };

        let args = match map.remove("args") {
            None | Some(Value::Null) => Some(Value::Object(Map::new())),
            Some(args @ Value::Object(_)) => Some(args),
            Some(_) => {
                errors.push(FieldError::new("args", "must be an object"));
                None
            }
        };

        match (name, args) {
            (Some(name), Some(args)) if errors.is_empty() => Ok(Self { name, args }),
            _ => Err(errors),
        }
    }
}

/// Error part of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Per-field problems for validation failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

/// Outgoing response: `{ "result": ... }` or `{ "error": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    Success { result: Value },
    Failure { error: ErrorBody },
}

impl ResponseEnvelope {
    pub fn success(result: Value) -> Self {
        Self::Success { result }
    }

    pub fn failure(message: impl Into<String>, code: &str) -> Self {
        Self::Failure {
            error: ErrorBody {
                message: message.into(),
                code: Some(code.to_string()),
                details: Vec::new(),
            },
        }
    }

    /// Validation failure listing every field problem.
    pub fn validation(errors: Vec<FieldError>) -> Self {
        let summary = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Self::Failure {
            error: ErrorBody {
                message: format!("Invalid arguments: {}", summary),
                code: Some(codes::VALIDATION_ERROR.to_string()),
                details: errors,
            },
        }
    }

    pub fn unknown_operation(name: &str) -> Self {
        Self::failure(
            format!("Unknown operation: {}", name),
            codes::UNKNOWN_OPERATION,
        )
    }

    pub fn cancelled(name: &str) -> Self {
        Self::failure(format!("Operation cancelled: {}", name), codes::CANCELLED)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            Self::Success { result } => Some(result),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorBody> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }

    /// Error code, if this is a failure carrying one.
    pub fn code(&self) -> Option<&str> {
        self.error().and_then(|e| e.code.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_envelope() {
        let call =
            CallEnvelope::from_value(json!({"name": "search_issues", "args": {"query": "x"}}))
                .unwrap();
        assert_eq!(call.name, "search_issues");
        assert_eq!(call.args, json!({"query": "x"}));
    }

    #[test]
    fn test_missing_args_is_empty_object() {
        let call = CallEnvelope::from_value(json!({"name": "ping"})).unwrap();
        assert_eq!(call.args, json!({}));

        let call = CallEnvelope::from_value(json!({"name": "ping", "args": null})).unwrap();
        assert_eq!(call.args, json!({}));
    }

    #[test]
    fn test_envelope_rejected_as_a_whole() {
        let errors = CallEnvelope::from_value(json!({"name": 7, "args": [1, 2]})).unwrap_err();
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "args"]);

        // A valid name does not rescue invalid args
        let errors = CallEnvelope::from_value(json!({"name": "ok", "args": "nope"})).unwrap_err();
        assert_eq!(errors.len(), 1);

        let errors = CallEnvelope::from_value(json!("search")).unwrap_err();
        assert_eq!(errors[0].path, "$");

        let errors = CallEnvelope::from_value(json!({"name": "  "})).unwrap_err();
        assert_eq!(errors[0].message, "must not be empty");
    }

    #[test]
    fn test_success_serialization() {
        let resp = ResponseEnvelope::success(json!({"results": []}));
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"result": {"results": []}})
        );
        assert!(!resp.is_error());
        assert!(resp.code().is_none());
    }

    #[test]
    fn test_failure_serialization() {
        let resp = ResponseEnvelope::unknown_operation("nope");
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"error": {"message": "Unknown operation: nope", "code": "UNKNOWN_OPERATION"}})
        );
        assert!(resp.is_error());
    }

    #[test]
    fn test_validation_envelope_lists_details() {
        let resp = ResponseEnvelope::validation(vec![
            FieldError::new("query", "is required"),
            FieldError::new("limit", "must be <= 100"),
        ]);

        let error = resp.error().unwrap();
        assert_eq!(error.code.as_deref(), Some(codes::VALIDATION_ERROR));
        assert_eq!(
            error.message,
            "Invalid arguments: query: is required; limit: must be <= 100"
        );
        assert_eq!(error.details.len(), 2);
    }

    #[test]
    fn test_deserialize_round_trip_shape() {
        let resp: ResponseEnvelope =
            serde_json::from_value(json!({"error": {"message": "boom"}})).unwrap();
        assert_eq!(resp.error().unwrap().message, "boom");
        assert!(resp.code().is_none());
    }
}
