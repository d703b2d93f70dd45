//! Declarative input schemas.
//!
//! A [`Schema`] is a table of [`FieldSpec`]s (name, type, required flag,
//! default, constraints). [`Schema::validate`] interprets that table against
//! an untyped JSON payload and either returns a normalized object (defaults
//! filled in, unknown keys dropped) or *every* field-level problem it found.
//!
//! The same table renders to JSON Schema for tool discovery, but the
//! validator never looks at the rendered form.
//!
//! # Example
//!
//! ```ignore
//! use serde_json::json;
//! use taskbridge_core::schema::{FieldSpec, Schema};
//!
//! let schema = Schema::new()
//!     .field(FieldSpec::string("query").required())
//!     .field(FieldSpec::integer("limit").range(1, 100).default_value(json!(25)));
//!
//! let args = schema.validate(&json!({"query": "bug"}))?;
//! assert_eq!(args["limit"], 25);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Value type accepted by a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array(Box<FieldType>),
}

impl FieldType {
    fn json_type(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array(_) => "array",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array(_) => value.is_array(),
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            FieldType::Array(items) => json!({
                "type": "array",
                "items": items.to_json_schema(),
            }),
            other => json!({ "type": other.json_type() }),
        }
    }
}

/// One validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field path (`limit`, `labelIds[2]`, or `$` for the whole payload)
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

// =============================================================================
// FieldSpec
// =============================================================================

/// Declaration of a single input field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub description: Option<&'static str>,
    pub default: Option<Value>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub allowed: Option<Vec<&'static str>>,
}

impl FieldSpec {
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            description: None,
            default: None,
            minimum: None,
            maximum: None,
            min_length: None,
            max_length: None,
            allowed: None,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn array(name: &'static str, items: FieldType) -> Self {
        Self::new(name, FieldType::Array(Box::new(items)))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    /// Value used when the field is absent or null.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Inclusive numeric bounds.
    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.minimum = Some(min as f64);
        self.maximum = Some(max as f64);
        self
    }

    /// Minimum string length (chars) or array length.
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    /// Maximum string length (chars) or array length.
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Restrict a string field to a fixed set of values.
    pub fn one_of(mut self, values: &[&'static str]) -> Self {
        self.allowed = Some(values.to_vec());
        self
    }

    fn check(&self, path: &str, value: &Value, errors: &mut Vec<FieldError>) {
        if !self.field_type.matches(value) {
            errors.push(FieldError::new(
                path,
                format!(
                    "expected {}, got {}",
                    self.field_type.json_type(),
                    json_kind(value)
                ),
            ));
            return;
        }

        if let Some(n) = value.as_f64() {
            if let Some(min) = self.minimum {
                if n < min {
                    errors.push(FieldError::new(path, format!("must be >= {}", min)));
                }
            }
            if let Some(max) = self.maximum {
                if n > max {
                    errors.push(FieldError::new(path, format!("must be <= {}", max)));
                }
            }
        }

        let length = match value {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            _ => None,
        };
        if let Some(len) = length {
            if let Some(min) = self.min_length {
                if len < min {
                    errors.push(FieldError::new(
                        path,
                        format!("length must be at least {}", min),
                    ));
                }
            }
            if let Some(max) = self.max_length {
                if len > max {
                    errors.push(FieldError::new(
                        path,
                        format!("length must be at most {}", max),
                    ));
                }
            }
        }

        if let (Some(allowed), Some(s)) = (&self.allowed, value.as_str()) {
            if !allowed.contains(&s) {
                errors.push(FieldError::new(
                    path,
                    format!("must be one of: {}", allowed.join(", ")),
                ));
            }
        }

        if let (FieldType::Array(item_type), Value::Array(items)) = (&self.field_type, value) {
            for (i, item) in items.iter().enumerate() {
                if !item_type.matches(item) {
                    errors.push(FieldError::new(
                        format!("{}[{}]", path, i),
                        format!(
                            "expected {}, got {}",
                            item_type.json_type(),
                            json_kind(item)
                        ),
                    ));
                }
            }
        }
    }

    fn to_json_schema(&self) -> Value {
        let mut prop = self.field_type.to_json_schema();
        let is_array = matches!(self.field_type, FieldType::Array(_));

        if let Some(obj) = prop.as_object_mut() {
            if let Some(description) = self.description {
                obj.insert("description".into(), json!(description));
            }
            if let Some(default) = &self.default {
                obj.insert("default".into(), default.clone());
            }
            if let Some(min) = self.minimum {
                obj.insert("minimum".into(), schema_number(min));
            }
            if let Some(max) = self.maximum {
                obj.insert("maximum".into(), schema_number(max));
            }
            let (min_key, max_key) = if is_array {
                ("minItems", "maxItems")
            } else {
                ("minLength", "maxLength")
            };
            if let Some(min) = self.min_length {
                obj.insert(min_key.into(), json!(min));
            }
            if let Some(max) = self.max_length {
                obj.insert(max_key.into(), json!(max));
            }
            if let Some(allowed) = &self.allowed {
                obj.insert("enum".into(), json!(allowed));
            }
        }

        prop
    }
}

// =============================================================================
// Schema
// =============================================================================

/// Object schema: an ordered list of fields plus cross-field rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    one_of_required: Vec<Vec<&'static str>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Require at least one of `names` to be present and non-null.
    pub fn require_one_of(mut self, names: &[&'static str]) -> Self {
        self.one_of_required.push(names.to_vec());
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Validate `input`, returning the normalized object or every problem found.
    ///
    /// `null` is treated as an empty object. Unknown keys are dropped.
    pub fn validate(&self, input: &Value) -> Result<Map<String, Value>, Vec<FieldError>> {
        let empty = Map::new();
        let object = match input {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(vec![FieldError::new(
                    "$",
                    format!("expected object, got {}", json_kind(other)),
                )])
            }
        };

        let mut errors = Vec::new();
        let mut normalized = Map::new();

        for spec in &self.fields {
            match object.get(spec.name) {
                None | Some(Value::Null) => {
                    if let Some(default) = &spec.default {
                        normalized.insert(spec.name.to_string(), default.clone());
                    } else if spec.required {
                        errors.push(FieldError::new(spec.name, "is required"));
                    }
                }
                Some(value) => {
                    let before = errors.len();
                    spec.check(spec.name, value, &mut errors);
                    if errors.len() == before {
                        normalized.insert(spec.name.to_string(), value.clone());
                    }
                }
            }
        }

        for group in &self.one_of_required {
            let present = group
                .iter()
                .any(|name| object.get(*name).is_some_and(|v| !v.is_null()));
            if !present {
                errors.push(FieldError::new(
                    "$",
                    format!("at least one of {} must be provided", group.join(", ")),
                ));
            }
        }

        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(errors)
        }
    }

    /// Render as a JSON Schema object for discovery.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.to_json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        if let Some(obj) = schema.as_object_mut() {
            if !required.is_empty() {
                obj.insert("required".into(), json!(required));
            }
            // Each group is satisfied independently.
            let mut groups: Vec<Value> = self
                .one_of_required
                .iter()
                .map(|group| {
                    let any_of: Vec<Value> = group
                        .iter()
                        .map(|name| json!({ "required": [name] }))
                        .collect();
                    json!({ "anyOf": any_of })
                })
                .collect();
            match groups.len() {
                0 => {}
                1 => {
                    if let Some(Value::Object(group)) = groups.pop() {
                        obj.extend(group);
                    }
                }
                _ => {
                    obj.insert("allOf".into(), Value::Array(groups));
                }
            }
        }
        schema
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whole numbers render as integers so `range(1, 100)` shows as `1`, not `1.0`.
fn schema_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        json!(n as i64)
    } else {
        json!(n)
    }
}
