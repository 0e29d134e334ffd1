//! Typed tool parameter schemas.
//!
//! A [`ToolSchema`] is the single source of truth for a tool's parameters: it
//! renders the JSON Schema returned by discovery and it validates incoming
//! arguments before any outbound call is made. Declared defaults are filled
//! in and numbers above a declared `maximum` are clamped to it.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Declared type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Boolean,
}

impl ParamType {
    /// JSON Schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
        }
    }
}

/// One parameter of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamType,
    pub description: String,
    pub required: bool,
    pub default: Option<Value>,
    pub minimum: Option<u64>,
    pub maximum: Option<u64>,
    pub allowed: Vec<String>,
}

impl ParamSpec {
    fn new(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required: false,
            default: None,
            minimum: None,
            maximum: None,
            allowed: Vec::new(),
        }
    }

    /// A string parameter.
    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::String, description)
    }

    /// A numeric parameter.
    pub fn number(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::Number, description)
    }

    /// A boolean parameter.
    pub fn boolean(name: &str, description: &str) -> Self {
        Self::new(name, ParamType::Boolean, description)
    }

    /// Mark the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Default applied when the parameter is omitted.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Smallest accepted number.
    pub fn minimum(mut self, minimum: u64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    /// Ceiling for numeric values; larger values are clamped to it.
    pub fn maximum(mut self, maximum: u64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    /// Restrict a string parameter to a fixed set of values.
    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed = values.iter().map(|v| v.to_string()).collect();
        self
    }

    fn property(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), Value::from(self.kind.as_str()));

        let description = match self.maximum {
            Some(max) => format!("{} (capped at {})", self.description, max),
            None => self.description.clone(),
        };
        prop.insert("description".into(), Value::from(description));

        if let Some(default) = &self.default {
            prop.insert("default".into(), default.clone());
        }
        if let Some(min) = self.minimum {
            prop.insert("minimum".into(), Value::from(min));
        }
        if let Some(max) = self.maximum {
            prop.insert("maximum".into(), Value::from(max));
        }
        if !self.allowed.is_empty() {
            prop.insert("enum".into(), Value::from(self.allowed.clone()));
        }
        Value::Object(prop)
    }

    /// Check and coerce one supplied value.
    fn coerce(&self, value: Value) -> Result<Value, String> {
        match self.kind {
            ParamType::String => {
                let s = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    other => return Err(self.type_error(&other)),
                };
                if !self.allowed.is_empty() && !self.allowed.iter().any(|a| a == &s) {
                    return Err(format!(
                        "parameter '{}' must be one of: {}",
                        self.name,
                        self.allowed.join(", ")
                    ));
                }
                Ok(Value::String(s))
            }
            ParamType::Number => {
                let number = match &value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| self.type_error(&value))?;

                if !number.is_finite() {
                    return Err(self.type_error(&value));
                }
                if let Some(min) = self.minimum {
                    if number < min as f64 {
                        return Err(format!(
                            "parameter '{}' must be at least {}",
                            self.name, min
                        ));
                    }
                }
                if let Some(max) = self.maximum {
                    if number > max as f64 {
                        return Ok(Value::from(max));
                    }
                }
                if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
                    Ok(Value::from(number as i64))
                } else {
                    Ok(Value::from(number))
                }
            }
            ParamType::Boolean => match value {
                Value::Bool(b) => Ok(Value::Bool(b)),
                Value::String(ref s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(ref s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                other => Err(self.type_error(&other)),
            },
        }
    }

    fn type_error(&self, value: &Value) -> String {
        format!(
            "parameter '{}' must be a {}, got {}",
            self.name,
            self.kind.as_str(),
            json_type_name(value)
        )
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Ordered parameter list of a tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSchema {
    params: Vec<ParamSpec>,
}

impl ToolSchema {
    /// A schema with no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Declared parameters, in declaration order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Names of the required parameters.
    pub fn required(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Render as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.property()))
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.required(),
        })
    }

    /// Validate caller arguments and produce the effective argument map.
    ///
    /// Required parameters must be present and non-null (strings non-blank).
    /// Omitted optional parameters receive their declared default; unknown
    /// keys are passed through untouched.
    pub fn apply(&self, args: Value) -> Result<Map<String, Value>, String> {
        let mut map = match args {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(format!(
                    "arguments must be an object, got {}",
                    json_type_name(&other)
                ))
            }
        };

        for spec in &self.params {
            let supplied = match map.remove(&spec.name) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) if s.trim().is_empty() => None,
                Some(value) => Some(value),
            };

            match supplied {
                Some(value) => {
                    let value = spec.coerce(value)?;
                    map.insert(spec.name.clone(), value);
                }
                None if spec.required => {
                    return Err(format!("missing required parameter '{}'", spec.name));
                }
                None => {
                    if let Some(default) = &spec.default {
                        map.insert(spec.name.clone(), default.clone());
                    }
                }
            }
        }

        Ok(map)
    }
}

impl Serialize for ToolSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_schema().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ToolSchema {
        ToolSchema::new()
            .param(ParamSpec::string("query", "Search text").required())
            .param(
                ParamSpec::number("page_size", "Results per page")
                    .default(30)
                    .minimum(1)
                    .maximum(300),
            )
            .param(
                ParamSpec::string("type", "Meeting type")
                    .default("scheduled")
                    .one_of(&["scheduled", "live"]),
            )
            .param(ParamSpec::boolean("exclude_archived", "Skip archived").default(true))
    }

    #[test]
    fn test_json_schema_rendering() {
        let rendered = schema().to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["required"], json!(["query"]));
        assert_eq!(rendered["properties"]["page_size"]["type"], "number");
        assert_eq!(rendered["properties"]["page_size"]["default"], 30);
        assert_eq!(rendered["properties"]["page_size"]["maximum"], 300);
        assert!(rendered["properties"]["page_size"]["description"]
            .as_str()
            .unwrap()
            .contains("capped at 300"));
        assert_eq!(
            rendered["properties"]["type"]["enum"],
            json!(["scheduled", "live"])
        );
    }

    #[test]
    fn test_missing_required() {
        let err = schema().apply(json!({"page_size": 10})).unwrap_err();
        assert!(err.contains("query"));

        let err = schema().apply(json!({"query": "   "})).unwrap_err();
        assert!(err.contains("query"));
    }

    #[test]
    fn test_defaults_applied() {
        let args = schema().apply(json!({"query": "planning"})).unwrap();
        assert_eq!(args["page_size"], 30);
        assert_eq!(args["type"], "scheduled");
        assert_eq!(args["exclude_archived"], true);
    }

    #[test]
    fn test_clamps_to_maximum() {
        let args = schema()
            .apply(json!({"query": "q", "page_size": 500}))
            .unwrap();
        assert_eq!(args["page_size"], 300);

        let args = schema()
            .apply(json!({"query": "q", "page_size": "42"}))
            .unwrap();
        assert_eq!(args["page_size"], 42);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(schema().apply(json!({"query": "q", "page_size": 0})).is_err());
        assert!(schema().apply(json!({"query": "q", "type": "past"})).is_err());
        assert!(schema().apply(json!({"query": ["q"]})).is_err());
        assert!(schema().apply(json!("query")).is_err());
    }

    #[test]
    fn test_number_for_enumerated_string_checked() {
        let err = schema().apply(json!({"query": "q", "type": 5})).unwrap_err();
        assert!(err.contains("must be one of: scheduled, live"), "{err}");

        let args = schema().apply(json!({"query": 2024})).unwrap();
        assert_eq!(args["query"], "2024");

        let numeric = ToolSchema::new()
            .param(ParamSpec::string("kind", "Kind").one_of(&["1", "2"]));
        assert_eq!(numeric.apply(json!({"kind": 2})).unwrap()["kind"], "2");
        assert!(numeric.apply(json!({"kind": 3})).is_err());
    }

    #[test]
    fn test_null_arguments_are_empty() {
        let schema = ToolSchema::new().param(ParamSpec::number("limit", "Limit").default(25));
        let args = schema.apply(Value::Null).unwrap();
        assert_eq!(args["limit"], 25);
    }
}
