//! Tool descriptor and result types.

use crate::error::{AgentNetError, AgentNetResult};
use crate::message::json_type_name;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Declared type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Coerce a raw argument into this type.
    ///
    /// Only unambiguous conversions are made: numeric strings become numbers,
    /// `"true"`/`"false"` become booleans, and integral floats become
    /// integers. Everything else that does not already match is rejected.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ParamType::String, Value::String(_)) => Some(value.clone()),
            (ParamType::Integer, Value::Number(n)) => integral(n).map(Value::from),
            (ParamType::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (ParamType::Number, Value::Number(_)) => Some(value.clone()),
            (ParamType::Number, Value::String(s)) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Some(Value::from(i));
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
            }
            (ParamType::Boolean, Value::Bool(_)) => Some(value.clone()),
            (ParamType::Boolean, Value::String(s)) => match s.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            (ParamType::Array, Value::Array(_)) => Some(value.clone()),
            (ParamType::Object, Value::Object(_)) => Some(value.clone()),
            _ => None,
        }
    }
}

fn integral(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Schema entry for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub ty: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl ParamSpec {
    /// A required parameter.
    pub fn required(ty: ParamType, description: impl Into<String>) -> Self {
        Self {
            ty,
            required: true,
            default: None,
            description: description.into(),
        }
    }

    /// An optional parameter, with an optional default.
    pub fn optional(ty: ParamType, default: Option<Value>, description: impl Into<String>) -> Self {
        Self {
            ty,
            required: false,
            default,
            description: description.into(),
        }
    }
}

/// Serializable description of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Agent kind expected to host the tool.
    #[serde(default)]
    pub agent_kind: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            agent_kind: String::new(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn for_kind(mut self, kind: impl Into<String>) -> Self {
        self.agent_kind = kind.into();
        self
    }

    pub fn param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.parameters.insert(name.into(), spec);
        self
    }

    /// Validate raw arguments against the schema and return the normalized
    /// argument map: coerced values, defaults filled in, undeclared
    /// arguments passed through untouched. `null` counts as absent.
    pub fn validate_arguments(&self, raw: &Map<String, Value>) -> AgentNetResult<Map<String, Value>> {
        let mut problems = Vec::new();
        let mut normalized = Map::new();

        for (name, value) in raw {
            if !self.parameters.contains_key(name) && !value.is_null() {
                normalized.insert(name.clone(), value.clone());
            }
        }

        for (name, spec) in &self.parameters {
            match raw.get(name).filter(|v| !v.is_null()) {
                Some(value) => match spec.ty.coerce(value) {
                    Some(coerced) => {
                        normalized.insert(name.clone(), coerced);
                    }
                    None => problems.push(format!(
                        "parameter '{name}' expects {}, got {}",
                        spec.ty,
                        json_type_name(value)
                    )),
                },
                None if spec.required => {
                    problems.push(format!("missing required parameter '{name}'"));
                }
                None => {
                    if let Some(default) = &spec.default {
                        normalized.insert(name.clone(), default.clone());
                    }
                }
            }
        }

        if problems.is_empty() {
            Ok(normalized)
        } else {
            Err(AgentNetError::Validation(format!(
                "{}: {}",
                self.name,
                problems.join("; ")
            )))
        }
    }

    /// Human-readable summary of the tool and its parameters.
    pub fn describe(&self) -> String {
        let mut out = format!("Tool: {}\nDescription: {}\n", self.name, self.description);
        if !self.agent_kind.is_empty() {
            out.push_str(&format!("Agent kind: {}\n", self.agent_kind));
        }
        out.push_str("Parameters:\n");
        for (name, spec) in &self.parameters {
            let requirement = if spec.required { "required" } else { "optional" };
            let default = spec
                .default
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_else(|| "none".to_string());
            out.push_str(&format!(
                "- {name} ({}, {requirement}): {} (default: {default})\n",
                spec.ty, spec.description
            ));
        }
        out
    }
}

/// Outcome tag of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolStatus {
    Ok,
    Error,
}

/// Error detail carried by a failed [`ToolResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: String,
    pub message: String,
}

/// Result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolFailure>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            status: ToolStatus::Ok,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            data: None,
            error: Some(ToolFailure {
                kind: kind.into(),
                message: message.into(),
            }),
        }
    }

    /// Successful result from a tool's output. String output that parses as
    /// JSON is stored as the parsed value.
    pub fn from_output(output: Value) -> Self {
        match output {
            Value::String(s) => match serde_json::from_str::<Value>(&s) {
                Ok(parsed) => Self::ok(parsed),
                Err(_) => Self::ok(Value::String(s)),
            },
            other => Self::ok(other),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ToolStatus::Ok
    }
}
