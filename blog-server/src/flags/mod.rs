pub mod flag_definitions;
pub mod flag_matching;
pub mod flag_resolver;
pub mod flag_source;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use flag_resolver::FlagResolver;

pub const USER_CONTEXT_KIND: &str = "user";

/// A variation served for a flag. Flags in this service only ever serve
/// strings or booleans.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    String(String),
}

impl FlagValue {
    /// Converts a raw variation from flag data, rejecting anything that is not
    /// a string or a boolean.
    pub fn from_json(value: &Value) -> Option<FlagValue> {
        match value {
            Value::Bool(b) => Some(FlagValue::Bool(*b)),
            Value::String(s) => Some(FlagValue::String(s.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::String(s) => Some(s),
            FlagValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(*b),
            FlagValue::String(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FlagValue::Bool(b) => Value::Bool(*b),
            FlagValue::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::String(value.to_string())
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{}", b),
            FlagValue::String(s) => write!(f, "{}", s),
        }
    }
}

/// Identity handed to flag evaluation. Built fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationContext {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl EvaluationContext {
    pub fn user(key: Option<String>) -> Self {
        EvaluationContext {
            kind: USER_CONTEXT_KIND.to_string(),
            key,
        }
    }

    /// Looks up a context attribute by name, as referenced from flag rules.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match name {
            "key" => self.key.as_deref(),
            "kind" => Some(&self.kind),
            _ => None,
        }
    }
}
