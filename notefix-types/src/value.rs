//! Closed sum type for frontmatter values.
//!
//! Field-kind validation is exhaustive pattern matching over this type;
//! nested mappings are rejected at the conversion boundary so no open
//! `Value`-like type leaks into the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A frontmatter value.
///
/// Variant order matters for untagged deserialization: `Null` before
/// `Bool` before `Number` before `String` before `List`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    /// Convert from a parsed YAML value. Mappings and tagged values have
    /// no counterpart in the closed sum and return `None`.
    pub fn from_yaml(v: &serde_yaml::Value) -> Option<Value> {
        match v {
            serde_yaml::Value::Null => Some(Value::Null),
            serde_yaml::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_yaml::Value::Number(n) => n.as_f64().map(Value::Number),
            serde_yaml::Value::String(s) => Some(Value::String(s.clone())),
            serde_yaml::Value::Sequence(items) => items
                .iter()
                .map(Value::from_yaml)
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            serde_yaml::Value::Mapping(_) | serde_yaml::Value::Tagged(_) => None,
        }
    }

    /// Convert from a JSON value (schema document defaults). Objects have
    /// no counterpart and return `None`.
    pub fn from_json(v: &serde_json::Value) -> Option<Value> {
        match v {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(Value::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            serde_json::Value::Object(_) => None,
        }
    }

    pub fn to_yaml(&self) -> serde_yaml::Value {
        match self {
            Value::Null => serde_yaml::Value::Null,
            Value::Bool(b) => serde_yaml::Value::Bool(*b),
            Value::Number(n) => serde_yaml::Value::Number((*n).into()),
            Value::String(s) => serde_yaml::Value::String(s.clone()),
            Value::List(items) => {
                serde_yaml::Value::Sequence(items.iter().map(Value::to_yaml).collect())
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Treat a value as a list of entries: a scalar is a one-element list,
    /// `Null` is empty. Used for fields that accept scalar-or-list.
    pub fn iter_entries(&self) -> Vec<&Value> {
        match self {
            Value::Null => vec![],
            Value::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::String(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}
