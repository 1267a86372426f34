//! Session state values
//!
//! Values are self-describing on disk: every value carries a `kind` tag next
//! to its contents, so new kinds can be added without breaking old files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::known_types::KnownType;

pub type StateMap = BTreeMap<String, StateValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StateValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<StateValue>),
    Map(StateMap),
    /// A host-defined type, see [`KnownType`]
    Custom(CustomValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomValue {
    /// Registered kind tag
    pub kind: String,
    /// The value encoded as JSON
    pub payload: serde_json::Value,
}

impl StateValue {
    /// Encode a known type as a custom value
    pub fn custom<T: KnownType>(value: &T) -> serde_json::Result<Self> {
        Ok(StateValue::Custom(CustomValue {
            kind: T::KIND.to_string(),
            payload: serde_json::to_value(value)?,
        }))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StateValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            StateValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Ints widen to floats
    pub fn as_float(&self) -> Option<f64> {
        match self {
            StateValue::Float(f) => Some(*f),
            StateValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StateValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[StateValue]> {
        match self {
            StateValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&StateMap> {
        match self {
            StateValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut StateMap> {
        match self {
            StateValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Decode a custom value of kind `T::KIND`
    pub fn as_custom<T: KnownType>(&self) -> Option<T> {
        match self {
            StateValue::Custom(custom) if custom.kind == T::KIND => {
                T::deserialize(&custom.payload).ok()
            }
            _ => None,
        }
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        StateValue::Bool(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        StateValue::Int(value)
    }
}

impl From<i32> for StateValue {
    fn from(value: i32) -> Self {
        StateValue::Int(value.into())
    }
}

impl From<u32> for StateValue {
    fn from(value: u32) -> Self {
        StateValue::Int(value.into())
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        StateValue::Float(value)
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        StateValue::Text(value)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        StateValue::Text(value.to_string())
    }
}

impl From<Vec<StateValue>> for StateValue {
    fn from(value: Vec<StateValue>) -> Self {
        StateValue::List(value)
    }
}

impl From<StateMap> for StateValue {
    fn from(value: StateMap) -> Self {
        StateValue::Map(value)
    }
}

impl<T: Into<StateValue>> From<Option<T>> for StateValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(StateValue::Null)
    }
}
