//! Record helpers: ids, nested lookups and key restriction.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A JSON object as returned by, or sent to, the API.
pub type Record = Map<String, Value>;

/// Identifier of a remote record.
///
/// Portainer-native kinds use integers, Docker-proxied kinds use strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Str(String),
}

impl ItemId {
    /// Read an id out of a JSON value.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) if !s.is_empty() => Some(Self::Str(s.clone())),
            _ => None,
        }
    }

    /// Integer form, when the id is numeric.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(id) => Some(*id),
            Self::Str(s) => s.parse().ok(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(id) => Value::from(*id),
            Self::Str(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::Str(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self::Str(id)
    }
}

/// Id of a record under the given field.
pub fn record_id(record: &Record, id_field: &str) -> Option<ItemId> {
    record.get(id_field).and_then(ItemId::from_value)
}

/// Look up a dotted path such as `Spec.Name` or `Authentication.Username`.
pub fn get_nested<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = record.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Turn a response body into a record.
pub fn into_record(value: Value) -> Result<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidResponse(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

/// Keep only the listed keys.
pub fn restrict(record: &Record, keys: &[&str]) -> Record {
    record
        .iter()
        .filter(|(key, _)| keys.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Drop the listed keys.
pub fn without(record: &Record, keys: &[&str]) -> Record {
    record
        .iter()
        .filter(|(key, _)| !keys.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Drop null values.
pub fn drop_nulls(record: Record) -> Record {
    record.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

/// Overlay `overlay` on `base`, ignoring null overlay values.
pub fn overlay(base: &Record, overlay: &Record) -> Record {
    let mut merged = base.clone();
    for (key, value) in overlay {
        if !value.is_null() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
