//! UI-shaped form snapshots.
//!
//! A snapshot is the JSON object a form dialog hands to the auto-save path:
//! camelCase field names, arbitrary values. Bookkeeping keys (`id`,
//! `status`, ...) may be present when the dialog was seeded from an
//! existing record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::types::DbId;

/// Snapshot key carrying the record identifier.
pub const ID_KEY: &str = "id";

/// Snapshot keys owned by the persistence layer rather than the form.
pub const BOOKKEEPING_KEYS: &[&str] = &[ID_KEY, "status", "version", "createdAt", "updatedAt"];

/// The current field values of a form dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormSnapshot(Map<String, Value>);

impl FormSnapshot {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a snapshot from an arbitrary JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CoreError::Validation(format!(
                "Form snapshot must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// The record identifier embedded in the snapshot, if any.
    ///
    /// Accepts a positive JSON integer or a string holding one.
    pub fn record_id(&self) -> Option<DbId> {
        self.get(ID_KEY).and_then(value_as_id)
    }

    /// Whether `key` holds a truthy value.
    pub fn is_populated(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_value_populated)
    }
}

impl From<Map<String, Value>> for FormSnapshot {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for FormSnapshot {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Interpret a JSON value as a database id (positive integer or numeric string).
pub fn value_as_id(value: &Value) -> Option<DbId> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<DbId>().ok(),
        _ => None,
    }?;
    (id > 0).then_some(id)
}

/// Truthiness used by the empty-snapshot heuristic and required checks.
///
/// Null, blank strings, empty arrays/objects, `false` and `0` are not
/// populated.
pub fn is_value_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
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
