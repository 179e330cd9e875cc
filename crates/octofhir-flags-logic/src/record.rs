//! Patient identifiers and attribute records

use crate::value::LogicValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Opaque integer identifier of a patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub i64);

impl PatientId {
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PatientId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(PatientId)
    }
}

impl From<i64> for PatientId {
    fn from(id: i64) -> Self {
        PatientId(id)
    }
}

/// Attributes of one patient, in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    pub id: PatientId,
    pub attributes: IndexMap<String, LogicValue>,
}

impl PatientRecord {
    pub fn new(id: impl Into<PatientId>) -> Self {
        Self {
            id: id.into(),
            attributes: IndexMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<LogicValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<LogicValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&LogicValue> {
        self.attributes.get(name)
    }

    /// Attribute value, null when the record does not carry it
    pub fn attribute(&self, name: &str) -> LogicValue {
        self.attributes.get(name).cloned().unwrap_or(LogicValue::Null)
    }

    /// Build a record from a JSON object with an integer `id` member
    pub fn from_json(value: &JsonValue) -> Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| "patient record must be a JSON object".to_string())?;
        let id = object
            .get("id")
            .and_then(JsonValue::as_i64)
            .ok_or_else(|| "patient record requires an integer 'id'".to_string())?;

        let mut record = PatientRecord::new(id);
        for (name, value) in object {
            if name == "id" {
                continue;
            }
            let value = LogicValue::from_json(value).map_err(|e| format!("{}.{}: {}", id, name, e))?;
            record.set(name.clone(), value);
        }
        Ok(record)
    }

    pub fn to_json(&self) -> JsonValue {
        let mut object = serde_json::Map::new();
        object.insert("id".to_string(), JsonValue::from(self.id.0));
        for (name, value) in &self.attributes {
            object.insert(name.clone(), value.to_json());
        }
        JsonValue::Object(object)
    }
}
