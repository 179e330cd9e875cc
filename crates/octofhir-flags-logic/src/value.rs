//! Runtime values of the logic language

use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// A value produced while evaluating criteria, or stored as a patient attribute
#[derive(Debug, Clone, PartialEq)]
pub enum LogicValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    List(Vec<LogicValue>),
}

impl LogicValue {
    pub fn is_null(&self) -> bool {
        matches!(self, LogicValue::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            LogicValue::Null => "Null",
            LogicValue::Boolean(_) => "Boolean",
            LogicValue::Integer(_) => "Integer",
            LogicValue::Decimal(_) => "Decimal",
            LogicValue::String(_) => "String",
            LogicValue::Date(_) => "Date",
            LogicValue::List(_) => "List",
        }
    }

    /// Numeric view with Integer promoted to Decimal
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            LogicValue::Integer(i) => Some(Decimal::from(*i)),
            LogicValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Convert a JSON attribute value
    ///
    /// Strings shaped like `YYYY-MM-DD` become dates. Objects are rejected.
    pub fn from_json(value: &JsonValue) -> Result<Self, String> {
        Ok(match value {
            JsonValue::Null => LogicValue::Null,
            JsonValue::Bool(b) => LogicValue::Boolean(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    LogicValue::Integer(i)
                } else {
                    let decimal = Decimal::from_str(&n.to_string())
                        .ok()
                        .or_else(|| n.as_f64().and_then(Decimal::from_f64))
                        .ok_or_else(|| format!("number {} is out of range", n))?;
                    LogicValue::Decimal(decimal)
                }
            }
            JsonValue::String(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                Ok(date) => LogicValue::Date(date),
                Err(_) => LogicValue::String(s.clone()),
            },
            JsonValue::Array(items) => LogicValue::List(
                items
                    .iter()
                    .map(LogicValue::from_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            JsonValue::Object(_) => return Err("nested objects are not supported".to_string()),
        })
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            LogicValue::Null => JsonValue::Null,
            LogicValue::Boolean(b) => JsonValue::Bool(*b),
            LogicValue::Integer(i) => JsonValue::from(*i),
            LogicValue::Decimal(d) => d
                .to_f64()
                .map(JsonValue::from)
                .unwrap_or_else(|| JsonValue::String(d.to_string())),
            LogicValue::String(s) => JsonValue::String(s.clone()),
            LogicValue::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            LogicValue::List(items) => JsonValue::Array(items.iter().map(LogicValue::to_json).collect()),
        }
    }
}

impl fmt::Display for LogicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicValue::Null => write!(f, "null"),
            LogicValue::Boolean(b) => write!(f, "{}", b),
            LogicValue::Integer(i) => write!(f, "{}", i),
            LogicValue::Decimal(d) => write!(f, "{}", d),
            LogicValue::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            LogicValue::Date(d) => write!(f, "@{}", d.format("%Y-%m-%d")),
            LogicValue::List(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for LogicValue {
    fn from(b: bool) -> Self {
        LogicValue::Boolean(b)
    }
}

impl From<i64> for LogicValue {
    fn from(i: i64) -> Self {
        LogicValue::Integer(i)
    }
}

impl From<&str> for LogicValue {
    fn from(s: &str) -> Self {
        LogicValue::String(s.to_string())
    }
}

impl From<NaiveDate> for LogicValue {
    fn from(d: NaiveDate) -> Self {
        LogicValue::Date(d)
    }
}

impl From<Decimal> for LogicValue {
    fn from(d: Decimal) -> Self {
        LogicValue::Decimal(d)
    }
}
