//! Supported attribute data types and typed scalar values

use crate::core::error::{KitResult, SchemaError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Data type of an attribute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
  #[default]
  String,
  Bool,
  Int,
  Float,
  DateTime,
}

impl DataType {
  const ALL: [DataType; 5] = [
    DataType::String,
    DataType::Bool,
    DataType::Int,
    DataType::Float,
    DataType::DateTime,
  ];

  /// Parse a type name (case-insensitive)
  pub fn parse(name: &str) -> KitResult<Self> {
    Self::ALL
      .into_iter()
      .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
      .ok_or_else(|| {
        SchemaError::UnsupportedDataType {
          data_type: name.to_string(),
        }
        .into()
      })
  }

  pub fn name(&self) -> &'static str {
    match self {
      DataType::String => "string",
      DataType::Bool => "bool",
      DataType::Int => "int",
      DataType::Float => "float",
      DataType::DateTime => "datetime",
    }
  }

  pub fn supported_names() -> Vec<&'static str> {
    Self::ALL.iter().map(DataType::name).collect()
  }

  /// Parse raw text into a value of this type
  pub fn parse_value(&self, raw: &str) -> Option<ScalarValue> {
    match self {
      DataType::String => Some(ScalarValue::String(raw.to_string())),
      DataType::Bool => {
        if raw.trim().eq_ignore_ascii_case("true") {
          Some(ScalarValue::Bool(true))
        } else if raw.trim().eq_ignore_ascii_case("false") {
          Some(ScalarValue::Bool(false))
        } else {
          None
        }
      }
      DataType::Int => raw.trim().parse::<i64>().ok().map(ScalarValue::Int),
      DataType::Float => raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(ScalarValue::Float),
      DataType::DateTime => DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|d| ScalarValue::DateTime(d.with_timezone(&Utc))),
    }
  }

  /// Whether the runtime type of `value` is this type
  pub fn accepts(&self, value: &ScalarValue) -> bool {
    matches!(
      (self, value),
      (DataType::String, ScalarValue::String(_))
        | (DataType::Bool, ScalarValue::Bool(_))
        | (DataType::Int, ScalarValue::Int(_))
        | (DataType::Float, ScalarValue::Float(_))
        | (DataType::DateTime, ScalarValue::DateTime(_))
    )
  }

  /// Convert a value of any type into this type through its text form
  pub fn coerce(&self, value: &ScalarValue) -> Option<ScalarValue> {
    if self.accepts(value) {
      return Some(value.clone());
    }
    self.parse_value(&value.to_string())
  }
}

impl fmt::Display for DataType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

/// A typed scalar held by a materialised attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ScalarValue {
  String(String),
  Bool(bool),
  Int(i64),
  Float(f64),
  DateTime(DateTime<Utc>),
}

impl ScalarValue {
  /// Plain JSON form used in draft configuration output
  pub fn to_json(&self) -> serde_json::Value {
    match self {
      ScalarValue::String(s) => serde_json::Value::String(s.clone()),
      ScalarValue::Bool(b) => serde_json::Value::Bool(*b),
      ScalarValue::Int(i) => serde_json::Value::from(*i),
      ScalarValue::Float(f) => serde_json::Value::from(*f),
      ScalarValue::DateTime(d) => serde_json::Value::String(d.to_rfc3339()),
    }
  }
}

impl fmt::Display for ScalarValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ScalarValue::String(s) => write!(f, "{}", s),
      ScalarValue::Bool(b) => write!(f, "{}", b),
      ScalarValue::Int(i) => write!(f, "{}", i),
      ScalarValue::Float(v) => write!(f, "{}", v),
      ScalarValue::DateTime(d) => write!(f, "{}", d.to_rfc3339()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_type_names() {
    assert_eq!(DataType::parse("INT").unwrap(), DataType::Int);
    assert_eq!(DataType::parse("datetime").unwrap(), DataType::DateTime);
    assert!(DataType::parse("decimal").is_err());
  }

  #[test]
  fn test_parse_values() {
    assert_eq!(DataType::Int.parse_value("25"), Some(ScalarValue::Int(25)));
    assert_eq!(DataType::Bool.parse_value("True"), Some(ScalarValue::Bool(true)));
    assert_eq!(DataType::Bool.parse_value("25"), None);
    assert_eq!(DataType::Float.parse_value("2.5"), Some(ScalarValue::Float(2.5)));
    assert_eq!(DataType::Float.parse_value("NaN"), None);
    assert!(DataType::DateTime.parse_value("2024-01-01T00:00:00Z").is_some());
    assert!(DataType::DateTime.parse_value("yesterday").is_none());
  }

  #[test]
  fn test_coerce_through_text() {
    assert_eq!(
      DataType::String.coerce(&ScalarValue::Int(25)),
      Some(ScalarValue::String("25".to_string()))
    );
    assert_eq!(DataType::Float.coerce(&ScalarValue::Int(3)), Some(ScalarValue::Float(3.0)));
    assert_eq!(DataType::Bool.coerce(&ScalarValue::Int(25)), None);
  }

  #[test]
  fn test_accepts_is_strict() {
    assert!(DataType::Int.accepts(&ScalarValue::Int(1)));
    assert!(!DataType::Float.accepts(&ScalarValue::Int(1)));
  }
}
