use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};

/// A dynamically typed SQL value, used both for bound parameters and for
/// the cells of rows read back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view; floats with no fractional part and numeric text also convert.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// One result row: column name to value, in select-list order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    columns: IndexMap<String, Value>,
}

impl Row {
    #[must_use]
    pub fn new(columns: IndexMap<String, Value>) -> Self {
        Self { columns }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Like [`Row::get`] but a missing column is an error.
    pub fn try_get(&self, column: &str) -> Result<&Value> {
        self.columns
            .get(column)
            .ok_or_else(|| Error::Decode(format!("no column named '{column}'")))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn into_map(self) -> IndexMap<String, Value> {
        self.columns
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Typed view over a [`Row`], used by `query_as`.
pub trait FromRow: Sized {
    fn from_row(row: Row) -> Result<Self>;
}

impl FromRow for Row {
    fn from_row(row: Row) -> Result<Self> {
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::Int(42).as_f64(), Some(42.0));
        assert_eq!(Value::Float(7.0).as_i64(), Some(7));
        assert_eq!(Value::Float(7.5).as_i64(), None);
        assert_eq!(Value::Text(" 12 ".into()).as_i64(), Some(12));
        assert_eq!(Value::Null.as_i64(), None);
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<f64>), Value::Null);
        assert_eq!(Value::from(Some(2.5)), Value::Float(2.5));
    }

    #[test]
    fn test_row_keeps_select_order() {
        let row: Row = vec![
            ("name".to_string(), Value::from("Tinola")),
            ("calories".to_string(), Value::Int(160)),
        ]
        .into_iter()
        .collect();

        let names: Vec<&str> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["name", "calories"]);
        assert_eq!(row.get("calories"), Some(&Value::Int(160)));
        assert!(row.try_get("fiber").is_err());
    }

    #[test]
    fn test_row_serializes_as_object() {
        let row: Row = vec![("total".to_string(), Value::Int(3))]
            .into_iter()
            .collect();
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"total":3}"#);
    }
}
