use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{HarnessError, Result};

/// A single bound parameter or result cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Convert a JSON mapping value into a bindable parameter.
    /// Arrays and objects are bound as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => SqlValue::Null,
            serde_json::Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        v.map(SqlValue::Integer).unwrap_or(SqlValue::Null)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

/// One result row, cells in select-list order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row(Vec<SqlValue>);

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Row(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.0.get(index)
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.0
    }

    pub fn get_i64(&self, index: usize, column: &'static str) -> Result<i64> {
        self.get_opt_i64(index, column)?
            .ok_or(HarnessError::UnexpectedValue {
                column,
                expected: "integer",
            })
    }

    pub fn get_opt_i64(&self, index: usize, column: &'static str) -> Result<Option<i64>> {
        match self.0.get(index) {
            Some(SqlValue::Integer(v)) => Ok(Some(*v)),
            Some(SqlValue::Null) => Ok(None),
            _ => Err(HarnessError::UnexpectedValue {
                column,
                expected: "integer",
            }),
        }
    }

    pub fn get_text(&self, index: usize, column: &'static str) -> Result<String> {
        self.get_opt_text(index, column)?
            .ok_or(HarnessError::UnexpectedValue {
                column,
                expected: "text",
            })
    }

    pub fn get_opt_text(&self, index: usize, column: &'static str) -> Result<Option<String>> {
        match self.0.get(index) {
            Some(SqlValue::Text(s)) => Ok(Some(s.clone())),
            Some(SqlValue::Null) => Ok(None),
            _ => Err(HarnessError::UnexpectedValue {
                column,
                expected: "text",
            }),
        }
    }
}
