//! Query result types for sqlbridge.
//!
//! Defines the structures used to represent row sets coming back from the
//! database, and their rendering into the JSON shape handed across the
//! boundary: one array of objects, keys = column names.

use serde::Serialize;

use crate::error::{BridgeError, Result};

/// Represents the result of executing a row-returning SQL statement.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    /// Column metadata for the result set, in server order.
    pub columns: Vec<ColumnInfo>,

    /// Rows of data, in server return order.
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Creates a new empty query result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query result with the given columns and rows.
    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the result set as a JSON array of objects, one object per
    /// row, keyed by column name.
    ///
    /// Byte-sequence values are coerced to text here: the boundary never
    /// surfaces opaque binary blobs. An empty result renders as `[]`, never
    /// as JSON `null`, so the boundary's return channel stays unambiguous.
    pub fn to_json(&self) -> Result<String> {
        let mut objects = Vec::with_capacity(self.rows.len());

        for row in &self.rows {
            let mut object = serde_json::Map::with_capacity(self.columns.len());
            for (column, value) in self.columns.iter().zip(row.iter()) {
                object.insert(column.name.clone(), value.to_json_value());
            }
            objects.push(serde_json::Value::Object(object));
        }

        serde_json::to_string(&objects).map_err(|e| BridgeError::serialization(e.to_string()))
    }
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Column data type as reported by the server.
    pub data_type: String,
}

impl ColumnInfo {
    /// Creates a new column info with the given name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),

    /// Binary data. Coerced to text during JSON marshaling.
    Bytes(Vec<u8>),
}

impl Value {
    /// Converts the value into its JSON representation.
    ///
    /// This is the explicit normalization step of the marshaling path:
    /// bytes become (lossy) UTF-8 text, and non-finite floats become null
    /// since JSON has no representation for them.
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => {
                serde_json::Value::String(String::from_utf8_lossy(b).into_owned())
            }
        }
    }
}

// Conversion implementations for common types
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
