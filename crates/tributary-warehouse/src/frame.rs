//! Tabular data handed to the loader

use std::fmt;

/// Column type in the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Double,
    BigInt,
}

impl SqlType {
    pub fn ddl(self) -> &'static str {
        match self {
            Self::Text => "VARCHAR",
            Self::Double => "DOUBLE",
            Self::BigInt => "BIGINT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub sql_type: SqlType,
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    BigInt(i64),
    Double(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub(crate) fn to_duckdb(&self) -> duckdb::types::Value {
        match self {
            Self::Null => duckdb::types::Value::Null,
            Self::BigInt(v) => duckdb::types::Value::BigInt(*v),
            Self::Double(v) => duckdb::types::Value::Double(*v),
            Self::Text(v) => duckdb::types::Value::Text(v.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A typed row that knows which warehouse table it belongs to.
pub trait TableRow {
    const TABLE: &'static str;
    /// Column whose uniqueness decides insert vs. overwrite.
    const CONFLICT_KEY: &'static str;

    fn columns() -> Vec<Column>;

    /// Cell values in [`TableRow::columns`] order.
    fn values(&self) -> Vec<Value>;
}

/// Column set plus rows, in load order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows<T: TableRow>(rows: &[T]) -> Self {
        Self {
            columns: T::columns(),
            rows: rows.iter().map(TableRow::values).collect(),
        }
    }

    pub fn push(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}
