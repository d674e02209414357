//! Typed cell values and projected records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Native type tag a tabular source reports for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Blob,
    /// The cell exists but holds no value.
    Null,
    /// A tag the core does not understand, carried as the source's raw code.
    Unrecognized(i32),
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("float"),
            Self::Text => f.write_str("text"),
            Self::Blob => f.write_str("blob"),
            Self::Null => f.write_str("null"),
            Self::Unrecognized(code) => write!(f, "unrecognized({code})"),
        }
    }
}

/// A single cell value, decided once per (row, column) from the source's tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ColumnValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    Absent,
}

impl ColumnValue {
    /// The type tag this value was read as. `Absent` reports `Null`.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Integer(_) => ColumnType::Integer,
            Self::Float(_) => ColumnType::Float,
            Self::Text(_) => ColumnType::Text,
            Self::Blob(_) => ColumnType::Blob,
            Self::Absent => ColumnType::Null,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(v) => Some(v),
            _ => None,
        }
    }
}

/// Column name to value mapping for one identity.
///
/// Only columns that were actually read carry an entry; an absent column is
/// a missing key, never a placeholder value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    columns: BTreeMap<String, ColumnValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `column`, replacing any earlier value.
    /// Absent values are not stored.
    pub fn set(&mut self, column: impl Into<String>, value: ColumnValue) {
        if value.is_absent() {
            return;
        }
        self.columns.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.columns.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates columns in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copies every column of `other` over this record (later row wins).
    pub fn overlay(&mut self, other: Record) {
        self.columns.extend(other.columns);
    }
}
