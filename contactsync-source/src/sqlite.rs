//! SQLite-backed [`TabularSource`].
//!
//! SQLite's storage classes map one-to-one onto [`ColumnType`]. Requested
//! columns the table does not have are left out of the `SELECT` (discovered
//! with `PRAGMA table_info`), so they read as missing rather than failing
//! the statement. Text cells that are not valid UTF-8 read as absent.

use crate::error::{SourceError, SourceResult};
use crate::source::{Query, Row, TabularSource};
use contactsync_types::{ColumnType, ColumnValue};
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Largest selection pushed down as an `IN (...)` list. Bigger selections
/// scan the table and leave filtering to the caller.
const MAX_PUSHDOWN_VALUES: usize = 500;

/// A contact source backed by an SQLite database.
#[derive(Clone)]
pub struct SqliteSource {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSource {
    /// Opens (or creates) a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn))
    }

    /// Opens an in-memory database.
    pub fn open_in_memory() -> SourceResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs one or more SQL statements, e.g. to create or fill tables.
    pub fn execute_batch(&self, sql: &str) -> SourceResult<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    fn lock(&self) -> SourceResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SourceError::Query("sqlite connection lock poisoned".into()))
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Column names of `table`, in declaration order.
fn table_columns(conn: &Connection, table: &str) -> SourceResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    if columns.is_empty() {
        return Err(SourceError::Query(format!("no such table: {table}")));
    }
    Ok(columns)
}

struct SqliteRow<'a, 'stmt> {
    row: &'a rusqlite::Row<'stmt>,
    columns: &'a [String],
}

impl SqliteRow<'_, '_> {
    fn value(&self, column: &str) -> Option<ValueRef<'_>> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.row.get_ref(idx).ok()
    }
}

impl Row for SqliteRow<'_, '_> {
    fn column_type(&self, column: &str) -> Option<ColumnType> {
        Some(match self.value(column)? {
            ValueRef::Null => ColumnType::Null,
            ValueRef::Integer(_) => ColumnType::Integer,
            ValueRef::Real(_) => ColumnType::Float,
            ValueRef::Text(_) => ColumnType::Text,
            ValueRef::Blob(_) => ColumnType::Blob,
        })
    }

    fn get_typed(&self, column: &str, ty: ColumnType) -> ColumnValue {
        match (ty, self.value(column)) {
            (ColumnType::Integer, Some(ValueRef::Integer(v))) => ColumnValue::Integer(v),
            (ColumnType::Float, Some(ValueRef::Real(v))) => ColumnValue::Float(v),
            // Invalid UTF-8 reads as absent, never as a lossy copy.
            (ColumnType::Text, Some(ValueRef::Text(bytes))) => match std::str::from_utf8(bytes) {
                Ok(text) => ColumnValue::Text(text.to_string()),
                Err(_) => ColumnValue::Absent,
            },
            (ColumnType::Blob, Some(ValueRef::Blob(bytes))) => ColumnValue::Blob(bytes.to_vec()),
            _ => ColumnValue::Absent,
        }
    }
}

impl TabularSource for SqliteSource {
    fn scan(
        &self,
        query: &Query,
        visit: &mut dyn FnMut(&dyn Row) -> ControlFlow<()>,
    ) -> SourceResult<()> {
        let conn = self.lock()?;
        let available = table_columns(&conn, &query.table)?;

        let columns: Vec<String> = query
            .columns
            .iter()
            .filter(|c| available.contains(c))
            .cloned()
            .collect();
        for missing in query.columns.iter().filter(|c| !available.contains(c)) {
            debug!("Table {} has no column {}", query.table, missing);
        }

        let select_list = if columns.is_empty() {
            "NULL".to_string()
        } else {
            columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut sql = format!("SELECT {} FROM {}", select_list, quote_ident(&query.table));

        let mut params: Vec<&str> = Vec::new();
        if let Some(selection) = &query.selection {
            if !available.contains(&selection.column) {
                debug!(
                    "Selection column {} not in {}, nothing matches",
                    selection.column, query.table
                );
                return Ok(());
            }
            if selection.values.is_empty() {
                return Ok(());
            }
            if selection.values.len() <= MAX_PUSHDOWN_VALUES {
                let placeholders = vec!["?"; selection.values.len()].join(", ");
                sql.push_str(&format!(
                    " WHERE CAST({} AS TEXT) IN ({})",
                    quote_ident(&selection.column),
                    placeholders
                ));
                params.extend(selection.values.iter().map(String::as_str));
            }
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        while let Some(row) = rows.next()? {
            let view = SqliteRow {
                row,
                columns: &columns,
            };
            if visit(&view).is_break() {
                break;
            }
        }
        Ok(())
    }
}
