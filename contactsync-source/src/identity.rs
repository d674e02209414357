//! Resolving a row to the identity of the logical contact it belongs to.

use crate::error::{SourceError, SourceResult};
use crate::source::Row;
use contactsync_types::{ColumnType, ColumnValue, Uid};

/// Extracts the identity of `row` from `lookup_column`.
///
/// Text values are used as-is. Integer keys are rendered in decimal, so a
/// source keyed by numeric ids yields the same identities as one keyed by
/// their string form. Fails with [`SourceError::Schema`] when the row has no
/// usable value in the column; the caller skips the row and continues.
pub fn identity_of(row: &dyn Row, lookup_column: &str) -> SourceResult<Uid> {
    let schema_error = || SourceError::Schema {
        column: lookup_column.to_string(),
    };

    let raw = match row.column_type(lookup_column).ok_or_else(schema_error)? {
        ColumnType::Text => match row.get_typed(lookup_column, ColumnType::Text) {
            ColumnValue::Text(s) => s,
            _ => return Err(schema_error()),
        },
        ColumnType::Integer => match row.get_typed(lookup_column, ColumnType::Integer) {
            ColumnValue::Integer(i) => i.to_string(),
            _ => return Err(schema_error()),
        },
        ColumnType::Null => return Err(schema_error()),
        tag => {
            return Err(SourceError::UnsupportedType {
                column: lookup_column.to_string(),
                tag,
            });
        }
    };

    Uid::parse(&raw).map_err(|source| SourceError::InvalidIdentity {
        column: lookup_column.to_string(),
        source,
    })
}
