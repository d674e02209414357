//! Error types for the source layer.

use contactsync_types::ColumnType;
use thiserror::Error;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors that can occur while reading a contact source.
///
/// `Schema`, `UnsupportedType` and `InvalidIdentity` describe a single row or
/// cell; the projection logs them and moves on. The rest abort the call.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The caller does not hold the capability required to read contacts.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A required column is absent from a row.
    #[error("row has no column {column:?}")]
    Schema { column: String },

    /// A cell carries a type tag the core does not understand.
    #[error("column {column:?} has unsupported type {tag}")]
    UnsupportedType { column: String, tag: ColumnType },

    /// The lookup column holds a value that is not a valid identity.
    #[error("invalid identity in column {column:?}: {source}")]
    InvalidIdentity {
        column: String,
        #[source]
        source: contactsync_types::Error,
    },

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The source could not run the query.
    #[error("query error: {0}")]
    Query(String),
}
