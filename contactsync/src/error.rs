//! Error types for the sync layer.

use contactsync_source::SourceError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An inbound request lacks a required field. The transaction is aborted.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// A record text block cannot be finalized.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// No handler is registered for the packet type.
    #[error("unsupported message type: {0}")]
    UnsupportedMessageType(String),

    /// The requester was driven out of order.
    #[error("invalid state: expected {expected}, was {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// The remote side dropped the request without answering.
    #[error("no response to {0}")]
    NoResponse(String),

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading the contact source failed as a whole.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Protocol error (invalid message format).
    #[error("protocol error: {0}")]
    Protocol(String),
}
