//! Core type definitions for contact book sync.
//!
//! This crate defines the value types every other layer shares:
//! - Contact identities ([`Uid`]) and device identifiers ([`DeviceId`])
//! - Typed cell values read from a tabular source ([`ColumnValue`], [`ColumnType`])
//! - Per-identity projected rows ([`Record`])
//! - Identity to last-modified snapshots ([`Manifest`])
//!
//! None of these outlive a single request/response exchange; they are
//! rebuilt from the source on every read.

mod ids;
mod manifest;
mod value;

pub use ids::{DeviceId, Uid, RESERVED_UIDS_KEY};
pub use manifest::Manifest;
pub use value::{ColumnType, ColumnValue, Record};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid uid {0:?}: {1}")]
    InvalidUid(String, &'static str),

    #[error("invalid device id {0:?}: {1}")]
    InvalidDeviceId(String, &'static str),
}
