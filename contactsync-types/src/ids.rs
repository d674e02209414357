//! Identifier types used throughout the contact sync core.
//!
//! A [`Uid`] is the string value of the source's designated lookup column.
//! It is content-derived rather than row-derived, so every raw row of a
//! merged contact maps to the same identity.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Body key that carries the uid list in every contacts packet.
///
/// Per-identity fields share the body with it, so no identity may use it.
pub const RESERVED_UIDS_KEY: &str = "uids";

/// Opaque identity of a logical contact.
///
/// Equality, ordering and hashing are defined on the string value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
    /// Parses a uid from its string representation.
    ///
    /// Rejects empty values, the reserved `uids` body key and values with
    /// line breaks (a uid is embedded in a record metadata line).
    pub fn parse(s: &str) -> Result<Self, Error> {
        if s.is_empty() {
            return Err(Error::InvalidUid(s.to_string(), "empty"));
        }
        if s == RESERVED_UIDS_KEY {
            return Err(Error::InvalidUid(s.to_string(), "reserved key"));
        }
        if s.contains(['\r', '\n']) {
            return Err(Error::InvalidUid(s.to_string(), "contains a line break"));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Uid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Uid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

impl Borrow<str> for Uid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identifier of the device that originates a record.
///
/// Appears verbatim in the `X-...-ID-DEV-<device>` metadata key, so it may
/// not contain `:`, whitespace or line breaks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Generates a random device id (UUID v4, simple form).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parses a device id from a string.
    pub fn parse(s: &str) -> Result<Self, Error> {
        if s.is_empty() {
            return Err(Error::InvalidDeviceId(s.to_string(), "empty"));
        }
        if s.contains(':') {
            return Err(Error::InvalidDeviceId(s.to_string(), "contains ':'"));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(Error::InvalidDeviceId(s.to_string(), "contains whitespace"));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}
