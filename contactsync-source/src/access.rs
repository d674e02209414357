//! Capability model for contact access.
//!
//! Whether the local contact book may be read is decided by the embedding
//! application (platform prompt, user setting, policy) and handed to the
//! core as a [`ContactsAccess`] value. The projection checks it before any
//! query is attempted.

use crate::error::{SourceError, SourceResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Individual capability a caller may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    /// Read contact rows and serialized records.
    ReadContacts,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadContacts => f.write_str("read-contacts"),
        }
    }
}

/// Set of capabilities granted to the contacts core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactsAccess {
    granted: HashSet<Permission>,
}

impl ContactsAccess {
    /// Access with `ReadContacts` granted.
    pub fn read_only() -> Self {
        let mut access = Self::default();
        access.grant(Permission::ReadContacts);
        access
    }

    /// Access with nothing granted.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, permission: Permission) {
        self.granted.insert(permission);
    }

    pub fn revoke(&mut self, permission: Permission) {
        self.granted.remove(&permission);
    }

    pub fn is_granted(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }

    /// Fails with [`SourceError::PermissionDenied`] unless `permission` is held.
    pub fn require(&self, permission: Permission) -> SourceResult<()> {
        if self.is_granted(permission) {
            Ok(())
        } else {
            Err(SourceError::PermissionDenied(format!(
                "{permission} has not been granted"
            )))
        }
    }
}
