//! Requester-side state.
//!
//! The [`ContactCache`] is the requester's copy of the remote contact book.
//! It belongs to the caller, which decides whether and where to persist it
//! (it is `serde` serializable). [`RequesterState`] tracks where a
//! [`ContactsRequester`](crate::ContactsRequester) is in the two-phase
//! exchange.

use contactsync_types::{Manifest, Uid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One cached contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedContact {
    /// Finalized vCard as received.
    pub vcard: String,
    /// Timestamp taken from the vCard's embedded metadata.
    pub timestamp: i64,
}

/// uid to cached contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactCache {
    entries: BTreeMap<Uid, CachedContact>,
}

impl ContactCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `uid`.
    pub fn insert(&mut self, uid: Uid, vcard: impl Into<String>, timestamp: i64) {
        self.entries.insert(
            uid,
            CachedContact {
                vcard: vcard.into(),
                timestamp,
            },
        );
    }

    pub fn remove(&mut self, uid: &Uid) -> Option<CachedContact> {
        self.entries.remove(uid)
    }

    pub fn get(&self, uid: &Uid) -> Option<&CachedContact> {
        self.entries.get(uid)
    }

    pub fn contains(&self, uid: &Uid) -> bool {
        self.entries.contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uid, &CachedContact)> {
        self.entries.iter()
    }

    /// The local manifest the next diff runs against.
    pub fn manifest(&self) -> Manifest {
        self.entries
            .iter()
            .map(|(uid, contact)| (uid.clone(), contact.timestamp))
            .collect()
    }
}

/// Requester progress through one sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequesterState {
    #[default]
    Idle,
    ManifestRequested,
    ManifestReceived,
    FetchRequested,
    Complete,
}

impl RequesterState {
    pub fn name(self) -> &'static str {
        match self {
            RequesterState::Idle => "idle",
            RequesterState::ManifestRequested => "manifest-requested",
            RequesterState::ManifestReceived => "manifest-received",
            RequesterState::FetchRequested => "fetch-requested",
            RequesterState::Complete => "complete",
        }
    }
}

impl fmt::Display for RequesterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
