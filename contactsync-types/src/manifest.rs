//! Identity to last-modified snapshots used for incremental diffing.

use crate::Uid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from identity to its last-modified timestamp.
///
/// Holds exactly one entry per identity. When several raw rows fold into one
/// identity, [`Manifest::observe`] keeps the largest timestamp seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<Uid, i64>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a timestamp for `uid`, keeping the maximum across calls.
    pub fn observe(&mut self, uid: Uid, timestamp: i64) {
        self.entries
            .entry(uid)
            .and_modify(|ts| *ts = (*ts).max(timestamp))
            .or_insert(timestamp);
    }

    /// Sets the timestamp for `uid`, overwriting whatever was there.
    pub fn insert(&mut self, uid: Uid, timestamp: i64) -> Option<i64> {
        self.entries.insert(uid, timestamp)
    }

    pub fn remove(&mut self, uid: &Uid) -> Option<i64> {
        self.entries.remove(uid)
    }

    pub fn get(&self, uid: &Uid) -> Option<i64> {
        self.entries.get(uid).copied()
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

    /// Identities in ascending order.
    pub fn uids(&self) -> impl Iterator<Item = &Uid> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uid, i64)> {
        self.entries.iter().map(|(uid, ts)| (uid, *ts))
    }
}

impl FromIterator<(Uid, i64)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (Uid, i64)>>(iter: I) -> Self {
        let mut manifest = Self::new();
        for (uid, ts) in iter {
            manifest.observe(uid, ts);
        }
        manifest
    }
}

impl IntoIterator for Manifest {
    type Item = (Uid, i64);
    type IntoIter = std::collections::btree_map::IntoIter<Uid, i64>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
