//! Manifest diffing.

use contactsync_types::{Manifest, Uid};
use serde::Serialize;
use std::collections::BTreeSet;

/// Outcome of comparing a local manifest against a remote one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestDiff {
    /// Absent locally, or newer remotely.
    pub to_fetch: BTreeSet<Uid>,
    /// Present locally, absent remotely. Reported only.
    pub deleted: BTreeSet<Uid>,
    /// Present on both sides with a local timestamp at least as new.
    pub unchanged: BTreeSet<Uid>,
}

impl ManifestDiff {
    /// Whether the two manifests already agree.
    pub fn is_in_sync(&self) -> bool {
        self.to_fetch.is_empty() && self.deleted.is_empty()
    }
}

/// Computes which identities the requester must fetch.
///
/// An identity is fetched when the local manifest lacks it or when the
/// remote timestamp is strictly greater than the local one.
pub fn diff(local: &Manifest, remote: &Manifest) -> ManifestDiff {
    let mut out = ManifestDiff::default();
    for (uid, remote_ts) in remote.iter() {
        match local.get(uid) {
            Some(local_ts) if local_ts >= remote_ts => {
                out.unchanged.insert(uid.clone());
            }
            _ => {
                out.to_fetch.insert(uid.clone());
            }
        }
    }
    out.deleted = local
        .uids()
        .filter(|uid| !remote.contains(uid))
        .cloned()
        .collect();
    out
}
