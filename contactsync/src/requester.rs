//! Requester-side reconciliation.
//!
//! [`ContactsRequester`] is a state machine without I/O: it produces
//! request packets and consumes response packets. [`ContactsRequester::sync`]
//! drives both phases over a [`PacketTransport`].

use crate::error::{SyncError, SyncResult};
use crate::protocol::{ContactsMessage, Packet};
use crate::reconcile::{diff, ManifestDiff};
use crate::state::{ContactCache, RequesterState};
use crate::transport::PacketTransport;
use crate::vcard;
use contactsync_types::Uid;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// What one sync did to the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Inserted or replaced in the cache.
    pub fetched: BTreeSet<Uid>,
    /// Cached locally but no longer present on the source. Left in the cache.
    pub deleted: BTreeSet<Uid>,
    /// Requested but absent from the response.
    pub missing: BTreeSet<Uid>,
    /// Returned with unusable metadata.
    pub rejected: BTreeSet<Uid>,
}

/// Pulls changed contacts from a paired source into a [`ContactCache`].
#[derive(Debug, Default)]
pub struct ContactsRequester {
    state: RequesterState,
    cache: ContactCache,
    pending: BTreeSet<Uid>,
    report: SyncReport,
}

impl ContactsRequester {
    /// Starts from the caller's cache of a previous sync.
    pub fn new(cache: ContactCache) -> Self {
        Self {
            cache,
            ..Self::default()
        }
    }

    pub fn state(&self) -> RequesterState {
        self.state
    }

    pub fn cache(&self) -> &ContactCache {
        &self.cache
    }

    /// Hands the cache back to the caller.
    pub fn into_cache(self) -> ContactCache {
        self.cache
    }

    /// The report of the current or last sync.
    pub fn report(&self) -> &SyncReport {
        &self.report
    }

    fn require_state(&self, expected: RequesterState) -> SyncResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SyncError::InvalidState {
                expected: expected.name(),
                actual: self.state.name(),
            })
        }
    }

    fn transition(&mut self, next: RequesterState) {
        debug!("Requester {} -> {}", self.state, next);
        self.state = next;
    }

    // ── Message producers ────────────────────────────────────────

    /// Starts a sync. Allowed when idle or after a completed sync.
    pub fn request_manifest(&mut self) -> SyncResult<Packet> {
        if self.state != RequesterState::Complete {
            self.require_state(RequesterState::Idle)?;
        }
        self.pending.clear();
        self.report = SyncReport::default();
        self.transition(RequesterState::ManifestRequested);
        Ok(ContactsMessage::RequestAllUidsTimestamps.into_packet())
    }

    /// Builds the fetch request for the uids selected by the manifest diff.
    ///
    /// Returns `None`, completing the sync, when nothing needs fetching.
    pub fn request_fetch(&mut self) -> SyncResult<Option<Packet>> {
        self.require_state(RequesterState::ManifestReceived)?;
        if self.pending.is_empty() {
            self.transition(RequesterState::Complete);
            return Ok(None);
        }
        self.transition(RequesterState::FetchRequested);
        let uids = self.pending.iter().cloned().collect();
        Ok(Some(ContactsMessage::RequestVCardsByUid(uids).into_packet()))
    }

    // ── Message handlers ─────────────────────────────────────────

    /// Diffs the remote manifest against the cache.
    pub fn handle_manifest_response(&mut self, packet: &Packet) -> SyncResult<ManifestDiff> {
        self.require_state(RequesterState::ManifestRequested)?;
        let ContactsMessage::ResponseUidsTimestamps(remote) = ContactsMessage::from_packet(packet)?
        else {
            return Err(SyncError::Protocol(format!(
                "expected a manifest, got {}",
                packet.packet_type
            )));
        };

        let diff = diff(&self.cache.manifest(), &remote);
        info!(
            "Remote has {} contact(s): {} to fetch, {} deleted, {} unchanged",
            remote.len(),
            diff.to_fetch.len(),
            diff.deleted.len(),
            diff.unchanged.len()
        );
        self.pending = diff.to_fetch.clone();
        self.report.deleted = diff.deleted.clone();
        self.transition(RequesterState::ManifestReceived);
        Ok(diff)
    }

    /// Applies fetched vCards to the cache.
    ///
    /// Each cached timestamp is read from the vCard's own metadata. uids
    /// that were not requested are ignored; records whose metadata cannot
    /// be read, or names a different uid, are rejected.
    pub fn handle_vcards_response(&mut self, packet: &Packet) -> SyncResult<&SyncReport> {
        self.require_state(RequesterState::FetchRequested)?;
        let ContactsMessage::ResponseVCards(vcards) = ContactsMessage::from_packet(packet)? else {
            return Err(SyncError::Protocol(format!(
                "expected vCards, got {}",
                packet.packet_type
            )));
        };

        let mut updates = Vec::with_capacity(vcards.len());
        for (uid, text) in vcards {
            if !self.pending.contains(&uid) {
                warn!("Ignoring unrequested contact {}", uid);
                continue;
            }
            match vcard::extract_metadata(&text) {
                Ok(meta) if meta.uid == uid => updates.push((uid, text, meta.last_modified)),
                Ok(meta) => {
                    warn!("Rejecting {}: metadata names {}", uid, meta.uid);
                    self.report.rejected.insert(uid);
                }
                Err(e) => {
                    warn!("Rejecting {}: {}", uid, e);
                    self.report.rejected.insert(uid);
                }
            }
        }

        for (uid, text, timestamp) in updates {
            self.cache.insert(uid.clone(), text, timestamp);
            self.report.fetched.insert(uid);
        }
        self.report.missing = self
            .pending
            .iter()
            .filter(|uid| !self.report.fetched.contains(*uid) && !self.report.rejected.contains(*uid))
            .cloned()
            .collect();
        if !self.report.missing.is_empty() {
            warn!("{} requested contact(s) were not returned", self.report.missing.len());
        }

        self.pending.clear();
        self.transition(RequesterState::Complete);
        Ok(&self.report)
    }

    /// Abandons an unfinished sync. The cache keeps whatever was applied
    /// by earlier completed syncs.
    pub fn abort(&mut self) {
        if self.state != RequesterState::Idle {
            debug!("Aborting sync in state {}", self.state);
        }
        self.pending.clear();
        self.state = RequesterState::Idle;
    }

    /// Runs a full sync over `transport`. On error the requester returns to
    /// [`RequesterState::Idle`].
    pub async fn sync(&mut self, transport: &dyn PacketTransport) -> SyncResult<SyncReport> {
        let result = self.exchange(transport).await;
        if result.is_err() {
            self.abort();
        }
        result
    }

    async fn exchange(&mut self, transport: &dyn PacketTransport) -> SyncResult<SyncReport> {
        let request = self.request_manifest()?;
        let response = transport.send_request(request).await?;
        self.handle_manifest_response(&response)?;

        if let Some(request) = self.request_fetch()? {
            let response = transport.send_request(request).await?;
            self.handle_vcards_response(&response)?;
        }

        info!(
            "Sync complete: {} fetched, {} deleted, {} missing, {} rejected",
            self.report.fetched.len(),
            self.report.deleted.len(),
            self.report.missing.len(),
            self.report.rejected.len()
        );
        Ok(self.report.clone())
    }
}
