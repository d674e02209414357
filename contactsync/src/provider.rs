//! Source-side request handling.
//!
//! The provider is stateless: every request reads the contact source
//! afresh and nothing is kept between requests. Source reads run on the
//! blocking pool.

use crate::config::ContactsConfig;
use crate::dispatcher::PacketHandler;
use crate::error::{SyncError, SyncResult};
use crate::protocol::{
    ContactsMessage, Packet, PACKET_TYPE_CONTACTS_REQUEST_ALL_UIDS_TIMESTAMPS,
    PACKET_TYPE_CONTACTS_REQUEST_VCARDS_BY_UIDS, PACKET_TYPE_CONTACTS_RESPONSE_UIDS_TIMESTAMPS,
    PACKET_TYPE_CONTACTS_RESPONSE_VCARDS,
};
use crate::vcard;
use async_trait::async_trait;
use contactsync_source::{ContactsAccess, Projection, SourceError, TabularSource};
use contactsync_types::{ColumnValue, Manifest, Uid};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SUPPORTED: &[&str] = &[
    PACKET_TYPE_CONTACTS_REQUEST_ALL_UIDS_TIMESTAMPS,
    PACKET_TYPE_CONTACTS_REQUEST_VCARDS_BY_UIDS,
];

const OUTGOING: &[&str] = &[
    PACKET_TYPE_CONTACTS_RESPONSE_UIDS_TIMESTAMPS,
    PACKET_TYPE_CONTACTS_RESPONSE_VCARDS,
];

/// Answers manifest and vCard requests from a local contact source.
pub struct ContactsProvider {
    source: Arc<dyn TabularSource>,
    access: ContactsAccess,
    config: ContactsConfig,
}

impl ContactsProvider {
    pub fn new(
        source: Arc<dyn TabularSource>,
        access: ContactsAccess,
        config: ContactsConfig,
    ) -> Self {
        Self {
            source,
            access,
            config,
        }
    }

    pub fn config(&self) -> &ContactsConfig {
        &self.config
    }

    /// Runs `read` against a capability-checked projection on the blocking
    /// pool.
    async fn read<T, F>(&self, read: F) -> SyncResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Projection<'_>) -> SyncResult<T> + Send + 'static,
    {
        let source = self.source.clone();
        let access = self.access.clone();
        let schema = self.config.schema.clone();
        tokio::task::spawn_blocking(move || {
            let projection = Projection::new(source.as_ref(), &access, &schema)?;
            read(&projection)
        })
        .await
        .map_err(|e| SyncError::Source(SourceError::Query(format!("source read failed: {e}"))))?
    }

    /// Builds the manifest of every contact in the source.
    pub async fn manifest(&self) -> SyncResult<Manifest> {
        let manifest = self
            .read(|projection| Ok(projection.manifest(None)?))
            .await?;
        info!("Serving manifest of {} contact(s)", manifest.len());
        Ok(manifest)
    }

    /// Builds finalized vCards for `uids`.
    ///
    /// The result only holds uids that were found and finalized; the rest
    /// are logged and left out.
    pub async fn vcards(&self, uids: Vec<Uid>) -> SyncResult<BTreeMap<Uid, String>> {
        let requested = uids.len();
        let device_id = self.config.device_id.clone();
        let vcard_column = self.config.schema.vcard_column.clone();
        let wanted: HashSet<Uid> = uids.into_iter().collect();

        let vcards = self
            .read(move |projection| {
                let manifest = projection.manifest(Some(&wanted))?;
                let records = projection.project(Some(&wanted), &[vcard_column.as_str()])?;

                let mut vcards = BTreeMap::new();
                for (uid, record) in records {
                    let raw = match record.get(&vcard_column) {
                        Some(ColumnValue::Text(text)) => text.clone(),
                        Some(ColumnValue::Blob(bytes)) => match String::from_utf8(bytes.clone()) {
                            Ok(text) => text,
                            Err(_) => {
                                warn!("Skipping {}: vCard is not UTF-8", uid);
                                continue;
                            }
                        },
                        _ => {
                            warn!("Skipping {}: no vCard", uid);
                            continue;
                        }
                    };
                    let Some(timestamp) = manifest.get(&uid) else {
                        warn!("Skipping {}: no timestamp", uid);
                        continue;
                    };
                    match vcard::finalize(&raw, &device_id, &uid, timestamp) {
                        Ok(finalized) => {
                            vcards.insert(uid, finalized);
                        }
                        Err(e) => warn!("Skipping {}: {}", uid, e),
                    }
                }
                Ok(vcards)
            })
            .await?;

        debug!("Resolved {} of {} requested vCard(s)", vcards.len(), requested);
        Ok(vcards)
    }
}

#[async_trait]
impl PacketHandler for ContactsProvider {
    fn supported_packet_types(&self) -> &'static [&'static str] {
        SUPPORTED
    }

    fn outgoing_packet_types(&self) -> &'static [&'static str] {
        OUTGOING
    }

    async fn on_packet(&self, packet: &Packet) -> SyncResult<Packet> {
        let response = match ContactsMessage::from_packet(packet)? {
            ContactsMessage::RequestAllUidsTimestamps => {
                ContactsMessage::ResponseUidsTimestamps(self.manifest().await?)
            }
            ContactsMessage::RequestVCardsByUid(uids) => {
                ContactsMessage::ResponseVCards(self.vcards(uids).await?)
            }
            _ => return Err(SyncError::UnsupportedMessageType(packet.packet_type.clone())),
        };
        Ok(response.into_packet())
    }
}
