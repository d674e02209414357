//! Contacts protocol packets and message types.
//!
//! Every exchange is one request packet answered by one response packet:
//! 1. The requester asks for every uid with its last-modified timestamp
//! 2. The source answers with a manifest
//! 3. The requester asks for the vCards of the uids it is missing
//! 4. The source answers with finalized vCards for the uids it resolved
//!
//! Bodies are flat string-keyed JSON objects. Per-uid values are stored
//! under the uid itself, next to the reserved `uids` list.

use crate::error::{SyncError, SyncResult};
use contactsync_types::{Manifest, Uid, RESERVED_UIDS_KEY};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Asks the source for every uid and its last-modified timestamp.
pub const PACKET_TYPE_CONTACTS_REQUEST_ALL_UIDS_TIMESTAMPS: &str =
    "kdeconnect.contacts.request_all_uids_timestamps";

/// Carries `uids` plus one timestamp field per uid.
pub const PACKET_TYPE_CONTACTS_RESPONSE_UIDS_TIMESTAMPS: &str =
    "kdeconnect.contacts.response_uids_timestamps";

/// Asks for the vCards of the uids listed in `uids`.
pub const PACKET_TYPE_CONTACTS_REQUEST_VCARDS_BY_UIDS: &str =
    "kdeconnect.contacts.request_vcards_by_uid";

/// Carries `uids` (those actually resolved) plus one vCard field per uid.
pub const PACKET_TYPE_CONTACTS_RESPONSE_VCARDS: &str = "kdeconnect.contacts.response_vcards";

/// A packet on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Creation time in milliseconds since the Unix epoch.
    pub id: i64,
    #[serde(rename = "type")]
    pub packet_type: String,
    #[serde(default)]
    pub body: Map<String, Value>,
}

impl Packet {
    /// Creates an empty packet of the given type.
    pub fn new(packet_type: impl Into<String>) -> Self {
        Self {
            id: chrono::Utc::now().timestamp_millis(),
            packet_type: packet_type.into(),
            body: Map::new(),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.body.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.body.get(key).and_then(Value::as_i64)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.body.insert(key.into(), value.into());
    }

    /// Builder form of [`Packet::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Encodes the packet as a single newline-terminated JSON line.
    pub fn serialize(&self) -> SyncResult<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decodes a packet from one JSON line.
    pub fn deserialize(line: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(line.trim_end())?)
    }
}

/// Parses one entry of a `uids` list.
///
/// Strings and integers are accepted. Anything else, and strings that are
/// not valid uids, yield `None`.
fn uid_entry(value: &Value) -> Option<Uid> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        _ => return None,
    };
    Uid::parse(&raw).ok()
}

/// Reads the `uids` list of `packet`, dropping entries that do not parse.
///
/// Returns `None` if the field is missing or not a list.
fn uid_list(packet: &Packet) -> Option<Vec<Uid>> {
    let entries = packet.get(RESERVED_UIDS_KEY)?.as_array()?;
    let mut uids = Vec::with_capacity(entries.len());
    for entry in entries {
        match uid_entry(entry) {
            Some(uid) => uids.push(uid),
            None => warn!(
                "Dropping malformed uid {} from {}",
                entry, packet.packet_type
            ),
        }
    }
    Some(uids)
}

fn uids_value<'a>(uids: impl Iterator<Item = &'a Uid>) -> Value {
    Value::Array(uids.map(|uid| Value::String(uid.to_string())).collect())
}

/// The typed view of a contacts packet.
#[derive(Debug, Clone, PartialEq)]
pub enum ContactsMessage {
    RequestAllUidsTimestamps,
    ResponseUidsTimestamps(Manifest),
    RequestVCardsByUid(Vec<Uid>),
    ResponseVCards(BTreeMap<Uid, String>),
}

impl ContactsMessage {
    /// Packet types this crate understands.
    pub const ALL_PACKET_TYPES: [&'static str; 4] = [
        PACKET_TYPE_CONTACTS_REQUEST_ALL_UIDS_TIMESTAMPS,
        PACKET_TYPE_CONTACTS_RESPONSE_UIDS_TIMESTAMPS,
        PACKET_TYPE_CONTACTS_REQUEST_VCARDS_BY_UIDS,
        PACKET_TYPE_CONTACTS_RESPONSE_VCARDS,
    ];

    pub fn packet_type(&self) -> &'static str {
        match self {
            ContactsMessage::RequestAllUidsTimestamps => {
                PACKET_TYPE_CONTACTS_REQUEST_ALL_UIDS_TIMESTAMPS
            }
            ContactsMessage::ResponseUidsTimestamps(_) => {
                PACKET_TYPE_CONTACTS_RESPONSE_UIDS_TIMESTAMPS
            }
            ContactsMessage::RequestVCardsByUid(_) => PACKET_TYPE_CONTACTS_REQUEST_VCARDS_BY_UIDS,
            ContactsMessage::ResponseVCards(_) => PACKET_TYPE_CONTACTS_RESPONSE_VCARDS,
        }
    }

    pub fn into_packet(self) -> Packet {
        let mut packet = Packet::new(self.packet_type());
        match self {
            ContactsMessage::RequestAllUidsTimestamps => {}
            ContactsMessage::ResponseUidsTimestamps(manifest) => {
                packet.set(RESERVED_UIDS_KEY, uids_value(manifest.uids()));
                for (uid, ts) in manifest.iter() {
                    packet.set(uid.as_str(), ts);
                }
            }
            ContactsMessage::RequestVCardsByUid(uids) => {
                packet.set(RESERVED_UIDS_KEY, uids_value(uids.iter()));
            }
            ContactsMessage::ResponseVCards(vcards) => {
                packet.set(RESERVED_UIDS_KEY, uids_value(vcards.keys()));
                for (uid, vcard) in vcards {
                    packet.set(uid.to_string(), vcard);
                }
            }
        }
        packet
    }

    /// Decodes a packet.
    ///
    /// A request missing its required fields is a
    /// [`SyncError::MalformedRequest`]; a response missing them is a
    /// [`SyncError::Protocol`] error. Individual uid entries that fail to
    /// parse, or whose per-uid field is missing or mistyped, are dropped
    /// with a warning.
    pub fn from_packet(packet: &Packet) -> SyncResult<Self> {
        match packet.packet_type.as_str() {
            PACKET_TYPE_CONTACTS_REQUEST_ALL_UIDS_TIMESTAMPS => {
                Ok(ContactsMessage::RequestAllUidsTimestamps)
            }
            PACKET_TYPE_CONTACTS_REQUEST_VCARDS_BY_UIDS => {
                let uids = uid_list(packet).ok_or_else(|| {
                    SyncError::MalformedRequest(format!(
                        "{} without a {} list",
                        packet.packet_type, RESERVED_UIDS_KEY
                    ))
                })?;
                Ok(ContactsMessage::RequestVCardsByUid(uids))
            }
            PACKET_TYPE_CONTACTS_RESPONSE_UIDS_TIMESTAMPS => {
                let uids = response_uids(packet)?;
                let mut manifest = Manifest::new();
                for uid in uids {
                    match packet.get_i64(uid.as_str()) {
                        Some(ts) => manifest.observe(uid, ts),
                        None => warn!("Dropping {}: no timestamp in {}", uid, packet.packet_type),
                    }
                }
                Ok(ContactsMessage::ResponseUidsTimestamps(manifest))
            }
            PACKET_TYPE_CONTACTS_RESPONSE_VCARDS => {
                let uids = response_uids(packet)?;
                let mut vcards = BTreeMap::new();
                for uid in uids {
                    match packet.get_str(uid.as_str()) {
                        Some(vcard) => {
                            vcards.insert(uid, vcard.to_string());
                        }
                        None => warn!("Dropping {}: no vCard in {}", uid, packet.packet_type),
                    }
                }
                Ok(ContactsMessage::ResponseVCards(vcards))
            }
            other => Err(SyncError::UnsupportedMessageType(other.to_string())),
        }
    }
}

fn response_uids(packet: &Packet) -> SyncResult<Vec<Uid>> {
    uid_list(packet).ok_or_else(|| {
        SyncError::Protocol(format!(
            "{} without a {} list",
            packet.packet_type, RESERVED_UIDS_KEY
        ))
    })
}

impl From<ContactsMessage> for Packet {
    fn from(message: ContactsMessage) -> Self {
        message.into_packet()
    }
}
