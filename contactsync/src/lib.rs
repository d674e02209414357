//! Incremental contact book sync between paired devices.
//!
//! One device (the source) serves its contacts; the other (the requester)
//! asks for a uid and timestamp manifest, diffs it against its cache and
//! pulls full vCards only for contacts it lacks or that changed.
//!
//! # Architecture
//!
//! - **Protocol**: packet types and the typed [`ContactsMessage`] view
//! - **vCard**: appending and reading back sync metadata
//! - **Reconcile**: manifest diffing
//! - **Provider**: the stateless source-side handler
//! - **Requester**: the requester state machine and its cache
//! - **Dispatcher** / **Service**: routing inbound packets to handlers
//! - **Transport**: the seam to the pairing and framing layer
//!
//! Reading the contact table itself lives in `contactsync-source`.
//!
//! # Example
//!
//! ```
//! use contactsync::{vcard, ContactsConfig};
//! use contactsync_types::Uid;
//!
//! let config = ContactsConfig::default();
//! let uid = Uid::parse("alice").unwrap();
//! let card = vcard::finalize(
//!     "BEGIN:VCARD\nFN:Alice\nEND:VCARD\n",
//!     &config.device_id,
//!     &uid,
//!     100,
//! )
//! .unwrap();
//! assert!(card.ends_with("X-KDECONNECT-TIMESTAMP:100\nEND:VCARD"));
//! ```

mod config;
mod dispatcher;
mod error;
pub mod protocol;
mod provider;
pub mod reconcile;
mod requester;
mod service;
pub mod state;
pub mod transport;
pub mod vcard;

pub use config::ContactsConfig;
pub use dispatcher::{Dispatcher, PacketHandler};
pub use error::{SyncError, SyncResult};
pub use protocol::{
    ContactsMessage, Packet, PACKET_TYPE_CONTACTS_REQUEST_ALL_UIDS_TIMESTAMPS,
    PACKET_TYPE_CONTACTS_REQUEST_VCARDS_BY_UIDS, PACKET_TYPE_CONTACTS_RESPONSE_UIDS_TIMESTAMPS,
    PACKET_TYPE_CONTACTS_RESPONSE_VCARDS,
};
pub use provider::ContactsProvider;
pub use reconcile::{diff, ManifestDiff};
pub use requester::{ContactsRequester, SyncReport};
pub use service::ContactsService;
pub use state::{CachedContact, ContactCache, RequesterState};
pub use transport::{IncomingPacket, PacketTransport, ResponseToken};
pub use vcard::{SyncMetadata, VCARD_END};
