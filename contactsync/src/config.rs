//! Sync configuration.

use crate::error::SyncResult;
use contactsync_source::ContactsSchema;
use contactsync_types::DeviceId;
use serde::{Deserialize, Serialize};

/// Configuration shared by the source and requester roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactsConfig {
    /// Identifier of this device, written into every record it sends.
    pub device_id: DeviceId,
    /// Where contacts live in the local source.
    pub schema: ContactsSchema,
}

impl ContactsConfig {
    pub fn new(device_id: DeviceId) -> Self {
        Self {
            device_id,
            schema: ContactsSchema::default(),
        }
    }

    pub fn with_schema(mut self, schema: ContactsSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Loads a configuration from a JSON document. Missing fields take
    /// their defaults.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
