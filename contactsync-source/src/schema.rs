//! Table and column names of the contact book.

use serde::{Deserialize, Serialize};

/// Names the contact tables and the columns the sync core reads.
///
/// The defaults follow the platform contacts provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactsSchema {
    /// Logical contacts, one or more rows per identity.
    pub table: String,
    /// Column whose value is the contact identity. Shared by every row of a
    /// merge group.
    pub lookup_column: String,
    /// Last-modified timestamp of the row.
    pub timestamp_column: String,
    /// Serialized record (vCard text) of the row.
    pub vcard_column: String,
    /// Phone numbers, one row per (contact, number).
    pub phone_table: String,
    pub phone_number_column: String,
    pub display_name_column: String,
    /// Photo bytes, or a URI to the photo.
    pub photo_column: String,
}

impl Default for ContactsSchema {
    fn default() -> Self {
        Self {
            table: "contacts".to_string(),
            lookup_column: "lookup".to_string(),
            timestamp_column: "contact_last_updated_timestamp".to_string(),
            vcard_column: "vcard".to_string(),
            phone_table: "phone_lookup".to_string(),
            phone_number_column: "number".to_string(),
            display_name_column: "display_name".to_string(),
            photo_column: "photo".to_string(),
        }
    }
}
