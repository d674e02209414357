//! Caller-id style lookup of a contact by phone number.

use crate::error::SourceResult;
use crate::projection::{read_cell, Projection};
use crate::source::Query;
use base64::{engine::general_purpose::STANDARD, Engine};
use contactsync_types::ColumnValue;
use serde::Serialize;
use std::ops::ControlFlow;
use tracing::warn;

/// Where a contact's photo can be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Photo {
    /// The source stores a reference to the photo.
    Uri(String),
    /// The photo bytes, Base64 encoded.
    Base64(String),
}

/// Name and photo of the contact owning a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneLookup {
    pub name: Option<String>,
    pub photo: Option<Photo>,
}

/// Reduces a phone number to its digits, keeping a leading `+`.
pub fn normalize_number(number: &str) -> String {
    let trimmed = number.trim();
    let mut out = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        out.push('+');
    }
    out.extend(trimmed.chars().filter(char::is_ascii_digit));
    out
}

impl Projection<'_> {
    /// Looks up the contact owning `number` in the phone table.
    ///
    /// Numbers are compared after [`normalize_number`]. Only the first
    /// matching row is used, even when it carries neither a name nor a
    /// photo; later rows for the same number are not consulted. Returns
    /// `None` if nothing matches or the first match is empty.
    pub fn phone_number_lookup(&self, number: &str) -> SourceResult<Option<PhoneLookup>> {
        let wanted = normalize_number(number);
        if wanted.is_empty() || wanted == "+" {
            return Ok(None);
        }

        let schema = self.schema;
        let query = Query::new(
            &schema.phone_table,
            vec![
                schema.phone_number_column.clone(),
                schema.display_name_column.clone(),
                schema.photo_column.clone(),
            ],
        );

        let mut found = None;
        self.source.scan(&query, &mut |row| {
            let number = match read_cell(row, &schema.phone_number_column) {
                Ok(ColumnValue::Text(s)) => s,
                Ok(ColumnValue::Integer(i)) => i.to_string(),
                _ => return ControlFlow::Continue(()),
            };
            if normalize_number(&number) != wanted {
                return ControlFlow::Continue(());
            }

            let name = match read_cell(row, &schema.display_name_column) {
                Ok(ColumnValue::Text(s)) => Some(s),
                Ok(_) => None,
                Err(e) => {
                    warn!("Ignoring display name of {}: {}", wanted, e);
                    None
                }
            };
            let photo = match read_cell(row, &schema.photo_column) {
                Ok(ColumnValue::Text(uri)) if !uri.is_empty() => Some(Photo::Uri(uri)),
                Ok(ColumnValue::Blob(bytes)) if !bytes.is_empty() => {
                    Some(Photo::Base64(STANDARD.encode(bytes)))
                }
                Ok(_) => None,
                Err(e) => {
                    warn!("Ignoring photo of {}: {}", wanted, e);
                    None
                }
            };
            found = Some(PhoneLookup { name, photo });
            ControlFlow::Break(())
        })?;

        Ok(found.filter(|hit| hit.name.is_some() || hit.photo.is_some()))
    }
}
