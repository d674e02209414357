//! Finalizing vCard text blocks with sync metadata.
//!
//! The body of a record is opaque. The builder only locates the end marker
//! and inserts two namespaced lines right before it:
//!
//! ```text
//! X-KDECONNECT-ID-DEV-<device id>:<uid>
//! X-KDECONNECT-TIMESTAMP:<last modified>
//! END:VCARD
//! ```
//!
//! Metadata lines already present are stripped first, so finalizing a
//! finalized record regenerates its metadata instead of stacking it.

use crate::error::{SyncError, SyncResult};
use contactsync_types::{DeviceId, Uid};

/// The line terminating every record.
pub const VCARD_END: &str = "END:VCARD";

const DEVICE_PREFIX: &str = "X-KDECONNECT-ID-DEV-";
const TIMESTAMP_PREFIX: &str = "X-KDECONNECT-TIMESTAMP:";

/// Metadata read back from a finalized record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncMetadata {
    pub origin_device_id: DeviceId,
    pub uid: Uid,
    pub last_modified: i64,
}

/// Where the end marker sits in a record.
struct Layout<'a> {
    /// Everything before the end marker line.
    head: &'a str,
    /// Line ending used by the record.
    eol: &'static str,
}

fn line_content(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// A line starting with whitespace folds into the previous one, so only
/// trailing whitespace is tolerated.
fn is_end_marker(line: &str) -> bool {
    line_content(line).trim_end().eq_ignore_ascii_case(VCARD_END)
}

fn is_metadata(line: &str) -> bool {
    let line = line_content(line);
    line.starts_with(DEVICE_PREFIX) || line.starts_with(TIMESTAMP_PREFIX)
}

fn layout(text: &str) -> SyncResult<Layout<'_>> {
    let mut marker_at = None;
    let mut markers = 0usize;
    let mut trailing_content = false;
    let mut offset = 0usize;

    for line in text.split_inclusive('\n') {
        if is_end_marker(line) {
            markers += 1;
            marker_at = Some(offset);
            trailing_content = false;
        } else if marker_at.is_some() && !line.trim().is_empty() {
            trailing_content = true;
        }
        offset += line.len();
    }

    let Some(at) = marker_at else {
        return Err(SyncError::MalformedRecord(format!("no {VCARD_END} line")));
    };
    if markers > 1 {
        return Err(SyncError::MalformedRecord(format!(
            "{markers} {VCARD_END} lines"
        )));
    }
    if trailing_content {
        return Err(SyncError::MalformedRecord(format!(
            "content after {VCARD_END}"
        )));
    }

    let eol = if text.contains("\r\n") { "\r\n" } else { "\n" };
    Ok(Layout {
        head: &text[..at],
        eol,
    })
}

/// Byte offset at which metadata lines are inserted: the start of the end
/// marker line.
pub fn insertion_point(text: &str) -> SyncResult<usize> {
    Ok(layout(text)?.head.len())
}

/// The body of a record without the end marker and without sync metadata.
pub fn strip_metadata(text: &str) -> SyncResult<String> {
    let head = layout(text)?.head;
    Ok(head
        .split_inclusive('\n')
        .filter(|line| !is_metadata(line))
        .collect())
}

/// Appends sync metadata to `raw` and terminates it with the end marker.
///
/// Fails with [`SyncError::MalformedRecord`] unless `raw` has exactly one
/// end marker line and nothing but blank lines after it.
pub fn finalize(
    raw: &str,
    device_id: &DeviceId,
    uid: &Uid,
    last_modified: i64,
) -> SyncResult<String> {
    let Layout { head, eol } = layout(raw)?;

    let mut out = String::with_capacity(raw.len() + 96);
    for line in head.split_inclusive('\n').filter(|line| !is_metadata(line)) {
        out.push_str(line);
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(eol);
    }
    out.push_str(DEVICE_PREFIX);
    out.push_str(device_id.as_str());
    out.push(':');
    out.push_str(uid.as_str());
    out.push_str(eol);
    out.push_str(TIMESTAMP_PREFIX);
    out.push_str(&last_modified.to_string());
    out.push_str(eol);
    out.push_str(VCARD_END);
    Ok(out)
}

/// Reads the metadata lines back from a finalized record.
pub fn extract_metadata(text: &str) -> SyncResult<SyncMetadata> {
    let head = layout(text)?.head;

    let mut origin = None;
    let mut last_modified = None;
    for line in head.split_inclusive('\n').map(line_content) {
        if let Some(rest) = line.strip_prefix(DEVICE_PREFIX) {
            origin = Some(rest);
        } else if let Some(rest) = line.strip_prefix(TIMESTAMP_PREFIX) {
            last_modified = Some(rest);
        }
    }

    let origin = origin
        .ok_or_else(|| SyncError::MalformedRecord("no device metadata line".into()))?;
    let (device, uid) = origin
        .split_once(':')
        .ok_or_else(|| SyncError::MalformedRecord(format!("bad device line: {origin}")))?;
    let origin_device_id = DeviceId::parse(device)
        .map_err(|e| SyncError::MalformedRecord(e.to_string()))?;
    let uid = Uid::parse(uid).map_err(|e| SyncError::MalformedRecord(e.to_string()))?;

    let last_modified = last_modified
        .ok_or_else(|| SyncError::MalformedRecord("no timestamp metadata line".into()))?;
    let last_modified = last_modified.trim().parse().map_err(|_| {
        SyncError::MalformedRecord(format!("bad timestamp: {last_modified}"))
    })?;

    Ok(SyncMetadata {
        origin_device_id,
        uid,
        last_modified,
    })
}
