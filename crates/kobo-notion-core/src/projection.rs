//! Grouping of local records into remote documents.
//!
//! Every record belongs to the group named by the title derived from its
//! volume identifier. Kobo sideloaded books carry a `file://` URL
//! (`file:///mnt/onboard/Folder/My Book.epub`); store books carry an opaque
//! id, which degrades to itself as the title.

use std::collections::BTreeMap;

use crate::models::BookmarkRecord;

const FILE_SCHEME: &str = "file://";

/// Title used when a volume identifier yields nothing printable. Remote
/// documents without a title are invisible to the index, so every group
/// needs a non-blank one.
pub const UNTITLED: &str = "Untitled";

/// Records partitioned by derived title; members keep source order.
pub type GroupedRecords = BTreeMap<String, Vec<BookmarkRecord>>;

/// Derive the human-readable group title from a volume identifier.
///
/// Strips the `file://` prefix, percent-decodes, takes the last non-empty
/// path segment and drops its extension. Blank results become
/// [`UNTITLED`]. Never fails.
pub fn title_from_volume_id(volume_id: &str) -> String {
    let path = volume_id.strip_prefix(FILE_SCHEME).unwrap_or(volume_id);
    let path = percent_decode(path);

    let basename = path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(path.as_str());

    let title = match basename.rfind('.') {
        Some(pos) if pos > 0 => &basename[..pos],
        _ => basename,
    };
    if title.trim().is_empty() {
        UNTITLED.to_string()
    } else {
        title.to_string()
    }
}

/// Partition records by derived title.
pub fn group_by_title(records: &[BookmarkRecord]) -> GroupedRecords {
    let mut groups = GroupedRecords::new();
    for record in records {
        groups
            .entry(title_from_volume_id(&record.volume_id))
            .or_default()
            .push(record.clone());
    }
    groups
}

/// Decode `%XX` escapes. Malformed escapes are kept verbatim and invalid
/// UTF-8 is replaced.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
