//! Core data models used throughout kobo-notion.
//!
//! These types represent the local bookmark records, the fragments rendered
//! from them, the remote entities they are reconciled against, and the
//! report a run produces.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ErrorKind;

/// Remote schema property names shared by the identity index and the
/// HTTP client.
pub mod props {
    /// Title property holding the derived book title.
    pub const BOOK_TITLE: &str = "Book Title";
    /// Rich-text copy of the book title.
    pub const BOOK_NAME: &str = "Book Name";
    /// Date property set from the first member's creation time.
    pub const DATE_CREATED: &str = "Date Created";
    /// Rich-text property listing bookmark ids already synced.
    pub const BOOKMARK_ID: &str = "Bookmark ID";
}

/// One annotation read from the local device database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkRecord {
    pub id: String,
    /// Path-like volume identifier the group title is derived from.
    pub volume_id: String,
    /// Highlighted text; may be empty.
    pub text: String,
    /// User note; may be empty.
    pub annotation: String,
    pub kind: String,
    /// ISO-8601-ish timestamp, possibly without a zone suffix.
    pub created_at: String,
    /// Palette key, see [`crate::render::color_for`].
    pub color: String,
}

impl BookmarkRecord {
    /// True when the record has neither highlighted text nor a note.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.annotation.is_empty()
    }
}

/// Text color of a styled run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    #[default]
    Default,
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    Brown,
}

impl Color {
    /// Wire name used by the remote store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Default => "default",
            Color::Red => "red",
            Color::Orange => "orange",
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Purple => "purple",
            Color::Pink => "pink",
            Color::Brown => "brown",
        }
    }
}

/// A styled run of text inside a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub content: String,
    pub bold: bool,
    pub color: Color,
}

impl TextRun {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            bold: false,
            color: Color::Default,
        }
    }
}

/// A renderable content block: one quote made of styled runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub runs: Vec<TextRun>,
}

impl Fragment {
    /// Concatenated plain text of all runs.
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.content.as_str()).collect()
    }
}

/// A child fragment as listed from the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingFragment {
    pub id: String,
    /// Remote block type (e.g. `"quote"`, `"paragraph"`).
    pub kind: String,
    /// Concatenated plain text of the block's text runs.
    pub plain_text: String,
}

/// A typed value from a remote item's property bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Title segments, plain text.
    Title(Vec<String>),
    /// Rich-text segments, plain text.
    RichText(Vec<String>),
    /// Date start, as sent by the store.
    Date(Option<String>),
    /// Any property type the engine does not read.
    Other,
}

/// One entry from the remote collection listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteItem {
    pub id: String,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl RemoteItem {
    /// First title segment of `name`, if that property is a non-empty title.
    pub fn title(&self, name: &str) -> Option<&str> {
        match self.properties.get(name) {
            Some(PropertyValue::Title(segments)) => segments.first().map(String::as_str),
            _ => None,
        }
    }

    /// All rich-text segments of `name`; empty for other property types.
    pub fn rich_text(&self, name: &str) -> &[String] {
        match self.properties.get(name) {
            Some(PropertyValue::RichText(segments)) => segments,
            _ => &[],
        }
    }
}

/// Payload for creating a remote document.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub children: Vec<Fragment>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Cursor for the next request, or `None` when the listing is done.
    ///
    /// A page that declares more results but carries no usable cursor is
    /// terminal.
    pub fn continuation(&self) -> Option<&str> {
        match self.next_cursor.as_deref() {
            Some(cursor) if self.has_more && !cursor.is_empty() => Some(cursor),
            _ => None,
        }
    }
}

/// An isolated failure recorded against one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupFailure {
    pub title: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Summary of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub created: usize,
    /// Existing documents with at least one successful append or delete.
    pub updated: usize,
    pub unchanged: usize,
    pub archived: usize,
    pub fragments_added: usize,
    pub fragments_removed: usize,
    /// Local records whose id the remote side has not seen.
    pub new_bookmarks: usize,
    pub errors: Vec<GroupFailure>,
}

impl RunReport {
    pub(crate) fn fail(&mut self, title: &str, kind: ErrorKind, message: impl Into<String>) {
        self.errors.push(GroupFailure {
            title: title.to_string(),
            kind,
            message: message.into(),
        });
    }
}
