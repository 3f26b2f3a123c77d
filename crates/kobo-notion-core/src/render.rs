//! Fragment rendering.
//!
//! Each non-empty field of a [`BookmarkRecord`] becomes one quote fragment:
//!
//! ```text
//! ┌ quote ───────────────────────────────────────────┐
//! │ **Highlighted Text** (palette color)             │
//! │ \n                                               │
//! │ chunk 0 │ chunk 1 │ … (≤ 2000 chars each)         │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Remote stores cap a single text run's length, so long highlights are
//! split into consecutive runs. Concatenating a fragment's runs gives back
//! the label, a newline, and the field's full text, which is what the differ's
//! containment checks rely on.

use crate::models::{BookmarkRecord, Color, Fragment, TextRun};

/// Maximum Unicode scalar values per text run.
pub const MAX_CHUNK_CHARS: usize = 2000;

pub const HIGHLIGHT_LABEL: &str = "Highlighted Text";
pub const ANNOTATION_LABEL: &str = "Annotation";

/// Which field of a record a fragment was rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Highlight,
    Annotation,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::Highlight => HIGHLIGHT_LABEL,
            Field::Annotation => ANNOTATION_LABEL,
        }
    }

    /// The field's text on `record`.
    pub fn text<'a>(&self, record: &'a BookmarkRecord) -> &'a str {
        match self {
            Field::Highlight => &record.text,
            Field::Annotation => &record.annotation,
        }
    }
}

/// Look up a palette key. Unknown keys get the default color.
pub fn color_for(key: &str) -> Color {
    match key {
        "0" => Color::Red,
        "1" => Color::Orange,
        "2" => Color::Yellow,
        "3" => Color::Green,
        "4" => Color::Blue,
        "5" => Color::Purple,
        "6" => Color::Pink,
        "7" => Color::Brown,
        _ => Color::Default,
    }
}

/// Split `text` into chunks of at most `max_chars` chars, in order.
///
/// Returns no chunks for empty text or a zero limit.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Render one field of a record, or `None` if the field is empty.
pub fn render_field(record: &BookmarkRecord, field: Field) -> Option<Fragment> {
    let text = field.text(record);
    if text.is_empty() {
        return None;
    }

    let mut runs = vec![
        TextRun {
            content: field.label().to_string(),
            bold: true,
            color: color_for(&record.color),
        },
        TextRun::plain("\n"),
    ];
    runs.extend(
        split_text(text, MAX_CHUNK_CHARS)
            .into_iter()
            .map(TextRun::plain),
    );

    Some(Fragment { runs })
}

/// Render all fragments for a record: highlight first, then annotation.
pub fn render_fragments(record: &BookmarkRecord) -> Vec<Fragment> {
    [Field::Highlight, Field::Annotation]
        .into_iter()
        .filter_map(|field| render_field(record, field))
        .collect()
}
