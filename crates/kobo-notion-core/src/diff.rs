//! Fragment differ.
//!
//! Compares a group's desired content against the fragments already on its
//! remote document. There is no persisted fragment-to-record mapping:
//! content counts as present when an existing fragment's plain text
//! contains it as a substring.
//!
//! Diffing is per field. A record whose highlight is already synced can
//! still contribute its (new) annotation, and vice versa.

use crate::models::{BookmarkRecord, ExistingFragment, Fragment};
use crate::render::{render_field, Field};

/// Result of diffing one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentDiff {
    /// New fragments, in member order, highlight before annotation.
    pub to_add: Vec<Fragment>,
    /// Stale fragments, in listing order.
    pub to_remove: Vec<ExistingFragment>,
}

impl FragmentDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Compute the add and remove sets for one group.
pub fn diff(existing: &[ExistingFragment], members: &[BookmarkRecord]) -> FragmentDiff {
    let mut to_add = Vec::new();
    for member in members {
        for field in [Field::Highlight, Field::Annotation] {
            let text = field.text(member);
            if text.is_empty() || contained_in_any(text, existing) {
                continue;
            }
            if let Some(fragment) = render_field(member, field) {
                to_add.push(fragment);
            }
        }
    }

    let to_remove = existing
        .iter()
        .filter(|fragment| !mentions_any_member(&fragment.plain_text, members))
        .cloned()
        .collect();

    FragmentDiff { to_add, to_remove }
}

fn contained_in_any(text: &str, existing: &[ExistingFragment]) -> bool {
    existing.iter().any(|f| f.plain_text.contains(text))
}

fn mentions_any_member(plain_text: &str, members: &[BookmarkRecord]) -> bool {
    members.iter().any(|m| {
        (!m.text.is_empty() && plain_text.contains(&m.text))
            || (!m.annotation.is_empty() && plain_text.contains(&m.annotation))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_fragments;

    fn record(id: &str, text: &str, annotation: &str) -> BookmarkRecord {
        BookmarkRecord {
            id: id.to_string(),
            text: text.to_string(),
            annotation: annotation.to_string(),
            ..Default::default()
        }
    }

    /// Fragments as they would be listed after syncing `records`.
    fn synced(records: &[BookmarkRecord]) -> Vec<ExistingFragment> {
        records
            .iter()
            .flat_map(render_fragments)
            .enumerate()
            .map(|(i, f)| ExistingFragment {
                id: format!("block-{}", i),
                kind: "quote".to_string(),
                plain_text: f.plain_text(),
            })
            .collect()
    }

    #[test]
    fn test_nothing_existing_adds_everything_in_order() {
        let members = vec![record("1", "alpha", "note a"), record("2", "beta", "")];
        let d = diff(&[], &members);
        let texts: Vec<String> = d.to_add.iter().map(Fragment::plain_text).collect();
        assert_eq!(
            texts,
            vec![
                "Highlighted Text\nalpha",
                "Annotation\nnote a",
                "Highlighted Text\nbeta"
            ]
        );
        assert!(d.to_remove.is_empty());
    }

    #[test]
    fn test_synced_group_is_a_no_op() {
        let members = vec![record("1", "alpha", "note a"), record("2", "", "note b")];
        let d = diff(&synced(&members), &members);
        assert!(d.is_empty(), "{:?}", d);
    }

    #[test]
    fn test_per_field_add() {
        let before = vec![record("1", "alpha", "")];
        let after = vec![record("1", "alpha", "added later")];
        let d = diff(&synced(&before), &after);
        assert_eq!(d.to_add.len(), 1);
        assert_eq!(d.to_add[0].plain_text(), "Annotation\nadded later");
        assert!(d.to_remove.is_empty());
    }

    #[test]
    fn test_deleted_bookmark_is_pruned() {
        let before = vec![record("1", "alpha", ""), record("2", "beta", "beta note")];
        let existing = synced(&before);
        let after = vec![record("1", "alpha", "")];

        let d = diff(&existing, &after);
        assert!(d.to_add.is_empty());
        let removed: Vec<&str> = d.to_remove.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(removed, vec!["block-1", "block-2"]);
    }

    #[test]
    fn test_foreign_fragment_without_member_text_is_removed() {
        let members = vec![record("1", "alpha", "")];
        let mut existing = synced(&members);
        existing.insert(
            0,
            ExistingFragment {
                id: "manual".to_string(),
                kind: "paragraph".to_string(),
                plain_text: "something typed by hand".to_string(),
            },
        );
        let d = diff(&existing, &members);
        assert_eq!(d.to_remove.len(), 1);
        assert_eq!(d.to_remove[0].id, "manual");
    }

    /// Containment is substring-based: a new highlight that happens to be a
    /// substring of an existing one is considered already present. This
    /// mirrors the absence of stable fragment ids and is kept deliberately.
    #[test]
    fn containment_dedup_treats_substring_as_present() {
        let existing = synced(&[record("1", "the quick brown fox", "")]);
        let members = vec![record("1", "the quick brown fox", ""), record("2", "quick", "")];
        let d = diff(&existing, &members);
        assert!(d.to_add.is_empty());
    }

    #[test]
    fn test_empty_group_removes_everything() {
        let existing = synced(&[record("1", "alpha", "")]);
        let d = diff(&existing, &[]);
        assert_eq!(d.to_remove.len(), 1);
    }
}
