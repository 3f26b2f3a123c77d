//! Identity index.
//!
//! Built once per run by walking the whole remote collection. It answers
//! two questions during reconciliation: which bookmark ids the remote side
//! has already seen, and which remote document (if any) owns a title.

use std::collections::{BTreeMap, HashSet};

use crate::error::SyncError;
use crate::models::{props, BookmarkRecord};
use crate::store::RemoteStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityIndex {
    pub known_bookmark_ids: HashSet<String>,
    pub documents_by_title: BTreeMap<String, String>,
}

impl IdentityIndex {
    /// Records whose id is not yet known remotely, in input order.
    pub fn filter_new<'a>(&self, records: &'a [BookmarkRecord]) -> Vec<&'a BookmarkRecord> {
        records
            .iter()
            .filter(|r| !self.known_bookmark_ids.contains(&r.id))
            .collect()
    }

    pub fn document_for(&self, title: &str) -> Option<&str> {
        self.documents_by_title.get(title).map(String::as_str)
    }
}

/// Walk every page of the remote collection and build the index.
///
/// Any failed page aborts the build; nothing is retried here.
pub async fn build_index(store: &dyn RemoteStore) -> Result<IdentityIndex, SyncError> {
    let mut index = IdentityIndex::default();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = store
            .query_collection(cursor.as_deref())
            .await
            .map_err(SyncError::RemoteQuery)?;
        pages += 1;

        for item in &page.items {
            for id in item.rich_text(props::BOOKMARK_ID) {
                if !id.is_empty() {
                    index.known_bookmark_ids.insert(id.clone());
                }
            }

            let title = match item.title(props::BOOK_TITLE) {
                Some(t) if !t.is_empty() => t,
                _ => {
                    tracing::debug!(document_id = %item.id, "skipping remote item without a title");
                    continue;
                }
            };
            if let Some(previous) = index
                .documents_by_title
                .insert(title.to_string(), item.id.clone())
            {
                tracing::warn!(
                    title,
                    previous = %previous,
                    document_id = %item.id,
                    "duplicate remote title; using the later document"
                );
            }
        }

        match page.continuation() {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    tracing::debug!(
        pages,
        documents = index.documents_by_title.len(),
        known_ids = index.known_bookmark_ids.len(),
        "identity index built"
    );
    Ok(index)
}
