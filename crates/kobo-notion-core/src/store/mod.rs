//! Remote store abstraction.
//!
//! The [`RemoteStore`] trait is the minimum set of primitives the engine
//! needs from a hierarchical document store: a paginated collection query,
//! document creation and archival, and child fragment list/append/delete.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! | Implementation | Purpose |
//! |----------------|---------|
//! | [`memory::InMemoryRemote`] | Tests; records every mutation |
//! | [`dry_run::DryRunStore`] | Forwards reads, suppresses writes |
//! | `NotionClient` (application crate) | Notion REST API |

pub mod dry_run;
pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{ExistingFragment, Fragment, NewDocument, Page, RemoteItem};

/// Abstract remote document store.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`query_collection`](RemoteStore::query_collection) | One page of the document collection |
/// | [`create_document`](RemoteStore::create_document) | Create a document with initial children |
/// | [`list_child_fragments`](RemoteStore::list_child_fragments) | One page of a document's children |
/// | [`append_fragments`](RemoteStore::append_fragments) | Append children in one batch |
/// | [`delete_fragment`](RemoteStore::delete_fragment) | Delete one child |
/// | [`archive_document`](RemoteStore::archive_document) | Soft-delete a document |
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch one page of the collection. `cursor` is `None` for the first page.
    async fn query_collection(&self, cursor: Option<&str>) -> Result<Page<RemoteItem>, StoreError>;

    /// Create a document and return its id.
    async fn create_document(&self, doc: &NewDocument) -> Result<String, StoreError>;

    /// Fetch one page of a document's children.
    async fn list_child_fragments(
        &self,
        document_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<ExistingFragment>, StoreError>;

    async fn append_fragments(
        &self,
        document_id: &str,
        fragments: &[Fragment],
    ) -> Result<(), StoreError>;

    async fn delete_fragment(&self, fragment_id: &str) -> Result<(), StoreError>;

    async fn archive_document(&self, document_id: &str) -> Result<(), StoreError>;
}

/// A remote write, as recorded by the in-memory and dry-run stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create { title: String, children: usize },
    Append { document_id: String, count: usize },
    Delete { fragment_id: String },
    Archive { document_id: String },
}

/// Collect every child fragment of a document, following cursors until
/// the listing is exhausted.
pub async fn list_all_fragments(
    store: &dyn RemoteStore,
    document_id: &str,
) -> Result<Vec<ExistingFragment>, StoreError> {
    let mut fragments = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = store
            .list_child_fragments(document_id, cursor.as_deref())
            .await?;
        let next = page.continuation().map(str::to_string);
        fragments.extend(page.items);

        match next {
            Some(c) => cursor = Some(c),
            None => break,
        }
    }

    Ok(fragments)
}
