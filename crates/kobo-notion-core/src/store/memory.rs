//! In-memory [`RemoteStore`] implementation for tests.
//!
//! Documents and their children live in a `Vec` behind `std::sync::RwLock`.
//! Listings are paginated with a configurable page size and numeric
//! cursors. Every successful write is recorded as a [`Mutation`], and
//! individual operations can be made to fail to exercise error isolation.

use std::collections::HashSet;
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    props, ExistingFragment, Fragment, NewDocument, Page, PropertyValue, RemoteItem,
};

use super::{Mutation, RemoteStore};

struct StoredFragment {
    id: String,
    kind: String,
    plain_text: String,
}

struct StoredDoc {
    id: String,
    title: String,
    created_at: Option<DateTime<Utc>>,
    bookmark_ids: Vec<String>,
    archived: bool,
    children: Vec<StoredFragment>,
}

/// Operations that can be made to fail.
#[derive(Default)]
struct FailPoints {
    query_page: Option<usize>,
    create: HashSet<String>,
    list: HashSet<String>,
    append: HashSet<String>,
    delete: HashSet<String>,
    archive: HashSet<String>,
}

/// Read-only view of a stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub title: String,
    pub created_at: Option<DateTime<Utc>>,
    pub archived: bool,
    /// Plain text of each child, in order.
    pub children: Vec<String>,
}

/// In-memory remote store for tests.
pub struct InMemoryRemote {
    docs: RwLock<Vec<StoredDoc>>,
    page_size: usize,
    empty_cursor_on_more: bool,
    fail: Mutex<FailPoints>,
    mutations: Mutex<Vec<Mutation>>,
    query_calls: Mutex<usize>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
            page_size: 100,
            empty_cursor_on_more: false,
            fail: Mutex::new(FailPoints::default()),
            mutations: Mutex::new(Vec::new()),
            query_calls: Mutex::new(0),
        }
    }

    /// Serve listings in pages of `size` entries.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Make every non-final page declare more results without a cursor.
    pub fn with_empty_cursor_on_more(mut self) -> Self {
        self.empty_cursor_on_more = true;
        self
    }

    /// Seed a document directly, bypassing the mutation log.
    pub fn insert_document(&self, title: &str, bookmark_ids: &[&str], children: &[&str]) -> String {
        let id = Uuid::new_v4().to_string();
        let children = children
            .iter()
            .map(|text| StoredFragment {
                id: Uuid::new_v4().to_string(),
                kind: "quote".to_string(),
                plain_text: text.to_string(),
            })
            .collect();
        self.docs.write().unwrap().push(StoredDoc {
            id: id.clone(),
            title: title.to_string(),
            created_at: None,
            bookmark_ids: bookmark_ids.iter().map(|s| s.to_string()).collect(),
            archived: false,
            children,
        });
        id
    }

    /// Fail the `n`th collection query (zero-based).
    pub fn fail_query_page(&self, n: usize) {
        self.fail.lock().unwrap().query_page = Some(n);
    }

    pub fn fail_create(&self, title: &str) {
        self.fail.lock().unwrap().create.insert(title.to_string());
    }

    pub fn fail_list(&self, document_id: &str) {
        self.fail.lock().unwrap().list.insert(document_id.to_string());
    }

    pub fn fail_append(&self, document_id: &str) {
        self.fail.lock().unwrap().append.insert(document_id.to_string());
    }

    pub fn fail_delete(&self, fragment_id: &str) {
        self.fail.lock().unwrap().delete.insert(fragment_id.to_string());
    }

    pub fn fail_archive(&self, document_id: &str) {
        self.fail.lock().unwrap().archive.insert(document_id.to_string());
    }

    /// Successful writes, in the order they happened.
    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().unwrap().clone()
    }

    /// Number of collection queries served (including failed ones).
    pub fn query_calls(&self) -> usize {
        *self.query_calls.lock().unwrap()
    }

    pub fn document(&self, id: &str) -> Option<DocumentSnapshot> {
        self.docs
            .read()
            .unwrap()
            .iter()
            .find(|d| d.id == id)
            .map(snapshot)
    }

    /// The live (non-archived) document with `title`, if any.
    pub fn find_by_title(&self, title: &str) -> Option<DocumentSnapshot> {
        self.docs
            .read()
            .unwrap()
            .iter()
            .find(|d| d.title == title && !d.archived)
            .map(snapshot)
    }

    /// Ids of a document's children, in order.
    pub fn child_ids(&self, document_id: &str) -> Vec<String> {
        self.docs
            .read()
            .unwrap()
            .iter()
            .find(|d| d.id == document_id)
            .map(|d| d.children.iter().map(|c| c.id.clone()).collect())
            .unwrap_or_default()
    }

    fn record(&self, mutation: Mutation) {
        self.mutations.lock().unwrap().push(mutation);
    }

    fn page<T>(&self, all: Vec<T>, cursor: Option<&str>) -> Result<Page<T>, StoreError> {
        let start = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| StoreError::Api {
                    status: 400,
                    message: format!("invalid start_cursor '{}'", c),
                })?,
            None => 0,
        };
        let end = (start + self.page_size).min(all.len());
        let has_more = end < all.len();
        let next_cursor = if !has_more {
            None
        } else if self.empty_cursor_on_more {
            Some(String::new())
        } else {
            Some(end.to_string())
        };
        let items = all.into_iter().skip(start).take(end.saturating_sub(start)).collect();
        Ok(Page {
            items,
            has_more,
            next_cursor,
        })
    }
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot(doc: &StoredDoc) -> DocumentSnapshot {
    DocumentSnapshot {
        id: doc.id.clone(),
        title: doc.title.clone(),
        created_at: doc.created_at,
        archived: doc.archived,
        children: doc.children.iter().map(|c| c.plain_text.clone()).collect(),
    }
}

fn to_stored(fragment: &Fragment) -> StoredFragment {
    StoredFragment {
        id: Uuid::new_v4().to_string(),
        kind: "quote".to_string(),
        plain_text: fragment.plain_text(),
    }
}

fn injected(what: &str) -> StoreError {
    StoreError::Api {
        status: 500,
        message: format!("injected failure: {}", what),
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn query_collection(&self, cursor: Option<&str>) -> Result<Page<RemoteItem>, StoreError> {
        let call = {
            let mut calls = self.query_calls.lock().unwrap();
            *calls += 1;
            *calls - 1
        };
        if self.fail.lock().unwrap().query_page == Some(call) {
            return Err(injected("query"));
        }

        let items: Vec<RemoteItem> = self
            .docs
            .read()
            .unwrap()
            .iter()
            .filter(|d| !d.archived)
            .map(|d| {
                let mut item = RemoteItem {
                    id: d.id.clone(),
                    ..Default::default()
                };
                item.properties.insert(
                    props::BOOK_TITLE.to_string(),
                    PropertyValue::Title(vec![d.title.clone()]),
                );
                item.properties.insert(
                    props::BOOKMARK_ID.to_string(),
                    PropertyValue::RichText(d.bookmark_ids.clone()),
                );
                item.properties.insert(
                    props::DATE_CREATED.to_string(),
                    PropertyValue::Date(d.created_at.map(|dt| dt.to_rfc3339())),
                );
                item
            })
            .collect();

        self.page(items, cursor)
    }

    async fn create_document(&self, doc: &NewDocument) -> Result<String, StoreError> {
        if self.fail.lock().unwrap().create.contains(&doc.title) {
            return Err(injected("create"));
        }
        let id = Uuid::new_v4().to_string();
        self.docs.write().unwrap().push(StoredDoc {
            id: id.clone(),
            title: doc.title.clone(),
            created_at: Some(doc.created_at),
            bookmark_ids: Vec::new(),
            archived: false,
            children: doc.children.iter().map(to_stored).collect(),
        });
        self.record(Mutation::Create {
            title: doc.title.clone(),
            children: doc.children.len(),
        });
        Ok(id)
    }

    async fn list_child_fragments(
        &self,
        document_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<ExistingFragment>, StoreError> {
        if self.fail.lock().unwrap().list.contains(document_id) {
            return Err(injected("list"));
        }
        let children: Vec<ExistingFragment> = {
            let docs = self.docs.read().unwrap();
            let doc = docs
                .iter()
                .find(|d| d.id == document_id)
                .ok_or_else(|| StoreError::NotFound(document_id.to_string()))?;
            doc.children
                .iter()
                .map(|c| ExistingFragment {
                    id: c.id.clone(),
                    kind: c.kind.clone(),
                    plain_text: c.plain_text.clone(),
                })
                .collect()
        };
        self.page(children, cursor)
    }

    async fn append_fragments(
        &self,
        document_id: &str,
        fragments: &[Fragment],
    ) -> Result<(), StoreError> {
        if self.fail.lock().unwrap().append.contains(document_id) {
            return Err(injected("append"));
        }
        {
            let mut docs = self.docs.write().unwrap();
            let doc = docs
                .iter_mut()
                .find(|d| d.id == document_id)
                .ok_or_else(|| StoreError::NotFound(document_id.to_string()))?;
            doc.children.extend(fragments.iter().map(to_stored));
        }
        self.record(Mutation::Append {
            document_id: document_id.to_string(),
            count: fragments.len(),
        });
        Ok(())
    }

    async fn delete_fragment(&self, fragment_id: &str) -> Result<(), StoreError> {
        if self.fail.lock().unwrap().delete.contains(fragment_id) {
            return Err(injected("delete"));
        }
        let removed = {
            let mut docs = self.docs.write().unwrap();
            docs.iter_mut().any(|d| {
                let before = d.children.len();
                d.children.retain(|c| c.id != fragment_id);
                d.children.len() != before
            })
        };
        if !removed {
            return Err(StoreError::NotFound(fragment_id.to_string()));
        }
        self.record(Mutation::Delete {
            fragment_id: fragment_id.to_string(),
        });
        Ok(())
    }

    async fn archive_document(&self, document_id: &str) -> Result<(), StoreError> {
        if self.fail.lock().unwrap().archive.contains(document_id) {
            return Err(injected("archive"));
        }
        {
            let mut docs = self.docs.write().unwrap();
            let doc = docs
                .iter_mut()
                .find(|d| d.id == document_id)
                .ok_or_else(|| StoreError::NotFound(document_id.to_string()))?;
            doc.archived = true;
        }
        self.record(Mutation::Archive {
            document_id: document_id.to_string(),
        });
        Ok(())
    }
}
