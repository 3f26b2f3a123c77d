//! Read-through store that suppresses writes.
//!
//! Wraps another [`RemoteStore`]: listings go to the inner store, while
//! create/append/delete/archive are recorded as [`Mutation`]s and reported
//! as successful without touching the remote side. Created documents get a
//! synthetic `dry-run-<uuid>` id.

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{ExistingFragment, Fragment, NewDocument, Page, RemoteItem};

use super::{Mutation, RemoteStore};

pub struct DryRunStore<S> {
    inner: S,
    planned: Mutex<Vec<Mutation>>,
}

impl<S: RemoteStore> DryRunStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            planned: Mutex::new(Vec::new()),
        }
    }

    /// Writes that would have been sent, in order.
    pub fn planned(&self) -> Vec<Mutation> {
        self.planned.lock().unwrap().clone()
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn plan(&self, mutation: Mutation) {
        tracing::debug!(?mutation, "dry run: skipping write");
        self.planned.lock().unwrap().push(mutation);
    }
}

#[async_trait]
impl<S: RemoteStore> RemoteStore for DryRunStore<S> {
    async fn query_collection(&self, cursor: Option<&str>) -> Result<Page<RemoteItem>, StoreError> {
        self.inner.query_collection(cursor).await
    }

    async fn create_document(&self, doc: &NewDocument) -> Result<String, StoreError> {
        self.plan(Mutation::Create {
            title: doc.title.clone(),
            children: doc.children.len(),
        });
        Ok(format!("dry-run-{}", Uuid::new_v4()))
    }

    async fn list_child_fragments(
        &self,
        document_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<ExistingFragment>, StoreError> {
        self.inner.list_child_fragments(document_id, cursor).await
    }

    async fn append_fragments(
        &self,
        document_id: &str,
        fragments: &[Fragment],
    ) -> Result<(), StoreError> {
        self.plan(Mutation::Append {
            document_id: document_id.to_string(),
            count: fragments.len(),
        });
        Ok(())
    }

    async fn delete_fragment(&self, fragment_id: &str) -> Result<(), StoreError> {
        self.plan(Mutation::Delete {
            fragment_id: fragment_id.to_string(),
        });
        Ok(())
    }

    async fn archive_document(&self, document_id: &str) -> Result<(), StoreError> {
        self.plan(Mutation::Archive {
            document_id: document_id.to_string(),
        });
        Ok(())
    }
}
