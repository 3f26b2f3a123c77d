//! Sync engine: the entry point that ties a record source to a remote store.

use std::sync::Arc;

use crate::error::SyncError;
use crate::index::build_index;
use crate::models::{BookmarkRecord, RunReport};
use crate::projection::group_by_title;
use crate::reconcile::reconcile;
use crate::source::RecordSource;
use crate::store::RemoteStore;

/// Owns the injected store and source handles for a run.
///
/// ```rust
/// use std::sync::Arc;
/// use kobo_notion_core::SyncEngine;
/// use kobo_notion_core::source::StaticSource;
/// use kobo_notion_core::store::memory::InMemoryRemote;
///
/// let engine = SyncEngine::new(
///     Arc::new(InMemoryRemote::new()),
///     Arc::new(StaticSource::new(Vec::new())),
/// );
/// # let _ = engine;
/// ```
pub struct SyncEngine {
    store: Arc<dyn RemoteStore>,
    source: Arc<dyn RecordSource>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn RemoteStore>, source: Arc<dyn RecordSource>) -> Self {
        Self { store, source }
    }

    pub fn store(&self) -> &dyn RemoteStore {
        self.store.as_ref()
    }

    /// Read every record from the source, then [`run`](Self::run).
    pub async fn sync(&self) -> Result<RunReport, SyncError> {
        let records = self
            .source
            .list_records()
            .await
            .map_err(SyncError::SourceUnavailable)?;
        tracing::info!(records = records.len(), "loaded local records");
        self.run(&records).await
    }

    /// Reconcile `records` against the remote store.
    ///
    /// Only index construction is fatal. Everything after it is isolated
    /// per group and surfaces in [`RunReport::errors`].
    pub async fn run(&self, records: &[BookmarkRecord]) -> Result<RunReport, SyncError> {
        let index = build_index(self.store.as_ref()).await?;
        let grouped = group_by_title(records);
        let new_bookmarks = index.filter_new(records).len();
        tracing::info!(
            groups = grouped.len(),
            remote_documents = index.documents_by_title.len(),
            new_bookmarks,
            "starting reconciliation"
        );

        let mut report = reconcile(self.store.as_ref(), &grouped, &index).await;
        report.new_bookmarks = new_bookmarks;

        tracing::info!(
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            archived = report.archived,
            errors = report.errors.len(),
            "sync finished"
        );
        Ok(report)
    }
}
