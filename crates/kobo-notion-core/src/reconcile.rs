//! Reconciler.
//!
//! Drives one pass over the grouped records against a prebuilt
//! [`IdentityIndex`]:
//!
//! 1. unknown titles get a new document holding every member's fragments;
//! 2. known titles are diffed against their listed children, then extended
//!    and pruned;
//! 3. indexed titles with no local group are archived.
//!
//! Failures below index construction are isolated: they are logged,
//! recorded in the [`RunReport`], and the pass moves on.

use crate::dates::parse_created_at;
use crate::diff::diff;
use crate::error::{StoreError, SyncError, WriteOp};
use crate::index::IdentityIndex;
use crate::models::{BookmarkRecord, NewDocument, RunReport};
use crate::projection::GroupedRecords;
use crate::render::render_fragments;
use crate::store::{list_all_fragments, RemoteStore};

pub async fn reconcile(
    store: &dyn RemoteStore,
    grouped: &GroupedRecords,
    index: &IdentityIndex,
) -> RunReport {
    let mut report = RunReport::default();

    for (title, members) in grouped {
        match index.document_for(title) {
            None => create_group(store, title, members, &mut report).await,
            Some(document_id) => {
                update_group(store, title, document_id, members, &mut report).await
            }
        }
    }

    for (title, document_id) in &index.documents_by_title {
        if grouped.contains_key(title) {
            continue;
        }
        match store.archive_document(document_id).await {
            Ok(()) => {
                tracing::info!(title = %title, document_id = %document_id, "archived document");
                report.archived += 1;
            }
            Err(e) => {
                let err = write_error(WriteOp::Archive, document_id, e);
                tracing::warn!(title = %title, document_id = %document_id, error = %err, "archive failed");
                report.fail(title, err.kind(), err.to_string());
            }
        }
    }

    report
}

async fn create_group(
    store: &dyn RemoteStore,
    title: &str,
    members: &[BookmarkRecord],
    report: &mut RunReport,
) {
    let Some(first) = members.first() else {
        return;
    };
    let created_at = match parse_created_at(&first.created_at) {
        Ok(dt) => dt,
        Err(err) => {
            tracing::warn!(title, bookmark_id = %first.id, error = %err, "skipping group creation");
            report.fail(title, err.kind(), err.to_string());
            return;
        }
    };

    let doc = NewDocument {
        title: title.to_string(),
        created_at,
        children: members.iter().flat_map(render_fragments).collect(),
    };
    let fragments = doc.children.len();

    match store.create_document(&doc).await {
        Ok(document_id) => {
            tracing::info!(title, document_id = %document_id, fragments, "created document");
            report.created += 1;
            report.fragments_added += fragments;
        }
        Err(e) => {
            let err = write_error(WriteOp::Create, title, e);
            tracing::warn!(title, error = %err, "create failed");
            report.fail(title, err.kind(), err.to_string());
        }
    }
}

async fn update_group(
    store: &dyn RemoteStore,
    title: &str,
    document_id: &str,
    members: &[BookmarkRecord],
    report: &mut RunReport,
) {
    let existing = match list_all_fragments(store, document_id).await {
        Ok(fragments) => fragments,
        Err(e) => {
            let err = SyncError::RemoteQuery(e);
            tracing::warn!(title, document_id, error = %err, "could not list fragments; skipping group");
            report.fail(title, err.kind(), err.to_string());
            return;
        }
    };

    let plan = diff(&existing, members);
    if plan.is_empty() {
        tracing::debug!(title, document_id, "document up to date");
        report.unchanged += 1;
        return;
    }

    let mut wrote = false;
    if !plan.to_add.is_empty() {
        match store.append_fragments(document_id, &plan.to_add).await {
            Ok(()) => {
                tracing::info!(title, document_id, count = plan.to_add.len(), "appended fragments");
                report.fragments_added += plan.to_add.len();
                wrote = true;
            }
            Err(e) => {
                let err = write_error(WriteOp::Append, document_id, e);
                tracing::warn!(title, document_id, error = %err, "append failed");
                report.fail(title, err.kind(), err.to_string());
            }
        }
    }

    for stale in &plan.to_remove {
        match store.delete_fragment(&stale.id).await {
            Ok(()) => {
                tracing::debug!(title, fragment_id = %stale.id, "deleted stale fragment");
                report.fragments_removed += 1;
                wrote = true;
            }
            Err(e) => {
                let err = write_error(WriteOp::Delete, &stale.id, e);
                tracing::warn!(title, fragment_id = %stale.id, error = %err, "delete failed");
                report.fail(title, err.kind(), err.to_string());
            }
        }
    }

    // A group counts as updated once any of its writes lands.
    if wrote {
        report.updated += 1;
    }
}

fn write_error(op: WriteOp, target: &str, source: StoreError) -> SyncError {
    SyncError::RemoteWrite {
        op,
        target: target.to_string(),
        source,
    }
}
