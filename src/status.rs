//! The `status` command: a read-only look at both sides of the sync.

use anyhow::{Context, Result};
use serde::Serialize;

use kobo_notion_core::index::build_index;
use kobo_notion_core::projection::group_by_title;
use kobo_notion_core::RecordSource;

use crate::config::Config;
use crate::kobo::KoboDatabase;
use crate::notion::NotionClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub records: usize,
    pub groups: usize,
    pub remote_documents: usize,
    pub known_bookmark_ids: usize,
    pub new_bookmarks: usize,
}

pub async fn run_status(config: &Config) -> Result<Status> {
    let resolved = config.resolved()?;
    let kobo = KoboDatabase::open(resolved.db_path);
    let records = kobo
        .list_records()
        .await
        .with_context(|| format!("Failed to read {}", kobo.path().display()))?;
    let client = NotionClient::from_config(config)?;
    let index = build_index(&client).await?;

    let status = Status {
        records: records.len(),
        groups: group_by_title(&records).len(),
        remote_documents: index.documents_by_title.len(),
        known_bookmark_ids: index.known_bookmark_ids.len(),
        new_bookmarks: index.filter_new(&records).len(),
    };

    println!("Kobo");
    println!("  Database:        {}", resolved.db_path.display());
    println!("  Records:         {}", status.records);
    println!("  Books:           {}", status.groups);
    println!();
    println!("Notion");
    println!("  Database:        {}", resolved.database_id);
    println!("  Documents:       {}", status.remote_documents);
    println!("  Known IDs:       {}", status.known_bookmark_ids);
    println!();
    println!("  New bookmarks:   {}", status.new_bookmarks);

    Ok(status)
}
