//! Kobo device database reader.
//!
//! Reads the `Bookmark` table of `KoboReader.sqlite`. Every highlight and
//! note the reader makes lands in this table, keyed by `BookmarkID` and
//! tagged with the `VolumeID` of the book it belongs to.
//!
//! Older firmware has no `Color` column; it is detected once per query
//! and read as `''` when absent.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

use kobo_notion_core::{BookmarkRecord, RecordSource};

use crate::db;

/// Read-only handle on a Kobo database file.
pub struct KoboDatabase {
    path: PathBuf,
}

impl KoboDatabase {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSource for KoboDatabase {
    async fn list_records(&self) -> Result<Vec<BookmarkRecord>> {
        let pool = db::connect_readonly(&self.path).await?;
        let records = query_bookmarks(&pool).await;
        pool.close().await;
        records
    }
}

async fn has_color_column(pool: &SqlitePool) -> Result<bool> {
    let rows = sqlx::query("PRAGMA table_info(Bookmark)")
        .fetch_all(pool)
        .await
        .context("Failed to inspect Bookmark table")?;
    if rows.is_empty() {
        anyhow::bail!("Bookmark table not found");
    }
    Ok(rows
        .iter()
        .any(|row| row.get::<String, _>("name").eq_ignore_ascii_case("Color")))
}

/// Fetch all bookmarks with a highlight or a note, newest first.
pub async fn query_bookmarks(pool: &SqlitePool) -> Result<Vec<BookmarkRecord>> {
    let color = if has_color_column(pool).await? {
        "IFNULL(CAST(Color AS TEXT), '')"
    } else {
        "''"
    };

    let sql = format!(
        r#"
        SELECT
            BookmarkID,
            IFNULL(VolumeID, '') AS VolumeID,
            IFNULL(Text, '') AS Text,
            IFNULL(Annotation, '') AS Annotation,
            IFNULL(Type, '') AS Type,
            IFNULL(DateCreated, '') AS DateCreated,
            {color} AS Color
        FROM Bookmark
        WHERE IFNULL(Text, '') <> '' OR IFNULL(Annotation, '') <> ''
        ORDER BY DateCreated DESC
        "#
    );

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to query Bookmark table")?;

    let records = rows
        .iter()
        .map(|row| BookmarkRecord {
            id: row.get("BookmarkID"),
            volume_id: row.get("VolumeID"),
            text: row.get("Text"),
            annotation: row.get("Annotation"),
            kind: row.get("Type"),
            created_at: row.get("DateCreated"),
            color: row.get("Color"),
        })
        .collect::<Vec<_>>();

    tracing::debug!(count = records.len(), "read bookmarks");
    Ok(records)
}
