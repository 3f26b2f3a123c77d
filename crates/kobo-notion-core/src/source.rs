use anyhow::Result;
use async_trait::async_trait;

use crate::models::BookmarkRecord;

/// A local source of bookmark records.
///
/// Implementations return every record with renderable content (highlight
/// or note non-empty), ordered by creation time, newest first.
///
/// # Example
///
/// ```rust
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use kobo_notion_core::{BookmarkRecord, RecordSource};
///
/// struct Fixed(Vec<BookmarkRecord>);
///
/// #[async_trait]
/// impl RecordSource for Fixed {
///     async fn list_records(&self) -> Result<Vec<BookmarkRecord>> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn list_records(&self) -> Result<Vec<BookmarkRecord>>;
}

/// A record source over an in-memory list.
pub struct StaticSource {
    records: Vec<BookmarkRecord>,
}

impl StaticSource {
    pub fn new(records: Vec<BookmarkRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for StaticSource {
    async fn list_records(&self) -> Result<Vec<BookmarkRecord>> {
        Ok(self.records.clone())
    }
}
