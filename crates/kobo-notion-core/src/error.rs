use serde::Serialize;
use thiserror::Error;

/// Failure reported by a [`RemoteStore`](crate::store::RemoteStore) call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("remote API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Remote write operation, used to label [`SyncError::RemoteWrite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Append,
    Delete,
    Archive,
}

impl std::fmt::Display for WriteOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WriteOp::Create => "create",
            WriteOp::Append => "append",
            WriteOp::Delete => "delete",
            WriteOp::Archive => "archive",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// The local record source could not be read. Fatal.
    #[error("record source unavailable: {0:#}")]
    SourceUnavailable(anyhow::Error),

    /// A remote listing failed.
    #[error("remote query failed: {0}")]
    RemoteQuery(#[source] StoreError),

    /// A record's `created_at` could not be parsed.
    #[error("could not parse date '{value}'")]
    DateParse { value: String },

    /// A remote mutation failed.
    #[error("remote {op} failed for {target}: {source}")]
    RemoteWrite {
        op: WriteOp,
        target: String,
        #[source]
        source: StoreError,
    },
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::SourceUnavailable(_) => ErrorKind::SourceUnavailable,
            SyncError::RemoteQuery(_) => ErrorKind::RemoteQuery,
            SyncError::DateParse { .. } => ErrorKind::DateParse,
            SyncError::RemoteWrite { .. } => ErrorKind::RemoteWrite,
        }
    }
}

/// Error category recorded in a [`RunReport`](crate::models::RunReport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceUnavailable,
    RemoteQuery,
    DateParse,
    RemoteWrite,
}
