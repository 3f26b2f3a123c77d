use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// Open the device database read-only.
///
/// The file must already exist; it is never created or migrated.
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.is_file() {
        anyhow::bail!("Kobo database not found: {}", db_path.display());
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true)
        .create_if_missing(false);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open Kobo database: {}", db_path.display()))?;

    Ok(pool)
}
