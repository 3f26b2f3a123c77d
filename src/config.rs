//! Configuration loading.
//!
//! Settings come from a TOML file (default `./config/kobo-notion.toml`)
//! overlaid with environment variables. The file is optional: a missing
//! file yields the all-defaults config, which the environment can then
//! complete.
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `NOTION_TOKEN` | `notion.token` |
//! | `NOTION_DATABASE_ID` | `notion.database_id` |
//! | `KOBO_DB_PATH` | `kobo.db_path` |
//! | `CERT_PATH` | `notion.ca_cert_path` |

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub kobo: KoboConfig,
    #[serde(default)]
    pub notion: NotionConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct KoboConfig {
    /// Path to `KoboReader.sqlite` on the mounted device.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotionConfig {
    #[serde(default)]
    pub database_id: Option<String>,
    /// Integration token. Prefer `NOTION_TOKEN` over storing it here.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Extra PEM bundle added to the TLS trust roots.
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            database_id: None,
            token: None,
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            ca_cert_path: None,
        }
    }
}

fn default_api_base() -> String {
    "https://api.notion.com/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_log_file")]
    pub file: String,
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}
fn default_log_file() -> String {
    "app.log".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Settings the sync needs, after validation.
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    pub db_path: &'a Path,
    pub database_id: &'a str,
    pub token: &'a str,
}

impl Config {
    /// Borrow the required settings. Only valid after [`load_config`].
    pub fn resolved(&self) -> Result<Resolved<'_>> {
        Ok(Resolved {
            db_path: self
                .kobo
                .db_path
                .as_deref()
                .context("kobo.db_path is not set")?,
            database_id: self
                .notion
                .database_id
                .as_deref()
                .context("notion.database_id is not set")?,
            token: self
                .notion
                .token
                .as_deref()
                .context("notion.token is not set")?,
        })
    }
}

/// Load `path` and apply overrides from the process environment.
pub fn load_config(path: &Path) -> Result<Config> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load `path` and apply overrides from `env`.
pub fn load_config_with_env<F>(path: &Path, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: Config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?
    } else {
        Config::default()
    };

    let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());
    if let Some(token) = non_empty("NOTION_TOKEN") {
        config.notion.token = Some(token);
    }
    if let Some(id) = non_empty("NOTION_DATABASE_ID") {
        config.notion.database_id = Some(id);
    }
    if let Some(db) = non_empty("KOBO_DB_PATH") {
        config.kobo.db_path = Some(PathBuf::from(db));
    }
    if let Some(cert) = non_empty("CERT_PATH") {
        config.notion.ca_cert_path = Some(PathBuf::from(cert));
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.notion.token.as_deref().map_or(true, str::is_empty) {
        anyhow::bail!("notion.token must be set (or NOTION_TOKEN)");
    }
    if config
        .notion
        .database_id
        .as_deref()
        .map_or(true, str::is_empty)
    {
        anyhow::bail!("notion.database_id must be set (or NOTION_DATABASE_ID)");
    }
    if config
        .kobo
        .db_path
        .as_ref()
        .map_or(true, |p| p.as_os_str().is_empty())
    {
        anyhow::bail!("kobo.db_path must be set (or KOBO_DB_PATH)");
    }
    if config.notion.timeout_secs == 0 {
        anyhow::bail!("notion.timeout_secs must be > 0");
    }
    if !config.notion.api_base.starts_with("http://")
        && !config.notion.api_base.starts_with("https://")
    {
        anyhow::bail!(
            "notion.api_base must be an http(s) URL, got '{}'",
            config.notion.api_base
        );
    }
    Ok(())
}
