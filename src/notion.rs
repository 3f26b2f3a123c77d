//! Notion REST client.
//!
//! Implements [`RemoteStore`] over the public Notion API. One database holds
//! one page per book; the page's children are the highlight and note quote
//! blocks.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `query_collection` | `POST /databases/{id}/query` |
//! | `create_document` | `POST /pages` (+ `PATCH /blocks/{id}/children` for overflow) |
//! | `list_child_fragments` | `GET /blocks/{id}/children` |
//! | `append_fragments` | `PATCH /blocks/{id}/children`, at most 100 blocks per call |
//! | `delete_fragment` | `DELETE /blocks/{id}` |
//! | `archive_document` | `PATCH /pages/{id}` with `archived: true` |
//!
//! # Retries
//!
//! Only HTTP 429 is retried, up to `max_retries` times. The wait honours
//! `Retry-After` (seconds) and otherwise backs off exponentially from 1s,
//! capped at 32s. Every other failure is returned to the caller at once.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

use kobo_notion_core::models::{
    props, Color, ExistingFragment, Fragment, NewDocument, Page, PropertyValue, RemoteItem,
    TextRun,
};
use kobo_notion_core::store::RemoteStore;
use kobo_notion_core::StoreError;

use crate::config::{Config, NotionConfig};

pub const NOTION_VERSION: &str = "2022-06-28";

/// Notion caps both page sizes and appended children at 100.
const PAGE_SIZE: usize = 100;
const MAX_BLOCKS_PER_REQUEST: usize = 100;
const MAX_BACKOFF_SECS: u64 = 32;

pub struct NotionClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    database_id: String,
    max_retries: u32,
}

impl NotionClient {
    pub fn new(settings: &NotionConfig, token: &str, database_id: &str) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(settings.timeout_secs));

        if let Some(path) = &settings.ca_cert_path {
            let pem = std::fs::read(path)
                .with_context(|| format!("Failed to read CA certificate: {}", path.display()))?;
            let certs = reqwest::Certificate::from_pem_bundle(&pem)
                .with_context(|| format!("Invalid PEM bundle: {}", path.display()))?;
            if certs.is_empty() {
                anyhow::bail!("No certificates found in {}", path.display());
            }
            tracing::debug!(count = certs.len(), path = %path.display(), "adding CA certificates");
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }

        Ok(Self {
            http: builder.build().context("Failed to build HTTP client")?,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            database_id: database_id.to_string(),
            max_retries: settings.max_retries,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let resolved = config.resolved()?;
        Self::new(&config.notion, resolved.token, resolved.database_id)
    }

    /// Send one request, retrying on 429, and decode the JSON body.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, StoreError> {
        let url = format!("{}{}", self.api_base, path);

        for attempt in 0..=self.max_retries {
            let mut req = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(&self.token)
                .header("Notion-Version", NOTION_VERSION);
            if !query.is_empty() {
                req = req.query(query);
            }
            if let Some(body) = body {
                req = req.json(body);
            }

            let response = req
                .send()
                .await
                .map_err(|e| StoreError::Transport(e.to_string()))?;
            let status = response.status();

            if status.is_success() {
                return response
                    .json::<Value>()
                    .await
                    .map_err(|e| StoreError::Decode(e.to_string()));
            }

            if status == StatusCode::TOO_MANY_REQUESTS && attempt < self.max_retries {
                let delay = retry_after(&response).unwrap_or_else(|| backoff(attempt));
                tracing::warn!(
                    %method,
                    path,
                    attempt = attempt + 1,
                    delay_secs = delay.as_secs(),
                    "rate limited by Notion; retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        Err(StoreError::Api {
            status: StatusCode::TOO_MANY_REQUESTS.as_u16(),
            message: "rate limited; retries exhausted".to_string(),
        })
    }

    async fn append_batched(&self, block_id: &str, fragments: &[Fragment]) -> Result<(), StoreError> {
        let path = format!("/blocks/{}/children", block_id);
        for batch in fragments.chunks(MAX_BLOCKS_PER_REQUEST) {
            let children: Vec<Value> = batch.iter().map(fragment_to_block).collect();
            self.send(
                Method::PATCH,
                &path,
                &[],
                Some(&json!({ "children": children })),
            )
            .await?;
        }
        Ok(())
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs.min(MAX_BACKOFF_SECS)))
}

/// Exponential backoff: 1s, 2s, 4s, ... capped at 32s.
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs((1u64 << attempt.min(5)).min(MAX_BACKOFF_SECS))
}

/// Notion error bodies carry a `message`; fall back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn page_of<T>(json: &Value, parse: impl Fn(&Value) -> Option<T>) -> Result<Page<T>, StoreError> {
    let results = json
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::Decode("missing 'results' array".to_string()))?;

    Ok(Page {
        items: results.iter().filter_map(parse).collect(),
        has_more: json.get("has_more").and_then(Value::as_bool).unwrap_or(false),
        next_cursor: json
            .get("next_cursor")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Plain text of each element of a rich-text array.
fn plain_segments(rich_text: Option<&Value>) -> Vec<String> {
    rich_text
        .and_then(Value::as_array)
        .map(|runs| {
            runs.iter()
                .map(|run| {
                    run.get("plain_text")
                        .or_else(|| run.get("text").and_then(|t| t.get("content")))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_property(value: &Value) -> PropertyValue {
    match value.get("type").and_then(Value::as_str) {
        Some("title") => PropertyValue::Title(plain_segments(value.get("title"))),
        Some("rich_text") => PropertyValue::RichText(plain_segments(value.get("rich_text"))),
        Some("date") => PropertyValue::Date(
            value
                .get("date")
                .and_then(|d| d.get("start"))
                .and_then(Value::as_str)
                .map(str::to_string),
        ),
        _ => PropertyValue::Other,
    }
}

fn parse_page(value: &Value) -> Option<RemoteItem> {
    let id = value.get("id")?.as_str()?.to_string();
    let properties: BTreeMap<String, PropertyValue> = value
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, v)| (name.clone(), parse_property(v)))
                .collect()
        })
        .unwrap_or_default();
    Some(RemoteItem { id, properties })
}

fn parse_block(value: &Value) -> Option<ExistingFragment> {
    let id = value.get("id")?.as_str()?.to_string();
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let plain_text = plain_segments(value.get(&kind).and_then(|b| b.get("rich_text"))).concat();
    Some(ExistingFragment {
        id,
        kind,
        plain_text,
    })
}

fn text_run(run: &TextRun) -> Value {
    let mut obj = json!({
        "type": "text",
        "text": { "content": run.content },
    });
    if run.bold || run.color != Color::Default {
        obj["annotations"] = json!({
            "bold": run.bold,
            "color": run.color.as_str(),
        });
    }
    obj
}

/// Serialize a fragment as a Notion quote block.
pub fn fragment_to_block(fragment: &Fragment) -> Value {
    let rich_text: Vec<Value> = fragment.runs.iter().map(text_run).collect();
    json!({
        "object": "block",
        "type": "quote",
        "quote": { "rich_text": rich_text },
    })
}

#[async_trait]
impl RemoteStore for NotionClient {
    async fn query_collection(&self, cursor: Option<&str>) -> Result<Page<RemoteItem>, StoreError> {
        let mut body = json!({ "page_size": PAGE_SIZE });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }
        let path = format!("/databases/{}/query", self.database_id);
        let json = self.send(Method::POST, &path, &[], Some(&body)).await?;
        page_of(&json, parse_page)
    }

    async fn create_document(&self, doc: &NewDocument) -> Result<String, StoreError> {
        let split = doc.children.len().min(MAX_BLOCKS_PER_REQUEST);
        let (initial, overflow) = doc.children.split_at(split);
        let children: Vec<Value> = initial.iter().map(fragment_to_block).collect();

        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": {
                (props::BOOK_TITLE): {
                    "title": [{ "type": "text", "text": { "content": doc.title } }]
                },
                (props::DATE_CREATED): {
                    "date": { "start": doc.created_at.to_rfc3339() }
                },
                (props::BOOK_NAME): {
                    "rich_text": [{ "type": "text", "text": { "content": doc.title } }]
                },
            },
            "children": children,
        });

        let json = self.send(Method::POST, "/pages", &[], Some(&body)).await?;
        let id = json
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Decode("created page has no id".to_string()))?
            .to_string();

        if !overflow.is_empty() {
            self.append_batched(&id, overflow).await?;
        }
        Ok(id)
    }

    async fn list_child_fragments(
        &self,
        document_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<ExistingFragment>, StoreError> {
        let mut query = vec![("page_size", PAGE_SIZE.to_string())];
        if let Some(cursor) = cursor {
            query.push(("start_cursor", cursor.to_string()));
        }
        let path = format!("/blocks/{}/children", document_id);
        let json = self.send(Method::GET, &path, &query, None).await?;
        page_of(&json, parse_block)
    }

    async fn append_fragments(
        &self,
        document_id: &str,
        fragments: &[Fragment],
    ) -> Result<(), StoreError> {
        self.append_batched(document_id, fragments).await
    }

    async fn delete_fragment(&self, fragment_id: &str) -> Result<(), StoreError> {
        let path = format!("/blocks/{}", fragment_id);
        self.send(Method::DELETE, &path, &[], None).await?;
        Ok(())
    }

    async fn archive_document(&self, document_id: &str) -> Result<(), StoreError> {
        let path = format!("/pages/{}", document_id);
        self.send(Method::PATCH, &path, &[], Some(&json!({ "archived": true })))
            .await?;
        Ok(())
    }
}
