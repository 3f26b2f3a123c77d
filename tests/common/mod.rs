//! A small in-process stand-in for the Notion API, served with axum.
//!
//! It keeps pages and their child blocks in memory, paginates listings the
//! way Notion does (numeric cursors here), and records every request so
//! tests can assert on the wire traffic. A throttle counter makes the next
//! N requests answer 429 with `Retry-After: 0`.
//!
//! Also builds Kobo database fixtures.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub notion_version: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct FakeBlock {
    pub id: String,
    pub block: Value,
}

impl FakeBlock {
    pub fn plain_text(&self) -> String {
        let kind = self.block["type"].as_str().unwrap_or_default();
        self.block[kind]["rich_text"]
            .as_array()
            .map(|runs| {
                runs.iter()
                    .map(|r| r["plain_text"].as_str().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub id: String,
    pub title: String,
    pub date: Option<String>,
    pub bookmark_ids: Vec<String>,
    pub archived: bool,
    pub children: Vec<FakeBlock>,
}

#[derive(Default)]
pub struct FakeNotion {
    pub pages: Vec<FakePage>,
    pub requests: Vec<Recorded>,
    /// Number of upcoming requests to reject with 429.
    pub throttle: usize,
    /// Caps the page size of every listing when set.
    pub page_size: Option<usize>,
    next_id: usize,
}

impl FakeNotion {
    fn new_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    /// Seed a page whose children are quote blocks with the given text.
    pub fn add_page(&mut self, title: &str, bookmark_ids: &[&str], children: &[&str]) -> String {
        let id = self.new_id("page");
        let children = children
            .iter()
            .map(|text| {
                let block_id = self.new_id("block");
                FakeBlock {
                    id: block_id,
                    block: json!({
                        "type": "quote",
                        "quote": { "rich_text": [{ "plain_text": text, "text": { "content": text } }] }
                    }),
                }
            })
            .collect();
        self.pages.push(FakePage {
            id: id.clone(),
            title: title.to_string(),
            date: None,
            bookmark_ids: bookmark_ids.iter().map(|s| s.to_string()).collect(),
            archived: false,
            children,
        });
        id
    }

    pub fn live_page(&self, title: &str) -> Option<&FakePage> {
        self.pages.iter().find(|p| p.title == title && !p.archived)
    }

    pub fn count(&self, method: &str, path_prefix: &str) -> usize {
        self.requests
            .iter()
            .filter(|r| r.method == method && r.path.starts_with(path_prefix))
            .count()
    }

    pub fn writes(&self) -> usize {
        self.requests
            .iter()
            .filter(|r| {
                r.method == "DELETE"
                    || r.method == "PATCH"
                    || (r.method == "POST" && r.path.ends_with("/pages"))
            })
            .count()
    }

    fn limit(&self, requested: Option<usize>) -> usize {
        let requested = requested.unwrap_or(100);
        self.page_size.map_or(requested, |cap| cap.min(requested))
    }

    fn store_block(&mut self, mut block: Value) -> FakeBlock {
        let kind = block["type"].as_str().unwrap_or("paragraph").to_string();
        if let Some(runs) = block[&kind]["rich_text"].as_array_mut() {
            for run in runs {
                let content = run["text"]["content"].clone();
                run["plain_text"] = content;
            }
        }
        FakeBlock {
            id: self.new_id("block"),
            block,
        }
    }
}

pub type Shared = Arc<Mutex<FakeNotion>>;

fn page_json(page: &FakePage) -> Value {
    let ids: Vec<Value> = page
        .bookmark_ids
        .iter()
        .map(|id| json!({ "plain_text": id }))
        .collect();
    json!({
        "object": "page",
        "id": page.id,
        "archived": page.archived,
        "properties": {
            "Book Title": { "type": "title", "title": [{ "plain_text": page.title }] },
            "Bookmark ID": { "type": "rich_text", "rich_text": ids },
            "Date Created": { "type": "date", "date": page.date.as_ref().map(|d| json!({ "start": d })) },
        }
    })
}

fn block_json(block: &FakeBlock) -> Value {
    let mut value = block.block.clone();
    value["object"] = json!("block");
    value["id"] = json!(block.id);
    value
}

fn paginate(items: Vec<Value>, cursor: Option<&str>, size: usize) -> Value {
    let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
    let end = (start + size).min(items.len());
    let has_more = end < items.len();
    let results: Vec<Value> = items[start.min(end)..end].to_vec();
    json!({
        "object": "list",
        "results": results,
        "has_more": has_more,
        "next_cursor": if has_more { json!(end.to_string()) } else { Value::Null },
    })
}

fn not_found(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "object": "error",
            "status": 404,
            "code": "object_not_found",
            "message": format!("Could not find block with ID: {}.", id),
        })),
    )
        .into_response()
}

/// Record the request; answer 429 while the throttle lasts.
fn gate(
    state: &mut FakeNotion,
    method: &str,
    path: String,
    headers: &HeaderMap,
    body: Option<Value>,
) -> Option<Response> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.requests.push(Recorded {
        method: method.to_string(),
        path,
        notion_version: header("notion-version"),
        authorization: header("authorization"),
        body,
    });
    if state.throttle > 0 {
        state.throttle -= 1;
        let mut resp = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "object": "error", "status": 429, "code": "rate_limited", "message": "slow down" })),
        )
            .into_response();
        resp.headers_mut()
            .insert("retry-after", "0".parse().unwrap());
        return Some(resp);
    }
    None
}

async fn query_database(
    State(state): State<Shared>,
    Path(database_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut st = state.lock().unwrap();
    let path = format!("/v1/databases/{}/query", database_id);
    if let Some(resp) = gate(&mut st, "POST", path, &headers, Some(body.clone())) {
        return resp;
    }
    let size = st.limit(body["page_size"].as_u64().map(|n| n as usize));
    let pages: Vec<Value> = st.pages.iter().filter(|p| !p.archived).map(page_json).collect();
    Json(paginate(pages, body["start_cursor"].as_str(), size)).into_response()
}

async fn create_page(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut st = state.lock().unwrap();
    if let Some(resp) = gate(&mut st, "POST", "/v1/pages".to_string(), &headers, Some(body.clone())) {
        return resp;
    }
    let title = body["properties"]["Book Title"]["title"][0]["text"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    if title.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "object": "error", "status": 400, "message": "title is required" })),
        )
            .into_response();
    }
    let date = body["properties"]["Date Created"]["date"]["start"]
        .as_str()
        .map(str::to_string);
    let children: Vec<FakeBlock> = body["children"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|b| st.store_block(b))
        .collect();
    let id = st.new_id("page");
    let page = FakePage {
        id,
        title,
        date,
        bookmark_ids: Vec::new(),
        archived: false,
        children,
    };
    let resp = page_json(&page);
    st.pages.push(page);
    Json(resp).into_response()
}

async fn list_children(
    State(state): State<Shared>,
    Path(block_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut st = state.lock().unwrap();
    let path = format!("/v1/blocks/{}/children", block_id);
    if let Some(resp) = gate(&mut st, "GET", path, &headers, None) {
        return resp;
    }
    let size = st.limit(params.get("page_size").and_then(|s| s.parse().ok()));
    let Some(page) = st.pages.iter().find(|p| p.id == block_id) else {
        return not_found(&block_id);
    };
    let blocks: Vec<Value> = page.children.iter().map(block_json).collect();
    Json(paginate(blocks, params.get("start_cursor").map(String::as_str), size)).into_response()
}

async fn append_children(
    State(state): State<Shared>,
    Path(block_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut st = state.lock().unwrap();
    let path = format!("/v1/blocks/{}/children", block_id);
    if let Some(resp) = gate(&mut st, "PATCH", path, &headers, Some(body.clone())) {
        return resp;
    }
    let incoming = body["children"].as_array().cloned().unwrap_or_default();
    if incoming.len() > 100 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "object": "error", "status": 400, "message": "body.children.length should be ≤ 100" })),
        )
            .into_response();
    }
    let stored: Vec<FakeBlock> = incoming.into_iter().map(|b| st.store_block(b)).collect();
    let Some(page) = st.pages.iter_mut().find(|p| p.id == block_id) else {
        return not_found(&block_id);
    };
    let results: Vec<Value> = stored.iter().map(block_json).collect();
    page.children.extend(stored);
    Json(json!({ "object": "list", "results": results, "has_more": false, "next_cursor": null }))
        .into_response()
}

async fn delete_block(
    State(state): State<Shared>,
    Path(block_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut st = state.lock().unwrap();
    let path = format!("/v1/blocks/{}", block_id);
    if let Some(resp) = gate(&mut st, "DELETE", path, &headers, None) {
        return resp;
    }
    for page in st.pages.iter_mut() {
        if let Some(pos) = page.children.iter().position(|b| b.id == block_id) {
            let removed = page.children.remove(pos);
            let mut value = block_json(&removed);
            value["archived"] = json!(true);
            return Json(value).into_response();
        }
    }
    not_found(&block_id)
}

async fn update_page(
    State(state): State<Shared>,
    Path(page_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut st = state.lock().unwrap();
    let path = format!("/v1/pages/{}", page_id);
    if let Some(resp) = gate(&mut st, "PATCH", path, &headers, Some(body.clone())) {
        return resp;
    }
    let Some(page) = st.pages.iter_mut().find(|p| p.id == page_id) else {
        return not_found(&page_id);
    };
    if let Some(archived) = body["archived"].as_bool() {
        page.archived = archived;
    }
    Json(page_json(page)).into_response()
}

/// Start the fake on an ephemeral port; returns its `/v1` base URL.
pub async fn spawn_fake_notion(state: Shared) -> String {
    let app = Router::new()
        .route("/v1/databases/{id}/query", post(query_database))
        .route("/v1/pages", post(create_page))
        .route("/v1/pages/{id}", patch(update_page))
        .route(
            "/v1/blocks/{id}/children",
            get(list_children).patch(append_children),
        )
        .route("/v1/blocks/{id}", delete(delete_block))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}/v1", addr)
}

/// Write a `KoboReader.sqlite` fixture with five bookmarks, three of them
/// renderable. Older firmware layouts omit the `Color` column.
pub async fn create_kobo_db(path: &FsPath, with_color: bool) {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .unwrap()
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    let color_col = if with_color { ", Color INTEGER" } else { "" };
    sqlx::query(&format!(
        "CREATE TABLE Bookmark (
            BookmarkID TEXT PRIMARY KEY,
            VolumeID TEXT,
            Text TEXT,
            Annotation TEXT,
            Type TEXT,
            DateCreated TEXT{}
        )",
        color_col
    ))
    .execute(&pool)
    .await
    .unwrap();

    let rows: [(&str, &str, Option<&str>, Option<&str>, &str, &str); 5] = [
        ("b1", "file:///mnt/onboard/Dune.epub", Some("spice"), None, "highlight", "2024-01-01T10:00:00"),
        ("b2", "file:///mnt/onboard/Dune.epub", Some("worms"), Some("big"), "note", "2024-03-01T10:00:00.000"),
        ("b3", "file:///mnt/onboard/Emma.epub", None, Some("a note"), "note", "2024-02-01T10:00:00Z"),
        ("b4", "file:///mnt/onboard/Emma.epub", None, None, "dogear", "2024-04-01T10:00:00"),
        ("b5", "file:///mnt/onboard/Emma.epub", Some(""), Some(""), "highlight", "2024-05-01T10:00:00"),
    ];
    for (i, &(id, volume, text, annotation, kind, date)) in rows.iter().enumerate() {
        if with_color {
            sqlx::query(
                "INSERT INTO Bookmark (BookmarkID, VolumeID, Text, Annotation, Type, DateCreated, Color)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(volume)
            .bind(text)
            .bind(annotation)
            .bind(kind)
            .bind(date)
            .bind(i as i64)
            .execute(&pool)
            .await
            .unwrap();
        } else {
            sqlx::query(
                "INSERT INTO Bookmark (BookmarkID, VolumeID, Text, Annotation, Type, DateCreated)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(volume)
            .bind(text)
            .bind(annotation)
            .bind(kind)
            .bind(date)
            .execute(&pool)
            .await
            .unwrap();
        }
    }
    pool.close().await;
}
