//! # kobo-notion
//!
//! Sync highlights and notes from a Kobo e-reader into a Notion database,
//! one page per book.
//!
//! The reconciliation logic lives in [`kobo_notion_core`]; this crate
//! supplies the pieces that touch the outside world.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────┐
//! │ KoboReader   │──▶│    SyncEngine    │──▶│  Notion  │
//! │ .sqlite      │   │ group/diff/index │   │   API    │
//! └──────────────┘   └──────────────────┘   └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration plus environment overrides |
//! | [`logging`] | Tracing to stderr and a log file |
//! | [`db`] | Read-only SQLite connection |
//! | [`kobo`] | `Bookmark` table reader |
//! | [`notion`] | Notion REST client |
//! | [`sync`] | `kobo-notion sync` |
//! | [`status`] | `kobo-notion status` |

pub mod config;
pub mod db;
pub mod kobo;
pub mod logging;
pub mod notion;
pub mod status;
pub mod sync;
