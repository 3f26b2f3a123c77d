//! # kobo-notion core
//!
//! The reconciliation engine behind `kobo-notion`: data models, grouping,
//! fragment rendering, diffing, the identity index, and the reconciler,
//! plus the [`store::RemoteStore`] and [`source::RecordSource`] traits the
//! engine is written against.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O. The
//! application crate supplies the Kobo reader and the Notion client.
//!
//! ## Data Flow
//!
//! ```text
//! RecordSource ──▶ group_by_title ──▶ Reconciler ──▶ RemoteStore
//!                                       │   ▲
//!                        IdentityIndex ─┘   └─ diff / render_fragments
//! ```

pub mod dates;
pub mod diff;
pub mod engine;
pub mod error;
pub mod index;
pub mod models;
pub mod projection;
pub mod reconcile;
pub mod render;
pub mod source;
pub mod store;

pub use engine::SyncEngine;
pub use error::{ErrorKind, StoreError, SyncError};
pub use models::{BookmarkRecord, RunReport};
pub use source::RecordSource;
pub use store::RemoteStore;
