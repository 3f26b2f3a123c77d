//! The `sync` command.
//!
//! Wires the Kobo reader and the Notion client into a [`SyncEngine`] and
//! prints the resulting [`RunReport`]. With `--dry-run` the client is
//! wrapped in a [`DryRunStore`]: reads hit Notion, writes are only listed.

use anyhow::Result;
use std::sync::Arc;

use kobo_notion_core::store::dry_run::DryRunStore;
use kobo_notion_core::store::Mutation;
use kobo_notion_core::{RunReport, SyncEngine};

use crate::config::Config;
use crate::kobo::KoboDatabase;
use crate::notion::NotionClient;

pub async fn run_sync(config: &Config, dry_run: bool, json: bool) -> Result<RunReport> {
    let resolved = config.resolved()?;
    let source = Arc::new(KoboDatabase::open(resolved.db_path));
    let client = NotionClient::from_config(config)?;

    tracing::info!(
        db_path = %resolved.db_path.display(),
        database_id = resolved.database_id,
        dry_run,
        "starting sync"
    );

    let (report, planned) = if dry_run {
        let store = Arc::new(DryRunStore::new(client));
        let engine = SyncEngine::new(store.clone(), source);
        let report = engine.sync().await?;
        (report, Some(store.planned()))
    } else {
        let engine = SyncEngine::new(Arc::new(client), source);
        (engine.sync().await?, None)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, planned.as_deref());
    }
    Ok(report)
}

fn print_report(report: &RunReport, planned: Option<&[Mutation]>) {
    match planned {
        Some(_) => println!("sync (dry-run)"),
        None => println!("sync"),
    }
    println!("  created:           {}", report.created);
    println!("  updated:           {}", report.updated);
    println!("  unchanged:         {}", report.unchanged);
    println!("  archived:          {}", report.archived);
    println!("  fragments added:   {}", report.fragments_added);
    println!("  fragments removed: {}", report.fragments_removed);
    println!("  new bookmarks:     {}", report.new_bookmarks);

    if let Some(planned) = planned {
        println!("  planned writes:    {}", planned.len());
        for m in planned {
            println!("    {}", describe(m));
        }
    }

    if report.errors.is_empty() {
        println!("ok");
    } else {
        println!("  errors:            {}", report.errors.len());
        for e in &report.errors {
            println!("    [{:?}] {}: {}", e.kind, e.title, e.message);
        }
    }
}

fn describe(mutation: &Mutation) -> String {
    match mutation {
        Mutation::Create { title, children } => {
            format!("create \"{}\" ({} fragments)", title, children)
        }
        Mutation::Append { document_id, count } => {
            format!("append {} fragments to {}", count, document_id)
        }
        Mutation::Delete { fragment_id } => format!("delete fragment {}", fragment_id),
        Mutation::Archive { document_id } => format!("archive {}", document_id),
    }
}
