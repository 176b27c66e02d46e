//! Command implementations.
//!
//! Commands are synchronous entry points: each resolves the project and
//! schema, then drives the async engine on a fresh tokio runtime.

pub mod completions;
pub mod example;
pub mod export;
pub mod import;
pub mod sync;
pub mod version;

use std::path::Path;

use colored::Colorize;
use serde_json::json;

use crate::config::{
    page_size, DefaultSessionProvider, Project, Session, SessionProvider, TableRef,
};
use crate::error::{Error, Result};
use crate::model::ModelSchema;
use crate::remote::GraphqlStore;
use crate::schema::resolve_model;
use crate::sync::{Outcome, Summary};
use crate::validate;

/// Project and model schema for a command.
pub(crate) fn load_model(project: Option<&Path>, model: &str) -> Result<(Project, ModelSchema)> {
    let model = validate::model_name(model)?;
    let project = Project::discover(project)?;
    let schema = resolve_model(&project, model)?;
    Ok((project, schema))
}

/// Credentials for a run touching `tables`.
///
/// Environments configured with an API key need no session; the provider
/// is only consulted when at least one table lacks a key.
pub(crate) async fn credentials(project: &Project, tables: &[&TableRef]) -> Result<Session> {
    let keys: Vec<&String> = tables.iter().filter_map(|t| t.config.api_key.as_ref()).collect();
    match keys.first() {
        Some(key) if keys.len() == tables.len() => Ok(Session::api_key(key.as_str())),
        _ => DefaultSessionProvider::new(&project.app_id).credentials().await,
    }
}

/// Store for `table`, paged per `RECSYNC_PAGE_SIZE`.
pub(crate) fn open_store(table: &TableRef, session: &Session, schema: &ModelSchema) -> GraphqlStore {
    GraphqlStore::for_environment(&table.config, session, schema).with_page_size(page_size())
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

/// Print the result of an import or sync run.
pub(crate) fn print_summary(
    title: &str,
    outcome: Outcome,
    summary: &Summary,
    details: serde_json::Value,
    json: bool,
) -> Result<()> {
    if json {
        let mut output = json!({
            "success": true,
            "outcome": outcome,
            "summary": summary,
        });
        if let (Some(obj), serde_json::Value::Object(extra)) = (output.as_object_mut(), details) {
            obj.extend(extra);
        }
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    match outcome {
        Outcome::Completed => println!("{} {title}", "✓".green().bold()),
        Outcome::DryRun => println!("{} {title} (dry run, nothing written)", "•".yellow().bold()),
        Outcome::Declined => {
            println!("{} {title} declined, nothing written", "✗".yellow().bold());
            return Ok(());
        }
    }

    println!();
    println!("  Records:  {}", summary.records);
    println!("  Created:  {}", summary.create);
    println!("  Updated:  {}", summary.update);
    if summary.delete > 0 {
        println!("  Deleted:  {}", summary.delete);
    }
    println!("  Skipped:  {}", summary.skip);
    if summary.extra > 0 {
        println!("  Extra:    {} (left in place)", summary.extra);
    }
    Ok(())
}

/// Report the actions completed before a run failed.
pub(crate) fn print_partial(summary: &Summary, json: bool) {
    if summary.writes() == 0 {
        return;
    }
    if json {
        println!("{}", json!({ "success": false, "summary": summary }));
    } else {
        eprintln!(
            "Completed before the failure: {} created, {} updated, {} deleted",
            summary.create, summary.update, summary.delete
        );
    }
}
