//! Import command: spreadsheet rows into the current environment.

use std::path::Path;

use serde_json::json;
use tracing::info;

use super::{credentials, load_model, open_store, print_partial, print_summary, runtime};
use crate::cli::ImportArgs;
use crate::error::Result;
use crate::sync::{read_table, Engine, ImportOptions, Interrupt, Summary};

/// Import `args.file` into `args.model` in the project's current environment.
///
/// # Errors
///
/// Returns an error if the project, schema or spreadsheet cannot be loaded,
/// a row is invalid, a store request fails, or Ctrl-C is pressed. Rows before
/// the failure stay written and are reported.
pub fn execute(args: &ImportArgs, project: Option<&Path>, json: bool) -> Result<()> {
    let (project, schema) = load_model(project, &args.model)?;
    let table = read_table(&args.file)?;
    let target = project.current_environment().table(&schema.name);
    let rt = runtime()?;
    let session = rt.block_on(credentials(&project, &[&target]))?;
    let store = open_store(&target, &session, &schema);

    info!(
        file = %args.file.display(),
        table = %target.table_name,
        rows = table.rows.len(),
        "importing"
    );

    let mut summary = Summary::default();
    let options = ImportOptions { dry_run: args.dryrun };
    let result = rt.block_on(async {
        Engine::new()
            .with_interrupt(Interrupt::on_ctrl_c())
            .import(&store, &schema, &table, options, &mut summary)
            .await
    });

    match result {
        Ok(outcome) => print_summary(
            &format!("Import into {} ({})", target.table_name, target.environment),
            outcome,
            &summary,
            json!({
                "model": schema.name,
                "environment": target.environment,
                "table": target.table_name,
                "file": args.file.display().to_string(),
            }),
            json,
        ),
        Err(e) => {
            print_partial(&summary, json);
            Err(e)
        }
    }
}
