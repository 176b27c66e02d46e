//! Export command: current environment records to a spreadsheet.

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde_json::json;

use super::{credentials, load_model, open_store, runtime};
use crate::cli::ExportArgs;
use crate::error::Result;
use crate::remote::RecordFilter;
use crate::sync::{write_table, Engine, Interrupt, Summary};
use crate::validate::parse_timestamp;

/// Export `args.model` from the current environment to a spreadsheet,
/// `<Model>.xlsx` unless a file is given.
///
/// Nothing is written unless the whole read succeeds.
///
/// # Errors
///
/// Returns an error if `--after` is not a timestamp, the read fails or is
/// interrupted, or the file cannot be written.
pub fn execute(args: &ExportArgs, project: Option<&Path>, json: bool) -> Result<()> {
    let modified_after = args.after.as_deref().map(parse_timestamp).transpose()?;
    let (project, schema) = load_model(project, &args.model)?;
    let source = project.current_environment().table(&schema.name);
    let rt = runtime()?;
    let session = rt.block_on(credentials(&project, &[&source]))?;
    let store = open_store(&source, &session, &schema);

    let filter = RecordFilter {
        modified_after,
        include_deleted: args.all,
    };
    let file = args
        .file
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.xlsx", schema.name)));

    let mut summary = Summary::default();
    let table = rt.block_on(async {
        Engine::new()
            .with_interrupt(Interrupt::on_ctrl_c())
            .export(&store, &schema, &filter, &mut summary)
            .await
    })?;
    write_table(&file, &table, &schema.name)?;

    if json {
        let output = json!({
            "success": true,
            "model": schema.name,
            "environment": source.environment,
            "table": source.table_name,
            "file": file.display().to_string(),
            "records": summary.records,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!(
            "{} Exported {} {} record(s) from {}",
            "✓".green().bold(),
            summary.records,
            schema.name,
            source.table_name
        );
        println!("  File: {}", file.display());
    }
    Ok(())
}
