//! Example command: a template spreadsheet for a model.

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde_json::json;

use super::load_model;
use crate::cli::ExampleArgs;
use crate::error::{Error, Result};
use crate::model::{ModelSchema, Value};
use crate::sync::{write_table, Table};

/// Header of field names, then one row of type names.
#[must_use]
pub fn template(schema: &ModelSchema) -> Table {
    Table {
        header: schema.field_names().map(String::from).collect(),
        rows: vec![
            schema
                .fields
                .iter()
                .map(|f| Value::String(f.type_name.clone()))
                .collect(),
        ],
    }
}

/// Write the template for `args.model`. Needs no credentials.
///
/// # Errors
///
/// Returns an error if the model is unknown or the file cannot be written.
pub fn execute(args: &ExampleArgs, project: Option<&Path>, json: bool) -> Result<()> {
    let (_project, schema) = load_model(project, &args.model)?;
    if schema.fields.is_empty() {
        return Err(Error::ModelNotFound {
            model: schema.name,
            available: Vec::new(),
        });
    }
    let file = args
        .file
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.xlsx", schema.name)));

    write_table(&file, &template(&schema), &schema.name)?;

    if json {
        let output = json!({
            "success": true,
            "model": schema.name,
            "file": file.display().to_string(),
            "fields": schema.fields,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{} Wrote {} template", "✓".green().bold(), schema.name);
        println!("  File: {}", file.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDef, ValueKind};

    #[test]
    fn test_template_rows() {
        let schema = ModelSchema {
            name: "Todo".into(),
            fields: vec![
                FieldDef {
                    name: "id".into(),
                    type_name: "ID".into(),
                    kind: ValueKind::Text,
                    required: true,
                },
                FieldDef {
                    name: "priority".into(),
                    type_name: "Int".into(),
                    kind: ValueKind::Integer,
                    required: false,
                },
            ],
        };

        let table = template(&schema);
        assert_eq!(table.header, vec!["id", "priority"]);
        assert_eq!(table.rows, vec![vec![Value::from("ID"), Value::from("Int")]]);
    }
}
