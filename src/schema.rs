//! GraphQL schema introspection.
//!
//! Parses the schema description of an Amplify API with `graphql-parser`
//! and extracts the storable fields of one object type.
//!
//! A field participates when its type is a built-in or AWS scalar, a custom
//! `scalar`, or an `enum`. List fields and fields typed as another object,
//! interface, union or input are relations and are left out.

use std::collections::HashSet;
use std::sync::LazyLock;

use graphql_parser::schema::{parse_schema, Definition, Field, ParseError, Type, TypeDefinition};
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{FieldDef, ModelSchema, ValueKind};

/// `line:column` in a parser error message.
static ERROR_POSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"at (\d+):\d+").expect("ERROR_POSITION is a valid regex pattern")
});

/// Supplies raw schema text for a project.
pub trait SchemaSource {
    /// Read the schema description.
    ///
    /// # Errors
    ///
    /// Returns `SchemaUnavailable` if the schema cannot be located.
    fn schema_text(&self) -> Result<String>;
}

/// Resolve a model's schema from a source.
///
/// # Errors
///
/// Returns an error if the schema is unavailable, malformed, or has no such type.
pub fn resolve_model(source: &impl SchemaSource, model: &str) -> Result<ModelSchema> {
    let text = source.schema_text()?;
    introspect(&text, model)
}

/// Extract the storable fields of `model` from schema text.
///
/// # Errors
///
/// Returns `SchemaInvalid` for malformed text and `ModelNotFound` when no
/// object type is named `model`.
pub fn introspect(text: &str, model: &str) -> Result<ModelSchema> {
    let document = parse_schema::<String>(text).map_err(invalid)?;

    let types: Vec<&TypeDefinition<'_, String>> = document
        .definitions
        .iter()
        .filter_map(|d| match d {
            Definition::TypeDefinition(t) => Some(t),
            _ => None,
        })
        .collect();

    let object = types.iter().find_map(|t| match t {
        TypeDefinition::Object(o) if o.name == model => Some(o),
        _ => None,
    });
    let Some(object) = object else {
        return Err(Error::ModelNotFound {
            model: model.to_string(),
            available: types
                .iter()
                .filter_map(|t| match t {
                    TypeDefinition::Object(o) => Some(o.name.clone()),
                    _ => None,
                })
                .collect(),
        });
    };

    let declared: HashSet<&str> = types
        .iter()
        .filter_map(|t| match t {
            TypeDefinition::Enum(e) => Some(e.name.as_str()),
            TypeDefinition::Scalar(s) => Some(s.name.as_str()),
            _ => None,
        })
        .collect();

    let fields = object
        .fields
        .iter()
        .filter_map(|field| field_def(model, field, &declared))
        .collect();

    Ok(ModelSchema {
        name: object.name.clone(),
        fields,
    })
}

fn field_def(model: &str, field: &Field<'_, String>, declared: &HashSet<&str>) -> Option<FieldDef> {
    let Some((type_name, required)) = named_type(&field.field_type) else {
        debug!(model, field = %field.name, "skipping list field");
        return None;
    };

    let kind = ValueKind::for_scalar(type_name)
        .or_else(|| declared.contains(type_name).then_some(ValueKind::Text));
    let Some(kind) = kind else {
        debug!(model, field = %field.name, ty = type_name, "skipping relation field");
        return None;
    };

    Some(FieldDef {
        name: field.name.clone(),
        type_name: type_name.to_string(),
        kind,
        required,
    })
}

/// Named type and whether it is non-null. `None` for lists.
fn named_type<'t>(ty: &'t Type<'_, String>) -> Option<(&'t str, bool)> {
    match ty {
        Type::NamedType(name) => Some((name.as_str(), false)),
        Type::NonNullType(inner) => named_type(inner).map(|(name, _)| (name, true)),
        Type::ListType(_) => None,
    }
}

fn invalid(error: ParseError) -> Error {
    let text = error.to_string();
    let line = ERROR_POSITION
        .captures(&text)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);
    let message = text
        .trim_start_matches("schema parse error:")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    Error::SchemaInvalid { line, message }
}
