//! Model schema types produced by schema introspection.

use serde::Serialize;

/// How a field's spreadsheet cells are typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Integer,
    Float,
    Boolean,
}

impl ValueKind {
    /// Kind for a built-in GraphQL or AWS scalar. `None` for anything else.
    #[must_use]
    pub fn for_scalar(type_name: &str) -> Option<Self> {
        match type_name {
            "Int" | "AWSTimestamp" => Some(Self::Integer),
            "Float" => Some(Self::Float),
            "Boolean" => Some(Self::Boolean),
            "ID" | "String" | "AWSDate" | "AWSTime" | "AWSDateTime" | "AWSEmail" | "AWSJSON"
            | "AWSURL" | "AWSPhone" | "AWSIPAddress" => Some(Self::Text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "an integer",
            Self::Float => "a number",
            Self::Boolean => "true or false",
        }
    }
}

/// One storable field of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    pub name: String,
    /// Named GraphQL type, e.g. `String`, `AWSTimestamp`, or an enum name.
    pub type_name: String,
    pub kind: ValueKind,
    /// Declared with a non-null wrapper.
    pub required: bool,
}

/// The storable fields of one model, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSchema {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl ModelSchema {
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Required fields a create must supply. `id` is store-generated.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields
            .iter()
            .filter(|f| f.required && f.name != super::record::ID)
    }
}
