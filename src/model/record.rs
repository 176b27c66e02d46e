//! Record and value types.
//!
//! A [`Record`] is an ordered mapping from field name to a scalar [`Value`].
//! The store-managed bookkeeping fields (`_version`, `_deleted`,
//! `_lastChangedAt`, ...) live in the same mapping and are read through the
//! typed accessors on `Record`.

use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Unique identifier field.
pub const ID: &str = "id";
/// Store-managed version token.
pub const VERSION: &str = "_version";
/// Soft-delete flag.
pub const DELETED: &str = "_deleted";
/// Last-modified timestamp (epoch milliseconds).
pub const LAST_CHANGED_AT: &str = "_lastChangedAt";
/// Store-managed creation timestamp.
pub const CREATED_AT: &str = "createdAt";
/// Store-managed modification timestamp.
pub const UPDATED_AT: &str = "updatedAt";
/// GraphQL type tag echoed back by some stores.
pub const TYPENAME: &str = "__typename";

/// Fields the store manages on its own. They never take part in equivalence.
pub const BOOKKEEPING_FIELDS: [&str; 6] =
    [VERSION, DELETED, LAST_CHANGED_AT, CREATED_AT, UPDATED_AT, TYPENAME];

/// A scalar cell value.
///
/// Composite JSON values (objects, arrays) are carried as their JSON text.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl Value {
    /// Whether this value is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view of this value, if it holds one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            Self::String(s) => s.trim().parse().ok(),
            Self::Null | Self::Bool(_) => None,
        }
    }

    /// Text rendering used for spreadsheet cells; `None` for null.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::String(s) => Some(s.clone()),
        }
    }

    /// Convert into a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

// 1 and 1.0 compare equal: spreadsheets and stores disagree on integral floats.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => {
                if a.is_f64() || b.is_f64() {
                    a.as_f64() == b.as_f64()
                } else {
                    a == b
                }
            }
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            composite @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Self::String(composite.to_string())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

/// One record: an ordered field-name → value mapping.
///
/// Equality is order-independent (same key set, same values).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON object. Non-object values yield `None`.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => Some(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Convert into a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The record identifier. Null or blank identifiers count as absent.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self.fields.get(ID)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The store-managed version token.
    #[must_use]
    pub fn version(&self) -> Option<i64> {
        self.fields.get(VERSION).and_then(Value::as_i64)
    }

    /// Last-modified timestamp in epoch milliseconds.
    #[must_use]
    pub fn last_changed_at(&self) -> Option<i64> {
        self.fields.get(LAST_CHANGED_AT).and_then(Value::as_i64)
    }

    /// Whether the record carries a true soft-delete flag.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        matches!(self.fields.get(DELETED), Some(Value::Bool(true)))
    }

    /// Copy of this record without the given fields.
    #[must_use]
    pub fn without<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> Self {
        let mut out = self.clone();
        for field in fields {
            out.fields.shift_remove(field);
        }
        out
    }

    /// Copy of this record restricted to `fields`, in `fields` order.
    ///
    /// Fields missing from the record stay missing.
    #[must_use]
    pub fn project<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> Self {
        fields
            .into_iter()
            .filter_map(|f| self.fields.get(f).map(|v| (f.to_string(), v.clone())))
            .collect()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
