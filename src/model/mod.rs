//! Data models for recsync.
//!
//! - [`Record`] / [`Value`]: one row of a model, as read from a store or a spreadsheet
//! - [`ModelSchema`]: the storable fields of one model

pub mod record;
pub mod schema;

pub use record::{Record, Value, BOOKKEEPING_FIELDS};
pub use schema::{FieldDef, ModelSchema, ValueKind};
