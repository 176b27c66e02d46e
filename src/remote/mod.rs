//! Remote record stores.
//!
//! - [`RemoteStore`]: the operations the engine needs from a store bound to one model
//! - [`read_all`]: follows list cursors to exhaustion
//! - [`GraphqlStore`]: AppSync/Amplify GraphQL implementation
//! - [`MemoryStore`]: in-process implementation with failure injection

mod graphql;
mod memory;
mod reader;

pub use graphql::GraphqlStore;
pub use memory::MemoryStore;
pub use reader::{read_all, read_all_until, RecordFilter};

use std::future::Future;

use crate::error::Result;
use crate::model::Record;

/// One page of a list request.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<Record>,
    /// Continuation cursor. `None` (or empty) means no more pages.
    pub next_cursor: Option<String>,
}

/// A record store bound to a single model.
///
/// Every call is one round trip. Update and delete carry the version token
/// the caller last saw and fail with `VersionConflict` when it is stale.
pub trait RemoteStore: Send + Sync {
    /// Model name this store serves.
    fn model(&self) -> &str;

    /// Fetch one page starting at `cursor` (`None` for the first page).
    fn list_page(&self, cursor: Option<&str>) -> impl Future<Output = Result<Page>> + Send;

    /// Point read by identifier.
    fn get_by_id(&self, id: &str) -> impl Future<Output = Result<Option<Record>>> + Send;

    /// Create a record; returns its identifier.
    fn create(&self, record: &Record) -> impl Future<Output = Result<String>> + Send;

    /// Update the record identified by `record`'s `id`.
    fn update(
        &self,
        record: &Record,
        version: Option<i64>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete (soft-delete, where the store supports it) a record.
    fn delete(&self, id: &str, version: Option<i64>) -> impl Future<Output = Result<()>> + Send;
}
