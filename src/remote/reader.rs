//! Paginated reads.
//!
//! [`read_all`] issues list requests until the store stops handing out a
//! cursor and returns every record in response order. A failed or cancelled
//! read yields `ReadInterrupted` and nothing else: partial pages are dropped.

use std::cell::Cell;
use std::future::Future;

use tracing::debug;

use super::RemoteStore;
use crate::error::{Error, Result};
use crate::model::Record;

/// Which records a read keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFilter {
    /// Keep only records with `_lastChangedAt` strictly after this (epoch ms).
    pub modified_after: Option<i64>,
    /// Keep soft-deleted records.
    pub include_deleted: bool,
}

impl RecordFilter {
    /// Keep everything, tombstones included.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            modified_after: None,
            include_deleted: true,
        }
    }

    /// Keep live records only.
    #[must_use]
    pub const fn live() -> Self {
        Self {
            modified_after: None,
            include_deleted: false,
        }
    }

    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        if !self.include_deleted && record.is_deleted() {
            return false;
        }
        match self.modified_after {
            Some(cutoff) => record.last_changed_at().is_some_and(|t| t > cutoff),
            None => true,
        }
    }
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self::all()
    }
}

/// Read every record of the store's model.
///
/// # Errors
///
/// Returns `ReadInterrupted` if any page fails or the cursor stops advancing.
/// `SessionExpired` is passed through unchanged.
pub async fn read_all<S: RemoteStore>(store: &S, filter: &RecordFilter) -> Result<Vec<Record>> {
    let pages = Cell::new(0);
    read_pages(store, filter, &pages).await
}

/// [`read_all`], abandoned as soon as `cancel` completes.
///
/// # Errors
///
/// As [`read_all`]; cancellation also yields `ReadInterrupted`.
pub async fn read_all_until<S, F>(store: &S, filter: &RecordFilter, cancel: F) -> Result<Vec<Record>>
where
    S: RemoteStore,
    F: Future<Output = ()>,
{
    let pages = Cell::new(0);
    tokio::select! {
        biased;
        () = cancel => Err(Error::ReadInterrupted {
            model: store.model().to_string(),
            pages: pages.get(),
            message: "cancelled".to_string(),
        }),
        result = read_pages(store, filter, &pages) => result,
    }
}

async fn read_pages<S: RemoteStore>(
    store: &S,
    filter: &RecordFilter,
    pages: &Cell<usize>,
) -> Result<Vec<Record>> {
    let model = store.model();
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = match store.list_page(cursor.as_deref()).await {
            Ok(page) => page,
            Err(Error::SessionExpired) => return Err(Error::SessionExpired),
            Err(e) => {
                return Err(Error::ReadInterrupted {
                    model: model.to_string(),
                    pages: pages.get(),
                    message: e.to_string(),
                });
            }
        };
        pages.set(pages.get() + 1);

        let fetched = page.records.len();
        records.extend(page.records.into_iter().filter(|r| filter.matches(r)));
        debug!(model, page = pages.get(), fetched, kept = records.len(), "read page");

        match page.next_cursor.filter(|c| !c.is_empty()) {
            None => break,
            Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                return Err(Error::ReadInterrupted {
                    model: model.to_string(),
                    pages: pages.get(),
                    message: "cursor did not advance".to_string(),
                });
            }
            Some(next) => cursor = Some(next),
        }
    }

    Ok(records)
}
