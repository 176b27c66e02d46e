//! In-process record store.
//!
//! Behaves like a conflict-detecting GraphQL store: every write bumps
//! `_version` and `_lastChangedAt`, update and delete check the caller's
//! version token, and deletes are soft (`_deleted: true`). Cursors are
//! offsets into the insertion order.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Page, RemoteStore};
use crate::error::{Error, Result};
use crate::model::record::{DELETED, ID, LAST_CHANGED_AT, VERSION};
use crate::model::{Record, Value, BOOKKEEPING_FIELDS};

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Default)]
struct State {
    records: Vec<Record>,
    next_id: u64,
    clock: i64,
    list_calls: usize,
    writes: usize,
    write_attempts: usize,
    fail_list_page: Option<usize>,
    fail_write: Option<usize>,
}

/// Record store kept in memory.
#[derive(Debug)]
pub struct MemoryStore {
    model: String,
    page_size: usize,
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            page_size: DEFAULT_PAGE_SIZE,
            state: Mutex::new(State {
                clock: 1,
                ..State::default()
            }),
        }
    }

    /// Seed the store. Records are kept exactly as given.
    #[must_use]
    pub fn with_records(self, records: Vec<Record>) -> Self {
        self.lock().records = records;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make the `n`th list request (1-based) fail.
    pub fn fail_list_page(&self, n: usize) {
        self.lock().fail_list_page = Some(n);
    }

    /// Make the `n`th write (1-based) fail.
    pub fn fail_write(&self, n: usize) {
        self.lock().fail_write = Some(n);
    }

    /// Simulate a concurrent writer touching `id`.
    pub fn touch(&self, id: &str) {
        let mut state = self.lock();
        let now = state.tick();
        if let Some(record) = state.find_mut(id) {
            bump(record, now);
        }
    }

    /// Snapshot of every stored record, tombstones included.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.lock().records.clone()
    }

    /// Number of list requests served.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    /// Number of successful writes.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn conflict(&self, id: &str, version: Option<i64>) -> Error {
        Error::VersionConflict {
            model: self.model.clone(),
            id: id.to_string(),
            version,
        }
    }
}

impl State {
    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Record> {
        self.records
            .iter_mut()
            .find(|r| r.id().as_deref() == Some(id))
    }

    /// Count a write attempt; `true` if it should fail.
    fn write_fails(&mut self) -> bool {
        self.write_attempts += 1;
        self.fail_write == Some(self.write_attempts)
    }
}

fn bump(record: &mut Record, now: i64) {
    let version = record.version().unwrap_or(0) + 1;
    record.insert(VERSION, version);
    record.insert(LAST_CHANGED_AT, now);
}

impl RemoteStore for MemoryStore {
    fn model(&self) -> &str {
        &self.model
    }

    async fn list_page(&self, cursor: Option<&str>) -> Result<Page> {
        let mut state = self.lock();
        state.list_calls += 1;
        if state.fail_list_page == Some(state.list_calls) {
            return Err(Error::Remote("injected list failure".into()));
        }

        let start = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| Error::Remote(format!("invalid cursor: {c}")))?,
            None => 0,
        };
        let end = start.saturating_add(self.page_size).min(state.records.len());
        let records = state.records.get(start..end).unwrap_or_default().to_vec();
        let next_cursor = (end < state.records.len()).then(|| end.to_string());

        Ok(Page {
            records,
            next_cursor,
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Record>> {
        Ok(self.lock().find_mut(id).map(|r| r.clone()))
    }

    async fn create(&self, record: &Record) -> Result<String> {
        let mut state = self.lock();
        if state.write_fails() {
            return Err(Error::Remote("injected write failure".into()));
        }

        let id = match record.id() {
            Some(id) => {
                if state.find_mut(&id).is_some() {
                    return Err(Error::Remote(format!("{} {id} already exists", self.model)));
                }
                id
            }
            None => {
                state.next_id += 1;
                format!("mem-{}", state.next_id)
            }
        };

        let mut stored = record.without(BOOKKEEPING_FIELDS);
        stored.insert(ID, id.clone());
        let now = state.tick();
        bump(&mut stored, now);
        state.records.push(stored);
        state.writes += 1;
        Ok(id)
    }

    async fn update(&self, record: &Record, version: Option<i64>) -> Result<()> {
        let id = record
            .id()
            .ok_or_else(|| Error::InvalidArgument("update requires an id".into()))?;

        let mut state = self.lock();
        if state.write_fails() {
            return Err(Error::Remote("injected write failure".into()));
        }
        let now = state.tick();
        let Some(stored) = state.find_mut(&id) else {
            return Err(Error::Remote(format!("{} {id} not found", self.model)));
        };
        if stored.version() != version || stored.is_deleted() {
            return Err(self.conflict(&id, version));
        }

        for (field, value) in record.iter() {
            if !BOOKKEEPING_FIELDS.contains(&field) {
                stored.insert(field, value.clone());
            }
        }
        bump(stored, now);
        state.writes += 1;
        Ok(())
    }

    async fn delete(&self, id: &str, version: Option<i64>) -> Result<()> {
        let mut state = self.lock();
        if state.write_fails() {
            return Err(Error::Remote("injected write failure".into()));
        }
        let now = state.tick();
        let Some(stored) = state.find_mut(id) else {
            return Err(Error::Remote(format!("{} {id} not found", self.model)));
        };
        if stored.version() != version || stored.is_deleted() {
            return Err(self.conflict(id, version));
        }

        stored.insert(DELETED, Value::Bool(true));
        bump(stored, now);
        state.writes += 1;
        Ok(())
    }
}
