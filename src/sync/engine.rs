//! Reconciliation engine.
//!
//! Drives import, export and sync runs against [`RemoteStore`]s:
//!
//! ```text
//! Init → SchemaResolved → Reading(source) → [Reading(target)] → Diffing
//!      → Executing → Reporting → Done
//! ```
//!
//! Every remote call is awaited in sequence. The first failed write aborts
//! the run; the caller's [`Summary`] then holds the actions completed so far.
//! A raised [`Interrupt`] abandons reads and stops the run before its next
//! write.

use tracing::{debug, info, warn};

use super::diff::{classify, plan_sync};
use super::interrupt::Interrupt;
use super::tabular::{coerce_to_schema, records_to_rows_seeded, rows_to_records, unknown_columns, Table};
use super::types::{Action, ClassifyOptions, ImportOptions, Outcome, RunState, Summary, SyncOptions};
use crate::error::{Error, Result};
use crate::model::record::VERSION;
use crate::model::{ModelSchema, Record};
use crate::remote::{read_all, read_all_until, RecordFilter, RemoteStore};

/// Asks the operator before a destructive run.
pub trait Confirmation {
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn confirm(&self, message: &str) -> Result<bool>;
}

/// Answers yes without asking (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirmation for AssumeYes {
    fn confirm(&self, _message: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Runs reconciliation.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    interrupt: Option<Interrupt>,
}

impl Engine {
    #[must_use]
    pub const fn new() -> Self {
        Self { interrupt: None }
    }

    /// Stop reads and writes once `interrupt` is raised.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Import spreadsheet rows into `store`.
    ///
    /// Rows with an `id` are compared with the stored record over the
    /// spreadsheet's own columns; rows without one are created.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCell` or `RequiredField` for bad rows, and any store
    /// error from a point read or write, or `Interrupted`. Rows before the
    /// failing one stay written.
    pub async fn import<S: RemoteStore>(
        &self,
        store: &S,
        schema: &ModelSchema,
        table: &Table,
        options: ImportOptions,
        summary: &mut Summary,
    ) -> Result<Outcome> {
        let model = store.model();
        transition(model, RunState::Init);
        transition(model, RunState::SchemaResolved);

        let unknown = unknown_columns(&table.header, schema);
        if !unknown.is_empty() {
            warn!(model, columns = ?unknown, "ignoring columns not in the model");
        }
        let (records, _dropped) = rows_to_records(table);

        transition(model, RunState::Executing);
        for (index, raw) in records.iter().enumerate() {
            let row = Table::row_number(index);
            let record = coerce_to_schema(raw, schema, row)?;
            if record.is_empty() {
                debug!(model, row, "skipping blank row");
                continue;
            }
            summary.records += 1;

            let target = match record.id() {
                Some(id) => store.get_by_id(&id).await?,
                None => None,
            };
            let action = match target {
                Some(target) if target.is_deleted() => {
                    warn!(model, row, id = ?target.id(), "stored record is deleted, skipping");
                    Action::Skip { id: target.id() }
                }
                target => {
                    let compared = target.map(|t| t.project(record.keys().chain([VERSION])));
                    classify(&record, compared.as_ref(), ClassifyOptions::default())
                }
            };

            if let Action::Create(created) = &action {
                check_required(created, schema, row)?;
            }
            if !options.dry_run {
                self.check_interrupt(model)?;
                execute(store, &action).await?;
            }
            summary.record(action.kind());
        }

        transition(model, RunState::Reporting);
        transition(model, RunState::Done);
        Ok(if options.dry_run {
            Outcome::DryRun
        } else {
            Outcome::Completed
        })
    }

    /// Read `store` into a spreadsheet table of the schema's fields.
    ///
    /// # Errors
    ///
    /// Returns `ReadInterrupted` if the read fails or is cancelled.
    pub async fn export<S: RemoteStore>(
        &self,
        store: &S,
        schema: &ModelSchema,
        filter: &RecordFilter,
        summary: &mut Summary,
    ) -> Result<Table> {
        let model = store.model();
        transition(model, RunState::Init);
        transition(model, RunState::SchemaResolved);

        transition(model, RunState::ReadingSource);
        let records = self.read(store, filter).await?;

        transition(model, RunState::Reporting);
        let fields: Vec<&str> = schema.field_names().collect();
        let projected: Vec<Record> = records
            .iter()
            .map(|r| r.project(fields.iter().copied()))
            .collect();
        summary.records = projected.len();

        transition(model, RunState::Done);
        Ok(records_to_rows_seeded(&projected, &fields))
    }

    /// Make `target` match `source`.
    ///
    /// When `delete_extra` is set and there is anything to write, `confirm`
    /// is asked once before the first write.
    ///
    /// # Errors
    ///
    /// Returns `ReadInterrupted` if either read fails, `Interrupted` if the
    /// interrupt is raised between writes, or the first failed write (e.g.
    /// `VersionConflict`). Writes before it stay applied.
    pub async fn sync<S: RemoteStore, T: RemoteStore>(
        &self,
        source: &S,
        target: &T,
        options: &SyncOptions,
        confirm: &dyn Confirmation,
        summary: &mut Summary,
    ) -> Result<Outcome> {
        let model = target.model();
        transition(model, RunState::Init);

        transition(model, RunState::ReadingSource);
        let source_records = self.read(source, &RecordFilter::all()).await?;
        transition(model, RunState::ReadingTarget);
        let target_records = self.read(target, &RecordFilter::all()).await?;

        transition(model, RunState::Diffing);
        let plan = plan_sync(&source_records, &target_records, options);
        summary.records = source_records.iter().filter(|r| !r.is_deleted()).count();
        summary.extra = plan.extra;

        if options.dry_run {
            for action in &plan.actions {
                summary.record(action.kind());
            }
            transition(model, RunState::Reporting);
            transition(model, RunState::Done);
            return Ok(Outcome::DryRun);
        }

        let writes = plan.writes();
        if options.delete_extra && writes > 0 {
            let deletes = plan
                .actions
                .iter()
                .filter(|a| matches!(a, Action::Delete { .. }))
                .count();
            let message = format!(
                "{writes} write(s) to {model}, including {deletes} delete(s). Continue?"
            );
            if !confirm.confirm(&message)? {
                info!(model, "sync declined");
                transition(model, RunState::Done);
                return Ok(Outcome::Declined);
            }
        }

        transition(model, RunState::Executing);
        for action in &plan.actions {
            self.check_interrupt(model)?;
            execute(target, action).await?;
            summary.record(action.kind());
        }

        transition(model, RunState::Reporting);
        transition(model, RunState::Done);
        Ok(Outcome::Completed)
    }

    async fn read<S: RemoteStore>(&self, store: &S, filter: &RecordFilter) -> Result<Vec<Record>> {
        match &self.interrupt {
            Some(interrupt) => read_all_until(store, filter, interrupt.raised()).await,
            None => read_all(store, filter).await,
        }
    }

    fn check_interrupt(&self, model: &str) -> Result<()> {
        if self.interrupt.as_ref().is_some_and(Interrupt::is_raised) {
            warn!(model, "run interrupted");
            return Err(Error::Interrupted {
                model: model.to_string(),
            });
        }
        Ok(())
    }
}

fn transition(model: &str, state: RunState) {
    debug!(model, %state, "state");
}

fn check_required(record: &Record, schema: &ModelSchema, row: usize) -> Result<()> {
    for field in schema.required_fields() {
        if record.get(&field.name).is_none_or(|v| v.is_null()) {
            return Err(Error::RequiredField {
                model: schema.name.clone(),
                row,
                field: field.name.clone(),
            });
        }
    }
    Ok(())
}

async fn execute<S: RemoteStore>(store: &S, action: &Action) -> Result<()> {
    let model = store.model();
    match action {
        Action::Create(record) => {
            let id = store.create(record).await?;
            info!(model, %id, "created");
        }
        Action::Update { record, version } => {
            store.update(record, *version).await?;
            info!(model, id = ?record.id(), ?version, "updated");
        }
        Action::Delete { id, version } => {
            store.delete(id, *version).await?;
            info!(model, %id, ?version, "deleted");
        }
        Action::Skip { id } => debug!(model, ?id, "unchanged"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;
    use crate::remote::{MemoryStore, Page};
    use crate::schema::introspect;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::Cell;

    fn rec(value: serde_json::Value) -> Record {
        Record::from_json(value).unwrap()
    }

    fn store(records: Vec<serde_json::Value>) -> MemoryStore {
        MemoryStore::new("Todo").with_records(records.into_iter().map(rec).collect())
    }

    fn schema() -> ModelSchema {
        introspect(
            "type Todo @model { id: ID! name: String! done: Boolean priority: Int }",
            "Todo",
        )
        .unwrap()
    }

    fn live(store: &MemoryStore) -> Vec<Record> {
        store.records().into_iter().filter(|r| !r.is_deleted()).collect()
    }

    /// Counts prompts and answers with a fixed value.
    struct Prompt {
        answer: bool,
        asked: Cell<usize>,
    }

    impl Prompt {
        fn new(answer: bool) -> Self {
            Self {
                answer,
                asked: Cell::new(0),
            }
        }
    }

    impl Confirmation for Prompt {
        fn confirm(&self, _message: &str) -> Result<bool> {
            self.asked.set(self.asked.get() + 1);
            Ok(self.answer)
        }
    }

    /// Lets another writer bump every record just before each update.
    struct Racing(MemoryStore);

    impl RemoteStore for Racing {
        fn model(&self) -> &str {
            self.0.model()
        }

        async fn list_page(&self, cursor: Option<&str>) -> Result<Page> {
            self.0.list_page(cursor).await
        }

        async fn get_by_id(&self, id: &str) -> Result<Option<Record>> {
            self.0.get_by_id(id).await
        }

        async fn create(&self, record: &Record) -> Result<String> {
            self.0.create(record).await
        }

        async fn update(&self, record: &Record, version: Option<i64>) -> Result<()> {
            if let Some(id) = record.id() {
                self.0.touch(&id);
            }
            self.0.update(record, version).await
        }

        async fn delete(&self, id: &str, version: Option<i64>) -> Result<()> {
            self.0.delete(id, version).await
        }
    }

    /// Raises the interrupt as soon as the first record is created.
    struct InterruptOnCreate {
        store: MemoryStore,
        interrupt: Interrupt,
    }

    impl RemoteStore for InterruptOnCreate {
        fn model(&self) -> &str {
            self.store.model()
        }

        async fn list_page(&self, cursor: Option<&str>) -> Result<Page> {
            self.store.list_page(cursor).await
        }

        async fn get_by_id(&self, id: &str) -> Result<Option<Record>> {
            self.store.get_by_id(id).await
        }

        async fn create(&self, record: &Record) -> Result<String> {
            self.interrupt.raise();
            self.store.create(record).await
        }

        async fn update(&self, record: &Record, version: Option<i64>) -> Result<()> {
            self.store.update(record, version).await
        }

        async fn delete(&self, id: &str, version: Option<i64>) -> Result<()> {
            self.store.delete(id, version).await
        }
    }

    // ── sync ─────────────────────────────────────────────────

    #[tokio::test]
    async fn test_sync_into_empty_target() {
        let source = store(vec![json!({"id": "1", "name": "A"}), json!({"id": "2", "name": "B"})]);
        let target = MemoryStore::new("Todo");
        let mut summary = Summary::default();

        let outcome = Engine::new()
            .sync(&source, &target, &SyncOptions::default(), &AssumeYes, &mut summary)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(
            summary,
            Summary {
                create: 2,
                records: 2,
                ..Summary::default()
            }
        );
        assert_eq!(target.records().len(), 2);
    }

    #[tokio::test]
    async fn test_sync_skips_equivalent() {
        let source = store(vec![json!({"id": "1", "name": "A"})]);
        let target = store(vec![json!({"id": "1", "name": "A", "_version": 3})]);
        let mut summary = Summary::default();

        Engine::new()
            .sync(&source, &target, &SyncOptions::default(), &AssumeYes, &mut summary)
            .await
            .unwrap();

        assert_eq!(summary.skip, 1);
        assert_eq!(summary.writes(), 0);
        assert_eq!(target.writes(), 0);
    }

    #[tokio::test]
    async fn test_sync_updates_with_target_version() {
        let source = store(vec![json!({"id": "1", "name": "A2"})]);
        let target = store(vec![json!({"id": "1", "name": "A", "_version": 3})]);
        let mut summary = Summary::default();

        Engine::new()
            .sync(&source, &target, &SyncOptions::default(), &AssumeYes, &mut summary)
            .await
            .unwrap();

        assert_eq!(summary.update, 1);
        let stored = target.get_by_id("1").await.unwrap().unwrap();
        assert_eq!(stored.get("name"), Some(&Value::from("A2")));
        assert_eq!(stored.version(), Some(4));
    }

    #[tokio::test]
    async fn test_stale_write_aborts_with_partial_summary() {
        let source = store(vec![json!({"id": "0", "name": "new"}), json!({"id": "1", "name": "A2"})]);
        let target = Racing(store(vec![json!({"id": "1", "name": "A", "_version": 3})]));
        let mut summary = Summary::default();

        let err = Engine::new()
            .sync(&source, &target, &SyncOptions::default(), &AssumeYes, &mut summary)
            .await
            .unwrap_err();

        match err {
            Error::VersionConflict { id, version, .. } => {
                assert_eq!(id, "1");
                assert_eq!(version, Some(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(summary.create, 1);
        assert_eq!(summary.update, 0);
        assert_eq!(target.0.records().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_extra_with_confirmation() {
        let source = store(vec![json!({"id": "1", "name": "A"})]);
        let target = store(vec![
            json!({"id": "1", "name": "A", "_version": 1}),
            json!({"id": "9", "name": "Z", "_version": 2}),
        ]);
        let options = SyncOptions {
            delete_extra: true,
            ..SyncOptions::default()
        };
        let prompt = Prompt::new(true);
        let mut summary = Summary::default();

        let outcome = Engine::new()
            .sync(&source, &target, &options, &prompt, &mut summary)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(prompt.asked.get(), 1);
        assert_eq!(summary.delete, 1);
        let ids: Vec<String> = live(&target).iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn test_extra_counted_without_delete() {
        let source = store(vec![json!({"id": "1", "name": "A"})]);
        let target = store(vec![
            json!({"id": "1", "name": "A", "_version": 1}),
            json!({"id": "9", "name": "Z", "_version": 2}),
        ]);
        let options = SyncOptions::default();
        let prompt = Prompt::new(true);
        let mut summary = Summary::default();

        Engine::new()
            .sync(&source, &target, &options, &prompt, &mut summary)
            .await
            .unwrap();

        assert_eq!(summary.extra, 1);
        assert_eq!(summary.delete, 0);
        assert_eq!(prompt.asked.get(), 0);
        assert_eq!(live(&target).len(), 2);
    }

    #[tokio::test]
    async fn test_declined_sync_writes_nothing() {
        let source = store(vec![json!({"id": "1", "name": "changed"})]);
        let target = store(vec![
            json!({"id": "1", "name": "A", "_version": 1}),
            json!({"id": "9", "name": "Z", "_version": 2}),
        ]);
        let options = SyncOptions {
            delete_extra: true,
            ..SyncOptions::default()
        };
        let mut summary = Summary::default();

        let outcome = Engine::new()
            .sync(&source, &target, &options, &Prompt::new(false), &mut summary)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Declined);
        assert_eq!(target.writes(), 0);
        assert_eq!(summary.writes(), 0);
    }

    #[tokio::test]
    async fn test_no_prompt_when_nothing_to_write() {
        let source = store(vec![json!({"id": "1", "name": "A"})]);
        let target = store(vec![json!({"id": "1", "name": "A", "_version": 1})]);
        let options = SyncOptions {
            delete_extra: true,
            ..SyncOptions::default()
        };
        let prompt = Prompt::new(false);
        let mut summary = Summary::default();

        let outcome = Engine::new()
            .sync(&source, &target, &options, &prompt, &mut summary)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(prompt.asked.get(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_counts_without_writing() {
        let source = store(vec![json!({"id": "1", "name": "A2"}), json!({"id": "2", "name": "B"})]);
        let target = store(vec![
            json!({"id": "1", "name": "A", "_version": 3}),
            json!({"id": "9", "name": "Z", "_version": 1}),
        ]);
        let options = SyncOptions {
            delete_extra: true,
            dry_run: true,
            ..SyncOptions::default()
        };
        let prompt = Prompt::new(true);
        let mut summary = Summary::default();

        let outcome = Engine::new()
            .sync(&source, &target, &options, &prompt, &mut summary)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::DryRun);
        assert_eq!((summary.create, summary.update, summary.delete), (1, 1, 1));
        assert_eq!(prompt.asked.get(), 0);
        assert_eq!(target.writes(), 0);
    }

    #[tokio::test]
    async fn test_second_sync_is_a_no_op() {
        let source = store(vec![
            json!({"id": "1", "name": "A", "done": true}),
            json!({"id": "2", "name": "B", "done": null}),
        ]);
        let target = store(vec![json!({"id": "1", "name": "old", "done": false, "_version": 5})]);

        let mut first = Summary::default();
        Engine::new()
            .sync(&source, &target, &SyncOptions::default(), &AssumeYes, &mut first)
            .await
            .unwrap();
        assert_eq!((first.create, first.update), (1, 1));

        let mut second = Summary::default();
        Engine::new()
            .sync(&source, &target, &SyncOptions::default(), &AssumeYes, &mut second)
            .await
            .unwrap();
        assert_eq!((second.create, second.update, second.skip), (0, 0, 2));
    }

    #[tokio::test]
    async fn test_failed_source_read_writes_nothing() {
        let source = store(vec![json!({"id": "1", "name": "A"})]);
        source.fail_list_page(1);
        let target = MemoryStore::new("Todo");
        let mut summary = Summary::default();

        let err = Engine::new()
            .sync(&source, &target, &SyncOptions::default(), &AssumeYes, &mut summary)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ReadInterrupted { .. }));
        assert_eq!(target.writes(), 0);
        assert_eq!(summary, Summary::default());
    }

    #[tokio::test]
    async fn test_interrupt_stops_before_next_write() {
        let source = store(vec![json!({"id": "1", "name": "A"}), json!({"id": "2", "name": "B"})]);
        let interrupt = Interrupt::new();
        let target = InterruptOnCreate {
            store: MemoryStore::new("Todo"),
            interrupt: interrupt.clone(),
        };
        let mut summary = Summary::default();

        let err = Engine::new()
            .with_interrupt(interrupt)
            .sync(&source, &target, &SyncOptions::default(), &AssumeYes, &mut summary)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Interrupted { .. }));
        assert_eq!(summary.create, 1);
        assert_eq!(target.store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_raised_interrupt_abandons_reads() {
        let source = store(vec![json!({"id": "1", "name": "A"})]);
        let target = MemoryStore::new("Todo");
        let interrupt = Interrupt::new();
        interrupt.raise();
        let mut summary = Summary::default();

        let err = Engine::new()
            .with_interrupt(interrupt)
            .sync(&source, &target, &SyncOptions::default(), &AssumeYes, &mut summary)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ReadInterrupted { .. }));
        assert_eq!(target.writes(), 0);
    }

    #[tokio::test]
    async fn test_unraised_interrupt_runs_to_completion() {
        let source = store(vec![json!({"id": "1", "name": "A"}), json!({"id": "2", "name": "B"})]);
        let target = MemoryStore::new("Todo");
        let mut summary = Summary::default();

        let outcome = Engine::new()
            .with_interrupt(Interrupt::new())
            .sync(&source, &target, &SyncOptions::default(), &AssumeYes, &mut summary)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(summary.create, 2);
    }

    // ── export ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_export_filters_and_projects() {
        let source = store(vec![
            json!({"id": "a", "name": "old", "_lastChangedAt": 900, "_version": 1}),
            json!({"id": "b", "name": "new", "_lastChangedAt": 1100, "_version": 1, "createdAt": "x"}),
            json!({"id": "c", "name": "gone", "_lastChangedAt": 1200, "_version": 2, "_deleted": true}),
        ]);
        let filter = RecordFilter {
            modified_after: Some(1000),
            include_deleted: false,
        };
        let mut summary = Summary::default();

        let table = Engine::new()
            .export(&source, &schema(), &filter, &mut summary)
            .await
            .unwrap();

        assert_eq!(table.header, vec!["id", "name", "done", "priority"]);
        assert_eq!(
            table.rows,
            vec![vec![Value::from("b"), Value::from("new"), Value::Null, Value::Null]]
        );
        assert_eq!(summary.records, 1);
    }

    #[tokio::test]
    async fn test_export_all_includes_deleted() {
        let source = store(vec![
            json!({"id": "a", "name": "A", "_lastChangedAt": 900}),
            json!({"id": "c", "name": "C", "_lastChangedAt": 1200, "_deleted": true}),
        ]);
        let mut summary = Summary::default();

        let table = Engine::new()
            .export(&source, &schema(), &RecordFilter::all(), &mut summary)
            .await
            .unwrap();
        assert_eq!(table.rows.len(), 2);
    }

    // ── import ───────────────────────────────────────────────

    fn table(header: &[&str], rows: &[&[&str]]) -> Table {
        let cell = |s: &&str| {
            if s.is_empty() {
                Value::Null
            } else {
                Value::from(*s)
            }
        };
        Table {
            header: header.iter().map(|h| (*h).to_string()).collect(),
            rows: rows.iter().map(|r| r.iter().map(cell).collect()).collect(),
        }
    }

    #[tokio::test]
    async fn test_import_creates_updates_and_skips() {
        let target = store(vec![
            json!({"id": "1", "name": "A", "done": true, "_version": 3}),
            json!({"id": "2", "name": "B", "done": false, "_version": 1}),
        ]);
        let input = table(
            &["id", "name", "_internal", "color"],
            &[&["1", "A2", "x", "red"], &["2", "B", "", ""], &["", "C", "", ""]],
        );
        let mut summary = Summary::default();

        let outcome = Engine::new()
            .import(&target, &schema(), &input, ImportOptions::default(), &mut summary)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!((summary.create, summary.update, summary.skip), (1, 1, 1));
        assert_eq!(summary.records, 3);

        let updated = target.get_by_id("1").await.unwrap().unwrap();
        assert_eq!(updated.get("name"), Some(&Value::from("A2")));
        assert_eq!(updated.get("done"), Some(&Value::Bool(true)));
        assert!(!updated.contains("color"));
        assert_eq!(target.records().len(), 3);
    }

    #[tokio::test]
    async fn test_import_unknown_id_is_created_with_that_id() {
        let target = MemoryStore::new("Todo");
        let input = table(&["id", "name", "priority"], &[&["abc", "A", "2"]]);
        let mut summary = Summary::default();

        Engine::new()
            .import(&target, &schema(), &input, ImportOptions::default(), &mut summary)
            .await
            .unwrap();

        let created = target.get_by_id("abc").await.unwrap().unwrap();
        assert_eq!(created.get("priority"), Some(&Value::from(2_i64)));
    }

    #[tokio::test]
    async fn test_import_requires_fields_on_create() {
        let target = MemoryStore::new("Todo");
        let input = table(&["id", "name", "done"], &[&["", "A", ""], &["", "", "true"]]);
        let mut summary = Summary::default();

        let err = Engine::new()
            .import(&target, &schema(), &input, ImportOptions::default(), &mut summary)
            .await
            .unwrap_err();

        match err {
            Error::RequiredField { row, field, .. } => {
                assert_eq!(row, 3);
                assert_eq!(field, "name");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(summary.create, 1);
        assert_eq!(target.records().len(), 1);
    }

    #[tokio::test]
    async fn test_import_bad_cell_names_row() {
        let target = MemoryStore::new("Todo");
        let input = table(&["name", "priority"], &[&["A", "high"]]);
        let mut summary = Summary::default();

        let err = Engine::new()
            .import(&target, &schema(), &input, ImportOptions::default(), &mut summary)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCell { row: 2, .. }));
    }

    #[tokio::test]
    async fn test_import_dry_run() {
        let target = store(vec![json!({"id": "1", "name": "A", "_version": 3})]);
        let input = table(&["id", "name"], &[&["1", "A2"], &["", "B"]]);
        let mut summary = Summary::default();

        let outcome = Engine::new()
            .import(&target, &schema(), &input, ImportOptions { dry_run: true }, &mut summary)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::DryRun);
        assert_eq!((summary.create, summary.update), (1, 1));
        assert_eq!(target.writes(), 0);
    }

    #[tokio::test]
    async fn test_import_conflict_aborts() {
        let target = Racing(store(vec![json!({"id": "1", "name": "A", "_version": 3})]));
        let input = table(&["id", "name"], &[&["1", "A2"], &["", "B"]]);
        let mut summary = Summary::default();

        let err = Engine::new()
            .import(&target, &schema(), &input, ImportOptions::default(), &mut summary)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::VersionConflict { .. }));
        assert_eq!(summary.writes(), 0);
        assert_eq!(target.0.records().len(), 1);
    }

    #[tokio::test]
    async fn test_import_interrupted_between_rows() {
        let interrupt = Interrupt::new();
        let target = InterruptOnCreate {
            store: MemoryStore::new("Todo"),
            interrupt: interrupt.clone(),
        };
        let input = table(&["name"], &[&["A"], &["B"], &["C"]]);
        let mut summary = Summary::default();

        let err = Engine::new()
            .with_interrupt(interrupt)
            .import(&target, &schema(), &input, ImportOptions::default(), &mut summary)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Interrupted { .. }));
        assert_eq!(summary.create, 1);
        assert_eq!(target.store.records().len(), 1);
    }
}
