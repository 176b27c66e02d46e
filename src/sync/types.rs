//! Reconciliation types.
//!
//! An [`Action`] is what the differ decides for one record; a [`Summary`]
//! accumulates the actions a run has carried out (or, for a dry run, would
//! carry out).

use std::fmt;

use serde::Serialize;

use crate::model::Record;

/// The decision for one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Write a record the target does not have.
    Create(Record),
    /// Overwrite the target record, which was read at `version`.
    Update { record: Record, version: Option<i64> },
    /// Remove a target-only record, which was read at `version`.
    Delete { id: String, version: Option<i64> },
    /// Leave the target alone.
    Skip { id: Option<String> },
}

impl Action {
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Create(_) => ActionKind::Create,
            Self::Update { .. } => ActionKind::Update,
            Self::Delete { .. } => ActionKind::Delete,
            Self::Skip { .. } => ActionKind::Skip,
        }
    }

    /// Identifier of the record this action concerns, if it has one yet.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self {
            Self::Create(record) | Self::Update { record, .. } => record.id(),
            Self::Delete { id, .. } => Some(id.clone()),
            Self::Skip { id } => id.clone(),
        }
    }

    /// Whether executing this action touches the store.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        !matches!(self, Self::Skip { .. })
    }
}

/// Action discriminant, for counting and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    Skip,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Gates applied when classifying one source record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyOptions {
    /// Create records the target lacks.
    pub write_missing: bool,
    /// Update target records that differ.
    pub write_differing: bool,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            write_missing: true,
            write_differing: true,
        }
    }
}

/// Options for a sync run. The four gates are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub write_missing: bool,
    pub write_differing: bool,
    /// Count target-only records as "extra". On by default.
    pub scan_for_extra: bool,
    /// Delete target-only records.
    pub delete_extra: bool,
    /// Classify and report only.
    pub dry_run: bool,
}

impl SyncOptions {
    #[must_use]
    pub const fn classify_options(&self) -> ClassifyOptions {
        ClassifyOptions {
            write_missing: self.write_missing,
            write_differing: self.write_differing,
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            write_missing: true,
            write_differing: true,
            scan_for_extra: true,
            delete_extra: false,
            dry_run: false,
        }
    }
}

/// Options for an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Classify and report only.
    pub dry_run: bool,
}

/// Counts for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub skip: usize,
    /// Target-only records left in place.
    pub extra: usize,
    /// Records read from (or, for export, written to) the primary side.
    pub records: usize,
}

impl Summary {
    /// Count one action.
    pub fn record(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::Create => self.create += 1,
            ActionKind::Update => self.update += 1,
            ActionKind::Delete => self.delete += 1,
            ActionKind::Skip => self.skip += 1,
        }
    }

    /// Number of writes.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.create + self.update + self.delete
    }
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every action was executed.
    Completed,
    /// Actions were classified and counted but not executed.
    DryRun,
    /// The operator declined a destructive run; nothing was written.
    Declined,
}

/// Engine states, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    SchemaResolved,
    ReadingSource,
    ReadingTarget,
    Diffing,
    Executing,
    Reporting,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::SchemaResolved => "schema-resolved",
            Self::ReadingSource => "reading(source)",
            Self::ReadingTarget => "reading(target)",
            Self::Diffing => "diffing",
            Self::Executing => "executing",
            Self::Reporting => "reporting",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}
