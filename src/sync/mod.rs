//! Record reconciliation.
//!
//! - **Differ** ([`diff`]): per-record create/update/delete/skip decisions
//! - **Tabular adapter** ([`tabular`]): spreadsheet rows ↔ records, schema coercion
//! - **File I/O** ([`file`]): CSV and xlsx read/write with atomic writes
//! - **Interrupt** ([`interrupt`]): Ctrl-C flag shared by reads, writes and prompts
//! - **Engine** ([`engine`]): import, export and sync runs
//!
//! # Example
//!
//! ```ignore
//! use recsync::sync::{AssumeYes, Engine, Summary, SyncOptions};
//!
//! let mut summary = Summary::default();
//! let outcome = Engine::new()
//!     .sync(&source, &target, &SyncOptions::default(), &AssumeYes, &mut summary)
//!     .await?;
//! ```

pub mod diff;
pub mod engine;
pub mod file;
pub mod interrupt;
pub mod tabular;
mod types;

pub use diff::{classify, equivalent, plan_sync, IgnoreSet, SyncPlan};
pub use engine::{AssumeYes, Confirmation, Engine};
pub use file::{atomic_write, read_table, write_table, Format};
pub use interrupt::Interrupt;
pub use tabular::{coerce_to_schema, records_to_rows, records_to_rows_seeded, rows_to_records, Table};
pub use types::{
    Action, ActionKind, ClassifyOptions, ImportOptions, Outcome, RunState, Summary, SyncOptions,
};
