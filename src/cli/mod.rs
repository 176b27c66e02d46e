//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Import, export and sync Amplify DataStore records
#[derive(Parser, Debug)]
#[command(name = "recsync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Amplify project root (default: nearest ancestor with an amplify/ backend)
    #[arg(long, global = true, env = "RECSYNC_PROJECT")]
    pub project: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import records from a spreadsheet (CSV)
    Import(ImportArgs),

    /// Export records to a spreadsheet (CSV)
    Export(ExportArgs),

    /// Copy records of a model from one environment to another
    Sync(SyncArgs),

    /// Write a template spreadsheet for a model
    Example(ExampleArgs),

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Model (GraphQL type) name
    pub model: String,

    /// Spreadsheet to import
    pub file: PathBuf,

    /// Report what would change without writing
    #[arg(long, alias = "dry-run")]
    pub dryrun: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Model (GraphQL type) name
    pub model: String,

    /// Output file, .xlsx or .csv (default: <Model>.xlsx)
    pub file: Option<PathBuf>,

    /// Only records changed after this time (epoch ms or RFC 3339)
    #[arg(long)]
    pub after: Option<String>,

    /// Include soft-deleted records
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct ExampleArgs {
    /// Model (GraphQL type) name
    pub model: String,

    /// Output file, .xlsx or .csv (default: <Model>.xlsx)
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Model (GraphQL type) name
    pub model: String,

    /// Environment to copy from
    pub source_env: String,

    /// Environment to copy to
    pub dest_env: String,

    /// Delete destination records that are not in the source
    #[arg(long)]
    pub delete: bool,

    /// Report what would change without writing
    #[arg(long, alias = "dry-run")]
    pub dryrun: bool,

    /// Do not count destination records that are not in the source
    #[arg(long)]
    pub no_scan_extra: bool,

    /// Do not create records missing from the destination
    #[arg(long)]
    pub skip_missing: bool,

    /// Do not update destination records that differ
    #[arg(long)]
    pub skip_differing: bool,

    /// Do not ask before deleting
    #[arg(short, long)]
    pub yes: bool,
}

/// Supported shells for completions.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
