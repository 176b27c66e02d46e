//! Error types for recsync.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=project/schema, 3=not_found, 4=validation, 5=conflict, etc.)
//! - Retryability flags
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for recsync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Project / schema (exit 2)
    SchemaUnavailable,
    SchemaInvalid,

    // Not Found (exit 3)
    ModelNotFound,
    EnvironmentNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidCell,
    RequiredField,

    // Conflict (exit 5)
    VersionConflict,

    // Remote (exit 6)
    ReadInterrupted,
    Interrupted,
    RemoteError,

    // Config / session (exit 7)
    ConfigError,
    SessionExpired,

    // I/O (exit 8)
    IoError,
    JsonError,
    CsvError,
    WorkbookError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::SchemaUnavailable => "SCHEMA_UNAVAILABLE",
            Self::SchemaInvalid => "SCHEMA_INVALID",
            Self::ModelNotFound => "MODEL_NOT_FOUND",
            Self::EnvironmentNotFound => "ENVIRONMENT_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidCell => "INVALID_CELL",
            Self::RequiredField => "REQUIRED_FIELD",
            Self::VersionConflict => "VERSION_CONFLICT",
            Self::ReadInterrupted => "READ_INTERRUPTED",
            Self::Interrupted => "INTERRUPTED",
            Self::RemoteError => "REMOTE_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::CsvError => "CSV_ERROR",
            Self::WorkbookError => "WORKBOOK_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::SchemaUnavailable | Self::SchemaInvalid => 2,
            Self::ModelNotFound | Self::EnvironmentNotFound => 3,
            Self::InvalidArgument | Self::InvalidCell | Self::RequiredField => 4,
            Self::VersionConflict => 5,
            Self::ReadInterrupted | Self::Interrupted | Self::RemoteError => 6,
            Self::ConfigError | Self::SessionExpired => 7,
            Self::IoError | Self::JsonError | Self::CsvError | Self::WorkbookError => 8,
        }
    }

    /// Whether rerunning the command (possibly with corrected input) can succeed.
    ///
    /// Version conflicts and interrupted reads clear up on a fresh run;
    /// validation errors need corrected spreadsheet cells.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument
                | Self::InvalidCell
                | Self::RequiredField
                | Self::VersionConflict
                | Self::ReadInterrupted
                | Self::Interrupted
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in recsync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Project or schema not found: {}", path.display())]
    SchemaUnavailable { path: PathBuf },

    #[error("Invalid schema at line {line}: {message}")]
    SchemaInvalid { line: usize, message: String },

    #[error("Model definition not found: {model}")]
    ModelNotFound { model: String, available: Vec<String> },

    #[error("Environment not configured: {env}")]
    EnvironmentNotFound { env: String, available: Vec<String> },

    #[error("Read of {model} interrupted after {pages} page(s): {message}")]
    ReadInterrupted {
        model: String,
        pages: usize,
        message: String,
    },

    #[error("Run on {model} interrupted")]
    Interrupted { model: String },

    #[error("Version conflict on {model} {id} (expected version {})", version.map_or_else(|| "none".to_string(), |v| v.to_string()))]
    VersionConflict {
        model: String,
        id: String,
        version: Option<i64>,
    },

    #[error("Session expired")]
    SessionExpired,

    #[error("Row {row}: field '{field}' is required to create a {model}")]
    RequiredField {
        model: String,
        row: usize,
        field: String,
    },

    #[error("Row {row}: field '{field}' expects {expected}, got '{value}'")]
    InvalidCell {
        row: usize,
        field: String,
        expected: &'static str,
        value: String,
    },

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    WorkbookRead(#[from] calamine::Error),

    #[error("Workbook error: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::SchemaUnavailable { .. } => ErrorCode::SchemaUnavailable,
            Self::SchemaInvalid { .. } => ErrorCode::SchemaInvalid,
            Self::ModelNotFound { .. } => ErrorCode::ModelNotFound,
            Self::EnvironmentNotFound { .. } => ErrorCode::EnvironmentNotFound,
            Self::ReadInterrupted { .. } => ErrorCode::ReadInterrupted,
            Self::Interrupted { .. } => ErrorCode::Interrupted,
            Self::VersionConflict { .. } => ErrorCode::VersionConflict,
            Self::SessionExpired => ErrorCode::SessionExpired,
            Self::RequiredField { .. } => ErrorCode::RequiredField,
            Self::InvalidCell { .. } => ErrorCode::InvalidCell,
            Self::Remote(_) | Self::Http(_) => ErrorCode::RemoteError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Csv(_) => ErrorCode::CsvError,
            Self::WorkbookRead(_) | Self::WorkbookWrite(_) => ErrorCode::WorkbookError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::SchemaUnavailable { .. } => Some(
                "Run this command in the project root, or pass --project <dir>.".to_string(),
            ),

            Self::ModelNotFound { model, available } => {
                if let Some(suggestion) = crate::validate::closest(model, available) {
                    return Some(format!("Did you mean '{suggestion}'?"));
                }
                let mut hint = format!(
                    "No object type named '{model}' with storable fields in schema.graphql."
                );
                if !available.is_empty() {
                    hint.push_str(&format!("\n  Models: {}", available.join(", ")));
                }
                Some(hint)
            }

            Self::EnvironmentNotFound { env, available } => {
                if let Some(suggestion) = crate::validate::closest(env, available) {
                    Some(format!("Did you mean '{suggestion}'?"))
                } else if available.is_empty() {
                    Some("Add the environment to recsync.json under \"environments\".".to_string())
                } else {
                    Some(format!("Configured environments: {}", available.join(", ")))
                }
            }

            Self::VersionConflict { .. } => Some(
                "The record changed after it was read. Rerun the command to pick up the \
                 latest version."
                    .to_string(),
            ),

            Self::SessionExpired => Some(
                "Credentials have expired. Run `amplify pull` or set RECSYNC_API_KEY / \
                 RECSYNC_TOKEN."
                    .to_string(),
            ),

            Self::RequiredField { field, .. } => Some(format!(
                "Fill in the '{field}' column, or add an id to update an existing record."
            )),

            Self::ReadInterrupted { .. } => {
                Some("No records were written. Rerun the command to read again.".to_string())
            }

            Self::Interrupted { .. } => Some(
                "Writes before the interrupt stay applied. Rerun the command to finish."
                    .to_string(),
            ),

            Self::SchemaInvalid { .. }
            | Self::InvalidCell { .. }
            | Self::Remote(_)
            | Self::Http(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Csv(_)
            | Self::WorkbookRead(_)
            | Self::WorkbookWrite(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
