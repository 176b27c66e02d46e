//! recsync - reconcile spreadsheet rows and GraphQL record stores
//!
//! This crate provides the core functionality for the `recsync` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Project discovery, environments and credentials
//! - [`schema`] - Model schemas from `schema.graphql`
//! - [`model`] - Records, values and schema types
//! - [`remote`] - Paged record stores (GraphQL, in-memory)
//! - [`sync`] - Differ, tabular adapter and the import/export/sync engine
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod remote;
pub mod schema;
pub mod sync;
pub mod validate;

pub use error::{Error, Result};
