//! CLI support for qmodel
//!
//! Provides programmatic access to the `run` and `explain` commands so they
//! can be embedded in other tools.

mod convert;
mod run;

pub use convert::{infer_type, json_to_value, value_to_json};
pub use run::{RunOptions, execute_run, explain};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Parse error: {0}")]
    Parse(#[from] crate::parser::ParseError),

    #[error("Query error: {0}")]
    Query(#[from] crate::error::QueryError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,

    #[error("Input must be a JSON array, got {0}")]
    NotASequence(&'static str),
}
