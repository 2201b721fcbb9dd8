//! Error types for divcord-core
//!
//! Two families live here. [`Error`] is a hard failure that stops a call
//! before it can look at any row (bad JSON envelope, unreadable file).
//! [`ParseError`] is per-row data that is collected and returned next to the
//! records it concerns; it never aborts a batch.

use crate::source::SourceType;
use crate::table::Column;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in divcord-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{name}': {source}")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// The top-level JSON document does not have the expected shape
    #[error("invalid {what} document: {message}")]
    InvalidDocument { what: &'static str, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A string did not name any variant of a closed enumeration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a valid {enum_name}")]
pub struct UnknownVariant {
    pub enum_name: &'static str,
    pub value: String,
}

/// How badly a [`ParseError`] affects its row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// The row was dropped from the output
    RowFatal,
    /// The row was kept; the field fell back to a default or was omitted
    FieldRecoverable,
}

/// What went wrong with a cell
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParseErrorKind {
    #[error("card name is empty")]
    EmptyCard,

    #[error("unrecognized {enum_name} value")]
    InvalidEnum { enum_name: String },

    #[error("could not infer a source type")]
    UntypeableSource,

    #[error("{source_type} mention has no name")]
    MissingSourceId { source_type: SourceType },

    #[error("{source_type} not found in reference catalog")]
    NotInCatalog { source_type: SourceType },

    #[error("plain grid has {plain_rows} rows but this column has {rich_rows}")]
    RowCountMismatch { plain_rows: usize, rich_rows: usize },

    #[error("malformed record: {reason}")]
    InvalidRecord { reason: String },

    #[error("malformed field: {reason}")]
    InvalidField { reason: String },

    #[error("malformed source: {reason}")]
    InvalidSource { reason: String },
}

impl ParseErrorKind {
    pub fn severity(&self) -> Severity {
        match self {
            ParseErrorKind::EmptyCard | ParseErrorKind::InvalidRecord { .. } => Severity::RowFatal,
            _ => Severity::FieldRecoverable,
        }
    }
}

/// A problem found in one cell of one row
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("row {row}, column {column}: {kind} ('{raw}')")]
pub struct ParseError {
    /// Record id of the offending row
    pub row: u32,
    pub column: Column,
    /// The text that could not be used, verbatim
    pub raw: String,
    #[serde(flatten)]
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(row: u32, column: Column, raw: impl Into<String>, kind: ParseErrorKind) -> Self {
        Self {
            row,
            column,
            raw: raw.into(),
            kind,
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::RowFatal
    }
}
