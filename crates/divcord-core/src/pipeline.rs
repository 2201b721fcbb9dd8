//! JSON-in, JSON-out entry points for host applications

use crate::assembler::{assemble_with, Assembly};
use crate::catalog::ReferenceCatalog;
use crate::config::ParseOptions;
use crate::diff::{diff, DeepDiff};
use crate::error::{Error, ParseError, Result};
use crate::record::DivcordRecord;
use crate::snapshot::load_records;
use crate::table::SpreadsheetPayload;
use serde::{Deserialize, Serialize};

/// Records of one parse pass and the problems found on the way
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOutput {
    pub records: Vec<DivcordRecord>,
    pub errors: Vec<ParseError>,
}

impl From<Assembly> for ParseOutput {
    fn from(assembly: Assembly) -> Self {
        Self {
            records: assembly.records,
            errors: assembly.errors,
        }
    }
}

/// A diff of two persisted snapshots plus their validation errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffOutput {
    pub diff: DeepDiff,
    pub old_errors: Vec<ParseError>,
    pub new_errors: Vec<ParseError>,
}

/// Decode a spreadsheet payload document
pub fn parse_payload(payload_json: &str) -> Result<SpreadsheetPayload> {
    serde_json::from_str(payload_json).map_err(|e| Error::InvalidDocument {
        what: "spreadsheet payload",
        message: e.to_string(),
    })
}

/// Parse a payload against a catalog, both given as JSON
pub fn parse_records(payload_json: &str, catalog_json: &str) -> Result<ParseOutput> {
    parse_records_with(payload_json, catalog_json, &ParseOptions::default())
}

pub fn parse_records_with(
    payload_json: &str,
    catalog_json: &str,
    options: &ParseOptions,
) -> Result<ParseOutput> {
    let payload = parse_payload(payload_json)?;
    let catalog = ReferenceCatalog::from_json(catalog_json)?;
    Ok(assemble_with(&payload, &catalog, options).into())
}

/// Diff two snapshots
pub fn diff_records(old: &[DivcordRecord], new: &[DivcordRecord]) -> DeepDiff {
    diff(old, new)
}

/// Diff two snapshots given as untrusted JSON arrays
pub fn diff_records_json(old_json: &str, new_json: &str) -> Result<DiffOutput> {
    let (old, old_errors) = load_records(old_json)?;
    let (new, new_errors) = load_records(new_json)?;
    Ok(DiffOutput {
        diff: diff(&old, &new),
        old_errors,
        new_errors,
    })
}
