//! Validation of persisted record JSON
//!
//! Snapshots and caches written by earlier runs are untrusted input. They go
//! through one pass here that turns every element into either a
//! [`DivcordRecord`] or a [`ParseError`], with the same severities the sheet
//! parser uses.

use crate::error::{Error, ParseError, ParseErrorKind, Result};
use crate::parser::parse_enum_cell;
use crate::record::DivcordRecord;
use crate::source::{dedupe_sources, Source};
use crate::table::{Column, PlainCellValue};
use serde_json::{Map, Value};
use tracing::debug;

/// Parse a JSON array of records, validating each element
pub fn load_records(json: &str) -> Result<(Vec<DivcordRecord>, Vec<ParseError>)> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(Error::InvalidDocument {
            what: "record snapshot",
            message: "expected a JSON array of records".to_string(),
        });
    };
    Ok(validate_records(&items))
}

/// Validate already-parsed JSON values
pub fn validate_records(items: &[Value]) -> (Vec<DivcordRecord>, Vec<ParseError>) {
    let mut records = Vec::with_capacity(items.len());
    let mut errors = Vec::new();

    for (position, item) in items.iter().enumerate() {
        if let Some(record) = validate_record(position, item, &mut errors) {
            records.push(record);
        }
    }

    debug!(
        records = records.len(),
        errors = errors.len(),
        "validated persisted records"
    );
    (records, errors)
}

fn validate_record(position: usize, item: &Value, errors: &mut Vec<ParseError>) -> Option<DivcordRecord> {
    let fallback_row = (position + 1) as u32;

    let Value::Object(fields) = item else {
        errors.push(ParseError::new(
            fallback_row,
            Column::Record,
            item.to_string(),
            ParseErrorKind::InvalidRecord {
                reason: "not an object".to_string(),
            },
        ));
        return None;
    };

    let id = match fields.get("id").and_then(Value::as_u64) {
        Some(id) if id <= u64::from(u32::MAX) => id as u32,
        _ => {
            errors.push(ParseError::new(
                fallback_row,
                Column::Record,
                fields.get("id").map(Value::to_string).unwrap_or_default(),
                ParseErrorKind::InvalidRecord {
                    reason: "id must be a non-negative integer".to_string(),
                },
            ));
            return None;
        }
    };

    let card = match fields.get("card") {
        Some(Value::String(card)) if !card.trim().is_empty() => card.trim().to_string(),
        other => {
            errors.push(ParseError::new(
                id,
                Column::Card,
                other.map(raw_text).unwrap_or_default(),
                ParseErrorKind::EmptyCard,
            ));
            return None;
        }
    };

    let greynote_cell = enum_cell(fields, "greynote", id, Column::Greynote, errors);
    let confidence_cell = enum_cell(fields, "confidence", id, Column::Confidence, errors);
    let remaining_cell = enum_cell(fields, "remainingWork", id, Column::RemainingWork, errors);

    Some(DivcordRecord {
        id,
        card,
        greynote: parse_enum_cell(&greynote_cell, id, Column::Greynote, errors),
        tag_hypothesis: optional_text(fields, "tagHypothesis", id, Column::TagHypothesis, errors),
        confidence: parse_enum_cell(&confidence_cell, id, Column::Confidence, errors),
        remaining_work: parse_enum_cell(&remaining_cell, id, Column::RemainingWork, errors),
        notes: optional_text(fields, "notes", id, Column::Notes, errors),
        sources: source_list(fields, "sources", id, Column::Sources, errors),
        verify_sources: source_list(fields, "verifySources", id, Column::VerifySources, errors),
    })
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn invalid_field(row: u32, column: Column, value: &Value, reason: &str) -> ParseError {
    ParseError::new(
        row,
        column,
        raw_text(value),
        ParseErrorKind::InvalidField {
            reason: reason.to_string(),
        },
    )
}

/// Enum fields must be strings; absent or null reads as blank
fn enum_cell(
    fields: &Map<String, Value>,
    key: &str,
    row: u32,
    column: Column,
    errors: &mut Vec<ParseError>,
) -> PlainCellValue {
    match fields.get(key) {
        None | Some(Value::Null) => PlainCellValue::Empty,
        Some(Value::String(s)) => PlainCellValue::parse(s),
        Some(other) => {
            errors.push(invalid_field(row, column, other, "expected a string"));
            PlainCellValue::Empty
        }
    }
}

fn optional_text(
    fields: &Map<String, Value>,
    key: &str,
    row: u32,
    column: Column,
    errors: &mut Vec<ParseError>,
) -> Option<String> {
    match fields.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => PlainCellValue::parse(s).into_option(),
        Some(other) => {
            errors.push(invalid_field(row, column, other, "expected a string"));
            None
        }
    }
}

fn source_list(
    fields: &Map<String, Value>,
    key: &str,
    row: u32,
    column: Column,
    errors: &mut Vec<ParseError>,
) -> Vec<Source> {
    let items = match fields.get(key) {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            errors.push(invalid_field(row, column, other, "expected an array"));
            return Vec::new();
        }
    };

    let sources = items
        .iter()
        .filter_map(|item| match serde_json::from_value::<Source>(item.clone()) {
            Ok(source) => Some(source),
            Err(e) => {
                errors.push(ParseError::new(
                    row,
                    column,
                    item.to_string(),
                    ParseErrorKind::InvalidSource {
                        reason: e.to_string(),
                    },
                ));
                None
            }
        })
        .collect();

    dedupe_sources(sources)
}
