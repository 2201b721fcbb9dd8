//! Adapter for the Google Sheets API response shapes
//!
//! Plain columns come from a `values.get` range, rich columns from
//! `spreadsheets.get` grid data with `textFormatRuns`. Run boundaries there
//! are UTF-16 offsets into `formattedValue`.

use crate::error::{Error, Result};
use crate::table::{RichCell, RichTextRun, SpreadsheetPayload};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFormat {
    #[serde(default)]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFormatRun {
    /// UTF-16 offset where this run starts; absent means 0
    #[serde(default)]
    pub start_index: usize,
    #[serde(default)]
    pub format: TextFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    #[serde(default)]
    pub formatted_value: Option<String>,
    /// Link covering the whole cell
    #[serde(default)]
    pub hyperlink: Option<String>,
    #[serde(default)]
    pub text_format_runs: Vec<TextFormatRun>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowData {
    #[serde(default)]
    pub values: Vec<CellData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridData {
    #[serde(default)]
    pub row_data: Vec<RowData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    #[serde(default)]
    pub values: Vec<Vec<String>>,
}

/// Zero-based sheet column of every field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SheetLayout {
    pub card: usize,
    pub greynote: usize,
    pub tag_hypothesis: usize,
    pub confidence: usize,
    pub remaining_work: usize,
    pub sources: usize,
    pub verify_sources: usize,
    pub notes: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            card: 1,
            greynote: 2,
            tag_hypothesis: 3,
            confidence: 4,
            remaining_work: 5,
            sources: 6,
            verify_sources: 7,
            notes: 8,
        }
    }
}

impl CellData {
    /// Split the cell text at run boundaries
    pub fn to_rich_runs(&self) -> RichCell {
        let text = match self.formatted_value.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => return Vec::new(),
        };

        if self.text_format_runs.is_empty() {
            return vec![RichTextRun {
                text: text.to_string(),
                link: self.hyperlink.clone(),
            }];
        }

        let mut starts: Vec<(usize, Option<String>)> = self
            .text_format_runs
            .iter()
            .map(|run| {
                let link = run.format.link.as_ref().and_then(|l| l.uri.clone());
                (utf16_to_byte(text, run.start_index), link)
            })
            .collect();
        starts.sort_by_key(|(start, _)| *start);
        if starts.first().is_some_and(|(start, _)| *start > 0) {
            starts.insert(0, (0, None));
        }

        let mut runs = Vec::with_capacity(starts.len());
        for (i, (start, link)) in starts.iter().enumerate() {
            let end = starts.get(i + 1).map_or(text.len(), |(next, _)| *next);
            if end > *start {
                runs.push(RichTextRun {
                    text: text[*start..end].to_string(),
                    link: link.clone(),
                });
            }
        }
        runs
    }
}

fn utf16_to_byte(text: &str, index: usize) -> usize {
    let mut units = 0;
    for (byte, ch) in text.char_indices() {
        if units >= index {
            return byte;
        }
        units += ch.len_utf16();
    }
    text.len()
}

/// Build a payload from the two API responses
///
/// `values` and `grid` must cover the same rows.
pub fn payload_from_sheets(values: &ValueRange, grid: &GridData, layout: &SheetLayout) -> SpreadsheetPayload {
    let plain_order = [
        layout.card,
        layout.greynote,
        layout.tag_hypothesis,
        layout.confidence,
        layout.remaining_work,
        layout.notes,
    ];

    let plain = values
        .values
        .iter()
        .map(|row| {
            plain_order
                .iter()
                .map(|&col| row.get(col).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    let rich_column = |col: usize| -> Vec<RichCell> {
        grid.row_data
            .iter()
            .map(|row| row.values.get(col).map(CellData::to_rich_runs).unwrap_or_default())
            .collect()
    };

    SpreadsheetPayload {
        plain,
        sources: rich_column(layout.sources),
        verify_sources: rich_column(layout.verify_sources),
    }
}

fn from_api_json<T: serde::de::DeserializeOwned>(json: &str, what: &'static str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| Error::InvalidDocument {
        what,
        message: e.to_string(),
    })
}

/// Build a payload from the raw JSON bodies of the two API responses
///
/// `layout_json` overrides [`SheetLayout::default`] when given.
pub fn import_payload(
    values_json: &str,
    grid_json: &str,
    layout_json: Option<&str>,
) -> Result<SpreadsheetPayload> {
    let values: ValueRange = from_api_json(values_json, "sheet values")?;
    let grid: GridData = from_api_json(grid_json, "sheet grid data")?;
    let layout = match layout_json {
        Some(json) => from_api_json(json, "sheet layout")?,
        None => SheetLayout::default(),
    };

    if values.values.len() != grid.row_data.len() {
        warn!(
            plain = values.values.len(),
            rich = grid.row_data.len(),
            "values and grid responses cover different row counts"
        );
    }

    Ok(payload_from_sheets(&values, &grid, &layout))
}
