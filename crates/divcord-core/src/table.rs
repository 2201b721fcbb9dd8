//! Raw spreadsheet shapes: plain cells, rich text runs and the payload

use serde::{Deserialize, Serialize};

/// A column of the divcord sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Column {
    Card,
    Greynote,
    TagHypothesis,
    Confidence,
    RemainingWork,
    Notes,
    Sources,
    VerifySources,
    /// The record as a whole (used when validating persisted JSON)
    Record,
}

impl Column {
    /// Plain grid columns, in grid order
    pub const PLAIN: [Column; 6] = [
        Column::Card,
        Column::Greynote,
        Column::TagHypothesis,
        Column::Confidence,
        Column::RemainingWork,
        Column::Notes,
    ];

    /// Position of this column in a plain grid row
    pub fn plain_index(&self) -> Option<usize> {
        Self::PLAIN.iter().position(|c| c == self)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Column::Card => "card",
            Column::Greynote => "greynote",
            Column::TagHypothesis => "tagHypothesis",
            Column::Confidence => "confidence",
            Column::RemainingWork => "remainingWork",
            Column::Notes => "notes",
            Column::Sources => "sources",
            Column::VerifySources => "verifySources",
            Column::Record => "record",
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A plain cell after trimming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlainCellValue {
    Text(String),
    /// Blank or whitespace-only cell
    Empty,
}

impl PlainCellValue {
    /// Parse a raw cell string
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            PlainCellValue::Empty
        } else {
            PlainCellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PlainCellValue::Empty)
    }

    pub fn as_str(&self) -> &str {
        match self {
            PlainCellValue::Text(s) => s,
            PlainCellValue::Empty => "",
        }
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            PlainCellValue::Text(s) => Some(s),
            PlainCellValue::Empty => None,
        }
    }
}

/// One styled fragment of a rich cell
///
/// A source mention may span several runs, and one run may hold several
/// mentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextRun {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl RichTextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: None,
        }
    }

    pub fn linked(text: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: Some(link.into()),
        }
    }
}

/// The runs of one rich cell
pub type RichCell = Vec<RichTextRun>;

/// Everything fetched from the sheet for one parse pass
///
/// `plain` holds one row per record with the columns of [`Column::PLAIN`].
/// `sources` and `verify_sources` are parallel to `plain` by row position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetPayload {
    #[serde(default)]
    pub plain: Vec<Vec<String>>,
    #[serde(default)]
    pub sources: Vec<RichCell>,
    #[serde(default)]
    pub verify_sources: Vec<RichCell>,
}

impl SpreadsheetPayload {
    pub fn row_count(&self) -> usize {
        self.plain.len()
    }
}

/// Parsed plain columns of one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainRow {
    pub card: PlainCellValue,
    pub greynote: PlainCellValue,
    pub tag_hypothesis: PlainCellValue,
    pub confidence: PlainCellValue,
    pub remaining_work: PlainCellValue,
    pub notes: PlainCellValue,
}

impl PlainRow {
    /// Read the plain columns out of a grid row; missing cells are empty
    pub fn from_cells(cells: &[String]) -> Self {
        let get = |column: Column| {
            column
                .plain_index()
                .and_then(|i| cells.get(i))
                .map(|s| PlainCellValue::parse(s))
                .unwrap_or(PlainCellValue::Empty)
        };

        Self {
            card: get(Column::Card),
            greynote: get(Column::Greynote),
            tag_hypothesis: get(Column::TagHypothesis),
            confidence: get(Column::Confidence),
            remaining_work: get(Column::RemainingWork),
            notes: get(Column::Notes),
        }
    }
}
