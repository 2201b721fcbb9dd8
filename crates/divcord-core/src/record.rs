//! Normalized spreadsheet rows

use crate::enums::closed_enum;
use crate::error::{ParseError, ParseErrorKind};
use crate::parser::parse_enum_cell;
use crate::source::{dedupe_sources, Source};
use crate::table::{Column, PlainRow};
use serde::{Deserialize, Serialize};
use tracing::debug;

closed_enum! {
    /// Editorial note on why a card drops where it does
    pub enum Greynote as "greynote" {
        Empty => "Empty",
        MonsterSpecific => "Monster-specific",
        AreaSpecific => "Area-specific",
        Disabled => "disabled",
        Story => "story",
        DeliriumReward => "Delirium_reward",
        ChestObject => "Chest_object",
        Strongbox => "strongbox",
        GlobalDrop => "Global Drop",
        Vendor => "Vendor",
    }
}

impl Default for Greynote {
    fn default() -> Self {
        Greynote::Empty
    }
}

closed_enum! {
    /// How sure the community is about a row's sources
    pub enum Confidence as "confidence" {
        None => "none",
        Low => "low",
        Ok => "ok",
        Done => "done",
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Confidence::None
    }
}

closed_enum! {
    /// What is still needed before a row counts as finished
    pub enum RemainingWork as "remaining work" {
        NotApplicable => "n/a",
        Confirm => "confirm",
        UnclearHypothesis => "unclear hypothesis",
        NoHypothesis => "no hypothesis",
        StoryOnly => "story only",
        LegacyTag => "legacy tag",
        OpenEnded => "open ended",
    }
}

impl Default for RemainingWork {
    fn default() -> Self {
        RemainingWork::NotApplicable
    }
}

/// One spreadsheet row after normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivcordRecord {
    /// 1-based row number among the data rows of one snapshot
    pub id: u32,
    pub card: String,
    pub greynote: Greynote,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_hypothesis: Option<String>,
    pub confidence: Confidence,
    pub remaining_work: RemainingWork,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub verify_sources: Vec<Source>,
}

impl DivcordRecord {
    /// A record with default editorial fields and no sources
    pub fn new(id: u32, card: impl Into<String>) -> Self {
        Self {
            id,
            card: card.into(),
            greynote: Greynote::default(),
            tag_hypothesis: None,
            confidence: Confidence::default(),
            remaining_work: RemainingWork::default(),
            notes: None,
            sources: Vec::new(),
            verify_sources: Vec::new(),
        }
    }
}

/// Assemble a record from a parsed plain row and its resolved sources
///
/// Returns `None` when the card name is blank; the row-fatal error is then
/// the only entry in the returned errors. Enum problems are recoverable and
/// leave the field at its default.
pub fn build_record(
    row_index: u32,
    plain: &PlainRow,
    sources: Vec<Source>,
    verify_sources: Vec<Source>,
) -> (Option<DivcordRecord>, Vec<ParseError>) {
    let mut errors = Vec::new();

    if plain.card.is_empty() {
        debug!(row = row_index, "dropping row without a card name");
        errors.push(ParseError::new(
            row_index,
            Column::Card,
            "",
            ParseErrorKind::EmptyCard,
        ));
        return (None, errors);
    }

    let greynote = parse_enum_cell(&plain.greynote, row_index, Column::Greynote, &mut errors);
    let confidence = parse_enum_cell(&plain.confidence, row_index, Column::Confidence, &mut errors);
    let remaining_work = parse_enum_cell(
        &plain.remaining_work,
        row_index,
        Column::RemainingWork,
        &mut errors,
    );

    let record = DivcordRecord {
        id: row_index,
        card: plain.card.as_str().to_string(),
        greynote,
        tag_hypothesis: plain.tag_hypothesis.clone().into_option(),
        confidence,
        remaining_work,
        notes: plain.notes.clone().into_option(),
        sources: dedupe_sources(sources),
        verify_sources: dedupe_sources(verify_sources),
    };

    (Some(record), errors)
}
