//! Table assembly: joins the plain grid with both rich source columns
//!
//! Rows are joined by position. Each rich mention goes through the
//! [`SourceResolver`]; the full row set is then walked a second time to
//! attribute cards from maps and acts to the bosses inside them.

use crate::catalog::ReferenceCatalog;
use crate::config::ParseOptions;
use crate::error::{ParseError, ParseErrorKind};
use crate::parser::RichCellParser;
use crate::record::{build_record, DivcordRecord};
use crate::resolver::SourceResolver;
use crate::source::{Source, SourceKey};
use crate::table::{Column, PlainRow, RichCell, RichTextRun, SpreadsheetPayload};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Result of one assembly pass
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assembly {
    /// Records in spreadsheet row order
    pub records: Vec<DivcordRecord>,
    pub errors: Vec<ParseError>,
    pub card_index: CardIndex,
}

/// Which cards drop from which source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardIndex {
    cards_by_source: BTreeMap<SourceKey, Vec<String>>,
}

impl CardIndex {
    /// Record that `card` drops from `source`; repeated pairs are ignored
    pub fn attribute(&mut self, source: &Source, card: &str) {
        let cards = self.cards_by_source.entry(source.key()).or_default();
        if !cards.iter().any(|c| c == card) {
            cards.push(card.to_string());
        }
    }

    /// Cards attributed to `source`, in row order
    pub fn cards_of(&self, source: &Source) -> &[String] {
        self.cards_by_source
            .get(&source.key())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.cards_by_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards_by_source.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SourceKey, &[String])> {
        self.cards_by_source.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

struct CardIndexEntry<'a> {
    source: &'a SourceKey,
    cards: &'a [String],
}

impl Serialize for CardIndexEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CardIndexEntry", 2)?;
        state.serialize_field("source", self.source)?;
        state.serialize_field("cards", self.cards)?;
        state.end()
    }
}

impl Serialize for CardIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            self.iter()
                .map(|(source, cards)| CardIndexEntry { source, cards }),
        )
    }
}

/// Assemble records from a payload with default options
pub fn assemble(payload: &SpreadsheetPayload, catalog: &ReferenceCatalog) -> Assembly {
    assemble_with(payload, catalog, &ParseOptions::default())
}

/// Assemble records from a payload
pub fn assemble_with(
    payload: &SpreadsheetPayload,
    catalog: &ReferenceCatalog,
    options: &ParseOptions,
) -> Assembly {
    let resolver = SourceResolver::new(catalog);
    let cell_parser = RichCellParser::new(catalog, options);

    let plain_rows: Vec<&Vec<String>> = payload.plain.iter().skip(options.header_rows).collect();
    let sources: Vec<&RichCell> = payload.sources.iter().skip(options.header_rows).collect();
    let verify: Vec<&RichCell> = payload
        .verify_sources
        .iter()
        .skip(options.header_rows)
        .collect();

    let mut errors = Vec::new();
    check_row_count(plain_rows.len(), sources.len(), Column::Sources, &mut errors);
    check_row_count(plain_rows.len(), verify.len(), Column::VerifySources, &mut errors);

    let empty: RichCell = Vec::new();
    let mut records = Vec::new();

    for (i, cells) in plain_rows.iter().enumerate() {
        let row = (i + 1) as u32;
        let plain = PlainRow::from_cells(cells);
        let source_runs = sources.get(i).copied().unwrap_or(&empty);
        let verify_runs = verify.get(i).copied().unwrap_or(&empty);

        if plain.card.is_empty() {
            // Row-fatal, blank rows included; the sources of a dropped row
            // are not worth reporting
            let (_, row_errors) = build_record(row, &plain, Vec::new(), Vec::new());
            errors.extend(row_errors);
            continue;
        }

        let mut source_errors = Vec::new();
        let resolved_sources = resolve_cell(
            &cell_parser,
            &resolver,
            source_runs,
            row,
            Column::Sources,
            &mut source_errors,
        );
        let resolved_verify = resolve_cell(
            &cell_parser,
            &resolver,
            verify_runs,
            row,
            Column::VerifySources,
            &mut source_errors,
        );

        let (record, row_errors) = build_record(row, &plain, resolved_sources, resolved_verify);
        errors.extend(row_errors);
        errors.extend(source_errors);
        if let Some(record) = record {
            records.push(record);
        }
    }

    let card_index = build_card_index(&records, &resolver);

    info!(
        rows = plain_rows.len(),
        records = records.len(),
        errors = errors.len(),
        "assembled divcord records"
    );

    Assembly {
        records,
        errors,
        card_index,
    }
}

fn check_row_count(plain_rows: usize, rich_rows: usize, column: Column, errors: &mut Vec<ParseError>) {
    if plain_rows == rich_rows {
        return;
    }

    warn!(%column, plain_rows, rich_rows, "rich column length differs from plain grid");
    errors.push(ParseError::new(
        (plain_rows.min(rich_rows) + 1) as u32,
        column,
        "",
        ParseErrorKind::RowCountMismatch {
            plain_rows,
            rich_rows,
        },
    ));
}

fn resolve_cell(
    cell_parser: &RichCellParser<'_>,
    resolver: &SourceResolver<'_>,
    runs: &[RichTextRun],
    row: u32,
    column: Column,
    errors: &mut Vec<ParseError>,
) -> Vec<Source> {
    cell_parser
        .parse(runs, row, column, errors)
        .iter()
        .map(|mention| {
            let resolved = resolver.resolve_mention(mention);
            if !resolved.in_catalog {
                debug!(row, %column, id = %mention.id, "source not in reference catalog");
                errors.push(ParseError::new(
                    row,
                    column,
                    mention.id.clone(),
                    ParseErrorKind::NotInCatalog {
                        source_type: mention.source_type,
                    },
                ));
            }
            resolved.source
        })
        .collect()
}

/// Direct attribution for every named source, then transitive attribution
/// of map/act cards to bosses that some row names directly
fn build_card_index(records: &[DivcordRecord], resolver: &SourceResolver<'_>) -> CardIndex {
    let mut index = CardIndex::default();
    let mut directly_named: HashSet<SourceKey> = HashSet::new();

    for record in records {
        for source in record.sources.iter().chain(&record.verify_sources) {
            index.attribute(source, &record.card);
            directly_named.insert(source.key());
        }
    }

    for record in records {
        for source in record
            .sources
            .iter()
            .filter(|s| s.source_type.has_transitive_members())
        {
            for boss in resolver.transitive_sources(source) {
                if directly_named.contains(&boss.key()) {
                    index.attribute(&boss, &record.card);
                }
            }
        }
    }

    index
}
