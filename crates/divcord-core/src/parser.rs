//! Cell parsing: plain cells, enum cells and rich source cells

use crate::catalog::ReferenceCatalog;
use crate::config::ParseOptions;
use crate::enums::ClosedEnum;
use crate::error::{Error, ParseError, ParseErrorKind, Result};
use crate::source::SourceType;
use crate::table::{Column, PlainCellValue, RichTextRun};
use tracing::debug;
use url::Url;

/// Parse one plain cell
pub fn parse_plain_cell(raw: &str) -> PlainCellValue {
    PlainCellValue::parse(raw)
}

/// Parse a closed-enum cell, falling back to the default variant
///
/// A blank cell is the default without complaint. Unrecognized text is
/// reported in `errors` and also yields the default.
pub fn parse_enum_cell<T: ClosedEnum + Default>(
    value: &PlainCellValue,
    row: u32,
    column: Column,
    errors: &mut Vec<ParseError>,
) -> T {
    match value {
        PlainCellValue::Empty => T::default(),
        PlainCellValue::Text(text) => T::parse_loose(text).unwrap_or_else(|| {
            debug!(row, %column, raw = %text, "unrecognized {} value", T::NAME);
            errors.push(ParseError::new(
                row,
                column,
                text.clone(),
                ParseErrorKind::InvalidEnum {
                    enum_name: column.name().to_string(),
                },
            ));
            T::default()
        }),
    }
}

/// A typed, not yet resolved, source mention from a rich cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMention {
    pub id: String,
    pub source_type: SourceType,
    pub min_level: Option<u32>,
    pub max_level: Option<u32>,
}

impl SourceMention {
    pub fn new(id: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            id: id.into(),
            source_type,
            min_level: None,
            max_level: None,
        }
    }
}

/// Mention text with the first hyperlink that touched it
#[derive(Debug, Default)]
struct RawMention {
    text: String,
    link: Option<String>,
}

/// Splits rich cells into mentions and infers their source types
#[derive(Debug, Clone, Copy)]
pub struct RichCellParser<'a> {
    catalog: &'a ReferenceCatalog,
    options: &'a ParseOptions,
}

impl<'a> RichCellParser<'a> {
    pub fn new(catalog: &'a ReferenceCatalog, options: &'a ParseOptions) -> Self {
        Self { catalog, options }
    }

    /// Parse the runs of one cell into mentions, in input order
    ///
    /// Mentions whose type cannot be inferred are reported and left out.
    pub fn parse(
        &self,
        runs: &[RichTextRun],
        row: u32,
        column: Column,
        errors: &mut Vec<ParseError>,
    ) -> Vec<SourceMention> {
        let mut mentions = Vec::new();
        let mut previous: Option<SourceType> = None;
        // A catalog-backed type named without an id heads the names after it
        let mut heading: Option<(SourceType, String)> = None;

        for raw in self.split_mentions(runs) {
            match self.classify(&raw, previous) {
                Some((source_type, id)) if source_type.is_catalog_backed() && id.is_empty() => {
                    if let Some((unused, text)) = heading.take() {
                        errors.push(missing_id(row, column, text, unused));
                    }
                    previous = Some(source_type);
                    heading = Some((source_type, raw.text));
                }
                Some((source_type, id)) => {
                    heading = None;
                    previous = Some(source_type);
                    mentions.push(build_mention(source_type, id));
                }
                None => {
                    debug!(row, %column, raw = %raw.text, "untypeable source mention");
                    errors.push(ParseError::new(
                        row,
                        column,
                        raw.text.clone(),
                        ParseErrorKind::UntypeableSource,
                    ));
                }
            }
        }

        if let Some((source_type, text)) = heading {
            errors.push(missing_id(row, column, text, source_type));
        }

        mentions
    }

    /// Cut runs into mentions; linked runs are only split on newlines so a
    /// linked name containing a comma stays whole
    fn split_mentions(&self, runs: &[RichTextRun]) -> Vec<RawMention> {
        let mut out = Vec::new();
        let mut current = RawMention::default();

        for run in runs {
            let pieces: Vec<&str> = if run.link.is_some() {
                run.text.split('\n').collect()
            } else {
                run.text
                    .split(|c: char| self.options.separators.contains(&c))
                    .collect()
            };

            for (i, piece) in pieces.into_iter().enumerate() {
                if i > 0 {
                    flush(&mut out, &mut current);
                }
                current.text.push_str(piece);
                if current.link.is_none() && !piece.trim().is_empty() {
                    current.link = run.link.clone();
                }
            }
        }
        flush(&mut out, &mut current);

        out
    }

    /// Infer `(type, id text)` for a mention
    fn classify(&self, raw: &RawMention, previous: Option<SourceType>) -> Option<(SourceType, String)> {
        let text = raw.text.as_str();

        if let Some((source_type, rest)) = explicit_type(text) {
            return Some((source_type, rest.to_string()));
        }

        if let Some(title) = raw.link.as_deref().and_then(wiki_title) {
            let by_link = self
                .catalog
                .classify_name(&title)
                .or_else(|| has_map_suffix(&title).then_some(SourceType::Map));
            if let Some(source_type) = by_link {
                return Some((source_type, text.to_string()));
            }
        }

        if has_map_suffix(text) {
            return Some((SourceType::Map, text.to_string()));
        }

        if let Some(source_type) = self.catalog.classify_name(text) {
            return Some((source_type, text.to_string()));
        }

        // Best effort: a bare continuation takes the previous mention's type
        if self.options.inherit_source_type {
            if let Some(source_type) = previous.filter(|t| *t != SourceType::GlobalDrop) {
                return Some((source_type, text.to_string()));
            }
        }

        None
    }
}

fn flush(out: &mut Vec<RawMention>, current: &mut RawMention) {
    let mention = std::mem::take(current);
    let text = mention.text.trim();
    if !text.is_empty() {
        out.push(RawMention {
            text: text.to_string(),
            link: mention.link,
        });
    }
}

fn missing_id(row: u32, column: Column, raw: String, source_type: SourceType) -> ParseError {
    ParseError::new(row, column, raw, ParseErrorKind::MissingSourceId { source_type })
}

fn build_mention(source_type: SourceType, id: String) -> SourceMention {
    if source_type == SourceType::GlobalDrop {
        let (min_level, max_level) = parse_level_range(&id);
        SourceMention {
            id: String::new(),
            source_type,
            min_level,
            max_level,
        }
    } else {
        SourceMention::new(id, source_type)
    }
}

/// `Type: id`, a bare type name, or `Global Drop <levels>`
fn explicit_type(text: &str) -> Option<(SourceType, &str)> {
    if let Some(source_type) = SourceType::parse_loose(text) {
        return Some((source_type, ""));
    }

    let global = SourceType::GlobalDrop.as_str();
    if text.len() > global.len()
        && text.is_char_boundary(global.len())
        && text[..global.len()].eq_ignore_ascii_case(global)
    {
        return Some((SourceType::GlobalDrop, text[global.len()..].trim()));
    }

    let (head, tail) = text.split_once(':')?;
    SourceType::parse_loose(head).map(|source_type| (source_type, tail.trim()))
}

fn has_map_suffix(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    lower.len() > 4 && lower.ends_with(" map")
}

/// Read a level range from text such as `68-75`, `(68+)` or `(-70)`
pub fn parse_level_range(text: &str) -> (Option<u32>, Option<u32>) {
    let numbers: Vec<u32> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter_map(|part| part.parse().ok())
        .collect();

    match numbers.as_slice() {
        [min, max, ..] => (Some(*min), Some(*max)),
        [only] => {
            let leading = text.trim_start_matches(|c: char| c == '(' || c.is_whitespace());
            if leading.starts_with('-') {
                (None, Some(*only))
            } else {
                (Some(*only), None)
            }
        }
        [] => (None, None),
    }
}

/// Page title of a wiki link, e.g. `.../wiki/Port_Map#Bosses` -> `Port Map`
pub fn wiki_title(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let mut segments = url.path_segments()?;
    segments.find(|segment| *segment == "wiki")?;
    let raw = segments.next()?;

    let title = urlencoding::decode(raw).ok()?.replace('_', " ");
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Parse one rich cell with default options
pub fn parse_rich_cell(
    runs: &[RichTextRun],
    row: u32,
    column: Column,
    catalog: &ReferenceCatalog,
) -> (Vec<SourceMention>, Vec<ParseError>) {
    let options = ParseOptions::default();
    let mut errors = Vec::new();
    let mentions = RichCellParser::new(catalog, &options).parse(runs, row, column, &mut errors);
    (mentions, errors)
}

/// Read a plain grid from a CSV export of the sheet
///
/// Every line is kept, including headings; `ParseOptions::header_rows`
/// decides later how many to skip.
pub fn parse_plain_grid_csv(content: &str, source_name: &str) -> Result<Vec<Vec<String>>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // Allow varying number of fields
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(|e| Error::Csv {
            name: source_name.to_string(),
            source: e,
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;
    use crate::record::Confidence;

    fn parse(runs: &[RichTextRun]) -> (Vec<SourceMention>, Vec<ParseError>) {
        parse_rich_cell(runs, 1, Column::Sources, &sample_catalog())
    }

    #[test]
    fn test_parse_enum_cell_default_and_error() {
        let mut errors = Vec::new();

        let blank: Confidence = parse_enum_cell(&PlainCellValue::Empty, 1, Column::Confidence, &mut errors);
        assert_eq!(blank, Confidence::None);
        assert!(errors.is_empty());

        let done: Confidence =
            parse_enum_cell(&parse_plain_cell(" DONE "), 1, Column::Confidence, &mut errors);
        assert_eq!(done, Confidence::Done);

        let bad: Confidence =
            parse_enum_cell(&parse_plain_cell("maybe"), 4, Column::Confidence, &mut errors);
        assert_eq!(bad, Confidence::None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row, 4);
        assert_eq!(errors[0].raw, "maybe");
        assert_eq!(errors[0].column, Column::Confidence);
    }

    #[test]
    fn test_linked_map_mention() {
        let (mentions, errors) = parse(&[RichTextRun::linked(
            "Port Map",
            "https://www.poewiki.net/wiki/Port_Map",
        )]);

        assert!(errors.is_empty());
        assert_eq!(mentions, vec![SourceMention::new("Port Map", SourceType::Map)]);
    }

    #[test]
    fn test_explicit_prefix_and_inherited_type() {
        let (mentions, errors) = parse(&[RichTextRun::plain(
            "Map Boss: Doedre the Defiler, Mirage of Bones\nUnravelling Horror",
        )]);

        assert!(errors.is_empty());
        assert_eq!(mentions.len(), 3);
        assert!(mentions.iter().all(|m| m.source_type == SourceType::MapBoss));
        assert_eq!(mentions[0].id, "Doedre the Defiler");
        assert_eq!(mentions[2].id, "Unravelling Horror");
    }

    #[test]
    fn test_mention_spanning_runs() {
        let (mentions, errors) = parse(&[
            RichTextRun::plain("Vendor: Lilly "),
            RichTextRun::plain("Roth, Strand Map"),
        ]);

        assert!(errors.is_empty());
        assert_eq!(
            mentions,
            vec![
                SourceMention::new("Lilly Roth", SourceType::Vendor),
                SourceMention::new("Strand Map", SourceType::Map),
            ]
        );
    }

    #[test]
    fn test_linked_run_with_comma_stays_whole() {
        let (mentions, errors) = parse(&[
            RichTextRun::linked(
                "Merveil, the Twisted",
                "https://www.poewiki.net/wiki/Merveil,_the_Twisted",
            ),
            RichTextRun::plain(", "),
            RichTextRun::linked("Hillock", "https://www.poewiki.net/wiki/Hillock"),
        ]);

        assert!(errors.is_empty());
        assert_eq!(
            mentions,
            vec![
                SourceMention::new("Merveil, the Twisted", SourceType::ActBoss),
                SourceMention::new("Hillock", SourceType::ActBoss),
            ]
        );
    }

    #[test]
    fn test_global_drop_levels() {
        let (mentions, errors) = parse(&[RichTextRun::plain("Global Drop (68+); Global drop 2-40")]);

        assert!(errors.is_empty());
        assert_eq!(mentions[0].source_type, SourceType::GlobalDrop);
        assert_eq!((mentions[0].min_level, mentions[0].max_level), (Some(68), None));
        assert_eq!((mentions[1].min_level, mentions[1].max_level), (Some(2), Some(40)));
        assert_eq!(mentions[1].id, "");
    }

    #[test]
    fn test_untypeable_mention_is_reported_and_dropped() {
        let (mentions, errors) = parse(&[RichTextRun::plain("some cave somewhere, Port Map")]);

        assert_eq!(mentions, vec![SourceMention::new("Port Map", SourceType::Map)]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ParseErrorKind::UntypeableSource);
        assert_eq!(errors[0].raw, "some cave somewhere");
    }

    #[test]
    fn test_inheritance_can_be_disabled() {
        let catalog = sample_catalog();
        let options = ParseOptions {
            inherit_source_type: false,
            ..ParseOptions::default()
        };
        let mut errors = Vec::new();
        let mentions = RichCellParser::new(&catalog, &options).parse(
            &[RichTextRun::plain("Vendor: Lilly Roth, Tarkleigh")],
            2,
            Column::VerifySources,
            &mut errors,
        );

        assert_eq!(mentions.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].column, Column::VerifySources);
    }

    #[test]
    fn test_catalog_type_without_name() {
        let (mentions, errors) = parse(&[RichTextRun::plain("Map:")]);

        assert!(mentions.is_empty());
        assert_eq!(
            errors[0].kind,
            ParseErrorKind::MissingSourceId {
                source_type: SourceType::Map
            }
        );
    }

    #[test]
    fn test_bare_type_heading_types_following_names() {
        let (mentions, errors) = parse(&[RichTextRun::plain("Map\nCity Square, Dock")]);

        assert!(errors.is_empty());
        assert_eq!(
            mentions,
            vec![
                SourceMention::new("City Square", SourceType::Map),
                SourceMention::new("Dock", SourceType::Map),
            ]
        );
    }

    #[test]
    fn test_heading_without_names_is_reported_once() {
        let (mentions, errors) = parse(&[RichTextRun::plain("Map Boss\nMap\nPort Map, Act")]);

        assert_eq!(mentions, vec![SourceMention::new("Port Map", SourceType::Map)]);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].raw, "Map Boss");
        assert_eq!(
            errors[1].kind,
            ParseErrorKind::MissingSourceId {
                source_type: SourceType::Act
            }
        );
    }

    #[test]
    fn test_catalog_hit_beats_inherited_type() {
        let (mentions, errors) = parse(&[RichTextRun::plain(
            "Map Boss: Doedre the Defiler, The Cavern of Wrath",
        )]);

        assert!(errors.is_empty());
        assert_eq!(mentions[0].source_type, SourceType::MapBoss);
        assert_eq!(
            mentions[1],
            SourceMention::new("The Cavern of Wrath", SourceType::Act)
        );
    }

    #[test]
    fn test_wiki_title() {
        assert_eq!(
            wiki_title("https://www.poewiki.net/wiki/Doedre%27s_Damning#Drops"),
            Some("Doedre's Damning".to_string())
        );
        assert_eq!(wiki_title("https://example.com/Port_Map"), None);
        assert_eq!(wiki_title("https://www.poewiki.net/wiki/"), None);
    }

    #[test]
    fn test_parse_level_range() {
        assert_eq!(parse_level_range("68-75"), (Some(68), Some(75)));
        assert_eq!(parse_level_range("(68+)"), (Some(68), None));
        assert_eq!(parse_level_range("(-70)"), (None, Some(70)));
        assert_eq!(parse_level_range(""), (None, None));
    }

    #[test]
    fn test_parse_plain_grid_csv() {
        let csv = "Card,Greynote,Tag,Confidence\nThe Doctor,,,\"done\"\n\"Rain of Chaos\",Empty\n";
        let rows = parse_plain_grid_csv(csv, "sheet.csv").unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "Card");
        assert_eq!(rows[1][3], "done");
        assert_eq!(rows[2].len(), 2);
    }
}
