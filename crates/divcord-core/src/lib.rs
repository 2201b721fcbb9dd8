//! divcord-core: Core library for normalizing and diffing the divcord sheet
//!
//! This library provides functionality to:
//! - Parse plain and rich-text spreadsheet cells into typed drop-source records
//! - Resolve source mentions against a reference catalog of game data
//! - Validate persisted record snapshots
//! - Diff snapshots by content and roll changes up into a per-day timeline

pub mod assembler;
pub mod catalog;
pub mod config;
pub mod diff;
pub mod enums;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod resolver;
pub mod sheets;
pub mod slug;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod table;
pub mod timeline;

pub use assembler::{assemble, assemble_with, Assembly, CardIndex};
pub use catalog::{ActArea, Bossfight, Card, CatalogData, MapArea, MapBoss, ReferenceCatalog};
pub use config::{ParseOptions, TimelineJob};
pub use diff::{diff, stable_key, DeepDiff, ModifiedRecord, RecordChanges, SourcesChange};
pub use enums::ClosedEnum;
pub use error::{Error, ParseError, ParseErrorKind, Result, Severity};
pub use parser::{parse_plain_cell, parse_plain_grid_csv, parse_rich_cell, RichCellParser, SourceMention};
pub use pipeline::{diff_records, diff_records_json, parse_records, parse_records_with, DiffOutput, ParseOutput};
pub use record::{build_record, Confidence, DivcordRecord, Greynote, RemainingWork};
pub use resolver::{Resolved, SourceResolver};
pub use sheets::{import_payload, payload_from_sheets, GridData, SheetLayout, ValueRange};
pub use slug::slugify;
pub use snapshot::load_records;
pub use source::{dedupe_sources, Source, SourceKey, SourceKind, SourceType};
pub use store::{load_series, save_snapshot, scan_snapshots, SnapshotFile};
pub use table::{Column, PlainCellValue, PlainRow, RichTextRun, SpreadsheetPayload};
pub use timeline::{aggregate_by_card, build_timeline, CardChangeSummary, Timeline, TimelineEntry};
