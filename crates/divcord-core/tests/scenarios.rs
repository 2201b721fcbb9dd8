use divcord_core::{
    assemble, diff, dedupe_sources, import_payload, parse_records, stable_key, Column, Confidence, DivcordRecord,
    ParseErrorKind, ReferenceCatalog, RichTextRun, Severity, Source, SourceKind, SourceType,
    SpreadsheetPayload,
};

const CATALOG: &str = r#"{
    "acts": [
        {"id": "1_1_7_1", "name": "The Cavern of Wrath", "act": 1, "areaLevel": 12,
         "bossfights": [{"name": "Merveil, the Twisted"}]}
    ],
    "maps": [
        {"name": "Port Map", "tier": 5},
        {"name": "Strand Map", "tier": 1}
    ],
    "mapBosses": [
        {"name": "Doedre the Defiler", "maps": ["Port Map"]}
    ],
    "cards": [{"name": "The Doctor", "weight": 43}]
}"#;

fn catalog() -> ReferenceCatalog {
    ReferenceCatalog::from_json(CATALOG).unwrap()
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|s| s.to_string()).collect()
}

fn single_row(cells: &[&str], sources: Vec<RichTextRun>) -> SpreadsheetPayload {
    SpreadsheetPayload {
        plain: vec![row(cells)],
        sources: vec![sources],
        verify_sources: vec![vec![]],
    }
}

fn record(card: &str, notes: &str, sources: Vec<Source>) -> DivcordRecord {
    let mut record = DivcordRecord::new(1, card);
    record.notes = Some(notes.to_string());
    record.sources = sources;
    record
}

fn map(name: &str) -> Source {
    Source::with_member(name, SourceType::Map)
}

#[test]
fn confirmed_map_source_produces_one_clean_record() {
    let payload = single_row(
        &["The Doctor", "", "", "done"],
        vec![RichTextRun::linked("Port Map", "https://www.poewiki.net/wiki/Port_Map")],
    );

    let assembly = assemble(&payload, &catalog());

    assert!(assembly.errors.is_empty());
    assert_eq!(assembly.records.len(), 1);
    let record = &assembly.records[0];
    assert_eq!(record.card, "The Doctor");
    assert_eq!(record.confidence, Confidence::Done);
    assert_eq!(record.sources.len(), 1);
    assert_eq!(record.sources[0].id, "Port Map");
    assert_eq!(record.sources[0].source_type, SourceType::Map);
    assert_eq!(record.sources[0].kind, SourceKind::WithMember);
}

#[test]
fn blank_card_drops_the_row_with_one_fatal_error() {
    let payload = single_row(&["", "", "", "done"], vec![RichTextRun::plain("Port Map")]);

    let assembly = assemble(&payload, &catalog());

    assert!(assembly.records.is_empty());
    assert_eq!(assembly.errors.len(), 1);
    assert_eq!(assembly.errors[0].severity(), Severity::RowFatal);
    assert_eq!(assembly.errors[0].row, 1);
    assert_eq!(assembly.errors[0].kind, ParseErrorKind::EmptyCard);
}

#[test]
fn fully_blank_row_is_still_a_fatal_error() {
    let payload = single_row(&[""], vec![]);

    let assembly = assemble(&payload, &catalog());

    assert!(assembly.records.is_empty());
    assert_eq!(assembly.errors.len(), 1);
    assert_eq!(assembly.errors[0].row, 1);
    assert_eq!(assembly.errors[0].kind, ParseErrorKind::EmptyCard);
}

#[test]
fn names_under_a_type_heading_take_its_type() {
    let payload = single_row(
        &["The Doctor"],
        vec![RichTextRun::plain("Map\nPort Map, Strand")],
    );

    let assembly = assemble(&payload, &catalog());

    assert!(assembly.errors.is_empty());
    assert_eq!(assembly.records[0].sources, vec![map("Port Map"), map("Strand Map")]);
}

#[test]
fn sheets_api_bodies_flow_into_records() {
    let values = r#"{"values": [["", "The Doctor", "", "", "done"], ["", ""]]}"#;
    let grid = r#"{"rowData": [
        {"values": [{}, {}, {}, {}, {}, {}, {
            "formattedValue": "Port Map",
            "textFormatRuns": [{"format": {"link": {"uri": "https://www.poewiki.net/wiki/Port_Map"}}}]
        }]},
        {"values": []}
    ]}"#;

    let payload = import_payload(values, grid, None).unwrap();
    let assembly = assemble(&payload, &catalog());

    assert_eq!(assembly.records.len(), 1);
    assert_eq!(assembly.records[0].sources, vec![map("Port Map")]);
    assert_eq!(assembly.errors.len(), 1);
    assert_eq!(assembly.errors[0].row, 2);
    assert_eq!(assembly.errors[0].kind, ParseErrorKind::EmptyCard);
}

#[test]
fn invalid_confidence_defaults_and_is_reported() {
    let payload = single_row(&["The Doctor", "", "", "maybe"], vec![]);

    let assembly = assemble(&payload, &catalog());

    assert_eq!(assembly.records.len(), 1);
    assert_eq!(assembly.records[0].confidence, Confidence::None);
    assert_eq!(assembly.errors.len(), 1);
    let error = &assembly.errors[0];
    assert_eq!(error.severity(), Severity::FieldRecoverable);
    assert_eq!(error.column, Column::Confidence);
    assert_eq!(error.raw, "maybe");
}

#[test]
fn added_source_is_a_modification() {
    let s1 = map("Port Map");
    let s2 = map("Strand Map");
    let old = vec![record("X", "a", vec![s1.clone()])];
    let new = vec![record("X", "a", vec![s1, s2.clone()])];

    let result = diff(&old, &new);

    assert!(result.added.is_empty());
    assert!(result.removed.is_empty());
    assert_eq!(result.modified.len(), 1);
    let sources = result.modified[0].changes.sources.as_ref().unwrap();
    assert_eq!(sources.added, vec![s2]);
    assert!(sources.removed.is_empty());
}

#[test]
fn descriptive_edit_is_a_removal_plus_addition() {
    let old = vec![record("X", "typo", vec![map("Port Map")])];
    let new = vec![record("X", "typo fixed", vec![map("Port Map")])];

    let result = diff(&old, &new);

    assert!(result.modified.is_empty());
    assert_eq!(result.removed, old);
    assert_eq!(result.added, new);
}

#[test]
fn parsing_is_deterministic() {
    let payload = r#"{
        "plain": [["The Doctor", "odd", "", "maybe"], ["Rain of Chaos"], [""]],
        "sources": [[{"text": "Map Boss: Doedre the Defiler, somewhere"}], [{"text": "Global Drop"}]],
        "verifySources": [[{"text": "Harbour Map"}], [], []]
    }"#;

    let first = parse_records(payload, CATALOG).unwrap();
    let second = parse_records(payload, CATALOG).unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.records.len(), 2);
}

#[test]
fn dedupe_is_idempotent() {
    let sources = vec![
        map("Port Map"),
        Source::global_drop(Some(1), None),
        map("Port Map"),
        Source::global_drop(None, Some(70)),
    ];

    let once = dedupe_sources(sources);
    assert_eq!(dedupe_sources(once.clone()), once);
    assert_eq!(once.len(), 2);
}

#[test]
fn stable_key_ignores_sources_and_confidence() {
    let base = record("X", "a", vec![map("Port Map")]);
    let mut changed = base.clone();
    changed.confidence = Confidence::Low;
    changed.sources.clear();
    changed.verify_sources.push(map("Strand Map"));

    assert_eq!(stable_key(&base), stable_key(&base));
    assert_eq!(stable_key(&base), stable_key(&changed));
}

#[test]
fn diff_accounts_for_every_record_exactly_once() {
    let old = vec![
        record("A", "1", vec![]),
        record("B", "1", vec![map("Port Map")]),
        record("C", "1", vec![]),
        record("C", "1", vec![]),
    ];
    let mut b_changed = old[1].clone();
    b_changed.confidence = Confidence::Ok;
    let new = vec![
        record("A", "1", vec![]),
        b_changed,
        record("C", "1", vec![]),
        record("D", "1", vec![]),
    ];

    let result = diff(&old, &new);

    // new: A unchanged, B modified, C unchanged, D added
    let unchanged_new = new.len() - result.added.len() - result.modified.len();
    assert_eq!(unchanged_new, 2);
    // old: A unchanged, B modified, one C unchanged, one C removed
    let unchanged_old = old.len() - result.removed.len() - result.modified.len();
    assert_eq!(unchanged_old, unchanged_new);
    assert_eq!(result.removed.len(), 1);
    assert_eq!(result.added[0].card, "D");
}

#[test]
fn diff_of_snapshot_with_itself_is_empty() {
    let payload = SpreadsheetPayload {
        plain: vec![row(&["The Doctor"]), row(&["The Doctor"])],
        sources: vec![vec![RichTextRun::plain("Port Map")], vec![]],
        verify_sources: vec![vec![], vec![]],
    };
    let snapshot = assemble(&payload, &catalog()).records;

    let result = diff(&snapshot, &snapshot);
    assert!(result.added.is_empty());
    assert!(result.removed.is_empty());
    assert!(result.modified.is_empty());
}
