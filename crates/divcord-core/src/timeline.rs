//! Per-card change summaries and the day-by-day timeline built from them

use crate::diff::{diff, ConfidenceChange, DeepDiff};
use crate::error::{Error, Result};
use crate::record::DivcordRecord;
use crate::source::{dedupe_sources, sources_difference, Source};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Everything that happened to one card between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardChangeSummary {
    pub card: String,
    pub rows_added: usize,
    pub rows_removed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub confidence: Vec<ConfidenceChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources_added: Vec<Source>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources_removed: Vec<Source>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verify_sources_added: Vec<Source>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verify_sources_removed: Vec<Source>,
}

impl CardChangeSummary {
    fn new(card: &str) -> Self {
        Self {
            card: card.to_string(),
            ..Self::default()
        }
    }

    fn add_record(&mut self, record: &DivcordRecord) {
        self.rows_added += 1;
        self.sources_added.extend(record.sources.iter().cloned());
        self.verify_sources_added
            .extend(record.verify_sources.iter().cloned());
    }

    fn remove_record(&mut self, record: &DivcordRecord) {
        self.rows_removed += 1;
        self.sources_removed.extend(record.sources.iter().cloned());
        self.verify_sources_removed
            .extend(record.verify_sources.iter().cloned());
    }

    /// Dedupe and cancel sources that were both added and removed
    fn settle(&mut self) {
        settle_pair(&mut self.sources_added, &mut self.sources_removed);
        settle_pair(&mut self.verify_sources_added, &mut self.verify_sources_removed);
    }
}

fn settle_pair(added: &mut Vec<Source>, removed: &mut Vec<Source>) {
    let a = dedupe_sources(std::mem::take(added));
    let r = dedupe_sources(std::mem::take(removed));
    *added = sources_difference(&a, &r);
    *removed = sources_difference(&r, &a);
}

/// Roll a diff up into one summary per card name, ordered by card
///
/// Records are grouped by exact card string, so several stable keys of the
/// same card land in one summary.
pub fn aggregate_by_card(diff: &DeepDiff) -> Vec<CardChangeSummary> {
    let mut by_card: BTreeMap<&str, CardChangeSummary> = BTreeMap::new();

    for record in &diff.added {
        by_card
            .entry(&record.card)
            .or_insert_with(|| CardChangeSummary::new(&record.card))
            .add_record(record);
    }

    for record in &diff.removed {
        by_card
            .entry(&record.card)
            .or_insert_with(|| CardChangeSummary::new(&record.card))
            .remove_record(record);
    }

    for modified in &diff.modified {
        let card = &modified.new_record.card;
        let summary = by_card
            .entry(card)
            .or_insert_with(|| CardChangeSummary::new(card));
        let changes = &modified.changes;

        if let Some(confidence) = &changes.confidence {
            summary.confidence.push(confidence.clone());
        }
        if let Some(sources) = &changes.sources {
            summary.sources_added.extend(sources.added.iter().cloned());
            summary.sources_removed.extend(sources.removed.iter().cloned());
        }
        if let Some(verify) = &changes.verify_sources {
            summary.verify_sources_added.extend(verify.added.iter().cloned());
            summary
                .verify_sources_removed
                .extend(verify.removed.iter().cloned());
        }
    }

    by_card
        .into_values()
        .map(|mut summary| {
            summary.settle();
            summary
        })
        .collect()
}

/// Changes observed on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub date: NaiveDate,
    pub changes: Vec<CardChangeSummary>,
}

/// The rolling `timeline_changes` document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    /// Entries in ascending date order
    pub entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a timeline, or start an empty one if the file does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the timeline as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Add a day's diff; days without changes are not recorded
    ///
    /// A second diff for a date already present replaces that entry.
    pub fn push_diff(&mut self, date: NaiveDate, diff: &DeepDiff) {
        if diff.is_empty() {
            debug!(%date, "no changes, skipping timeline entry");
            return;
        }

        let entry = TimelineEntry {
            date,
            changes: aggregate_by_card(diff),
        };
        match self.entries.binary_search_by_key(&date, |e| e.date) {
            Ok(i) => self.entries[i] = entry,
            Err(i) => self.entries.insert(i, entry),
        }
    }

    /// Date of the most recent entry
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.entries.last().map(|e| e.date)
    }

    /// Entries on or after `date`
    pub fn since(&self, date: NaiveDate) -> &[TimelineEntry] {
        let start = self.entries.partition_point(|e| e.date < date);
        &self.entries[start..]
    }

    /// Every entry that mentions `card`, newest first
    pub fn card_history<'a>(
        &'a self,
        card: &'a str,
    ) -> impl Iterator<Item = (NaiveDate, &'a CardChangeSummary)> + 'a {
        self.entries.iter().rev().filter_map(move |entry| {
            entry
                .changes
                .iter()
                .find(|c| c.card == card)
                .map(|c| (entry.date, c))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Diff consecutive snapshots into a timeline
///
/// Snapshots are ordered by date first; each entry is dated with the newer
/// snapshot of its pair.
pub fn build_timeline(snapshots: &[(NaiveDate, Vec<DivcordRecord>)]) -> Timeline {
    let mut ordered: Vec<&(NaiveDate, Vec<DivcordRecord>)> = snapshots.iter().collect();
    ordered.sort_by_key(|(date, _)| *date);

    let mut timeline = Timeline::new();
    for pair in ordered.windows(2) {
        let (_, old) = pair[0];
        let (date, new) = pair[1];
        timeline.push_diff(*date, &diff(old, new));
    }
    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Confidence;
    use crate::source::SourceType;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn record(id: u32, card: &str, notes: &str, sources: &[&str]) -> DivcordRecord {
        let mut record = DivcordRecord::new(id, card);
        record.notes = Some(notes.to_string());
        record.sources = sources
            .iter()
            .map(|s| Source::with_member(*s, SourceType::Map))
            .collect();
        record
    }

    #[test]
    fn test_aggregate_merges_keys_of_same_card() {
        let old = vec![
            record(1, "X", "a", &["Port Map"]),
            record(2, "X", "b", &[]),
            record(3, "Y", "c", &[]),
        ];
        let new = vec![
            record(1, "X", "a", &["Port Map", "Strand Map"]),
            record(2, "X", "b fixed", &[]),
            record(3, "Y", "c", &[]),
        ];

        let summaries = aggregate_by_card(&diff(&old, &new));

        assert_eq!(summaries.len(), 1);
        let x = &summaries[0];
        assert_eq!(x.card, "X");
        assert_eq!(x.rows_added, 1);
        assert_eq!(x.rows_removed, 1);
        assert_eq!(x.sources_added, vec![Source::with_member("Strand Map", SourceType::Map)]);
        assert!(x.sources_removed.is_empty());
    }

    #[test]
    fn test_rewritten_row_cancels_its_own_sources() {
        let old = vec![record(1, "X", "typo", &["Port Map"])];
        let new = vec![record(1, "X", "typo fixed", &["Port Map"])];

        let summaries = aggregate_by_card(&diff(&old, &new));

        assert!(summaries[0].sources_added.is_empty());
        assert!(summaries[0].sources_removed.is_empty());
    }

    #[test]
    fn test_build_timeline_skips_quiet_days() {
        let base = vec![record(1, "X", "a", &[])];
        let mut confident = base.clone();
        confident[0].confidence = Confidence::Done;

        let timeline = build_timeline(&[
            (day(3), confident.clone()),
            (day(1), base.clone()),
            (day(2), base),
        ]);

        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.entries[0].date, day(3));
        assert_eq!(timeline.entries[0].changes[0].confidence.len(), 1);
        assert_eq!(timeline.last_date(), Some(day(3)));
    }

    #[test]
    fn test_push_diff_keeps_date_order() {
        let old = vec![record(1, "X", "a", &[])];
        let new = vec![record(1, "Y", "a", &[])];
        let changes = diff(&old, &new);

        let mut timeline = Timeline::new();
        timeline.push_diff(day(9), &changes);
        timeline.push_diff(day(2), &changes);
        timeline.push_diff(day(9), &changes);

        let dates: Vec<NaiveDate> = timeline.entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![day(2), day(9)]);
        assert_eq!(timeline.since(day(3)).len(), 1);
        assert_eq!(timeline.card_history("Y").count(), 2);
    }

    #[test]
    fn test_timeline_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeline_changes.json");

        assert!(Timeline::load(&path).unwrap().is_empty());

        let timeline = build_timeline(&[
            (day(1), vec![record(1, "X", "a", &[])]),
            (day(2), vec![]),
        ]);
        timeline.save(&path).unwrap();

        let loaded = Timeline::load(&path).unwrap();
        assert_eq!(loaded, timeline);
        assert_eq!(loaded.entries[0].changes[0].rows_removed, 1);
    }
}
