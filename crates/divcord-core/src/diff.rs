//! Snapshot diffing keyed by record content
//!
//! Row ids shift whenever rows are inserted above, so records are matched
//! across snapshots by a key built from their descriptive fields. Editing
//! one of those fields therefore shows up as a removal plus an addition.

use crate::enums::ClosedEnum;
use crate::record::{Confidence, DivcordRecord};
use crate::source::{sources_difference, Source};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::info;

/// Joins stable key fields; control characters never occur in sheet text
const KEY_SEPARATOR: &str = "\u{1f}\u{1e}\u{1f}";
/// Stands in for an absent optional field
const ABSENT: &str = "\u{0}absent\u{0}";

/// Content-derived identity of a record
///
/// Depends on card, greynote, tag hypothesis, remaining work and notes only.
pub fn stable_key(record: &DivcordRecord) -> String {
    [
        record.card.as_str(),
        record.greynote.as_str(),
        record.tag_hypothesis.as_deref().unwrap_or(ABSENT),
        record.remaining_work.as_str(),
        record.notes.as_deref().unwrap_or(ABSENT),
    ]
    .join(KEY_SEPARATOR)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceChange {
    pub old: Confidence,
    pub new: Confidence,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesChange {
    pub added: Vec<Source>,
    pub removed: Vec<Source>,
}

impl SourcesChange {
    /// Set difference both ways, or `None` when the sets are equal
    pub fn between(old: &[Source], new: &[Source]) -> Option<Self> {
        let change = Self {
            added: sources_difference(new, old),
            removed: sources_difference(old, new),
        };
        (!change.is_empty()).then_some(change)
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Field-level changes of a matched record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<SourcesChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_sources: Option<SourcesChange>,
}

impl RecordChanges {
    pub fn between(old: &DivcordRecord, new: &DivcordRecord) -> Self {
        Self {
            confidence: (old.confidence != new.confidence).then_some(ConfidenceChange {
                old: old.confidence,
                new: new.confidence,
            }),
            sources: SourcesChange::between(&old.sources, &new.sources),
            verify_sources: SourcesChange::between(&old.verify_sources, &new.verify_sources),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.confidence.is_none() && self.sources.is_none() && self.verify_sources.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedRecord {
    pub old_record: DivcordRecord,
    pub new_record: DivcordRecord,
    pub changes: RecordChanges,
}

/// Differences between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepDiff {
    /// New records with no counterpart, in new-snapshot order
    pub added: Vec<DivcordRecord>,
    /// Old records with no counterpart, in old-snapshot order
    pub removed: Vec<DivcordRecord>,
    /// Matched records that changed, in new-snapshot order
    pub modified: Vec<ModifiedRecord>,
}

impl DeepDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Compare two snapshots
///
/// Records sharing a stable key are paired up in order of appearance, so
/// duplicated rows are matched one to one.
pub fn diff(old: &[DivcordRecord], new: &[DivcordRecord]) -> DeepDiff {
    let mut by_key: HashMap<String, VecDeque<usize>> = HashMap::new();
    for (i, record) in old.iter().enumerate() {
        by_key.entry(stable_key(record)).or_default().push_back(i);
    }

    let mut matched = vec![false; old.len()];
    let mut result = DeepDiff::default();

    for record in new {
        let old_idx = by_key
            .get_mut(&stable_key(record))
            .and_then(VecDeque::pop_front);

        match old_idx {
            None => result.added.push(record.clone()),
            Some(i) => {
                matched[i] = true;
                let changes = RecordChanges::between(&old[i], record);
                if !changes.is_empty() {
                    result.modified.push(ModifiedRecord {
                        old_record: old[i].clone(),
                        new_record: record.clone(),
                        changes,
                    });
                }
            }
        }
    }

    result.removed = old
        .iter()
        .zip(&matched)
        .filter(|(_, seen)| !**seen)
        .map(|(record, _)| record.clone())
        .collect();

    info!(
        added = result.added.len(),
        removed = result.removed.len(),
        modified = result.modified.len(),
        "computed record diff"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Greynote;
    use crate::source::SourceType;

    fn record(id: u32, card: &str, notes: Option<&str>, sources: Vec<Source>) -> DivcordRecord {
        let mut record = DivcordRecord::new(id, card);
        record.notes = notes.map(str::to_string);
        record.sources = sources;
        record
    }

    fn map(name: &str) -> Source {
        Source::with_member(name, SourceType::Map)
    }

    #[test]
    fn test_stable_key_ignores_volatile_fields() {
        let a = record(1, "X", Some("a"), vec![map("Port Map")]);
        let mut b = a.clone();
        b.id = 40;
        b.confidence = Confidence::Done;
        b.sources.push(map("Strand Map"));
        b.verify_sources.push(map("Dunes Map"));

        assert_eq!(stable_key(&a), stable_key(&a));
        assert_eq!(stable_key(&a), stable_key(&b));

        b.greynote = Greynote::Story;
        assert_ne!(stable_key(&a), stable_key(&b));
    }

    #[test]
    fn test_stable_key_distinguishes_absent_from_empty() {
        let absent = record(1, "X", None, vec![]);
        let empty = record(1, "X", Some(""), vec![]);
        assert_ne!(stable_key(&absent), stable_key(&empty));
    }

    #[test]
    fn test_diff_of_identical_snapshots_is_empty() {
        let snapshot = vec![
            record(1, "X", Some("a"), vec![map("Port Map")]),
            record(2, "Y", None, vec![]),
        ];
        assert!(diff(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn test_row_shift_is_not_a_change() {
        let old = vec![record(1, "X", None, vec![]), record(2, "Y", None, vec![])];
        let new = vec![
            record(1, "W", None, vec![]),
            record(2, "X", None, vec![]),
            record(3, "Y", None, vec![]),
        ];

        let result = diff(&old, &new);
        assert_eq!(result.added.len(), 1);
        assert_eq!(result.added[0].card, "W");
        assert!(result.removed.is_empty());
        assert!(result.modified.is_empty());
    }

    #[test]
    fn test_confidence_change_is_a_modification() {
        let old = vec![record(1, "X", None, vec![])];
        let mut changed = old[0].clone();
        changed.confidence = Confidence::Low;

        let result = diff(&old, &[changed]);
        assert_eq!(result.modified.len(), 1);
        let changes = &result.modified[0].changes;
        assert_eq!(
            changes.confidence,
            Some(ConfidenceChange {
                old: Confidence::None,
                new: Confidence::Low
            })
        );
        assert!(changes.sources.is_none());
    }

    #[test]
    fn test_duplicate_keys_pair_one_to_one() {
        let old = vec![record(1, "X", None, vec![]), record(2, "X", None, vec![])];
        let new = vec![record(1, "X", None, vec![])];

        let result = diff(&old, &new);
        assert_eq!(result.removed.len(), 1);
        assert_eq!(result.removed[0].id, 2);
        assert!(result.added.is_empty());
    }

    #[test]
    fn test_diff_json_shape() {
        let old = vec![record(1, "X", None, vec![map("Port Map")])];
        let new = vec![record(1, "X", None, vec![])];

        let json = serde_json::to_value(diff(&old, &new)).unwrap();
        let changes = &json["modified"][0]["changes"];
        assert_eq!(changes["sources"]["added"], serde_json::json!([]));
        assert_eq!(changes["sources"]["removed"][0]["id"], "Port Map");
        assert!(changes.get("verifySources").is_none());
        assert!(json["modified"][0].get("oldRecord").is_some());
    }
}
