//! Directory of daily record snapshots
//!
//! Each snapshot is a JSON array of records named after its day,
//! e.g. `2024-05-01.json`. Files with other names are ignored.

use crate::error::{Error, ParseError, Result};
use crate::record::DivcordRecord;
use crate::snapshot::load_records;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One snapshot file found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub date: NaiveDate,
    pub path: PathBuf,
}

impl SnapshotFile {
    /// Read and validate the records in this file
    pub fn load(&self) -> Result<(Vec<DivcordRecord>, Vec<ParseError>)> {
        let content = fs::read_to_string(&self.path).map_err(|e| Error::FileRead {
            path: self.path.clone(),
            source: e,
        })?;
        load_records(&content)
    }
}

/// Find snapshot files under `root`, sorted by date
///
/// When two files share a date (in different subdirectories) the first
/// one in path order is kept.
pub fn scan_snapshots<P: AsRef<Path>>(root: P) -> Result<Vec<SnapshotFile>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root.as_ref())
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext == "json") {
            continue;
        }

        let date = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|stem| NaiveDate::parse_from_str(stem, DATE_FORMAT).ok());

        match date {
            Some(date) => files.push(SnapshotFile {
                date,
                path: path.to_path_buf(),
            }),
            None => debug!(path = %path.display(), "not a snapshot file"),
        }
    }

    files.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));
    files.dedup_by_key(|f| f.date);

    Ok(files)
}

/// Write `records` as the snapshot for `date` and return its path
pub fn save_snapshot<P: AsRef<Path>>(
    dir: P,
    date: NaiveDate,
    records: &[DivcordRecord],
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let path = dir.join(format!("{}.json", date.format(DATE_FORMAT)));
    let content = serde_json::to_string_pretty(records)?;
    fs::write(&path, content)?;

    Ok(path)
}

/// Load every snapshot under `root` dated on or after `since`
///
/// Validation problems inside a snapshot are logged and the usable records
/// kept; a file that cannot be read at all is an error.
pub fn load_series<P: AsRef<Path>>(
    root: P,
    since: Option<NaiveDate>,
) -> Result<Vec<(NaiveDate, Vec<DivcordRecord>)>> {
    let mut series = Vec::new();

    for file in scan_snapshots(root)? {
        if since.is_some_and(|since| file.date < since) {
            continue;
        }

        let (records, errors) = file.load()?;
        if !errors.is_empty() {
            warn!(
                path = %file.path.display(),
                errors = errors.len(),
                "snapshot contains invalid records"
            );
        }
        series.push((file.date, records));
    }

    Ok(series)
}
