//! Options files for parsing and timeline jobs

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Knobs for one parse pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParseOptions {
    /// Rows at the top of the sheet that hold headings, not records
    pub header_rows: usize,
    /// Give an untyped mention the type of the previous mention in its cell
    pub inherit_source_type: bool,
    /// Characters separating source mentions inside an unlinked run
    pub separators: Vec<char>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            header_rows: 0,
            inherit_source_type: true,
            separators: vec![',', ';', '\n'],
        }
    }
}

impl ParseOptions {
    /// Load options from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save options to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// An offline timeline build over a directory of daily snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineJob {
    /// Directory holding `YYYY-MM-DD.json` snapshots
    pub snapshots_dir: PathBuf,
    /// Where the timeline document is written
    pub output: PathBuf,
    /// Ignore snapshots dated before this day
    #[serde(default)]
    pub since: Option<NaiveDate>,
}

impl TimelineJob {
    /// Load a job file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the job file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
