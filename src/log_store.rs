//! Receiving side of the remote submission log
//!
//! Each accepted submission becomes one appended row of
//! `[timestamp, name, phone, resolution]`, with placeholders for blank
//! fields. The timestamp is rendered for India Standard Time the way an
//! `en-IN` locale prints it.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Body returned for an accepted submission.
pub const ACKNOWLEDGEMENT: &str = "CONNECTED_V2";

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    pub timestamp: String,
    pub name: String,
    pub phone: String,
    pub resolution: String,
}

impl LogRow {
    pub fn from_params(params: &HashMap<String, String>, now: DateTime<Utc>) -> Self {
        let field = |key: &str, placeholder: &str| {
            params
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| placeholder.to_string())
        };
        Self {
            timestamp: localized_timestamp(now),
            name: field("fullName", "No Name"),
            phone: field("phone", "No Phone"),
            resolution: field("resolution", "No Resolution"),
        }
    }
}

/// `d/m/yyyy, h:mm:ss am` in UTC+05:30.
pub fn localized_timestamp(now: DateTime<Utc>) -> String {
    const FORMAT: &str = "%-d/%-m/%Y, %-I:%M:%S %P";
    match FixedOffset::east_opt(IST_OFFSET_SECS) {
        Some(ist) => now.with_timezone(&ist).format(FORMAT).to_string(),
        None => now.format(FORMAT).to_string(),
    }
}

pub trait AppendOnlyLog: Send + Sync {
    fn append(&self, row: LogRow) -> Result<()>;
}

/// Rows kept in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    rows: Mutex<Vec<LogRow>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<LogRow> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl AppendOnlyLog for MemoryLog {
    fn append(&self, row: LogRow) -> Result<()> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner).push(row);
        Ok(())
    }
}

/// One JSON array per line, appended to a file.
#[derive(Debug)]
pub struct JsonlLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AppendOnlyLog for JsonlLog {
    fn append(&self, row: LogRow) -> Result<()> {
        let line = serde_json::to_string(&[&row.timestamp, &row.name, &row.phone, &row.resolution])
            .map_err(|e| Error::StorageError(e.to_string()))?;
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::StorageError(format!("{}: {}", self.path.display(), e)))?;
        writeln!(file, "{}", line).map_err(|e| Error::StorageError(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

/// Append one row for `params` and return the plain-text reply.
pub fn handle_submission(store: &dyn AppendOnlyLog, params: &HashMap<String, String>, now: DateTime<Utc>) -> String {
    match store.append(LogRow::from_params(params, now)) {
        Ok(()) => ACKNOWLEDGEMENT.to_string(),
        Err(e) => {
            log::error!("submission not stored: {}", e);
            format!("Error: {}", e)
        }
    }
}
