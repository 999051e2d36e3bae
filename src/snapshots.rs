//! Date-keyed snapshot persistence with a rolling retention window.
//!
//! One JSON record per calendar date, named `YYYYMMDD.json`, holding the
//! flat zone → level-count mapping for that day. The scene classifier
//! needs today plus at most three prior days, so every run starts by
//! sweeping anything older out of the directory.
//!
//! Absence and failure are kept apart throughout: `load` answers a
//! missing record with `Ok(None)` in a single read (never an exists-check
//! followed by a read), and only real I/O faults or unparseable bodies
//! come back as errors.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};

use crate::logging::{self, DataSource};
use crate::model::{StoreError, ZoneSnapshot};

/// Days of history kept on disk: the reference date itself plus the three
/// days before it. Anything older is deleted by the retention sweep.
pub const RETENTION_DAYS: i64 = 4;

/// Filename date stamp, e.g. `20260117` for 2026-01-17.
pub const DATE_STAMP_FORMAT: &str = "%Y%m%d";

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// A directory of date-stamped snapshot records.
pub struct SnapshotStore {
    dir: PathBuf,
}

/// What a retention sweep did. Failures are recoverable: the stale record
/// stays behind, is never loaded (loads are date-addressed), and the next
/// run's sweep retries the delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub deleted: usize,
    pub failed: usize,
}

impl SnapshotStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::WriteFailed {
            path: dir.display().to_string(),
            detail: e.to_string(),
        })?;
        Ok(SnapshotStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}.json", date.format(DATE_STAMP_FORMAT)))
    }

    /// Writes (or overwrites) the record for `date`.
    ///
    /// A failure here is fatal to the run: without a durable record of
    /// today, tomorrow's cascade would be computed over a hole.
    pub fn save(&self, date: NaiveDate, snapshot: &ZoneSnapshot) -> Result<(), StoreError> {
        let path = self.record_path(date);
        let body = serde_json::to_string(snapshot).map_err(|e| StoreError::WriteFailed {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        fs::write(&path, body).map_err(|e| StoreError::WriteFailed {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }

    /// Reads the record for `date`.
    ///
    /// `Ok(None)` means the record was never written or has been evicted;
    /// the caller decides what that absence means. Errors are reserved for
    /// records that exist but cannot be read or parsed.
    pub fn load(&self, date: NaiveDate) -> Result<Option<ZoneSnapshot>, StoreError> {
        let path = self.record_path(date);
        let body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::ReadFailed {
                    path: path.display().to_string(),
                    detail: e.to_string(),
                });
            }
        };
        match serde_json::from_str(&body) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => Err(StoreError::Corrupted {
                path: path.display().to_string(),
                detail: e.to_string(),
            }),
        }
    }

    /// Deletes every record older than the retention window relative to
    /// `reference` (normally the run date). Files that are not date-stamped
    /// records are left alone. Per-record delete failures are logged and
    /// counted, never raised.
    pub fn evict_older_than(&self, reference: NaiveDate) -> Eviction {
        let oldest_kept = reference - Duration::days(RETENTION_DAYS - 1);
        let mut outcome = Eviction {
            deleted: 0,
            failed: 0,
        };

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                logging::warn(
                    DataSource::Store,
                    None,
                    &format!(
                        "Retention sweep could not list {}: {}",
                        self.dir.display(),
                        e
                    ),
                );
                return outcome;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let date = match record_date(&name.to_string_lossy()) {
                Some(date) => date,
                None => continue,
            };
            if date >= oldest_kept {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => outcome.deleted += 1,
                Err(e) => {
                    outcome.failed += 1;
                    logging::warn(
                        DataSource::Store,
                        Some(&date.format(DATE_STAMP_FORMAT).to_string()),
                        &format!("Could not delete stale record: {}; will retry next run", e),
                    );
                }
            }
        }

        outcome
    }
}

/// Parses a `YYYYMMDD.json` file name into its date. Anything else in the
/// directory (temp files, notes, the scene artifact) is not a record.
fn record_date(file_name: &str) -> Option<NaiveDate> {
    let stamp = file_name.strip_suffix(".json")?;
    if stamp.len() != 8 || !stamp.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(stamp, DATE_STAMP_FORMAT).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
