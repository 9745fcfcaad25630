//! Date-partitioned snapshot store
//!
//! Layout on disk:
//!
//! ```text
//! <root>/
//!   2026-01-21/
//!     HEALTH_DASHBOARD_20260121_080000_000.json
//!     HEALTH_DASHBOARD_20260121_200000_000.json
//!   2026-01-22/
//!     ...
//! ```
//!
//! File names embed the full timestamp at fixed width, so lexical order is
//! chronological order within a partition.

use super::snapshot::Snapshot;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

const PARTITION_FORMAT: &str = "%Y-%m-%d";
const SNAPSHOT_PREFIX: &str = "HEALTH_DASHBOARD_";
const SNAPSHOT_SUFFIX: &str = ".json";
const TEMP_SUFFIX: &str = ".tmp";

/// Failures surfaced by the history store
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Enumerating the store or a partition failed
    #[error("history: failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    /// Persisting a snapshot failed; the current cycle has no history entry
    #[error("history: failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("history: failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HistoryError>;

/// Outcome of a prune pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub removed: Vec<NaiveDate>,
    pub failed: Vec<(NaiveDate, String)>,
}

/// Depth of stored history, for dashboards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub total_days: usize,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
    pub snapshot_count: usize,
    pub dates: Vec<NaiveDate>,
}

impl HistorySummary {
    /// `2026-01-20 to 2026-01-22`, or `None` for an empty store
    #[must_use]
    pub fn date_range(&self) -> Option<String> {
        match (self.first, self.last) {
            (Some(first), Some(last)) => Some(format!("{first} to {last}")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    /// Open a store rooted at `root`. The directory is created lazily on the
    /// first save, so opening never touches the disk.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn partition_key(date: NaiveDate) -> String {
        date.format(PARTITION_FORMAT).to_string()
    }

    fn partition_path(&self, date: NaiveDate) -> PathBuf {
        self.root.join(Self::partition_key(date))
    }

    fn file_name(at: DateTime<Utc>) -> String {
        format!(
            "{SNAPSHOT_PREFIX}{}{SNAPSHOT_SUFFIX}",
            at.format("%Y%m%d_%H%M%S_%3f")
        )
    }

    fn is_snapshot_file(name: &str) -> bool {
        name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(SNAPSHOT_SUFFIX)
    }

    /// Persist `snapshot` into the partition for `at`'s date
    ///
    /// The document is written to a temporary file in the same partition and
    /// renamed into place, so readers never observe a partial snapshot.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the partition cannot be created or the file cannot
    /// be written
    pub fn save(&self, snapshot: &Snapshot, at: DateTime<Utc>) -> Result<PathBuf> {
        let partition = self.partition_path(at.date_naive());
        fs::create_dir_all(&partition).map_err(|source| HistoryError::Write {
            path: partition.clone(),
            source,
        })?;

        let final_path = partition.join(Self::file_name(at));
        let temp_path = partition.join(format!(".{}{TEMP_SUFFIX}", Self::file_name(at)));
        let body = serde_json::to_vec_pretty(snapshot)?;

        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(&body)?;
            file.sync_all()?;
            fs::rename(&temp_path, &final_path)
        };

        if let Err(source) = write() {
            let _ = fs::remove_file(&temp_path);
            error!(path = %final_path.display(), error = %source, "failed to save snapshot");
            return Err(HistoryError::Write {
                path: final_path,
                source,
            });
        }

        info!(path = %final_path.display(), "saved snapshot to history");
        Ok(final_path)
    }

    /// Snapshot file names in a partition, oldest first. An absent partition
    /// is empty, not an error.
    fn snapshot_files(&self, date: NaiveDate) -> Result<Vec<PathBuf>> {
        let partition = self.partition_path(date);
        let entries = match fs::read_dir(&partition) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(HistoryError::Read {
                    path: partition,
                    source,
                });
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| HistoryError::Read {
                path: partition.clone(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().to_string();
            if Self::is_snapshot_file(&name) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Read one snapshot file; unreadable or corrupt files are logged and
    /// yield `None`
    fn read_snapshot(path: &Path) -> Option<Snapshot> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable snapshot, ignoring");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt snapshot, ignoring");
                None
            }
        }
    }

    /// Most recently written snapshot of `date`'s partition
    ///
    /// # Errors
    ///
    /// Will return `Err` only if the partition exists but cannot be listed
    pub fn latest_for_date(&self, date: NaiveDate) -> Result<Option<Snapshot>> {
        let files = self.snapshot_files(date)?;
        let Some(newest) = files.last() else {
            debug!(partition = %date, "no snapshots for date");
            return Ok(None);
        };
        Ok(Self::read_snapshot(newest))
    }

    /// Most recent partition strictly before `date` that holds a snapshot,
    /// together with that partition's newest snapshot
    ///
    /// Partitions are chosen from directory names alone; only the selected
    /// partition's newest file is deserialized. If that file is corrupt the
    /// result is `None` rather than an older baseline.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the store root or a partition cannot be listed
    pub fn latest_before(&self, date: NaiveDate) -> Result<Option<(NaiveDate, Snapshot)>> {
        let partitions = self.list_partitions()?;
        self.newest_of(partitions.into_iter().rev().filter(|d| *d < date))
    }

    /// First partition (in iteration order) holding a snapshot file, with its
    /// newest snapshot deserialized
    fn newest_of(
        &self,
        candidates: impl Iterator<Item = NaiveDate>,
    ) -> Result<Option<(NaiveDate, Snapshot)>> {
        for candidate in candidates {
            let files = self.snapshot_files(candidate)?;
            if let Some(newest) = files.last() {
                return Ok(Self::read_snapshot(newest).map(|s| (candidate, s)));
            }
            debug!(partition = %candidate, "empty partition, looking further back");
        }
        Ok(None)
    }

    /// Most recent snapshot in the whole store
    ///
    /// # Errors
    ///
    /// Will return `Err` if the store cannot be listed
    pub fn latest(&self) -> Result<Option<(NaiveDate, Snapshot)>> {
        let partitions = self.list_partitions()?;
        self.newest_of(partitions.into_iter().rev())
    }

    /// Whether any snapshot file exists for `date`
    ///
    /// # Errors
    ///
    /// Will return `Err` if the partition exists but cannot be listed
    pub fn has_snapshot(&self, date: NaiveDate) -> Result<bool> {
        Ok(!self.snapshot_files(date)?.is_empty())
    }

    /// All partition dates on disk, ascending. Entries whose names are not
    /// `YYYY-MM-DD` directories are ignored.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the root exists but cannot be listed
    pub fn list_partitions(&self) -> Result<Vec<NaiveDate>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(HistoryError::Read {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let mut dates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| HistoryError::Read {
                path: self.root.clone(),
                source,
            })?;
            if !entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if let Ok(date) = NaiveDate::parse_from_str(&name, PARTITION_FORMAT) {
                dates.push(date);
            }
        }
        dates.sort_unstable();
        Ok(dates)
    }

    /// Delete every partition strictly older than `before`
    ///
    /// Best effort: a partition that cannot be removed is logged and recorded
    /// in the report while the remaining ones are still processed. Pruning a
    /// range with nothing in it is a no-op.
    ///
    /// # Errors
    ///
    /// Will return `Err` only if the store root cannot be listed
    pub fn prune(&self, before: NaiveDate) -> Result<PruneReport> {
        let mut report = PruneReport::default();
        for date in self.list_partitions()?.into_iter().filter(|d| *d < before) {
            let path = self.partition_path(date);
            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    info!(partition = %date, "removed expired partition");
                    report.removed.push(date);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    error!(partition = %date, path = %path.display(), error = %e, "failed to remove partition");
                    report.failed.push((date, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Summary of history depth
    ///
    /// # Errors
    ///
    /// Will return `Err` if the store or one of its partitions cannot be listed
    pub fn summary(&self) -> Result<HistorySummary> {
        let dates = self.list_partitions()?;
        let mut snapshot_count = 0;
        for date in &dates {
            snapshot_count += self.snapshot_files(*date)?.len();
        }
        Ok(HistorySummary {
            total_days: dates.len(),
            first: dates.first().copied(),
            last: dates.last().copied(),
            snapshot_count,
            dates,
        })
    }
}
