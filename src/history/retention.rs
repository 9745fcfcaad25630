//! Retention sweeps over the snapshot store
//!
//! Retention counts calendar days: with `keep_days = 7` and today being
//! 2026-01-22, partitions 2026-01-15 through 2026-01-22 survive and anything
//! older is removed. `keep_days = 0` keeps only today.

use super::store::{PruneReport, Result, SnapshotStore};
use crate::config::HistoryConfig;
use chrono::{Days, NaiveDate};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub keep_days: u32,
    pub auto_cleanup: bool,
}

impl RetentionPolicy {
    #[must_use]
    pub const fn from_config(history: &HistoryConfig) -> Self {
        Self {
            keep_days: history.keep_days,
            auto_cleanup: history.auto_cleanup,
        }
    }

    /// Oldest date that survives a sweep run on `today`
    #[must_use]
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        cutoff(today, self.keep_days)
    }
}

fn cutoff(today: NaiveDate, keep_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(keep_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Remove every partition older than `today - keep_days`
///
/// Individual partition failures are reported in the returned
/// [`PruneReport`], never as an error.
///
/// # Errors
///
/// Will return `Err` only if the store root cannot be listed
pub fn sweep(store: &SnapshotStore, today: NaiveDate, keep_days: u32) -> Result<PruneReport> {
    let cutoff = cutoff(today, keep_days);
    let report = store.prune(cutoff)?;
    if !report.removed.is_empty() {
        info!(
            removed = report.removed.len(),
            %cutoff,
            "cleaned up old history partitions"
        );
    }
    if !report.failed.is_empty() {
        warn!(
            failed = report.failed.len(),
            %cutoff,
            "some history partitions could not be removed"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Snapshot;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn seed(store: &SnapshotStore, days: &[u32]) {
        for d in days {
            let ts = Utc.with_ymd_and_hms(2026, 1, *d, 12, 0, 0).unwrap();
            store.save(&Snapshot::new(ts), ts).unwrap();
        }
    }

    #[test]
    fn test_cutoff_is_calendar_days() {
        let policy = RetentionPolicy {
            keep_days: 7,
            auto_cleanup: true,
        };
        assert_eq!(policy.cutoff(date(22)), date(15));
        assert_eq!(cutoff(date(22), 0), date(22));
        assert_eq!(cutoff(NaiveDate::MIN, 3), NaiveDate::MIN);
    }

    #[test]
    fn test_sweep_keeps_window() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        seed(&store, &[10, 14, 15, 20, 22]);

        let report = sweep(&store, date(22), 7).unwrap();
        assert_eq!(report.removed, vec![date(10), date(14)]);
        assert!(report.failed.is_empty());
        assert_eq!(
            store.list_partitions().unwrap(),
            vec![date(15), date(20), date(22)]
        );
    }

    #[test]
    fn test_sweep_zero_keeps_only_today() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        seed(&store, &[21, 22]);

        sweep(&store, date(22), 0).unwrap();
        assert_eq!(store.list_partitions().unwrap(), vec![date(22)]);
    }

    #[test]
    fn test_sweep_on_missing_root_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("never-created"));
        let report = sweep(&store, date(22), 7).unwrap();
        assert_eq!(report, PruneReport::default());
    }
}
