use chrono::{Days, NaiveDate};
use mistwatch::history::{RetentionPolicy, Snapshot, SnapshotStore, sweep};
use tempfile::TempDir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 22).unwrap()
}

fn days_ago(n: u64) -> NaiveDate {
    today().checked_sub_days(Days::new(n)).unwrap()
}

/// One snapshot per day from `today - span` through `today`
fn seeded_store(dir: &TempDir, span: u64) -> SnapshotStore {
    let store = SnapshotStore::new(dir.path());
    for n in 0..=span {
        let ts = days_ago(n).and_hms_opt(12, 0, 0).unwrap().and_utc();
        store.save(&Snapshot::new(ts), ts).unwrap();
    }
    store
}

#[test]
fn test_sweep_keeps_last_seven_days() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir, 10);
    assert_eq!(store.list_partitions().unwrap().len(), 11);

    let report = sweep(&store, today(), 7).unwrap();

    assert_eq!(report.removed, vec![days_ago(10), days_ago(9), days_ago(8)]);
    let remaining = store.list_partitions().unwrap();
    let expected: Vec<NaiveDate> = (0..=7).rev().map(days_ago).collect();
    assert_eq!(remaining, expected);
}

#[test]
fn test_prune_twice_is_same_as_once() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir, 10);
    let cutoff = days_ago(7);

    let first = store.prune(cutoff).unwrap();
    let after_first = store.list_partitions().unwrap();
    let second = store.prune(cutoff).unwrap();

    assert_eq!(first.removed.len(), 3);
    assert!(second.removed.is_empty());
    assert!(second.failed.is_empty());
    assert_eq!(store.list_partitions().unwrap(), after_first);
}

#[test]
fn test_policy_cutoff_matches_sweep() {
    let policy = RetentionPolicy {
        keep_days: 7,
        auto_cleanup: true,
    };
    assert_eq!(policy.cutoff(today()), days_ago(7));
}
