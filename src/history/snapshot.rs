use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Insight counts per severity tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: u64,
    pub major: u64,
    pub warning: u64,
    pub info: u64,
}

impl SeverityCounts {
    /// Critical + major + warning; info insights are not issues
    #[must_use]
    pub const fn issues(&self) -> u64 {
        self.critical + self.major + self.warning
    }
}

/// One monitoring cycle's result, as persisted in the history store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    pub counts: SeverityCounts,
    /// Flat metric key to value map; keys may encode the site (`capacity.Phoenix`)
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl Snapshot {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            organization_id: None,
            counts: SeverityCounts::default(),
            metrics: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }

    /// Calendar date (UTC) of the partition this snapshot belongs to
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_snapshot_json_shape() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 22, 8, 30, 0).unwrap();
        let mut snapshot = Snapshot::new(ts).with_metric("capacity.Phoenix", 80.0);
        snapshot.counts.critical = 2;

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["counts"]["critical"], 2);
        assert_eq!(json["metrics"]["capacity.Phoenix"], 80.0);
        assert!(json.get("organization_id").is_none());
        assert_eq!(snapshot.date(), NaiveDate::from_ymd_opt(2026, 1, 22).unwrap());
    }

    #[test]
    fn test_issue_count_excludes_info() {
        let counts = SeverityCounts {
            critical: 1,
            major: 2,
            warning: 3,
            info: 40,
        };
        assert_eq!(counts.issues(), 6);
    }
}
