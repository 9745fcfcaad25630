//! Snapshot history: persistence, day-over-day trends and retention

pub mod polarity;
pub mod retention;
pub mod snapshot;
pub mod store;
pub mod trend;

pub use polarity::{Polarity, PolarityTable};
pub use retention::{RetentionPolicy, sweep};
pub use snapshot::{SeverityCounts, Snapshot};
pub use store::{HistoryError, HistorySummary, PruneReport, SnapshotStore};
pub use trend::{Direction, MetricTrend, TrendAnalyzer, TrendResult, render};

use crate::config::AppConfig;

/// Snapshot store and its retention policy
#[derive(Debug, Clone)]
pub struct History {
    pub store: SnapshotStore,
    pub retention: RetentionPolicy,
}

impl History {
    /// `None` when `history.directory` is empty
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let root = config.history.root()?;
        Some(Self {
            store: SnapshotStore::new(root),
            retention: RetentionPolicy::from_config(&config.history),
        })
    }
}
