pub mod client;
pub mod insights;
pub mod sle;
pub mod types;

pub use client::MistClient;
pub use insights::{CategorizedInsights, InsightsSummary, categorize};
pub use sle::{SleIssue, SleMonitor, SleReading, SleReport};
pub use types::{Insight, Severity, Site, site_labels};
