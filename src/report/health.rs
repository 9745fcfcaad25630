use crate::history::{SeverityCounts, Snapshot};
use crate::mist::{Insight, Severity, Site, SleReport, site_labels};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Health classification shared by the organization and individual sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthLevel {
    Critical,
    Unhealthy,
    Degraded,
    Healthy,
}

impl HealthLevel {
    #[must_use]
    pub const fn from_counts(counts: &SeverityCounts) -> Self {
        if counts.critical > 0 {
            Self::Critical
        } else if counts.major > 0 {
            Self::Unhealthy
        } else if counts.warning > 0 {
            Self::Degraded
        } else {
            Self::Healthy
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Unhealthy => "UNHEALTHY",
            Self::Degraded => "DEGRADED",
            Self::Healthy => "HEALTHY",
        }
    }

    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Critical => "[CRIT] CRITICAL",
            Self::Unhealthy => "[FAIL] UNHEALTHY",
            Self::Degraded => "[WARN] DEGRADED",
            Self::Healthy => "[OK] HEALTHY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteStatus {
    pub id: String,
    pub status: HealthLevel,
    pub insight_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub timestamp: DateTime<Utc>,
    pub organization_id: Option<String>,
    pub total_sites: usize,
    pub total_insights: usize,
    pub counts: SeverityCounts,
    pub overall: HealthLevel,
    /// Keyed by site name
    pub sites: BTreeMap<String, SiteStatus>,
}

fn tally<'a>(insights: impl Iterator<Item = &'a Insight>) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for insight in insights {
        match insight.severity() {
            Severity::Critical => counts.critical += 1,
            Severity::Major => counts.major += 1,
            Severity::Warning => counts.warning += 1,
            Severity::Info => counts.info += 1,
            Severity::Minor => {}
        }
    }
    counts
}

impl HealthStatus {
    #[must_use]
    pub fn calculate(
        sites: &[Site],
        insights: &[Insight],
        organization_id: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let counts = tally(insights.iter());
        let total_sites = sites.len();
        let labels = site_labels(sites);

        let sites = sites
            .iter()
            .map(|site| {
                let site_insights: Vec<&Insight> = insights
                    .iter()
                    .filter(|i| i.site_id.as_deref() == Some(site.id.as_str()))
                    .collect();
                let status = HealthLevel::from_counts(&tally(site_insights.iter().copied()));
                (
                    labels[site.id.as_str()].clone(),
                    SiteStatus {
                        id: site.id.clone(),
                        status,
                        insight_count: site_insights.len(),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        Self {
            timestamp,
            organization_id: organization_id.map(ToString::to_string),
            total_sites,
            total_insights: insights.len(),
            counts,
            overall: HealthLevel::from_counts(&counts),
            sites,
        }
    }

    /// Sites not currently healthy
    #[must_use]
    pub fn affected_sites(&self) -> usize {
        self.sites
            .values()
            .filter(|s| s.status != HealthLevel::Healthy)
            .count()
    }

    #[must_use]
    pub fn sites_with(&self, level: HealthLevel) -> usize {
        self.sites.values().filter(|s| s.status == level).count()
    }

    /// Sites ordered worst first, then by name
    #[must_use]
    pub fn sites_by_severity(&self) -> Vec<(&String, &SiteStatus)> {
        let mut sorted: Vec<_> = self.sites.iter().collect();
        sorted.sort_by_key(|(_, s)| s.status);
        sorted
    }

    /// Snapshot of this cycle for the history store: severity counts under
    /// `<tier>_insights` plus SLE readings under `<metric>.<site>`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_snapshot(&self, sle: Option<&SleReport>) -> Snapshot {
        let mut snapshot = Snapshot::new(self.timestamp);
        snapshot.organization_id.clone_from(&self.organization_id);
        snapshot.counts = self.counts;

        for (tier, count) in [
            ("critical", self.counts.critical),
            ("major", self.counts.major),
            ("warning", self.counts.warning),
            ("info", self.counts.info),
        ] {
            snapshot.metrics.insert(format!("{tier}_insights"), count as f64);
        }

        if let Some(report) = sle {
            snapshot.metrics.extend(report.metrics());
        }
        snapshot
    }
}
