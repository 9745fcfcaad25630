//! Insight categorization and proactive recommendations

use super::types::{Insight, Severity};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

const MAJOR_REVIEW_THRESHOLD: usize = 3;
const PATTERN_THRESHOLD: usize = 2;
const SITE_HOTSPOT_THRESHOLD: usize = 2;

/// Insights grouped three ways
#[derive(Debug, Default)]
pub struct CategorizedInsights<'a> {
    pub by_severity: BTreeMap<Severity, Vec<&'a Insight>>,
    pub by_type: BTreeMap<String, Vec<&'a Insight>>,
    pub by_site: BTreeMap<String, Vec<&'a Insight>>,
    total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InsightsSummary {
    pub total_insights: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub sites_affected: usize,
}

#[must_use]
pub fn categorize(insights: &[Insight]) -> CategorizedInsights<'_> {
    let mut categorized = CategorizedInsights {
        total: insights.len(),
        ..CategorizedInsights::default()
    };
    for insight in insights {
        categorized
            .by_severity
            .entry(insight.severity())
            .or_default()
            .push(insight);
        categorized
            .by_type
            .entry(insight.kind().to_string())
            .or_default()
            .push(insight);
        categorized
            .by_site
            .entry(insight.site().to_string())
            .or_default()
            .push(insight);
    }
    categorized
}

impl<'a> CategorizedInsights<'a> {
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn of(&self, severity: Severity) -> &[&'a Insight] {
        self.by_severity.get(&severity).map_or(&[][..], Vec::as_slice)
    }

    /// Actions worth taking now, most pressing first
    #[must_use]
    pub fn recommendations(&self) -> Vec<String> {
        let mut actions = Vec::new();

        let critical = self.count(Severity::Critical);
        if critical > 0 {
            actions.push(format!(
                "URGENT: Address {critical} critical insight(s) immediately"
            ));
        }

        let major = self.count(Severity::Major);
        if major > MAJOR_REVIEW_THRESHOLD {
            actions.push(format!(
                "Review and address {major} major insights to prevent degradation"
            ));
        }

        for (kind, insights) in &self.by_type {
            if insights.len() > PATTERN_THRESHOLD {
                actions.push(format!(
                    "Pattern detected: Multiple '{kind}' insights ({} occurrences) - investigate root cause",
                    insights.len()
                ));
            }
        }

        for (site, insights) in &self.by_site {
            let high = insights.iter().filter(|i| i.severity().is_high()).count();
            if high > SITE_HOTSPOT_THRESHOLD {
                actions.push(format!(
                    "Site {site} has {high} high-severity insights - prioritize investigation"
                ));
            }
        }

        actions
    }

    #[must_use]
    pub fn summary(&self) -> InsightsSummary {
        InsightsSummary {
            total_insights: self.total,
            by_severity: self
                .by_severity
                .iter()
                .map(|(s, v)| (s.as_str().to_string(), v.len()))
                .collect(),
            by_type: self
                .by_type
                .iter()
                .map(|(t, v)| (t.clone(), v.len()))
                .collect(),
            sites_affected: self.by_site.len(),
        }
    }

    /// Log the analysis report and recommendations
    pub fn log_report(&self) {
        info!("INSIGHTS ANALYSIS REPORT");
        for severity in Severity::ALL {
            let count = self.count(severity);
            if count > 0 {
                info!(severity = %severity, count, "insights by severity");
            }
        }
        for (kind, insights) in &self.by_type {
            info!(kind = %kind, count = insights.len(), "insights by type");
        }

        for severity in [Severity::Critical, Severity::Major] {
            for insight in self.of(severity) {
                warn!(
                    severity = %severity,
                    kind = insight.kind(),
                    site = insight.site(),
                    device = insight.device_name.as_deref().unwrap_or("-"),
                    "{}",
                    insight.description.as_deref().unwrap_or("No description")
                );
            }
        }

        let actions = self.recommendations();
        if actions.is_empty() {
            info!("no immediate actions required");
        }
        for (idx, action) in actions.iter().enumerate() {
            info!("recommendation {}: {action}", idx + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insight(severity: &str, kind: &str, site: &str) -> Insight {
        Insight {
            severity: Some(severity.to_string()),
            kind: Some(kind.to_string()),
            site_id: Some(site.to_string()),
            ..Insight::default()
        }
    }

    #[test]
    fn test_categorize_counts() {
        let insights = vec![
            insight("critical", "ap_offline", "s1"),
            insight("Major", "dhcp_failure", "s1"),
            insight("whatever", "dhcp_failure", "s2"),
        ];
        let categorized = categorize(&insights);

        assert_eq!(categorized.count(Severity::Critical), 1);
        assert_eq!(categorized.count(Severity::Major), 1);
        assert_eq!(categorized.count(Severity::Info), 1);
        assert_eq!(categorized.by_type["dhcp_failure"].len(), 2);

        let summary = categorized.summary();
        assert_eq!(summary.total_insights, 3);
        assert_eq!(summary.sites_affected, 2);
        assert_eq!(summary.by_severity["info"], 1);
    }

    #[test]
    fn test_recommendations() {
        let insights = vec![
            insight("critical", "ap_offline", "s1"),
            insight("major", "ap_offline", "s1"),
            insight("major", "ap_offline", "s1"),
            insight("major", "radius", "s2"),
            insight("major", "radius", "s3"),
        ];
        let actions = categorize(&insights).recommendations();

        assert_eq!(actions.len(), 4);
        assert!(actions[0].starts_with("URGENT: Address 1 critical"));
        assert!(actions[1].starts_with("Review and address 4 major"));
        assert!(actions[2].contains("'ap_offline' insights (3 occurrences)"));
        assert!(actions[3].starts_with("Site s1 has 3 high-severity"));
    }

    #[test]
    fn test_no_recommendations_when_quiet() {
        let insights = vec![insight("info", "client_count", "s1")];
        assert!(categorize(&insights).recommendations().is_empty());
        assert!(categorize(&[]).recommendations().is_empty());
    }
}
