// Text and JSON renderers for the summary report and the health dashboard
use super::health::{HealthLevel, HealthStatus, SiteStatus};
use crate::history::HistorySummary;
use crate::mist::{Insight, Severity, Site, site_labels};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

const RULE: &str = "======================================================================";
const THIN_RULE: &str = "----------------------------------------------------------------------";

/// Tiers listed in reports, most urgent first
const REPORTED_TIERS: [Severity; 4] = [
    Severity::Critical,
    Severity::Major,
    Severity::Warning,
    Severity::Info,
];

#[must_use]
pub const fn action_text(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "URGENT - Immediate action required",
        Severity::Major => "HIGH - Address within 24 hours",
        Severity::Warning => "MEDIUM - Monitor closely",
        Severity::Info => "INFO - Normal operation",
        Severity::Minor => "LOW - Review when convenient",
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Summary report with priority-sorted insights. `trend` is appended verbatim.
#[must_use]
pub fn summary_report(
    health: &HealthStatus,
    sites: &[Site],
    insights: &[Insight],
    trend: Option<&str>,
) -> String {
    let site_names = site_labels(sites);
    let counts = &health.counts;

    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "MIST INFRASTRUCTURE SUMMARY REPORT");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);
    let _ = writeln!(out, "Report Generated: {}", timestamp(health.timestamp));
    let _ = writeln!(
        out,
        "Organization ID: {}",
        health.organization_id.as_deref().unwrap_or("unknown")
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "OVERALL INFRASTRUCTURE HEALTH");
    let _ = writeln!(out, "{THIN_RULE}");
    let _ = writeln!(out, "Status: {}", health.overall.as_str());
    let _ = writeln!(out, "Total Sites: {}", health.total_sites);
    let _ = writeln!(out, "Total Insights: {}", health.total_insights);
    let _ = writeln!(out);

    let _ = writeln!(out, "INSIGHTS BREAKDOWN (BY PRIORITY)");
    let _ = writeln!(out, "{THIN_RULE}");
    for (tag, label, count, severity) in [
        ("[CRIT]", "Critical:", counts.critical, Severity::Critical),
        ("[FAIL]", "Major:   ", counts.major, Severity::Major),
        ("[WARN]", "Warning: ", counts.warning, Severity::Warning),
        ("[INFO]", "Info:    ", counts.info, Severity::Info),
    ] {
        let _ = writeln!(out, "  {tag} {label} {count} - {}", action_text(severity));
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "SITES STATUS");
    let _ = writeln!(out, "{THIN_RULE}");
    for (name, site) in &health.sites {
        let _ = writeln!(
            out,
            "  {name:30} | Status: {:10} | Insights: {}",
            site.status.as_str(),
            site.insight_count
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "DETAILED INSIGHTS (PRIORITY-SORTED)");
    let _ = writeln!(out, "{THIN_RULE}");
    if insights.is_empty() {
        let _ = writeln!(out, "No insights available.");
    } else {
        let mut counter = 1;
        for severity in REPORTED_TIERS {
            let mut tier: Vec<&Insight> =
                insights.iter().filter(|i| i.severity() == severity).collect();
            if tier.is_empty() {
                continue;
            }
            tier.sort_by(|a, b| a.title().cmp(b.title()));

            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "[{}] {}",
                severity.as_str().to_uppercase(),
                action_text(severity)
            );
            let _ = writeln!(out, "{THIN_RULE}");
            for insight in tier {
                let _ = writeln!(out);
                let _ = writeln!(out, "{counter}. {}", insight.title());
                let _ = writeln!(
                    out,
                    "   Severity: {}",
                    insight.severity.as_deref().unwrap_or("unknown")
                );
                let _ = writeln!(out, "   Type: {}", insight.kind());
                if let Some(site_id) = insight.site_id.as_deref() {
                    let name = site_names.get(site_id).map_or("Unknown", String::as_str);
                    let _ = writeln!(out, "   Site: {name}");
                    let _ = writeln!(out, "   Site ID: {site_id}");
                }
                if let Some(text) = insight.text.as_deref() {
                    let _ = writeln!(out, "   Details: {text}");
                }
                counter += 1;
            }
        }
    }

    if let Some(trend) = trend {
        let _ = writeln!(out);
        out.push_str(trend);
        if !trend.ends_with('\n') {
            out.push('\n');
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "End of Report");
    let _ = writeln!(out, "{RULE}");
    out
}

fn write_recommendations(out: &mut String, health: &HealthStatus) {
    let counts = &health.counts;
    let _ = writeln!(out, "ACTION RECOMMENDATIONS (BY PRIORITY)");
    let _ = writeln!(out, "{THIN_RULE}");

    let tiers: [(&str, u64, Severity, [&str; 3]); 3] = [
        (
            "[CRIT] CRITICAL",
            counts.critical,
            Severity::Critical,
            [
                "Investigate immediately",
                "Engage incident response team",
                "Estimate resolution time",
            ],
        ),
        (
            "[FAIL] MAJOR",
            counts.major,
            Severity::Major,
            [
                "Create tickets for remediation",
                "Schedule maintenance window",
                "Document impact and workarounds",
            ],
        ),
        (
            "[WARN] WARNING",
            counts.warning,
            Severity::Warning,
            [
                "Monitor trending metrics",
                "Plan preventive maintenance",
                "Update runbooks if applicable",
            ],
        ),
    ];
    for (label, count, severity, steps) in tiers {
        if count == 0 {
            continue;
        }
        let _ = writeln!(out, "{label} ({count} issues)");
        let _ = writeln!(out, "       {}", action_text(severity));
        for step in steps {
            let _ = writeln!(out, "       - {step}");
        }
        let _ = writeln!(out);
    }

    if counts.issues() == 0 {
        let _ = writeln!(out, "[INFO] All systems normal");
        let _ = writeln!(out, "       Continue routine monitoring");
        let _ = writeln!(out);
    }
}

/// Health dashboard text, with a history depth line when history is enabled
#[must_use]
pub fn dashboard_text(health: &HealthStatus, history: Option<&HistorySummary>) -> String {
    let counts = &health.counts;
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "INFRASTRUCTURE HEALTH DASHBOARD");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated: {}", timestamp(health.timestamp));
    let _ = writeln!(out, "Overall Status: {}", health.overall.symbol());
    if let Some(history) = history {
        match history.date_range() {
            Some(range) => {
                let _ = writeln!(
                    out,
                    "History: {} day(s), {} snapshot(s) ({range})",
                    history.total_days, history.snapshot_count
                );
            }
            None => {
                let _ = writeln!(out, "History: no snapshots stored yet");
            }
        }
    }
    let _ = writeln!(out);

    write_recommendations(&mut out, health);

    let _ = writeln!(out, "HEALTH STATISTICS");
    let _ = writeln!(out, "{THIN_RULE}");
    let _ = writeln!(out, "Total Issues:    {}", counts.issues());
    let _ = writeln!(out, "  [CRIT] Critical:   {}", counts.critical);
    let _ = writeln!(out, "  [WARN] Major:      {}", counts.major);
    let _ = writeln!(out, "  [!] Warning:       {}", counts.warning);
    let _ = writeln!(out, "  [i] Info:          {}", counts.info);
    let _ = writeln!(out);

    let _ = writeln!(out, "SITE STATUS GRID");
    let _ = writeln!(out, "{THIN_RULE}");
    let _ = writeln!(out, "Healthy:    {}", health.sites_with(HealthLevel::Healthy));
    let _ = writeln!(out, "Degraded:   {}", health.sites_with(HealthLevel::Degraded));
    let _ = writeln!(out, "Unhealthy:  {}", health.sites_with(HealthLevel::Unhealthy));
    let _ = writeln!(out, "Critical:   {}", health.sites_with(HealthLevel::Critical));
    let _ = writeln!(out);

    let _ = writeln!(out, "INDIVIDUAL SITE STATUS (PRIORITY-ORDERED)");
    let _ = writeln!(out, "{THIN_RULE}");
    let _ = writeln!(out, "{:<30} | {:<16} | Insights", "Site Name", "Status");
    let _ = writeln!(out, "{THIN_RULE}");
    for (name, site) in health.sites_by_severity() {
        let _ = writeln!(
            out,
            "{name:<30} | {:<16} | {}",
            site.status.symbol(),
            site.insight_count
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Dashboard generated successfully");
    let _ = writeln!(out, "{RULE}");
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSummaryCounts {
    pub critical: u64,
    pub major: u64,
    pub warning: u64,
    pub info: u64,
}

/// Machine-readable health dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardJson<'a> {
    pub timestamp: DateTime<Utc>,
    pub organization_id: Option<&'a str>,
    pub overall_status: HealthLevel,
    pub total_sites: usize,
    pub health_summary: HealthSummaryCounts,
    pub sites: &'a BTreeMap<String, SiteStatus>,
}

#[must_use]
pub fn dashboard_json(health: &HealthStatus) -> DashboardJson<'_> {
    DashboardJson {
        timestamp: health.timestamp,
        organization_id: health.organization_id.as_deref(),
        overall_status: health.overall,
        total_sites: health.total_sites,
        health_summary: HealthSummaryCounts {
            critical: health.counts.critical,
            major: health.counts.major,
            warning: health.counts.warning,
            info: health.counts.info,
        },
        sites: &health.sites,
    }
}
