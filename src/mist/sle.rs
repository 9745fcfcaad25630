//! SLE (Service Level Expectation) monitoring
//!
//! Each site's SLE metrics are fetched, checked against the configured
//! thresholds and recorded as snapshot metrics keyed `<metric>.<site name>`.

use super::client::MistClient;
use super::types::{Site, site_labels};
use crate::history::{Polarity, PolarityTable, polarity::normalize};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

/// SLE metrics queried for every site, in Mist's URL form
pub const TRACKED_METRICS: &[&str] = &[
    "time-to-connect",
    "successful-connect",
    "throughput",
    "capacity",
    "roaming",
    "coverage",
    "ap-health",
];

/// Snapshot metric key for a site's SLE value. `site_name` is the site's
/// label from [`site_labels`], unique within the organization.
#[must_use]
pub fn metric_key(metric: &str, site_name: &str) -> String {
    format!("{}.{site_name}", normalize(metric))
}

/// Current value of an SLE metric response
///
/// The payload shape differs per metric; `score`, `value`, `summary.score`
/// and `summary.value` are tried in that order.
#[must_use]
pub fn extract_value(data: &Value) -> Option<f64> {
    let obj = data.as_object()?;
    if let Some(v) = obj.get("score").and_then(Value::as_f64) {
        return Some(v);
    }
    if let Some(v) = obj.get("value").and_then(Value::as_f64) {
        return Some(v);
    }
    let summary = obj.get("summary")?.as_object()?;
    summary
        .get("score")
        .and_then(Value::as_f64)
        .or_else(|| summary.get("value").and_then(Value::as_f64))
}

/// Whether `value` violates `threshold` for a metric of the given polarity
#[must_use]
pub fn violates(value: f64, threshold: f64, polarity: Polarity) -> bool {
    match polarity {
        Polarity::HigherIsBetter => value < threshold,
        Polarity::HigherIsWorse => value > threshold,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleReading {
    pub site_id: String,
    pub site_name: String,
    /// snake_case metric name
    pub metric: String,
    pub value: f64,
}

impl SleReading {
    #[must_use]
    pub fn key(&self) -> String {
        metric_key(&self.metric, &self.site_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleIssue {
    pub site_name: String,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
}

impl fmt::Display for SleIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.2} (threshold: {:.2})",
            self.metric, self.value, self.threshold
        )
    }
}

/// Aggregate of one metric over all sites
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStats {
    pub count: usize,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub threshold: Option<f64>,
    pub issues: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SleReport {
    pub sites_analyzed: usize,
    pub readings: Vec<SleReading>,
    pub issues: Vec<SleIssue>,
}

impl SleReport {
    /// Snapshot metrics for every reading
    pub fn metrics(&self) -> impl Iterator<Item = (String, f64)> + '_ {
        self.readings.iter().map(|r| (r.key(), r.value))
    }

    /// Per-metric statistics across sites
    #[must_use]
    pub fn summary(&self, thresholds: &BTreeMap<String, f64>) -> BTreeMap<String, MetricStats> {
        let mut grouped: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for reading in &self.readings {
            grouped.entry(reading.metric.as_str()).or_default().push(reading.value);
        }

        grouped
            .into_iter()
            .map(|(metric, values)| {
                let count = values.len();
                let sum: f64 = values.iter().sum();
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let issues = self.issues.iter().filter(|i| i.metric == metric).count();
                #[allow(clippy::cast_precision_loss)]
                let average = sum / count as f64;
                (
                    metric.to_string(),
                    MetricStats {
                        count,
                        average,
                        min,
                        max,
                        threshold: thresholds.get(metric).copied(),
                        issues,
                    },
                )
            })
            .collect()
    }
}

/// Check readings against thresholds. Metrics without a threshold are never
/// issues.
#[must_use]
pub fn evaluate(
    readings: &[SleReading],
    thresholds: &BTreeMap<String, f64>,
    polarity: &PolarityTable,
) -> Vec<SleIssue> {
    readings
        .iter()
        .filter_map(|r| {
            let threshold = *thresholds.get(&r.metric)?;
            violates(r.value, threshold, polarity.lookup(&r.metric)).then(|| SleIssue {
                site_name: r.site_name.clone(),
                metric: r.metric.clone(),
                value: r.value,
                threshold,
            })
        })
        .collect()
}

pub struct SleMonitor<'a> {
    client: &'a MistClient,
    thresholds: &'a BTreeMap<String, f64>,
    polarity: &'a PolarityTable,
}

impl<'a> SleMonitor<'a> {
    #[must_use]
    pub const fn new(
        client: &'a MistClient,
        thresholds: &'a BTreeMap<String, f64>,
        polarity: &'a PolarityTable,
    ) -> Self {
        Self {
            client,
            thresholds,
            polarity,
        }
    }

    /// Collect SLE readings for all `sites` and flag threshold violations
    pub async fn run(&self, sites: &[Site]) -> SleReport {
        info!(sites = sites.len(), "starting SLE monitoring");
        let labels = site_labels(sites);
        let mut readings = Vec::new();
        for site in sites {
            let name = labels[site.id.as_str()].as_str();
            info!(site = name, id = %site.id, "monitoring site");
            readings.extend(self.monitor_site(site, name).await);
        }

        let issues = evaluate(&readings, self.thresholds, self.polarity);
        for site in sites {
            let name = labels[site.id.as_str()].as_str();
            let site_issues: Vec<&SleIssue> =
                issues.iter().filter(|i| i.site_name == name).collect();
            if site_issues.is_empty() {
                info!(site = name, "all SLE metrics within thresholds");
            } else {
                warn!(site = name, count = site_issues.len(), "SLE issues found");
                for issue in site_issues {
                    warn!(site = name, "{issue}");
                }
            }
        }

        SleReport {
            sites_analyzed: sites.len(),
            readings,
            issues,
        }
    }

    /// Readings for one site, recorded under `name`
    async fn monitor_site(&self, site: &Site, name: &str) -> Vec<SleReading> {
        if let Err(e) = self.client.get_sle_metrics(&site.id, None).await {
            debug!(site = name, error = %e, "SLE metrics not available");
            return Vec::new();
        }

        let mut readings = Vec::new();
        for &metric in TRACKED_METRICS {
            let data = match self.client.get_sle_metrics(&site.id, Some(metric)).await {
                Ok(data) => data,
                Err(e) => {
                    debug!(site = name, metric, error = %e, "could not retrieve metric");
                    continue;
                }
            };
            let Some(value) = extract_value(&data) else {
                debug!(site = name, metric, "metric has no value");
                continue;
            };
            debug!(site = name, metric, value, "SLE reading");
            readings.push(SleReading {
                site_id: site.id.clone(),
                site_name: name.to_string(),
                metric: normalize(metric),
                value,
            });
        }
        readings
    }
}
