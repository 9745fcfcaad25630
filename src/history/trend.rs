//! Day-over-day trend analysis
//!
//! Compares a fresh snapshot with the newest snapshot of the most recent
//! earlier day and classifies each shared metric as worsening, improving or
//! stable, taking the metric's polarity into account.

use super::polarity::{Polarity, PolarityTable};
use super::snapshot::Snapshot;
use super::store::{Result, SnapshotStore};
use crate::config::ThresholdsConfig;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt::Write;
use tracing::debug;

const RULE: &str = "======================================================================";

/// Direction of a metric (or of the whole comparison) relative to its baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Worsening,
    Improving,
    Stable,
}

impl Direction {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Worsening => "[WORSENING]",
            Self::Improving => "[IMPROVING]",
            Self::Stable => "[STABLE]",
        }
    }

    #[must_use]
    pub const fn arrow(&self) -> &'static str {
        match self {
            Self::Worsening => "↘",
            Self::Improving => "↗",
            Self::Stable => "→",
        }
    }

    /// Sort rank, worst first
    const fn rank(self) -> u8 {
        match self {
            Self::Worsening => 0,
            Self::Improving => 1,
            Self::Stable => 2,
        }
    }
}

/// Raw movement of a value before polarity is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Movement {
    Rising,
    Falling,
    Flat,
}

/// Comparison of one metric key present in both snapshots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTrend {
    pub key: String,
    pub old: f64,
    pub new: f64,
    /// `None` when the baseline was zero and the new value is not: the change
    /// is unbounded
    pub percent_change: Option<f64>,
    pub direction: Direction,
}

/// Outcome of one day-over-day comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    pub baseline_date: NaiveDate,
    pub baseline_timestamp: DateTime<Utc>,
    pub overall_direction: Direction,
    /// Worsening first, then improving, then stable; ties by key
    pub per_metric: Vec<MetricTrend>,
    pub degraded: Vec<MetricTrend>,
    pub stable_count: usize,
}

impl TrendResult {
    pub fn improved(&self) -> impl Iterator<Item = &MetricTrend> {
        self.per_metric
            .iter()
            .filter(|m| m.direction == Direction::Improving)
    }

    #[must_use]
    pub fn has_degradation(&self) -> bool {
        !self.degraded.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    threshold_percent: f64,
    polarity: PolarityTable,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_TREND_DEGRADATION_PERCENT,
            PolarityTable::builtin(),
        )
    }
}

impl TrendAnalyzer {
    #[must_use]
    pub const fn new(threshold_percent: f64, polarity: PolarityTable) -> Self {
        Self {
            threshold_percent,
            polarity,
        }
    }

    #[must_use]
    pub fn from_config(thresholds: &ThresholdsConfig) -> Self {
        Self::new(
            thresholds.trend_degradation_percent,
            PolarityTable::with_overrides(&thresholds.polarity, thresholds.default_polarity),
        )
    }

    #[must_use]
    pub const fn threshold_percent(&self) -> f64 {
        self.threshold_percent
    }

    #[must_use]
    pub const fn polarity(&self) -> &PolarityTable {
        &self.polarity
    }

    /// Compare `current` with the newest snapshot of the most recent day
    /// strictly before `current`'s date
    ///
    /// Returns `Ok(None)` when there is no usable baseline.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the store cannot be listed
    pub fn analyze(&self, current: &Snapshot, store: &SnapshotStore) -> Result<Option<TrendResult>> {
        let Some((baseline_date, baseline)) = store.latest_before(current.date())? else {
            debug!(date = %current.date(), "no baseline before date");
            return Ok(None);
        };
        Ok(Some(self.compare(baseline_date, &baseline, current)))
    }

    /// Compare two snapshots; keys present on only one side are skipped
    #[must_use]
    pub fn compare(
        &self,
        baseline_date: NaiveDate,
        baseline: &Snapshot,
        current: &Snapshot,
    ) -> TrendResult {
        let mut per_metric: Vec<MetricTrend> = current
            .metrics
            .iter()
            .filter_map(|(key, new)| {
                let old = baseline.metrics.get(key)?;
                Some(self.classify(key, *old, *new))
            })
            .collect();

        // BTreeMap iteration already yields keys in lexical order; a stable
        // sort on rank keeps it as the tie-breaker
        per_metric.sort_by_key(|m| m.direction.rank());

        let degraded: Vec<MetricTrend> = per_metric
            .iter()
            .filter(|m| m.direction == Direction::Worsening)
            .cloned()
            .collect();
        let stable_count = per_metric
            .iter()
            .filter(|m| m.direction == Direction::Stable)
            .count();

        let overall_direction = if !degraded.is_empty() {
            Direction::Worsening
        } else if per_metric.iter().any(|m| m.direction == Direction::Improving) {
            Direction::Improving
        } else {
            Direction::Stable
        };

        TrendResult {
            baseline_date,
            baseline_timestamp: baseline.timestamp,
            overall_direction,
            per_metric,
            degraded,
            stable_count,
        }
    }

    /// Classify one metric. The percent change is rounded to two decimals
    /// before it is compared, so a change of exactly the threshold is stable.
    #[must_use]
    pub fn classify(&self, key: &str, old: f64, new: f64) -> MetricTrend {
        let (percent_change, movement) = if old == 0.0 {
            if new == 0.0 {
                (Some(0.0), Movement::Flat)
            } else if new > 0.0 {
                (None, Movement::Rising)
            } else {
                (None, Movement::Falling)
            }
        } else {
            let pct = round_percent((new - old) * 100.0 / old.abs());
            let movement = if pct > self.threshold_percent {
                Movement::Rising
            } else if pct < -self.threshold_percent {
                Movement::Falling
            } else {
                Movement::Flat
            };
            (Some(pct), movement)
        };

        let direction = match (movement, self.polarity.lookup(key)) {
            (Movement::Flat, _) => Direction::Stable,
            (Movement::Rising, Polarity::HigherIsBetter)
            | (Movement::Falling, Polarity::HigherIsWorse) => Direction::Improving,
            (Movement::Rising, Polarity::HigherIsWorse)
            | (Movement::Falling, Polarity::HigherIsBetter) => Direction::Worsening,
        };

        MetricTrend {
            key: key.to_string(),
            old,
            new,
            percent_change,
            direction,
        }
    }
}

/// Percent changes are kept and compared at two-decimal precision
fn round_percent(pct: f64) -> f64 {
    (pct * 100.0).round() / 100.0
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn format_change(metric: &MetricTrend) -> String {
    metric
        .percent_change
        .map_or_else(|| "new, was 0".to_string(), |pct| format!("{pct:+.1}%"))
}

fn format_metric_line(metric: &MetricTrend) -> String {
    format!(
        "  - {}: {} → {} ({}) {}",
        metric.key,
        format_value(metric.old),
        format_value(metric.new),
        format_change(metric),
        metric.direction.label()
    )
}

/// Render the plain-text trend block embedded in reports and emails
///
/// Log scrapers key off `DEGRADATION DETECTED` and `STABLE:`.
#[must_use]
pub fn render(trend: Option<&TrendResult>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "TREND ANALYSIS REPORT");
    let _ = writeln!(out, "{RULE}");

    let Some(trend) = trend else {
        let _ = writeln!(out, "[WARNING] No historical data available for trend analysis");
        let _ = writeln!(out, "Trends will be available after the next report generation");
        let _ = writeln!(out, "{RULE}");
        return out;
    };

    let _ = writeln!(
        out,
        "Baseline: {} (snapshot taken {})",
        trend.baseline_date,
        trend.baseline_timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Overall Trend: {} {}",
        trend.overall_direction.label(),
        trend.overall_direction.arrow()
    );

    if trend.has_degradation() {
        let _ = writeln!(out);
        let _ = writeln!(out, "DEGRADATION DETECTED:");
        for metric in &trend.degraded {
            let _ = writeln!(out, "{}", format_metric_line(metric));
        }
    }

    let mut improved = trend.improved().peekable();
    if improved.peek().is_some() {
        let _ = writeln!(out);
        let _ = writeln!(out, "IMPROVEMENTS DETECTED:");
        for metric in improved {
            let _ = writeln!(out, "{}", format_metric_line(metric));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "STABLE: {} metric(s) stable", trend.stable_count);
    let _ = writeln!(out, "{RULE}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(day: u32, metrics: &[(&str, f64)]) -> Snapshot {
        let mut s = Snapshot::new(Utc.with_ymd_and_hms(2026, 1, day, 8, 0, 0).unwrap());
        for (k, v) in metrics {
            s.metrics.insert((*k).to_string(), *v);
        }
        s
    }

    fn compare(old: &[(&str, f64)], new: &[(&str, f64)]) -> TrendResult {
        let baseline = snapshot(21, old);
        TrendAnalyzer::default().compare(baseline.date(), &baseline, &snapshot(22, new))
    }

    #[test]
    fn test_threshold_boundaries() {
        let analyzer = TrendAnalyzer::default();

        let m = analyzer.classify("capacity", 100.0, 104.0);
        assert_eq!(m.direction, Direction::Stable);

        let m = analyzer.classify("capacity", 100.0, 106.0);
        assert_eq!(m.direction, Direction::Improving);
        let m = analyzer.classify("critical_insights", 100.0, 106.0);
        assert_eq!(m.direction, Direction::Worsening);

        // Exactly the threshold is not a move
        let m = analyzer.classify("capacity", 100.0, 95.0);
        assert_eq!(m.percent_change, Some(-5.0));
        assert_eq!(m.direction, Direction::Stable);
        let m = analyzer.classify("capacity", 100.0, 94.9);
        assert_eq!(m.direction, Direction::Worsening);
    }

    #[test]
    fn test_fractional_values_at_threshold_are_stable() {
        let analyzer = TrendAnalyzer::default();
        for (old, new) in [(0.3, 0.315), (0.7, 0.735), (3.3, 3.465), (0.7, 0.665)] {
            let m = analyzer.classify("capacity", old, new);
            assert_eq!(m.direction, Direction::Stable, "{old} -> {new}");
            assert_eq!(m.percent_change.map(f64::abs), Some(5.0), "{old} -> {new}");
        }
        let m = analyzer.classify("capacity", 0.3, 0.3152);
        assert_eq!(m.direction, Direction::Improving);
    }

    #[test]
    fn test_zero_baseline() {
        let analyzer = TrendAnalyzer::default();

        let m = analyzer.classify("critical_insights", 0.0, 0.0);
        assert_eq!(m.percent_change, Some(0.0));
        assert_eq!(m.direction, Direction::Stable);

        let m = analyzer.classify("critical_insights", 0.0, 3.0);
        assert_eq!(m.percent_change, None);
        assert_eq!(m.direction, Direction::Worsening);

        let m = analyzer.classify("successful_connect.HQ", 0.0, 90.0);
        assert_eq!(m.direction, Direction::Improving);
    }

    #[test]
    fn test_ordering_worst_first_then_key() {
        let result = compare(
            &[
                ("roaming.B", 90.0),
                ("capacity.A", 80.0),
                ("critical_insights", 1.0),
                ("throughput.A", 50.0),
                ("coverage.A", 90.0),
            ],
            &[
                ("roaming.B", 70.0),
                ("capacity.A", 60.0),
                ("critical_insights", 0.0),
                ("throughput.A", 50.0),
                ("coverage.A", 90.0),
            ],
        );

        let keys: Vec<&str> = result.per_metric.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "capacity.A",
                "roaming.B",
                "critical_insights",
                "coverage.A",
                "throughput.A"
            ]
        );
        assert_eq!(result.degraded.len(), 2);
        assert_eq!(result.stable_count, 2);
    }

    #[test]
    fn test_overall_direction() {
        let improving = compare(&[("critical_insights", 4.0)], &[("critical_insights", 1.0)]);
        assert_eq!(improving.overall_direction, Direction::Improving);

        let stable = compare(&[("roaming", 92.0)], &[("roaming", 92.0)]);
        assert_eq!(stable.overall_direction, Direction::Stable);

        let empty = compare(&[("roaming", 92.0)], &[("capacity", 80.0)]);
        assert!(empty.per_metric.is_empty());
        assert_eq!(empty.overall_direction, Direction::Stable);
    }

    #[test]
    fn test_render_sections() {
        let result = compare(
            &[("capacity.Phoenix", 80.0), ("roaming", 92.0), ("major_insights", 4.0)],
            &[("capacity.Phoenix", 75.0), ("roaming", 92.0), ("major_insights", 2.0)],
        );
        let text = render(Some(&result));

        assert!(text.contains("TREND ANALYSIS REPORT"));
        assert!(text.contains("Overall Trend: [WORSENING]"));
        assert!(text.contains("DEGRADATION DETECTED:"));
        assert!(text.contains("  - capacity.Phoenix: 80 → 75 (-6."));
        assert!(text.contains("IMPROVEMENTS DETECTED:"));
        assert!(text.contains("  - major_insights: 4 → 2 (-50.0%) [IMPROVING]"));
        assert!(text.contains("STABLE: 1 metric(s) stable"));

        let degradation = text.find("DEGRADATION DETECTED").unwrap();
        let stable = text.find("STABLE:").unwrap();
        assert!(degradation < stable);
    }

    #[test]
    fn test_render_without_degradation_or_baseline() {
        let result = compare(&[("roaming", 92.0)], &[("roaming", 92.0)]);
        let text = render(Some(&result));
        assert!(!text.contains("DEGRADATION DETECTED"));
        assert!(text.contains("STABLE: 1 metric(s) stable"));

        let text = render(None);
        assert!(text.contains("No historical data available for trend analysis"));
    }

    #[test]
    fn test_unbounded_change_rendering() {
        let result = compare(&[("critical_insights", 0.0)], &[("critical_insights", 2.0)]);
        let text = render(Some(&result));
        assert!(text.contains("critical_insights: 0 → 2 (new, was 0) [WORSENING]"));
    }
}
