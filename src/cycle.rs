//! Monitoring cycles and the daemon loop
//!
//! A cycle collects from the Mist API, builds the snapshot, compares it with
//! the previous day, persists it, sweeps expired history, writes reports and
//! sends alerts, in that order.

use crate::config::AppConfig;
use crate::error::Result;
use crate::history::{self, History, PruneReport, Snapshot, TrendAnalyzer, TrendResult};
use crate::mist::{self, Insight, MistClient, Site, SleMonitor, SleReport};
use crate::notify::NotificationService;
use crate::report::{self, HealthStatus, ReportPaths, ReportWriter};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// SLE monitoring only
    Monitor,
    /// Insights analysis only
    Insights,
    /// Health reports, history and trends
    Report,
    #[default]
    All,
}

impl Mode {
    #[must_use]
    pub const fn runs_monitor(self) -> bool {
        matches!(self, Self::Monitor | Self::All)
    }

    #[must_use]
    pub const fn runs_insights(self) -> bool {
        matches!(self, Self::Insights | Self::All)
    }

    #[must_use]
    pub const fn runs_report(self) -> bool {
        matches!(self, Self::Report | Self::All)
    }
}

/// Everything fetched from the API during one cycle
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub sites: Vec<Site>,
    pub insights: Vec<Insight>,
    pub sle: Option<SleReport>,
}

#[derive(Debug)]
pub struct CycleOutcome {
    pub id: Uuid,
    pub mode: Mode,
    pub health: Option<HealthStatus>,
    pub trend: Option<TrendResult>,
    pub snapshot_path: Option<PathBuf>,
    /// Set when history is enabled but this cycle's snapshot was not saved
    pub history_write_failed: bool,
    pub prune: Option<PruneReport>,
    pub reports: Option<ReportPaths>,
    pub alerts_sent: usize,
    pub errors: Vec<String>,
}

impl CycleOutcome {
    #[must_use]
    pub const fn new(id: Uuid, mode: Mode) -> Self {
        Self {
            id,
            mode,
            health: None,
            trend: None,
            snapshot_path: None,
            history_write_failed: false,
            prune: None,
            reports: None,
            alerts_sent: 0,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.history_write_failed && self.errors.is_empty()
    }
}

/// Long-lived monitoring context shared by all cycles
pub struct Monitor {
    config: AppConfig,
    client: MistClient,
    history: Option<History>,
    reports: ReportWriter,
    notifier: NotificationService,
    /// Trend thresholds and the polarity table shared with SLE checks
    analyzer: TrendAnalyzer,
}

impl Monitor {
    #[must_use]
    pub fn new(config: AppConfig, client: MistClient) -> Self {
        let history = History::from_config(&config);
        if history.is_none() {
            info!("history directory not configured, trend analysis disabled");
        }
        Self {
            reports: ReportWriter::new(&config.reports.directory),
            notifier: NotificationService::new(&config.notifications),
            analyzer: TrendAnalyzer::from_config(&config.thresholds),
            history,
            client,
            config,
        }
    }

    /// Build the client, resolve the organization and assemble the monitor
    ///
    /// # Errors
    ///
    /// Will return `Err` if the client cannot be built or the organization
    /// cannot be resolved
    pub async fn connect(config: AppConfig) -> Result<Self> {
        let mut client = MistClient::new(&config.mist)?;
        client.initialize_org().await?;
        Ok(Self::new(config, client))
    }

    #[must_use]
    pub const fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    #[must_use]
    pub const fn analyzer(&self) -> &TrendAnalyzer {
        &self.analyzer
    }

    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run one cycle. Failures are recorded in the outcome, never raised.
    pub async fn run_cycle(&self, mode: Mode) -> CycleOutcome {
        let id = Uuid::new_v4();
        let span = info_span!("cycle", %id, ?mode);
        async move {
            info!("cycle started");
            let mut outcome = CycleOutcome::new(id, mode);
            let collected = self.collect(mode, &mut outcome).await;
            if mode.runs_report() {
                if outcome.errors.is_empty() {
                    self.report(&collected, Utc::now(), &mut outcome).await;
                } else {
                    warn!("skipping reports, collection failed");
                }
            }
            info!(success = outcome.is_success(), "cycle finished");
            outcome
        }
        .instrument(span)
        .await
    }

    async fn collect(&self, mode: Mode, outcome: &mut CycleOutcome) -> Collected {
        let mut collected = Collected::default();

        if mode.runs_monitor() || mode.runs_report() {
            match self.client.get_sites().await {
                Ok(sites) => collected.sites = sites,
                Err(e) => {
                    error!(error = %e, "failed to retrieve sites");
                    outcome.errors.push(format!("sites: {e}"));
                    return collected;
                }
            }
        }

        if mode.runs_monitor() {
            let monitor = SleMonitor::new(
                &self.client,
                &self.config.thresholds.sle,
                self.analyzer.polarity(),
            );
            collected.sle = Some(monitor.run(&collected.sites).await);
        }

        if mode.runs_insights() || mode.runs_report() {
            match self.client.get_insights(None).await {
                Ok(insights) => collected.insights = insights,
                Err(e) => {
                    warn!(error = %e, "insights unavailable, endpoint may not be enabled for this organization");
                }
            }
        }

        if mode.runs_insights() {
            if collected.insights.is_empty() {
                info!("no insights found");
            } else {
                mist::categorize(&collected.insights).log_report();
            }
        }

        collected
    }

    /// Report stage: snapshot, trend, save, sweep, report files, alerts
    pub async fn report(&self, data: &Collected, now: DateTime<Utc>, outcome: &mut CycleOutcome) {
        let health = HealthStatus::calculate(&data.sites, &data.insights, self.client.org_id(), now);
        let snapshot = health.to_snapshot(data.sle.as_ref());

        let trend = self
            .history
            .as_ref()
            .and_then(|h| analyze(&self.analyzer, h, &snapshot));
        if let Some(history) = &self.history {
            self.persist(history, &snapshot, now, outcome);
        }

        let trend_text = self
            .history
            .as_ref()
            .map(|_| history::render(trend.as_ref()));
        if let Some(text) = &trend_text {
            info!("\n{text}");
        }

        let history_summary = self.history.as_ref().and_then(|h| {
            h.store
                .summary()
                .inspect_err(|e| warn!(error = %e, "history summary unavailable"))
                .ok()
        });

        let summary = report::summary_report(
            &health,
            &data.sites,
            &data.insights,
            trend_text.as_deref(),
        );
        let dashboard = report::dashboard_text(&health, history_summary.as_ref());
        match self
            .reports
            .write(now, &summary, &dashboard, &report::dashboard_json(&health))
        {
            Ok(paths) => outcome.reports = Some(paths),
            Err(e) => {
                error!(dir = %self.reports.dir().display(), error = %e, "failed to write reports");
                outcome.errors.push(format!("reports: {e}"));
            }
        }

        outcome.alerts_sent = self.notify(&health, trend.as_ref()).await;
        outcome.health = Some(health);
        outcome.trend = trend;
    }

    fn persist(
        &self,
        history: &History,
        snapshot: &Snapshot,
        now: DateTime<Utc>,
        outcome: &mut CycleOutcome,
    ) {
        match history.store.save(snapshot, now) {
            Ok(path) => outcome.snapshot_path = Some(path),
            Err(e) => {
                error!(error = %e, "snapshot not saved, this cycle has no history entry");
                outcome.history_write_failed = true;
                return;
            }
        }

        if !history.retention.auto_cleanup {
            debug!("history auto cleanup disabled");
            return;
        }
        match history::sweep(&history.store, now.date_naive(), history.retention.keep_days) {
            Ok(report) => outcome.prune = Some(report),
            Err(e) => warn!(error = %e, "history cleanup failed"),
        }
    }

    async fn notify(&self, health: &HealthStatus, trend: Option<&TrendResult>) -> usize {
        if !self.notifier.is_enabled() {
            return 0;
        }
        let mut sent = 0;
        if health.counts.critical > 0 && self.notifier.send_critical_alert(health).await {
            sent += 1;
        }
        if health.counts.major > 0 && self.notifier.send_major_alert(health).await {
            sent += 1;
        }
        if let Some(trend) = trend {
            if self.notifier.send_trend_alert(trend).await {
                sent += 1;
            }
        }
        sent
    }
}

fn analyze(
    analyzer: &TrendAnalyzer,
    history: &History,
    snapshot: &Snapshot,
) -> Option<TrendResult> {
    match analyzer.analyze(snapshot, &history.store) {
        Ok(Some(trend)) => Some(trend),
        Ok(None) => {
            info!("no historical data available for trend analysis");
            None
        }
        Err(e) => {
            warn!(error = %e, "trend analysis unavailable");
            None
        }
    }
}

/// Run cycles every `interval` until `shutdown` fires
///
/// Cancellation interrupts the sleep between cycles but never a running
/// cycle. Returns the number of cycles run.
pub async fn run_daemon(
    monitor: &Monitor,
    mode: Mode,
    interval: Duration,
    shutdown: CancellationToken,
) -> usize {
    info!(interval_secs = interval.as_secs(), ?mode, "daemon started");
    let mut cycles = 0;
    loop {
        if shutdown.is_cancelled() {
            break;
        }
        let outcome = monitor.run_cycle(mode).await;
        cycles += 1;
        if !outcome.is_success() {
            warn!(id = %outcome.id, errors = ?outcome.errors, history_write_failed = outcome.history_write_failed, "cycle completed with failures");
        }

        tokio::select! {
            () = shutdown.cancelled() => {
                info!("shutdown requested");
                break;
            }
            () = tokio::time::sleep(interval) => {}
        }
    }
    info!(cycles, "daemon stopped");
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{Polarity, SnapshotStore};
    use crate::mist::Severity;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn monitor(dir: &TempDir) -> Monitor {
        let mut config = AppConfig::default();
        config.mist.api_token = "tok".to_string();
        config.mist.org_id = Some("org-1".to_string());
        config.mist.base_url = "http://127.0.0.1:9".to_string();
        config.history.directory = dir.path().join("history").display().to_string();
        config.reports.directory = dir.path().join("reports").display().to_string();
        let client = MistClient::new(&config.mist).unwrap();
        Monitor::new(config, client)
    }

    fn collected(critical: usize) -> Collected {
        Collected {
            sites: vec![Site {
                id: "s1".to_string(),
                name: Some("HQ".to_string()),
            }],
            insights: (0..critical)
                .map(|_| Insight {
                    severity: Some(Severity::Critical.as_str().to_string()),
                    site_id: Some("s1".to_string()),
                    ..Insight::default()
                })
                .collect(),
            sle: None,
        }
    }

    #[test]
    fn test_mode_stages() {
        assert!(Mode::All.runs_monitor() && Mode::All.runs_insights() && Mode::All.runs_report());
        assert!(!Mode::Monitor.runs_report());
        assert!(!Mode::Report.runs_monitor());
        assert_eq!(Mode::default(), Mode::All);
    }

    #[tokio::test]
    async fn test_report_stage_saves_and_compares() {
        let dir = TempDir::new().unwrap();
        let monitor = monitor(&dir);

        let yesterday = Utc.with_ymd_and_hms(2026, 1, 21, 8, 0, 0).unwrap();
        let mut first = CycleOutcome::new(Uuid::new_v4(), Mode::Report);
        monitor.report(&collected(2), yesterday, &mut first).await;
        assert!(first.is_success());
        assert!(first.trend.is_none());
        assert!(first.snapshot_path.is_some());
        assert!(first.reports.is_some());

        let today = Utc.with_ymd_and_hms(2026, 1, 22, 8, 0, 0).unwrap();
        let mut second = CycleOutcome::new(Uuid::new_v4(), Mode::Report);
        monitor.report(&collected(3), today, &mut second).await;

        let trend = second.trend.unwrap();
        assert_eq!(trend.baseline_date, yesterday.date_naive());
        assert_eq!(trend.degraded.len(), 1);
        assert_eq!(trend.degraded[0].key, "critical_insights");
        assert_eq!(trend.degraded[0].percent_change, Some(50.0));
        assert_eq!(second.alerts_sent, 0);

        let summary = fs::read_to_string(second.reports.unwrap().summary).unwrap();
        assert!(summary.contains("DEGRADATION DETECTED:"));
    }

    #[tokio::test]
    async fn test_history_write_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let monitor = monitor(&dir);
        // A file where the history root directory should go
        fs::write(dir.path().join("history"), "").unwrap();

        let now = Utc.with_ymd_and_hms(2026, 1, 22, 8, 0, 0).unwrap();
        let mut outcome = CycleOutcome::new(Uuid::new_v4(), Mode::Report);
        monitor.report(&collected(0), now, &mut outcome).await;

        assert!(outcome.history_write_failed);
        assert!(!outcome.is_success());
        assert!(outcome.prune.is_none());
        assert!(outcome.reports.is_some());
    }

    #[tokio::test]
    async fn test_sweep_follows_save() {
        let dir = TempDir::new().unwrap();
        let monitor = monitor(&dir);
        let store = SnapshotStore::new(dir.path().join("history"));
        let old = Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap();
        store.save(&Snapshot::new(old), old).unwrap();

        let now = Utc.with_ymd_and_hms(2026, 1, 22, 8, 0, 0).unwrap();
        let mut outcome = CycleOutcome::new(Uuid::new_v4(), Mode::Report);
        monitor.report(&collected(0), now, &mut outcome).await;

        assert_eq!(outcome.prune.unwrap().removed, vec![old.date_naive()]);
        assert_eq!(store.list_partitions().unwrap(), vec![now.date_naive()]);
    }

    #[tokio::test]
    async fn test_history_disabled() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.mist.api_token = "tok".to_string();
        config.history.directory = String::new();
        config.reports.directory = dir.path().display().to_string();
        let client = MistClient::new(&config.mist).unwrap();
        let monitor = Monitor::new(config, client);
        assert!(monitor.history().is_none());

        let now = Utc.with_ymd_and_hms(2026, 1, 22, 8, 0, 0).unwrap();
        let mut outcome = CycleOutcome::new(Uuid::new_v4(), Mode::Report);
        monitor.report(&collected(1), now, &mut outcome).await;
        assert!(outcome.snapshot_path.is_none());
        assert!(!outcome.history_write_failed);
        assert!(outcome.is_success());

        let summary = fs::read_to_string(outcome.reports.unwrap().summary).unwrap();
        assert!(!summary.contains("TREND ANALYSIS REPORT"));
    }

    #[tokio::test]
    async fn test_daemon_stops_when_cancelled_up_front() {
        let dir = TempDir::new().unwrap();
        let monitor = monitor(&dir);
        let token = CancellationToken::new();
        token.cancel();
        let cycles = run_daemon(&monitor, Mode::Report, Duration::from_secs(3600), token).await;
        assert_eq!(cycles, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_daemon_finishes_running_cycle_before_stopping() {
        let dir = TempDir::new().unwrap();
        let monitor = monitor(&dir);
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        // The API is unreachable, so the cycle fails; the daemon carries on
        // until cancelled during the sleep
        let cycles = run_daemon(&monitor, Mode::Report, Duration::from_secs(3600), token).await;
        assert_eq!(cycles, 1);
    }

    #[test]
    fn test_analyzer_matches_config() {
        let dir = TempDir::new().unwrap();
        let monitor = monitor(&dir);
        assert!((monitor.analyzer().threshold_percent() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_polarity_overrides_apply_without_history() {
        let mut config = AppConfig::default();
        config.mist.api_token = "tok".to_string();
        config.history.directory = String::new();
        config.thresholds.trend_degradation_percent = 10.0;
        config
            .thresholds
            .polarity
            .insert("jitter".to_string(), Polarity::HigherIsWorse);
        let client = MistClient::new(&config.mist).unwrap();
        let monitor = Monitor::new(config, client);

        assert!(monitor.history().is_none());
        let analyzer = monitor.analyzer();
        assert!((analyzer.threshold_percent() - 10.0).abs() < f64::EPSILON);
        assert_eq!(analyzer.polarity().lookup("jitter.HQ"), Polarity::HigherIsWorse);
        assert_eq!(analyzer.polarity().lookup("capacity.HQ"), Polarity::HigherIsBetter);
    }
}
