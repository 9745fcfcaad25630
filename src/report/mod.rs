//! Health status and the report files written each cycle

pub mod health;
pub mod render;

pub use health::{HealthLevel, HealthStatus, SiteStatus};
pub use render::{DashboardJson, action_text, dashboard_json, dashboard_text, summary_report};

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Paths of the files produced by one report run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub summary: PathBuf,
    pub dashboard_text: PathBuf,
    pub dashboard_json: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, prefix: &str, at: DateTime<Utc>, ext: &str) -> PathBuf {
        self.dir
            .join(format!("{prefix}_{}.{ext}", at.format("%Y%m%d_%H%M%S")))
    }

    /// Write the summary report and both dashboard renditions
    ///
    /// # Errors
    ///
    /// Will return `Err` if the report directory or any file cannot be written
    pub fn write(
        &self,
        at: DateTime<Utc>,
        summary: &str,
        dashboard: &str,
        dashboard_json: &DashboardJson<'_>,
    ) -> Result<ReportPaths> {
        fs::create_dir_all(&self.dir)?;

        let paths = ReportPaths {
            summary: self.path("SUMMARY_REPORT", at, "txt"),
            dashboard_text: self.path("HEALTH_DASHBOARD", at, "txt"),
            dashboard_json: self.path("HEALTH_DASHBOARD", at, "json"),
        };
        fs::write(&paths.summary, summary)?;
        info!(path = %paths.summary.display(), "summary report generated");
        fs::write(&paths.dashboard_text, dashboard)?;
        info!(path = %paths.dashboard_text.display(), "health dashboard generated");
        fs::write(
            &paths.dashboard_json,
            serde_json::to_vec_pretty(dashboard_json)?,
        )?;
        info!(path = %paths.dashboard_json.display(), "health dashboard JSON generated");

        Ok(paths)
    }
}
