/*!
Configuration for `mistwatch`

Settings are read from a YAML file and may be overridden through
`MISTWATCH_`-prefixed environment variables, using `__` to reach nested
keys (e.g. `MISTWATCH_MIST__API_TOKEN`).
*/
use crate::error::{Error, Result};
use crate::history::Polarity;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default Mist cloud API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.mist.com/api/v1";

/// Default HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default history root, relative to the working directory
pub const DEFAULT_HISTORY_DIR: &str = "reports/history";

/// Default number of calendar days of history to keep
pub const DEFAULT_KEEP_DAYS: u32 = 7;

/// Default cutoff (percent) separating STABLE from WORSENING/IMPROVING
pub const DEFAULT_TREND_DEGRADATION_PERCENT: f64 = 5.0;

/// Default daemon interval in seconds
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;

pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_FROM_ADDRESS: &str = "noreply@mist-infra-manager.local";

const ENV_PREFIX: &str = "MISTWATCH";

const _: () = {
    assert!(DEFAULT_TIMEOUT_SECS > 0, "DEFAULT_TIMEOUT_SECS must be greater than 0");
    assert!(DEFAULT_INTERVAL_SECS > 0, "DEFAULT_INTERVAL_SECS must be greater than 0");
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mist: MistConfig,
    pub history: HistoryConfig,
    pub thresholds: ThresholdsConfig,
    pub reports: ReportsConfig,
    pub notifications: NotificationsConfig,
    pub daemon: DaemonConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MistConfig {
    pub api_token: String,
    pub base_url: String,
    /// Skips organization discovery through `/self` when set
    pub org_id: Option<String>,
    pub timeout_secs: u64,
}

impl Default for MistConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            org_id: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Root of the snapshot store; empty disables history entirely
    pub directory: String,
    pub keep_days: u32,
    pub auto_cleanup: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            directory: DEFAULT_HISTORY_DIR.to_string(),
            keep_days: DEFAULT_KEEP_DAYS,
            auto_cleanup: true,
        }
    }
}

impl HistoryConfig {
    /// Root directory of the snapshot store, or `None` when history is disabled
    #[must_use]
    pub fn root(&self) -> Option<PathBuf> {
        let trimmed = self.directory.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub trend_degradation_percent: f64,
    /// Polarity for metrics missing from both the built-in and configured tables
    pub default_polarity: Polarity,
    /// Per-metric polarity overrides, keyed by base name or full metric key
    pub polarity: BTreeMap<String, Polarity>,
    /// SLE alarm thresholds keyed by snake_case metric name
    pub sle: BTreeMap<String, f64>,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            trend_degradation_percent: DEFAULT_TREND_DEGRADATION_PERCENT,
            default_polarity: Polarity::HigherIsBetter,
            polarity: BTreeMap::new(),
            sle: default_sle_thresholds(),
        }
    }
}

/// Built-in SLE thresholds (percent, except `time_to_connect` in seconds)
#[must_use]
pub fn default_sle_thresholds() -> BTreeMap<String, f64> {
    [
        ("successful_connect", 95.0),
        ("time_to_connect", 5.0),
        ("throughput", 80.0),
        ("capacity", 85.0),
        ("roaming", 98.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    pub directory: String,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            directory: "reports".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub use_tls: bool,
    pub from_address: String,
    pub recipients: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: DEFAULT_SMTP_SERVER.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_user: None,
            smtp_password: None,
            use_tls: true,
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            recipients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub interval_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

/// `MISTWATCH_<SECTION>__<KEY>` overrides
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

impl AppConfig {
    /// Load configuration from `path`, layering environment overrides on top
    ///
    /// # Errors
    ///
    /// Will return `Err` if the file is missing or malformed, or if the
    /// resulting settings fail validation
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: &Path, env: Environment) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Custom(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }

        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(env)
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// # Errors
    ///
    /// Will return `Err` describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if self.mist.api_token.trim().is_empty() {
            return Err(Error::Custom(
                "API token not found in configuration (mist.api_token)".to_string(),
            ));
        }
        let pct = self.thresholds.trend_degradation_percent;
        if !pct.is_finite() || pct < 0.0 {
            return Err(Error::Custom(format!(
                "thresholds.trend_degradation_percent must be a non-negative number, got {pct}"
            )));
        }
        if let Some((name, value)) = self.thresholds.sle.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::Custom(format!(
                "thresholds.sle.{name} must be a finite number, got {value}"
            )));
        }
        if self.daemon.interval_secs == 0 {
            return Err(Error::Custom(
                "daemon.interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.mist.timeout_secs == 0 {
            return Err(Error::Custom(
                "mist.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Map;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_yaml(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_applied_to_sparse_file() {
        let file = write_yaml("mist:\n  api_token: abc123\n");
        let config = AppConfig::load(file.path()).unwrap();

        assert_eq!(config.mist.api_token, "abc123");
        assert_eq!(config.mist.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.history.keep_days, DEFAULT_KEEP_DAYS);
        assert!(config.history.auto_cleanup);
        assert!((config.thresholds.trend_degradation_percent - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.thresholds.default_polarity, Polarity::HigherIsBetter);
        assert_eq!(config.thresholds.sle.get("roaming"), Some(&98.0));
        assert!(!config.notifications.enabled);
        assert_eq!(config.notifications.email.smtp_port, 587);
    }

    #[test]
    fn test_full_file() {
        let file = write_yaml(
            r"
mist:
  api_token: tok
  org_id: org-1
history:
  directory: /var/lib/mistwatch
  keep_days: 14
  auto_cleanup: false
thresholds:
  trend_degradation_percent: 10
  default_polarity: higher_is_worse
  polarity:
    jitter: higher_is_worse
    time_to_roam: higher_is_worse
notifications:
  enabled: true
  email:
    enabled: true
    recipients: [noc@example.com, oncall@example.com]
daemon:
  interval_secs: 900
",
        );
        let config = AppConfig::load(file.path()).unwrap();

        assert_eq!(config.mist.org_id.as_deref(), Some("org-1"));
        assert_eq!(
            config.history.root(),
            Some(PathBuf::from("/var/lib/mistwatch"))
        );
        assert_eq!(config.history.keep_days, 14);
        assert!(!config.history.auto_cleanup);
        assert_eq!(config.thresholds.default_polarity, Polarity::HigherIsWorse);
        assert_eq!(
            config.thresholds.polarity.get("time_to_roam"),
            Some(&Polarity::HigherIsWorse)
        );
        assert_eq!(config.notifications.email.recipients.len(), 2);
        assert_eq!(config.daemon.interval_secs, 900);
    }

    #[test]
    fn test_example_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/config.example.yaml");
        let config = AppConfig::load(&path).unwrap();
        assert!(config.thresholds.polarity.is_empty());
        assert_eq!(config.thresholds.sle, default_sle_thresholds());
        assert!(config.notifications.email.recipients.is_empty());
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        let file = write_yaml("mist:\n  api_token: from-file\n");
        let vars: Map<String, String> = [
            ("MISTWATCH_MIST__API_TOKEN", "from-env"),
            ("MISTWATCH_HISTORY__KEEP_DAYS", "3"),
            ("OTHER_HISTORY__KEEP_DAYS", "9"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = AppConfig::load_with(file.path(), environment().source(Some(vars))).unwrap();

        assert_eq!(config.mist.api_token, "from-env");
        assert_eq!(config.history.keep_days, 3);
    }

    #[test]
    fn test_missing_token_rejected() {
        let file = write_yaml("history:\n  keep_days: 3\n");
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_rejected() {
        let result = AppConfig::load(Path::new("/nonexistent/mistwatch.yaml"));
        assert!(matches!(result, Err(Error::Custom(_))));
    }

    #[test]
    fn test_empty_history_directory_disables_history() {
        let history = HistoryConfig {
            directory: "  ".to_string(),
            ..HistoryConfig::default()
        };
        assert!(history.root().is_none());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut config = AppConfig::default();
        config.mist.api_token = "tok".to_string();
        config.thresholds.trend_degradation_percent = -1.0;
        assert!(config.validate().is_err());

        config.thresholds.trend_degradation_percent = 5.0;
        assert!(config.validate().is_ok());
    }
}
