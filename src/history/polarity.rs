//! Which direction of change is healthy for each tracked metric

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Success rates, capacity headroom, coverage
    HigherIsBetter,
    /// Insight counts, connect latency
    HigherIsWorse,
}

const HIGHER_IS_BETTER: &[&str] = &[
    "successful_connect",
    "capacity",
    "roaming",
    "throughput",
    "coverage",
    "ap_health",
];

const HIGHER_IS_WORSE: &[&str] = &[
    "time_to_connect",
    "critical_insights",
    "major_insights",
    "warning_insights",
    "info_insights",
];

/// Per-metric polarity lookup
///
/// Lookups try the full metric key first, then its base name (everything
/// before the first `.`), then fall back to the default. Names are matched
/// case-insensitively with `-` treated as `_`, so `successful-connect.HQ`
/// resolves through `successful_connect`.
#[derive(Debug, Clone)]
pub struct PolarityTable {
    entries: BTreeMap<String, Polarity>,
    default: Polarity,
}

impl Default for PolarityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PolarityTable {
    /// Table with no entries at all; every lookup yields `default`
    #[must_use]
    pub const fn empty(default: Polarity) -> Self {
        Self {
            entries: BTreeMap::new(),
            default,
        }
    }

    /// The built-in table for Mist SLE metrics and insight counts
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::empty(Polarity::HigherIsBetter);
        for name in HIGHER_IS_BETTER {
            table.set(name, Polarity::HigherIsBetter);
        }
        for name in HIGHER_IS_WORSE {
            table.set(name, Polarity::HigherIsWorse);
        }
        table
    }

    /// Built-in table with configured overrides and default applied
    #[must_use]
    pub fn with_overrides(overrides: &BTreeMap<String, Polarity>, default: Polarity) -> Self {
        let mut table = Self::builtin();
        table.default = default;
        for (name, polarity) in overrides {
            table.set(name, *polarity);
        }
        table
    }

    pub fn set(&mut self, name: &str, polarity: Polarity) {
        self.entries.insert(normalize(name), polarity);
    }

    #[must_use]
    pub fn lookup(&self, metric_key: &str) -> Polarity {
        let key = normalize(metric_key);
        if let Some(polarity) = self.entries.get(&key) {
            return *polarity;
        }
        let base = key.split('.').next().unwrap_or(&key);
        self.entries.get(base).copied().unwrap_or(self.default)
    }

    #[must_use]
    pub const fn default_polarity(&self) -> Polarity {
        self.default
    }
}

/// Lower-case and map `-` to `_`, the form Mist uses in config keys
#[must_use]
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace('-', "_")
}
