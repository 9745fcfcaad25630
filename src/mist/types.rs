use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const UNKNOWN: &str = "Unknown";

/// A Mist site as returned by `/orgs/{org_id}/sites`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Site {
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN)
    }
}

/// Label for every site id: its display name, or `name (id)` for names
/// shared by more than one site
#[must_use]
pub fn site_labels(sites: &[Site]) -> HashMap<&str, String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for site in sites {
        *seen.entry(site.display_name()).or_default() += 1;
    }
    sites
        .iter()
        .map(|site| {
            let name = site.display_name();
            let label = if seen[name] > 1 {
                format!("{name} ({})", site.id)
            } else {
                name.to_string()
            };
            (site.id.as_str(), label)
        })
        .collect()
}

/// Insight severity tiers, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Warning,
    Info,
}

impl Severity {
    pub const ALL: [Self; 5] = [
        Self::Critical,
        Self::Major,
        Self::Minor,
        Self::Warning,
        Self::Info,
    ];

    /// Case-insensitive; anything unrecognised counts as info
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "critical" => Self::Critical,
            "major" => Self::Major,
            "minor" => Self::Minor,
            "warning" => Self::Warning,
            _ => Self::Info,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// Critical and major insights are treated as high severity
    #[must_use]
    pub const fn is_high(&self) -> bool {
        matches!(self, Self::Critical | Self::Major)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One insight entry. Mist's insight payloads vary by type, so every field
/// is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

impl Insight {
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity.as_deref().map_or(Severity::Info, Severity::parse)
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("unknown")
    }

    #[must_use]
    pub fn site(&self) -> &str {
        self.site_id.as_deref().unwrap_or("unknown")
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("Unknown Insight")
    }
}

/// Subset of the `/self` response used to discover the organization
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SelfInfo {
    #[serde(default)]
    pub privileges: Vec<Privilege>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Privilege {
    #[serde(default)]
    pub org_id: Option<String>,
}
