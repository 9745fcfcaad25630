// Mist cloud REST client
use super::types::{Insight, SelfInfo, Site};
use crate::config::MistConfig;
use crate::error::{Error, Result};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct MistClient {
    http: Client,
    base_url: String,
    org_id: Option<String>,
}

impl MistClient {
    /// Build a client that authenticates every request with the API token
    ///
    /// # Errors
    ///
    /// Will return `Err` if the token is not a valid header value or the HTTP
    /// client cannot be built
    pub fn new(config: &MistConfig) -> Result<Self> {
        let mut token = HeaderValue::from_str(&format!("Token {}", config.api_token.trim()))?;
        token.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, token);

        let http = Client::builder()
            .use_rustls_tls()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            org_id: config.org_id.clone().filter(|id| !id.trim().is_empty()),
        })
    }

    #[must_use]
    pub fn org_id(&self) -> Option<&str> {
        self.org_id.as_deref()
    }

    fn org(&self) -> Result<&str> {
        self.org_id
            .as_deref()
            .ok_or_else(|| Error::Custom("organization ID not initialized".to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.json().await?)
    }

    /// Resolve the organization from `/self` unless one is already configured
    ///
    /// # Errors
    ///
    /// Will return `Err` if `/self` fails or lists no organization
    pub async fn initialize_org(&mut self) -> Result<String> {
        if let Some(org_id) = &self.org_id {
            debug!(%org_id, "using configured organization");
            return Ok(org_id.clone());
        }

        let info: SelfInfo = self.get_json("self").await.inspect_err(|e| {
            error!(error = %e, "failed to initialize organization");
        })?;
        let Some(org_id) = info.privileges.into_iter().find_map(|p| p.org_id) else {
            warn!("no organization privileges found");
            return Err(Error::Custom("no organization privileges found".to_string()));
        };

        info!(%org_id, "initialized organization");
        self.org_id = Some(org_id.clone());
        Ok(org_id)
    }

    /// # Errors
    ///
    /// Will return `Err` if the organization is unknown or the request fails
    pub async fn get_sites(&self) -> Result<Vec<Site>> {
        let sites: Vec<Site> = self.get_json(&format!("orgs/{}/sites", self.org()?)).await?;
        info!(count = sites.len(), "retrieved sites");
        Ok(sites)
    }

    /// Devices of one site, or of the whole organization when `site_id` is
    /// `None`
    ///
    /// # Errors
    ///
    /// Will return `Err` if the organization is unknown or the request fails
    pub async fn get_devices(&self, site_id: Option<&str>) -> Result<Vec<Value>> {
        let path = match site_id {
            Some(site) => format!("sites/{site}/devices"),
            None => format!("orgs/{}/devices", self.org()?),
        };
        let devices: Vec<Value> = self.get_json(&path).await?;
        info!(count = devices.len(), "retrieved devices");
        Ok(devices)
    }

    /// SLE overview of a site, or one metric's detail when `metric` is given
    ///
    /// # Errors
    ///
    /// Will return `Err` if the request fails
    pub async fn get_sle_metrics(&self, site_id: &str, metric: Option<&str>) -> Result<Value> {
        let path = match metric {
            Some(metric) => format!("sites/{site_id}/sle/{metric}"),
            None => format!("sites/{site_id}/sle"),
        };
        self.get_json(&path).await
    }

    /// # Errors
    ///
    /// Will return `Err` if the organization is unknown or the request fails
    pub async fn get_insights(&self, site_id: Option<&str>) -> Result<Vec<Insight>> {
        let path = match site_id {
            Some(site) => format!("sites/{site}/insights"),
            None => format!("orgs/{}/insights", self.org()?),
        };
        let insights: Vec<Insight> = self.get_json(&path).await?;
        info!(count = insights.len(), "retrieved insights");
        Ok(insights)
    }

    /// # Errors
    ///
    /// Will return `Err` if the organization is unknown or the request fails
    pub async fn get_alarms(&self, site_id: Option<&str>) -> Result<Vec<Value>> {
        let path = match site_id {
            Some(site) => format!("sites/{site}/alarms"),
            None => format!("orgs/{}/alarms", self.org()?),
        };
        let alarms: Vec<Value> = self.get_json(&path).await?;
        info!(count = alarms.len(), "retrieved alarms");
        Ok(alarms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MistConfig {
        MistConfig {
            api_token: "secret".to_string(),
            base_url: "https://api.eu.mist.com/api/v1/".to_string(),
            ..MistConfig::default()
        }
    }

    #[test]
    fn test_user_agent_names_crate() {
        assert!(USER_AGENT.starts_with("mistwatch/"));
    }

    #[test]
    fn test_url_join() {
        let client = MistClient::new(&config()).unwrap();
        assert_eq!(
            client.url("/sites/s1/sle"),
            "https://api.eu.mist.com/api/v1/sites/s1/sle"
        );
    }

    #[test]
    fn test_org_required_before_init() {
        let client = MistClient::new(&config()).unwrap();
        assert!(client.org_id().is_none());
        assert!(matches!(client.org(), Err(Error::Custom(_))));
    }

    #[test]
    fn test_configured_org_is_used() {
        let mut cfg = config();
        cfg.org_id = Some("org-42".to_string());
        let client = MistClient::new(&cfg).unwrap();
        assert_eq!(client.org_id(), Some("org-42"));

        cfg.org_id = Some("  ".to_string());
        let client = MistClient::new(&cfg).unwrap();
        assert!(client.org_id().is_none());
    }

    #[test]
    fn test_invalid_token_rejected() {
        let mut cfg = config();
        cfg.api_token = "bad\ntoken".to_string();
        assert!(matches!(MistClient::new(&cfg), Err(Error::HttpHeader(_))));
    }

    #[tokio::test]
    async fn test_configured_org_skips_self_lookup() {
        let mut cfg = config();
        cfg.org_id = Some("org-42".to_string());
        // Unroutable address: any request would fail
        cfg.base_url = "http://127.0.0.1:9".to_string();
        let mut client = MistClient::new(&cfg).unwrap();
        assert_eq!(client.initialize_org().await.unwrap(), "org-42");
    }
}
