//! Panel HTTP client.

use std::time::Duration;

use crate::error::PanelError;
use crate::status::{LogEntry, PanelInfo, StatusSnapshot};

/// Shared-secret header the panel authenticates on
const SECRET_HEADER: &str = "x-secret-key";

/// HTTP request timeout
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Panel connection settings, constructed once at session start and passed
/// into everything that talks to the panel.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Base URL, no trailing slash
    pub base_url: String,

    /// Shared secret for the `x-secret-key` header
    pub secret: String,

    /// Heartbeat interval
    pub interval: Duration,

    /// Relay agent log lines to the panel
    pub send_logs: bool,
}

impl PanelConfig {
    /// Config with the default 3 s heartbeat interval
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            secret: secret.into(),
            interval: Duration::from_secs(3),
            send_logs: false,
        }
    }
}

/// Panel API client.
pub struct PanelClient {
    http: reqwest::Client,
    base_url: String,
    secret: String,
}

impl PanelClient {
    /// Create a client for the configured panel
    pub fn new(config: &PanelConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret: config.secret.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Connectivity probe: does the panel accept this rig's secret?
    pub async fn verify_access(&self, rig_id: &str) -> Result<(), PanelError> {
        let response = self
            .http
            .get(self.url(&format!("/v1/api/simrig/{rig_id}/access")))
            .header(SECRET_HEADER, &self.secret)
            .send()
            .await
            .map_err(|e| PanelError::Network(e.to_string()))?;

        ok_or_status(response.status())
    }

    /// Panel version/branch lookup
    pub async fn info(&self) -> Result<PanelInfo, PanelError> {
        let response = self
            .http
            .get(self.url("/v1/api/info"))
            .send()
            .await
            .map_err(|e| PanelError::Network(e.to_string()))?;

        ok_or_status(response.status())?;

        response
            .json()
            .await
            .map_err(|e| PanelError::Network(e.to_string()))
    }

    /// Push one heartbeat snapshot
    pub async fn post_status(
        &self,
        rig_id: &str,
        snapshot: &StatusSnapshot,
    ) -> Result<(), PanelError> {
        let response = self
            .http
            .post(self.url(&format!("/v1/api/simrig/{rig_id}/status")))
            .header(SECRET_HEADER, &self.secret)
            .json(snapshot)
            .send()
            .await
            .map_err(|e| PanelError::Network(e.to_string()))?;

        ok_or_status(response.status())
    }

    /// Push one relayed log line
    pub async fn post_log(&self, rig_id: &str, entry: &LogEntry) -> Result<(), PanelError> {
        let response = self
            .http
            .post(self.url(&format!("/v1/api/simrig/{rig_id}/logs")))
            .header(SECRET_HEADER, &self.secret)
            .json(entry)
            .send()
            .await
            .map_err(|e| PanelError::Network(e.to_string()))?;

        ok_or_status(response.status())
    }
}

fn ok_or_status(status: reqwest::StatusCode) -> Result<(), PanelError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(PanelError::Server(status.as_u16()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = PanelConfig::new("https://panel.example.com/", "s3cret");
        let client = PanelClient::new(&config);
        assert_eq!(
            client.url("/v1/api/info"),
            "https://panel.example.com/v1/api/info"
        );
    }

    #[test]
    fn test_default_interval() {
        let config = PanelConfig::new("https://panel.example.com", "s");
        assert_eq!(config.interval, Duration::from_secs(3));
        assert!(!config.send_logs);
    }

    #[tokio::test]
    async fn test_unreachable_panel_is_a_network_error() {
        // Nothing listens on this port; the probe must fail cleanly
        let config = PanelConfig::new("http://127.0.0.1:9", "s");
        let client = PanelClient::new(&config);

        let result = client.verify_access("1").await;
        assert!(matches!(result, Err(PanelError::Network(_))));
    }
}
