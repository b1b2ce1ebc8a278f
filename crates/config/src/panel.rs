//! Panel reporting configuration

use serde::Deserialize;

/// Panel reporting section
///
/// Presence of this section (with url and secret) enables reporting.
///
/// # Example
///
/// ```toml
/// [panel]
/// url = "https://panel.example.com"
/// secret = "s3cret"
/// interval_ms = 3000
/// send_logs = false
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PanelSection {
    /// Panel base URL
    pub url: String,

    /// Shared secret for the `x-secret-key` header
    pub secret: String,

    /// Heartbeat interval, in milliseconds
    pub interval_ms: u64,

    /// Relay agent log lines to the panel
    pub send_logs: bool,
}

impl Default for PanelSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            secret: String::new(),
            interval_ms: 3000,
            send_logs: false,
        }
    }
}
