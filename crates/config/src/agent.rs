//! Agent identity and listener configuration

use serde::Deserialize;

/// Agent configuration
///
/// # Example
///
/// ```toml
/// [agent]
/// rig = "1"
/// listen_address = "0.0.0.0"
/// listen_port = 20777
/// dev_mode = false
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Rig id to run; when unset the CLI asks (flag or prompt)
    pub rig: Option<String>,

    /// Telemetry listen address
    pub listen_address: String,

    /// Telemetry listen port
    pub listen_port: u16,

    /// Development mode: per-event debug lines and a startup banner
    pub dev_mode: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            rig: None,
            listen_address: "0.0.0.0".into(),
            listen_port: 20777,
            dev_mode: false,
        }
    }
}
