//! Panel wire types.
//!
//! Field names follow the panel's JSON contract exactly (camelCase), so the
//! serde renames here are load-bearing.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Heartbeat snapshot, built fresh for every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,

    /// Agent running in development mode
    pub dev_mode: bool,

    /// Log relay enabled
    pub send_logs: bool,

    /// Build branch
    pub branch: String,

    /// Agent version
    pub version: String,

    /// Telemetry observed recently
    pub is_in_use: bool,
}

/// One relayed log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log level, lowercase
    pub level: String,

    /// Formatted message
    pub message: String,

    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

/// Panel identity from `GET /v1/api/info`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PanelInfo {
    pub version: String,
    pub branch: String,
}

/// Current wall-clock time in panel timestamp format.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_wire_field_names() {
        let snapshot = StatusSnapshot {
            timestamp: 1700000000000,
            dev_mode: true,
            send_logs: false,
            branch: "main".into(),
            version: "0.4.2".into(),
            is_in_use: true,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["timestamp"], 1700000000000u64);
        assert_eq!(json["devMode"], true);
        assert_eq!(json["sendLogs"], false);
        assert_eq!(json["branch"], "main");
        assert_eq!(json["version"], "0.4.2");
        assert_eq!(json["isInUse"], true);
    }

    #[test]
    fn test_log_entry_wire_field_names() {
        let entry = LogEntry {
            level: "info".into(),
            message: "queue ensured".into(),
            timestamp: 1,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "info");
        assert_eq!(json["message"], "queue ensured");
        assert_eq!(json["timestamp"], 1);
    }

    #[test]
    fn test_panel_info_tolerates_missing_fields() {
        let info: PanelInfo = serde_json::from_str("{}").unwrap();
        assert!(info.version.is_empty());
        assert!(info.branch.is_empty());
    }
}
