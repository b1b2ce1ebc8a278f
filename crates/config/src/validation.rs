//! Configuration validation
//!
//! Checks run after parse, before the config is handed to the agent, so
//! every failure is reported at startup rather than mid-session.

use crate::error::{ConfigError, Result};
use crate::Config;

/// Validate a parsed configuration
pub fn validate(config: &Config) -> Result<()> {
    validate_broker(config)?;
    validate_panel(config)?;
    validate_rigs(config)?;
    Ok(())
}

fn validate_broker(config: &Config) -> Result<()> {
    let retry = &config.broker.retry;

    if let Some(uri) = &config.broker.uri {
        if uri.is_empty() {
            return Err(ConfigError::invalid_value("broker", "uri", "must not be empty"));
        }
    } else if config.broker.host.is_empty() {
        return Err(ConfigError::missing_field("broker", "host"));
    }

    if retry.multiplier < 1.0 {
        return Err(ConfigError::invalid_value(
            "broker.retry",
            "multiplier",
            "must be >= 1.0",
        ));
    }

    if retry.initial_delay_ms == 0 {
        return Err(ConfigError::invalid_value(
            "broker.retry",
            "initial_delay_ms",
            "must be > 0",
        ));
    }

    if retry.max_delay_ms < retry.initial_delay_ms {
        return Err(ConfigError::invalid_value(
            "broker.retry",
            "max_delay_ms",
            format!("must be >= initial_delay_ms ({})", retry.initial_delay_ms),
        ));
    }

    Ok(())
}

fn validate_panel(config: &Config) -> Result<()> {
    let Some(panel) = &config.panel else {
        return Ok(());
    };

    if panel.url.is_empty() {
        return Err(ConfigError::missing_field("panel", "url"));
    }
    if panel.secret.is_empty() {
        return Err(ConfigError::missing_field("panel", "secret"));
    }
    if panel.interval_ms == 0 {
        return Err(ConfigError::invalid_value(
            "panel",
            "interval_ms",
            "must be > 0",
        ));
    }

    Ok(())
}

fn validate_rigs(config: &Config) -> Result<()> {
    for (rig_id, entries) in &config.rigs {
        for (key, destination) in entries {
            if destination.is_empty() {
                return Err(ConfigError::invalid_value(
                    "rigs",
                    "queue",
                    format!("rig '{rig_id}' entry '{key}' has an empty destination"),
                ));
            }
        }
    }
    Ok(())
}
