//! CLI subcommands

pub mod routes;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use gridlink_config::Config;

/// Arguments shared by the subcommands (all come from global CLI flags)
#[derive(Debug, Default)]
pub struct SessionArgs {
    /// Path to configuration file
    pub config: Option<PathBuf>,

    /// Rig id override
    pub rig: Option<String>,

    /// Log level override
    pub log_level: Option<String>,
}

/// Load configuration: an explicit path must exist, otherwise the default
/// locations are tried and built-in defaults are the fallback.
///
/// Returns the config and the path it came from (`None` = defaults). The
/// caller logs the choice - this runs before logging is initialized.
pub fn load_config(path: Option<&PathBuf>) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        let config = Config::from_file(path).context("failed to load configuration")?;
        return Ok((config, Some(path.clone())));
    }

    let default_paths = [
        PathBuf::from("gridlink.toml"),
        PathBuf::from("configs/gridlink.toml"),
    ];

    for path in &default_paths {
        if path.exists() {
            let config = Config::from_file(path).context("failed to load configuration")?;
            return Ok((config, Some(path.clone())));
        }
    }

    Ok((Config::default(), None))
}
