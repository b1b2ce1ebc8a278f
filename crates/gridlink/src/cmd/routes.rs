//! Routes command - print the resolved route table for a rig
//!
//! Resolution is the same code path the agent uses at session start, so this
//! is the quickest way to check what a profile actually routes.

use anyhow::Result;

use gridlink_protocol::TelemetryCategory;
use gridlink_routing::{RigProfile, RouteTable};

use crate::cmd::{load_config, SessionArgs};

/// Run the routes command
pub fn run(args: SessionArgs) -> Result<()> {
    let (config, _) = load_config(args.config.as_ref())?;

    let rig_id = args
        .rig
        .or_else(|| config.agent.rig.clone())
        .ok_or_else(|| anyhow::anyhow!("no rig id given (pass --rig)"))?;

    let Some(entries) = config.rig(&rig_id) else {
        anyhow::bail!(
            "unknown rig id '{}' (known: {})",
            rig_id,
            config.known_rigs().join(", ")
        );
    };

    let profile = RigProfile::new(rig_id.clone(), entries.clone());
    let table = RouteTable::resolve(&profile, &TelemetryCategory::ALL);

    if table.is_empty() {
        println!("rig {rig_id}: no categories routed");
        return Ok(());
    }

    println!("rig {rig_id}:");
    for (category, destination) in table.iter() {
        println!("  {:<22} -> {}", category.name(), destination);
    }

    let unrouted: Vec<&str> = TelemetryCategory::ALL
        .iter()
        .filter(|c| table.destination(**c).is_none())
        .map(|c| c.name())
        .collect();
    if !unrouted.is_empty() {
        println!("  (unrouted: {})", unrouted.join(", "));
    }

    Ok(())
}
