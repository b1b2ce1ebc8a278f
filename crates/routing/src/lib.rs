//! Gridlink - Routing
//!
//! Route resolution for a rig session: given a rig's destination profile and
//! the known telemetry categories, compute the category→queue mapping once
//! at session start.
//!
//! # Design
//!
//! Routing decisions are made once, at session start, not per event. The
//! `RouteTable` stores the resolved mapping; the hot path is a lookup into
//! pre-resolved data with no string transforms and no allocation.
//!
//! Profiles carry destination queues under two historical key conventions
//! (see [`TelemetryCategory::config_keys`]); resolution tries both forms in
//! priority order. A category with neither key configured is simply absent
//! from the table - the agent never forwards it, and that is not an error.
//!
//! # Example
//!
//! ```
//! use gridlink_protocol::TelemetryCategory;
//! use gridlink_routing::{RigProfile, RouteTable};
//!
//! let profile = RigProfile::new("1", [("lapDataQueue".into(), "laps".into())]);
//! let table = RouteTable::resolve(&profile, &TelemetryCategory::ALL);
//!
//! assert_eq!(table.destination(TelemetryCategory::LapData), Some("laps"));
//! assert_eq!(table.destination(TelemetryCategory::CarStatus), None);
//! ```

mod profile;
mod table;


pub use profile::RigProfile;
pub use table::RouteTable;

// Re-export for convenience
pub use gridlink_protocol::TelemetryCategory;
