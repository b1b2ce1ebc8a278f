//! Gridlink - Panel
//!
//! Client side of the remote panel API: a connectivity-probed status
//! heartbeat and an optional log relay. Nothing here is load-bearing for
//! telemetry forwarding - every network failure on this path is absorbed,
//! and a failed probe simply means the heartbeat never starts.
//!
//! The panel endpoints and shared-secret header are fixed by the panel
//! service:
//!
//! - `GET  {base}/v1/api/simrig/{id}/access` - connectivity probe
//! - `GET  {base}/v1/api/info` - panel version/branch
//! - `POST {base}/v1/api/simrig/{id}/status` - heartbeat snapshot
//! - `POST {base}/v1/api/simrig/{id}/logs` - relayed log line

mod client;
mod error;
mod relay;
mod reporter;
mod status;

pub use client::{PanelClient, PanelConfig};
pub use error::PanelError;
pub use relay::{LogRelay, PanelLogLayer};
pub use reporter::{ActivityTracker, AgentIdentity, StatusReporter};
pub use status::{LogEntry, PanelInfo, StatusSnapshot};
