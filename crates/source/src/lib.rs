//! Gridlink - Source
//!
//! UDP telemetry source. The sim feed sends one packet per datagram; the
//! source classifies each datagram by its packet header and hands the
//! payload to whoever subscribed to that category.
//!
//! # Design
//!
//! - Subscription is composition, not inheritance: the coordinator builds a
//!   [`Subscriptions`] registry (category → bounded sender) and gives it to
//!   the source. Unsubscribed categories are dropped at the socket loop.
//! - Dispatch never blocks the socket: a full subscriber queue drops the
//!   event and bumps a counter. Telemetry is a live stream - late delivery
//!   is worse than no delivery.
//! - A single reader task keeps per-category receipt order intact.

mod subscriptions;
mod udp;

pub use subscriptions::{DispatchOutcome, Subscriptions};
pub use udp::{
    SourceConfig, SourceError, SourceMetrics, SourceMetricsSnapshot, TelemetrySource,
};

// Re-exports for subscribers
pub use gridlink_protocol::{TelemetryCategory, TelemetryEvent};
