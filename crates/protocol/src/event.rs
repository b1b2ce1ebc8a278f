//! Telemetry event type

use std::time::Instant;

use bytes::Bytes;

use crate::TelemetryCategory;

/// One categorized telemetry event as received from the sim feed
///
/// The payload is the datagram body as received; decoding it into structured
/// fields is the job of downstream consumers, not the agent. `Bytes` keeps
/// the dispatch path copy-free when an event fans out.
#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    /// Category derived from the packet header
    pub category: TelemetryCategory,

    /// Raw packet payload
    pub payload: Bytes,

    /// When the datagram was received
    pub received_at: Instant,
}

impl TelemetryEvent {
    /// Create an event stamped with the current time
    pub fn new(category: TelemetryCategory, payload: Bytes) -> Self {
        Self {
            category,
            payload,
            received_at: Instant::now(),
        }
    }
}
