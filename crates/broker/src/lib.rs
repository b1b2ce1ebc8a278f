//! Gridlink - Broker
//!
//! The resilient publishing side of the agent: a self-healing broker
//! connection per rig plus a non-blocking, best-effort publish gateway.
//!
//! # Design
//!
//! - One lifecycle task per rig id owns the connection state machine
//!   (disconnected → connecting → connected). Concurrent `connect` callers
//!   coalesce onto that task through a shared readiness signal - there is
//!   never more than one in-flight connection attempt per rig.
//! - Readiness is only signaled after the channel is open and every
//!   destination queue has been declared.
//! - On transport close the channel slot is cleared immediately and a fresh
//!   attempt is scheduled after a backoff delay; on connect failure the
//!   attempt is retried the same way. Retries continue indefinitely unless
//!   an attempt cap is configured.
//! - `publish` never blocks the event path and never propagates transport
//!   errors: no live channel means the event is counted and dropped,
//!   delivery is at-most-once.
//!
//! The broker wire protocol sits behind the [`BrokerTransport`] seam; the
//! production implementation is AMQP via `lapin`, tests substitute a mock.

mod amqp;
mod publisher;
mod retry;
mod transport;

#[cfg(test)]
mod publisher_test;

pub use amqp::AmqpTransport;
pub use publisher::{MetricsSnapshot, Publisher, PublisherConfig, PublisherMetrics};
pub use retry::{Backoff, RetryPolicy};
pub use transport::{
    BrokerChannel, BrokerEndpoint, BrokerLink, BrokerTransport, CloseSignal, TransportError,
};
