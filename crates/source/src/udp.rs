//! UDP telemetry source
//!
//! Binds the sim feed port, classifies datagrams by packet header, and
//! dispatches payloads into the subscription registry.
//!
//! # Packet header
//!
//! Every feed packet starts with the same header layout:
//!
//! ```text
//! [2 bytes: packet format (LE)][1: game major][1: game minor]
//! [1: packet version][1: packet id][...body...]
//! ```
//!
//! Only the packet id is read here; body decoding belongs to downstream
//! consumers.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use gridlink_protocol::{TelemetryCategory, TelemetryEvent};

use crate::subscriptions::{DispatchOutcome, Subscriptions};

/// Offset of the packet id within the header
const PACKET_ID_OFFSET: usize = 5;

/// Minimum bytes a datagram needs to carry a full header
const HEADER_MIN_LEN: usize = 6;

/// Default sim feed port
const DEFAULT_PORT: u16 = 20777;

/// Default receive buffer request (UDP bursts between reads)
const DEFAULT_RECV_BUFFER_SIZE: usize = 256 * 1024;

/// Largest datagram accepted (feed packets stay well under 2 KiB)
const DEFAULT_MAX_PACKET_SIZE: usize = 2048;

/// UDP source configuration
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Bind address
    pub address: String,

    /// Listen port
    pub port: u16,

    /// Requested SO_RCVBUF size
    pub recv_buffer_size: usize,

    /// Largest datagram accepted
    pub max_packet_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }
}

impl SourceConfig {
    /// Config with a custom port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// The socket address to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Source metrics
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Datagrams received
    pub packets_received: AtomicU64,

    /// Bytes received
    pub bytes_received: AtomicU64,

    /// Events handed to a subscriber
    pub events_dispatched: AtomicU64,

    /// Events dropped because a subscriber queue was full
    pub events_dropped: AtomicU64,

    /// Datagrams with no subscriber for their category
    pub unsubscribed: AtomicU64,

    /// Datagrams that could not be classified (short or unknown id)
    pub unclassified: AtomicU64,
}

impl SourceMetrics {
    /// Get a point-in-time snapshot
    pub fn snapshot(&self) -> SourceMetricsSnapshot {
        SourceMetricsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            unsubscribed: self.unsubscribed.load(Ordering::Relaxed),
            unclassified: self.unclassified.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of source metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceMetricsSnapshot {
    pub packets_received: u64,
    pub bytes_received: u64,
    pub events_dispatched: u64,
    pub events_dropped: u64,
    pub unsubscribed: u64,
    pub unclassified: u64,
}

/// UDP source errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Bind address did not parse or the bind failed
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error on the socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// UDP telemetry source
///
/// `bind` first, then `run` with a cancellation token; cancellation is the
/// stop signal.
pub struct TelemetrySource {
    config: SourceConfig,
    socket: UdpSocket,
    subscriptions: Subscriptions,
    metrics: Arc<SourceMetrics>,
}

impl TelemetrySource {
    /// Bind the feed socket
    pub fn bind(config: SourceConfig, subscriptions: Subscriptions) -> Result<Self, SourceError> {
        let bind_addr = config.bind_address();
        let socket_addr: SocketAddr = bind_addr.parse().map_err(|_| SourceError::Bind {
            address: bind_addr.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid socket address"),
        })?;

        let socket = create_socket(socket_addr, config.recv_buffer_size)
            .map_err(|e| SourceError::Bind {
                address: bind_addr,
                source: e,
            })?;

        Ok(Self {
            config,
            socket,
            subscriptions,
            metrics: Arc::new(SourceMetrics::default()),
        })
    }

    /// The address actually bound (resolves port 0 for tests)
    pub fn local_addr(&self) -> Result<SocketAddr, SourceError> {
        Ok(self.socket.local_addr()?)
    }

    /// Source metrics
    pub fn metrics(&self) -> &Arc<SourceMetrics> {
        &self.metrics
    }

    /// Run the receive loop until cancelled
    pub async fn run(self, cancel: CancellationToken) -> Result<(), SourceError> {
        tracing::info!(
            address = %self.config.bind_address(),
            subscriptions = self.subscriptions.len(),
            "telemetry source listening"
        );

        let mut recv_buf = vec![0u8; self.config.max_packet_size];

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                recv_result = self.socket.recv_from(&mut recv_buf) => {
                    match recv_result {
                        Ok((len, _peer)) => self.process_datagram(&recv_buf[..len]),
                        Err(e) => {
                            tracing::debug!(error = %e, "telemetry recv error");
                        }
                    }
                }
            }
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            packets = snapshot.packets_received,
            dispatched = snapshot.events_dispatched,
            dropped = snapshot.events_dropped,
            "telemetry source stopped"
        );

        Ok(())
    }

    /// Classify one datagram and dispatch it
    fn process_datagram(&self, data: &[u8]) {
        self.metrics.packets_received.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .bytes_received
            .fetch_add(data.len() as u64, Ordering::Relaxed);

        let Some(category) = classify(data) else {
            self.metrics.unclassified.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(len = data.len(), "unclassifiable datagram dropped");
            return;
        };

        let event = TelemetryEvent::new(category, Bytes::copy_from_slice(data));

        match self.subscriptions.dispatch(event) {
            DispatchOutcome::Delivered => {
                self.metrics.events_dispatched.fetch_add(1, Ordering::Relaxed);
            }
            DispatchOutcome::NoSubscriber => {
                self.metrics.unsubscribed.fetch_add(1, Ordering::Relaxed);
            }
            DispatchOutcome::Dropped => {
                self.metrics.events_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(category = %category, "subscriber queue full, event dropped");
            }
            DispatchOutcome::Closed => {
                self.metrics.events_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(category = %category, "subscriber gone, event dropped");
            }
        }
    }
}

/// Classify a datagram by its header packet id
pub fn classify(data: &[u8]) -> Option<TelemetryCategory> {
    if data.len() < HEADER_MIN_LEN {
        return None;
    }
    TelemetryCategory::from_packet_id(data[PACKET_ID_OFFSET])
}

/// Create the UDP socket with a sized receive buffer
fn create_socket(addr: SocketAddr, recv_buffer_size: usize) -> std::io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;

    // Burst tolerance; a refusal here is not fatal
    if let Err(e) = socket.set_recv_buffer_size(recv_buffer_size) {
        tracing::warn!(
            error = %e,
            requested_size = recv_buffer_size,
            "failed to set UDP SO_RCVBUF"
        );
    }

    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod udp_test;
