//! Publisher - connection lifecycle and publish gateway
//!
//! One lifecycle task per rig id owns that rig's connection and channel.
//! Everything else goes through `connect` (coalesced readiness) and
//! `publish` (non-blocking, best-effort).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::retry::RetryPolicy;
use crate::transport::{BrokerChannel, BrokerEndpoint, BrokerLink, BrokerTransport, TransportError};

/// Publisher configuration
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Broker endpoint to connect to
    pub endpoint: BrokerEndpoint,

    /// Reconnect delay policy
    pub retry: RetryPolicy,
}

impl PublisherConfig {
    /// Config with the default retry policy
    pub fn new(endpoint: BrokerEndpoint) -> Self {
        Self {
            endpoint,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Publisher metrics
#[derive(Debug, Default)]
pub struct PublisherMetrics {
    /// Events handed to the transport successfully
    pub published: AtomicU64,

    /// Events dropped because no live channel existed
    pub dropped_no_channel: AtomicU64,

    /// Events the transport rejected
    pub publish_errors: AtomicU64,

    /// Failed connection attempts
    pub connect_failures: AtomicU64,

    /// Successful (re)connections
    pub connections: AtomicU64,
}

impl PublisherMetrics {
    /// Get a point-in-time snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            dropped_no_channel: self.dropped_no_channel.load(Ordering::Relaxed),
            publish_errors: self.publish_errors.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of publisher metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub published: u64,
    pub dropped_no_channel: u64,
    pub publish_errors: u64,
    pub connect_failures: u64,
    pub connections: u64,
}

/// Per-rig connection state, owned by the lifecycle task
struct RigState<C> {
    /// Readiness signal shared by all `connect` callers; true only while a
    /// declared channel is live
    ready_rx: watch::Receiver<bool>,

    /// Live channel slot; `None` whenever the connection is down
    channel: Arc<Mutex<Option<Arc<C>>>>,

    /// The lifecycle task itself
    task: JoinHandle<()>,
}

/// Resilient broker publisher
///
/// Owns one connection per rig id, repairs it transparently, and exposes a
/// fire-and-forget publish operation. See the crate docs for the state
/// machine.
pub struct Publisher<T: BrokerTransport> {
    transport: Arc<T>,
    config: PublisherConfig,
    rigs: Mutex<HashMap<String, RigState<T::Channel>>>,
    metrics: Arc<PublisherMetrics>,
    cancel: CancellationToken,
}

impl<T: BrokerTransport> Publisher<T> {
    /// Create a publisher over the given transport
    pub fn new(transport: T, config: PublisherConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
            rigs: Mutex::new(HashMap::new()),
            metrics: Arc::new(PublisherMetrics::default()),
            cancel: CancellationToken::new(),
        }
    }

    /// Publisher metrics
    pub fn metrics(&self) -> &Arc<PublisherMetrics> {
        &self.metrics
    }

    /// Whether a live channel currently exists for the rig
    pub fn is_connected(&self, rig_id: &str) -> bool {
        self.rigs
            .lock()
            .get(rig_id)
            .is_some_and(|state| state.channel.lock().is_some())
    }

    /// Connect for a rig, declaring all destination queues
    ///
    /// Idempotent per rig id: the first call starts the lifecycle task,
    /// every later call (and every concurrent one) just awaits the shared
    /// readiness signal. Resolves once the channel is open and every
    /// destination has been declared; while the broker is unreachable it
    /// keeps waiting through the retry loop.
    pub async fn connect(&self, rig_id: &str, destinations: Vec<String>) {
        let mut ready_rx = {
            let mut rigs = self.rigs.lock();

            if let Some(state) = rigs.get(rig_id) {
                state.ready_rx.clone()
            } else {
                let (ready_tx, ready_rx) = watch::channel(false);
                let channel = Arc::new(Mutex::new(None));

                let task = tokio::spawn(run_lifecycle(
                    Arc::clone(&self.transport),
                    self.config.clone(),
                    rig_id.to_string(),
                    destinations,
                    ready_tx,
                    Arc::clone(&channel),
                    Arc::clone(&self.metrics),
                    self.cancel.clone(),
                ));

                rigs.insert(
                    rig_id.to_string(),
                    RigState {
                        ready_rx: ready_rx.clone(),
                        channel,
                        task,
                    },
                );

                ready_rx
            }
        };

        // Resolves on readiness; a dropped sender means shutdown, which also
        // releases the caller.
        let _ = ready_rx.wait_for(|ready| *ready).await;
    }

    /// Publish a payload to a destination queue, best-effort
    ///
    /// Never blocks on connection state and never returns an error: without
    /// a live channel the event is counted and dropped, and transport
    /// rejections are absorbed the same way.
    pub async fn publish(&self, rig_id: &str, destination: &str, payload: &[u8]) {
        // Clone the channel handle out so no lock is held across the await
        let channel = self
            .rigs
            .lock()
            .get(rig_id)
            .and_then(|state| state.channel.lock().clone());

        let Some(channel) = channel else {
            self.metrics.dropped_no_channel.fetch_add(1, Ordering::Relaxed);
            debug!(
                rig = %rig_id,
                queue = %destination,
                "no live channel, dropping event"
            );
            return;
        };

        match channel.publish(destination, payload).await {
            Ok(()) => {
                self.metrics.published.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.metrics.publish_errors.fetch_add(1, Ordering::Relaxed);
                debug!(
                    rig = %rig_id,
                    queue = %destination,
                    error = %e,
                    "publish rejected, dropping event"
                );
            }
        }
    }

    /// Stop all lifecycle tasks and drop connections, best-effort
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let tasks: Vec<JoinHandle<()>> = {
            let mut rigs = self.rigs.lock();
            rigs.drain().map(|(_, state)| state.task).collect()
        };

        for task in tasks {
            let _ = task.await;
        }
    }
}

/// The per-rig connection state machine
///
/// disconnected → connecting → connected, back to connecting on close or
/// failure, until cancelled or the attempt cap is hit.
#[allow(clippy::too_many_arguments)]
async fn run_lifecycle<T: BrokerTransport>(
    transport: Arc<T>,
    config: PublisherConfig,
    rig_id: String,
    destinations: Vec<String>,
    ready_tx: watch::Sender<bool>,
    slot: Arc<Mutex<Option<Arc<T::Channel>>>>,
    metrics: Arc<PublisherMetrics>,
    cancel: CancellationToken,
) {
    let mut backoff = config.retry.backoff();

    loop {
        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            result = establish(&*transport, &config.endpoint, &rig_id, &destinations) => result,
        };

        match attempt {
            Ok(BrokerLink { channel, closed }) => {
                *slot.lock() = Some(Arc::new(channel));
                let _ = ready_tx.send(true);
                metrics.connections.fetch_add(1, Ordering::Relaxed);
                backoff.reset();

                info!(
                    rig = %rig_id,
                    endpoint = %config.endpoint.redacted(),
                    queues = destinations.len(),
                    "broker connection ready"
                );

                // Park here until the connection dies or we shut down
                let close_reason = tokio::select! {
                    _ = cancel.cancelled() => break,
                    reason = closed => reason,
                };

                *slot.lock() = None;
                let _ = ready_tx.send(false);

                match close_reason {
                    Ok(err) => warn!(rig = %rig_id, error = %err, "broker connection closed, reconnecting"),
                    Err(_) => warn!(rig = %rig_id, "broker connection dropped, reconnecting"),
                }
            }
            Err(e) => {
                metrics.connect_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    rig = %rig_id,
                    endpoint = %config.endpoint.redacted(),
                    error = %e,
                    "broker connect failed"
                );
            }
        }

        let Some(delay) = backoff.next_delay() else {
            error!(
                rig = %rig_id,
                attempts = backoff.attempt(),
                "broker retry attempts exhausted, giving up"
            );
            break;
        };

        debug!(rig = %rig_id, delay_ms = delay.as_millis() as u64, "next broker attempt scheduled");

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    // Leaving the loop drops the connection; make the gateway see it gone
    *slot.lock() = None;
}

/// One connection attempt: connect, then declare every destination
///
/// Readiness requires all declarations to succeed, so a partial setup is
/// torn down (by drop) and retried whole.
async fn establish<T: BrokerTransport>(
    transport: &T,
    endpoint: &BrokerEndpoint,
    rig_id: &str,
    destinations: &[String],
) -> Result<BrokerLink<T::Channel>, TransportError> {
    let link = transport.connect(endpoint).await?;

    for queue in destinations {
        link.channel.ensure_queue(queue).await?;
        info!(rig = %rig_id, queue = %queue, "queue ensured");
    }

    Ok(link)
}
