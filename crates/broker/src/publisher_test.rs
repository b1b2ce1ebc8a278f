//! Publisher lifecycle tests against a mock transport

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::publisher::{Publisher, PublisherConfig};
use crate::retry::RetryPolicy;
use crate::transport::{
    BrokerChannel, BrokerEndpoint, BrokerLink, BrokerTransport, TransportError,
};

#[derive(Default)]
struct MockState {
    /// Connection attempts made so far
    attempts: AtomicUsize,

    /// Number of initial connects to refuse
    fail_first: AtomicUsize,

    /// Reject publishes when set
    fail_publish: AtomicBool,

    /// (queue, payload) pairs accepted by the channel
    published: Mutex<Vec<(String, Vec<u8>)>>,

    /// Queues declared, in order
    declared: Mutex<Vec<String>>,

    /// Close triggers for live connections
    close_senders: Mutex<Vec<oneshot::Sender<TransportError>>>,
}

struct MockTransport {
    state: Arc<MockState>,
    connect_delay: Duration,
}

impl MockTransport {
    fn new() -> (Self, Arc<MockState>) {
        let state = Arc::new(MockState::default());
        (
            Self {
                state: Arc::clone(&state),
                connect_delay: Duration::ZERO,
            },
            state,
        )
    }

    fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }
}

struct MockChannel {
    state: Arc<MockState>,
}

#[async_trait]
impl BrokerTransport for MockTransport {
    type Channel = MockChannel;

    async fn connect(
        &self,
        _endpoint: &BrokerEndpoint,
    ) -> Result<BrokerLink<Self::Channel>, TransportError> {
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }

        let attempt = self.state.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.state.fail_first.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("mock broker refused".into()));
        }

        let (closed_tx, closed_rx) = oneshot::channel();
        self.state.close_senders.lock().push(closed_tx);

        Ok(BrokerLink {
            channel: MockChannel {
                state: Arc::clone(&self.state),
            },
            closed: closed_rx,
        })
    }
}

#[async_trait]
impl BrokerChannel for MockChannel {
    async fn ensure_queue(&self, queue: &str) -> Result<(), TransportError> {
        self.state.declared.lock().push(queue.to_string());
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), TransportError> {
        if self.state.fail_publish.load(Ordering::SeqCst) {
            return Err(TransportError::Publish {
                queue: queue.to_string(),
                message: "mock rejection".into(),
            });
        }
        self.state
            .published
            .lock()
            .push((queue.to_string(), payload.to_vec()));
        Ok(())
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(10),
        multiplier: 1.0,
        jitter: false,
        max_attempts: 0,
    }
}

fn test_config() -> PublisherConfig {
    PublisherConfig::new(BrokerEndpoint::uri("amqp://test")).with_retry(fast_policy())
}

/// Poll a condition with a hard deadline so tests stay time-bounded
async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met within bounded test time");
}

#[tokio::test]
async fn test_concurrent_connects_share_one_attempt() {
    let (transport, state) = MockTransport::new();
    let transport = transport.with_connect_delay(Duration::from_millis(50));
    let publisher = Arc::new(Publisher::new(transport, test_config()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let publisher = Arc::clone(&publisher);
        handles.push(tokio::spawn(async move {
            publisher.connect("1", vec!["laps".into()]).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(state.attempts.load(Ordering::SeqCst), 1);
    assert!(publisher.is_connected("1"));
}

#[tokio::test]
async fn test_connect_is_idempotent_after_ready() {
    let (transport, state) = MockTransport::new();
    let publisher = Publisher::new(transport, test_config());

    publisher.connect("1", vec!["laps".into()]).await;
    publisher.connect("1", vec!["laps".into()]).await;

    assert_eq!(state.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_declares_every_destination_before_ready() {
    let (transport, state) = MockTransport::new();
    let publisher = Publisher::new(transport, test_config());

    publisher
        .connect("1", vec!["laps".into(), "status".into()])
        .await;

    assert_eq!(*state.declared.lock(), vec!["laps", "status"]);
}

#[tokio::test]
async fn test_connect_retries_until_broker_accepts() {
    let (transport, state) = MockTransport::new();
    state.fail_first.store(2, Ordering::SeqCst);
    let publisher = Publisher::new(transport, test_config());

    publisher.connect("1", vec!["laps".into()]).await;

    assert_eq!(state.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(publisher.metrics().snapshot().connect_failures, 2);
    assert_eq!(publisher.metrics().snapshot().connections, 1);
}

#[tokio::test]
async fn test_publish_delivers_exact_payload() {
    let (transport, state) = MockTransport::new();
    let publisher = Publisher::new(transport, test_config());

    publisher.connect("1", vec!["laps".into()]).await;
    publisher.publish("1", "laps", b"lap 12 1:31.204").await;

    let published = state.published.lock();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "laps");
    assert_eq!(published[0].1, b"lap 12 1:31.204");
    assert_eq!(publisher.metrics().snapshot().published, 1);
}

#[tokio::test]
async fn test_publish_while_disconnected_drops_silently() {
    let (transport, state) = MockTransport::new();
    let publisher = Publisher::new(transport, test_config());

    // No connect at all - the event path must not error
    publisher.publish("1", "laps", b"early").await;

    assert!(state.published.lock().is_empty());
    assert_eq!(publisher.metrics().snapshot().dropped_no_channel, 1);
}

#[tokio::test]
async fn test_publish_error_is_absorbed() {
    let (transport, state) = MockTransport::new();
    let publisher = Publisher::new(transport, test_config());

    publisher.connect("1", vec!["laps".into()]).await;
    state.fail_publish.store(true, Ordering::SeqCst);

    publisher.publish("1", "laps", b"rejected").await;

    assert_eq!(publisher.metrics().snapshot().publish_errors, 1);
    assert_eq!(publisher.metrics().snapshot().published, 0);
}

#[tokio::test]
async fn test_reconnects_after_transport_close() {
    let (transport, state) = MockTransport::new();
    let publisher = Publisher::new(transport, test_config());

    publisher.connect("1", vec!["laps".into()]).await;

    // Kill the connection from the broker side
    let closer = state.close_senders.lock().remove(0);
    closer
        .send(TransportError::Closed("heartbeat missed".into()))
        .ok();

    // The state machine must come back to connected on its own
    wait_until(|| state.attempts.load(Ordering::SeqCst) >= 2).await;
    wait_until(|| publisher.is_connected("1")).await;

    assert_eq!(publisher.metrics().snapshot().connections, 2);
}

#[tokio::test]
async fn test_events_during_gap_dropped_then_flow_resumes() {
    let (transport, state) = MockTransport::new();
    let publisher = Publisher::new(transport, test_config());

    publisher.connect("1", vec!["laps".into()]).await;
    publisher.publish("1", "laps", b"before").await;

    let closer = state.close_senders.lock().remove(0);
    closer.send(TransportError::Closed("gone".into())).ok();
    wait_until(|| !publisher.is_connected("1")).await;

    // Published into the gap: counted, not queued
    publisher.publish("1", "laps", b"during gap").await;
    assert_eq!(publisher.metrics().snapshot().dropped_no_channel, 1);

    wait_until(|| publisher.is_connected("1")).await;
    publisher.publish("1", "laps", b"after").await;

    let payloads: Vec<_> = state
        .published
        .lock()
        .iter()
        .map(|(_, payload)| payload.clone())
        .collect();
    assert_eq!(payloads, vec![b"before".to_vec(), b"after".to_vec()]);
}

#[tokio::test]
async fn test_attempt_cap_stops_retrying() {
    let (transport, state) = MockTransport::new();
    state.fail_first.store(usize::MAX, Ordering::SeqCst);

    let config = PublisherConfig::new(BrokerEndpoint::uri("amqp://test")).with_retry(RetryPolicy {
        max_attempts: 3,
        ..fast_policy()
    });
    let publisher = Arc::new(Publisher::new(transport, config));

    // connect never resolves to ready; give the lifecycle time to exhaust
    let publisher_clone = Arc::clone(&publisher);
    let connect = tokio::spawn(async move {
        publisher_clone.connect("1", vec!["laps".into()]).await;
    });

    wait_until(|| state.attempts.load(Ordering::SeqCst) >= 3).await;
    // Exhaustion drops the readiness sender, releasing the caller
    connect.await.unwrap();

    assert!(!publisher.is_connected("1"));
}

#[tokio::test]
async fn test_shutdown_closes_connection() {
    let (transport, _state) = MockTransport::new();
    let publisher = Publisher::new(transport, test_config());

    publisher.connect("1", vec!["laps".into()]).await;
    publisher.shutdown().await;

    assert!(!publisher.is_connected("1"));
}
