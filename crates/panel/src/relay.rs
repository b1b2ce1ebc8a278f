//! Log relay: agent log lines → panel.
//!
//! A `tracing` layer captures formatted events into a bounded channel with
//! `try_send`; the relay task posts them one at a time. The layer never
//! blocks the emitting thread and the relay swallows every delivery error -
//! losing a relayed log line is always acceptable, slowing the agent is not.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use tokio_util::sync::CancellationToken;

use crate::client::PanelClient;
use crate::status::{now_millis, LogEntry};

/// Bounded queue between the layer and the relay task
const RELAY_QUEUE: usize = 64;

/// Relay task that delivers captured log lines to the panel.
pub struct LogRelay {
    rx: mpsc::Receiver<LogEntry>,
    client: Arc<PanelClient>,
    rig_id: String,
}

impl LogRelay {
    /// Create the relay and its capture layer.
    ///
    /// Install the layer into the subscriber registry and spawn `run`.
    pub fn new(client: Arc<PanelClient>, rig_id: impl Into<String>) -> (Self, PanelLogLayer) {
        let (tx, rx) = mpsc::channel(RELAY_QUEUE);
        (
            Self {
                rx,
                client,
                rig_id: rig_id.into(),
            },
            PanelLogLayer { tx },
        )
    }

    /// Deliver entries until cancelled or the layer is dropped.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let entry = tokio::select! {
                _ = cancel.cancelled() => break,
                entry = self.rx.recv() => match entry {
                    Some(entry) => entry,
                    None => break,
                },
            };

            // Deliberately silent on failure: a log about a failed log
            // delivery would loop straight back into this relay
            let _ = self.client.post_log(&self.rig_id, &entry).await;
        }
    }
}

/// `tracing` layer that captures event messages for the relay.
pub struct PanelLogLayer {
    tx: mpsc::Sender<LogEntry>,
}

impl<S: Subscriber> Layer<S> for PanelLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let Some(message) = visitor.message else {
            return;
        };

        let entry = LogEntry {
            level: event.metadata().level().as_str().to_ascii_lowercase(),
            message,
            timestamp: now_millis(),
        };

        // Full queue: drop the entry, never block the caller
        let _ = self.tx.try_send(entry);
    }
}

/// Extracts the `message` field from an event.
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PanelConfig;
    use tracing_subscriber::prelude::*;

    fn test_client() -> Arc<PanelClient> {
        Arc::new(PanelClient::new(&PanelConfig::new("http://127.0.0.1:9", "s")))
    }

    #[tokio::test]
    async fn test_layer_captures_event_message() {
        let (mut relay, layer) = LogRelay::new(test_client(), "1");

        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("queue ensured");
        });

        let entry = relay.rx.try_recv().expect("entry captured");
        assert_eq!(entry.level, "info");
        assert_eq!(entry.message, "queue ensured");
        assert!(entry.timestamp > 0);
    }

    #[tokio::test]
    async fn test_layer_drops_when_queue_full() {
        let (relay, layer) = LogRelay::new(test_client(), "1");

        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            // Overfill the bounded queue; none of these may block or panic
            for i in 0..(RELAY_QUEUE + 16) {
                tracing::warn!(i, "spam");
            }
        });

        drop(relay);
    }

    #[tokio::test]
    async fn test_relay_stops_when_layer_dropped() {
        let (relay, layer) = LogRelay::new(test_client(), "1");
        drop(layer);

        tokio::time::timeout(std::time::Duration::from_secs(2), relay.run(CancellationToken::new()))
            .await
            .expect("relay exits once the layer sender is gone");
    }
}
