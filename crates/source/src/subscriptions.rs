//! Category subscription registry

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use gridlink_protocol::{TelemetryCategory, TelemetryEvent};

/// Outcome of dispatching one event into the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handed to the subscriber's queue
    Delivered,

    /// Nobody subscribed to this category
    NoSubscriber,

    /// Subscriber queue full - event dropped
    Dropped,

    /// Subscriber receiver gone
    Closed,
}

/// Category → subscriber registry
///
/// Built by the session coordinator before the source starts and then
/// read-only. Several categories may share one sender (one receive loop for
/// the whole route table) or each get their own channel.
#[derive(Debug, Default)]
pub struct Subscriptions {
    senders: HashMap<TelemetryCategory, mpsc::Sender<TelemetryEvent>>,
}

impl Subscriptions {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an existing sender to a category
    pub fn attach(&mut self, category: TelemetryCategory, sender: mpsc::Sender<TelemetryEvent>) {
        self.senders.insert(category, sender);
    }

    /// Subscribe a category on its own bounded channel
    pub fn subscribe(
        &mut self,
        category: TelemetryCategory,
        capacity: usize,
    ) -> mpsc::Receiver<TelemetryEvent> {
        let (tx, rx) = mpsc::channel(capacity);
        self.attach(category, tx);
        rx
    }

    /// Whether a category has a subscriber
    pub fn is_subscribed(&self, category: TelemetryCategory) -> bool {
        self.senders.contains_key(&category)
    }

    /// Number of subscribed categories
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// Whether no category is subscribed
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Dispatch an event to its category's subscriber, non-blocking
    pub fn dispatch(&self, event: TelemetryEvent) -> DispatchOutcome {
        let Some(sender) = self.senders.get(&event.category) else {
            return DispatchOutcome::NoSubscriber;
        };

        match sender.try_send(event) {
            Ok(()) => DispatchOutcome::Delivered,
            Err(TrySendError::Full(_)) => DispatchOutcome::Dropped,
            Err(TrySendError::Closed(_)) => DispatchOutcome::Closed,
        }
    }
}
