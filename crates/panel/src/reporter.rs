//! Status heartbeat reporter.
//!
//! Runs as its own task: one connectivity probe, then an immediate snapshot
//! followed by one per interval. A failed probe means the task exits without
//! ever starting the heartbeat; a failed push is logged at debug and the
//! next tick retries naturally.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::PanelClient;
use crate::status::{now_millis, StatusSnapshot};

/// How recently telemetry must have been seen for `isInUse`
const ACTIVITY_WINDOW: Duration = Duration::from_secs(30);

/// Static identity reported in every snapshot.
#[derive(Debug, Clone)]
pub struct AgentIdentity {
    pub version: String,
    pub branch: String,
    pub dev_mode: bool,
    pub send_logs: bool,
}

/// Tracks when telemetry was last observed.
///
/// The coordinator touches this per event; the reporter reads it to fill
/// the snapshot's activity flag. Cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct ActivityTracker {
    last_event_millis: Arc<AtomicU64>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that an event was just seen
    pub fn touch(&self) {
        self.last_event_millis.store(now_millis(), Ordering::Relaxed);
    }

    /// Whether an event was seen within the window
    pub fn active_within(&self, window: Duration) -> bool {
        let last = self.last_event_millis.load(Ordering::Relaxed);
        if last == 0 {
            return false;
        }
        now_millis().saturating_sub(last) <= window.as_millis() as u64
    }
}

/// Heartbeat reporter task.
pub struct StatusReporter {
    client: Arc<PanelClient>,
    rig_id: String,
    identity: AgentIdentity,
    interval: Duration,
    activity: ActivityTracker,
}

impl StatusReporter {
    pub fn new(
        client: Arc<PanelClient>,
        rig_id: impl Into<String>,
        identity: AgentIdentity,
        interval: Duration,
        activity: ActivityTracker,
    ) -> Self {
        Self {
            client,
            rig_id: rig_id.into(),
            identity,
            interval,
            activity,
        }
    }

    /// Run until cancelled.
    ///
    /// Returns immediately (heartbeat never started) when the probe fails;
    /// telemetry forwarding is unaffected either way.
    pub async fn run(self, cancel: CancellationToken) {
        if let Err(e) = self.client.verify_access(&self.rig_id).await {
            warn!(rig = %self.rig_id, error = %e, "panel probe failed, status reporting disabled");
            return;
        }

        // Identity of the thing we just connected to; a failure here is
        // cosmetic only
        match self.client.info().await {
            Ok(info) => {
                info!(
                    rig = %self.rig_id,
                    panel_version = %info.version,
                    panel_branch = %info.branch,
                    "connected to panel"
                );
            }
            Err(e) => {
                debug!(error = %e, "panel info lookup failed");
            }
        }

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    // First tick fires immediately: that is the prompt
                    // initial snapshot
                    self.push_snapshot().await;
                }
            }
        }

        debug!(rig = %self.rig_id, "status reporter stopped");
    }

    async fn push_snapshot(&self) {
        let snapshot = StatusSnapshot {
            timestamp: now_millis(),
            dev_mode: self.identity.dev_mode,
            send_logs: self.identity.send_logs,
            branch: self.identity.branch.clone(),
            version: self.identity.version.clone(),
            is_in_use: self.activity.active_within(ACTIVITY_WINDOW),
        };

        if let Err(e) = self.client.post_status(&self.rig_id, &snapshot).await {
            debug!(rig = %self.rig_id, error = %e, "status push failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PanelConfig;

    fn identity() -> AgentIdentity {
        AgentIdentity {
            version: "0.4.2".into(),
            branch: "main".into(),
            dev_mode: false,
            send_logs: false,
        }
    }

    #[test]
    fn test_activity_tracker_starts_idle() {
        let tracker = ActivityTracker::new();
        assert!(!tracker.active_within(Duration::from_secs(30)));
    }

    #[test]
    fn test_activity_tracker_touch() {
        let tracker = ActivityTracker::new();
        tracker.touch();
        assert!(tracker.active_within(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_failed_probe_never_starts_heartbeat() {
        // Nothing listens here; the probe fails and run() must return on
        // its own, well before any heartbeat tick
        let client = Arc::new(PanelClient::new(&PanelConfig::new("http://127.0.0.1:9", "s")));
        let reporter = StatusReporter::new(
            client,
            "1",
            identity(),
            Duration::from_secs(3600),
            ActivityTracker::new(),
        );

        tokio::time::timeout(Duration::from_secs(15), reporter.run(CancellationToken::new()))
            .await
            .expect("reporter exits after failed probe");
    }
}
