//! Rig destination profile

use std::collections::HashMap;

/// A rig's destination profile, loaded once at session start
///
/// The profile maps configuration keys (`"<key>Queue"`) to broker queue
/// names. It is immutable for the lifetime of the session; the session
/// coordinator owns it and hands references to the resolver.
#[derive(Debug, Clone)]
pub struct RigProfile {
    /// Rig identifier this profile belongs to
    rig_id: String,

    /// Queue-key → destination queue name
    queues: HashMap<String, String>,
}

impl RigProfile {
    /// Create a profile from a rig id and its queue entries
    pub fn new(
        rig_id: impl Into<String>,
        queues: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            rig_id: rig_id.into(),
            queues: queues.into_iter().collect(),
        }
    }

    /// The rig identifier
    pub fn rig_id(&self) -> &str {
        &self.rig_id
    }

    /// Look up a destination by its exact configuration key
    pub fn queue(&self, key: &str) -> Option<&str> {
        self.queues.get(key).map(String::as_str)
    }

    /// Number of configured queue entries
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// Whether the profile has no queue entries at all
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_lookup() {
        let profile = RigProfile::new("2", [("lapDataQueue".into(), "laps".into())]);
        assert_eq!(profile.rig_id(), "2");
        assert_eq!(profile.queue("lapDataQueue"), Some("laps"));
        assert_eq!(profile.queue("lapdataQueue"), None);
        assert_eq!(profile.len(), 1);
        assert!(!profile.is_empty());
    }

    #[test]
    fn test_empty_profile() {
        let profile = RigProfile::new("9", []);
        assert!(profile.is_empty());
        assert_eq!(profile.queue("anything"), None);
    }
}
