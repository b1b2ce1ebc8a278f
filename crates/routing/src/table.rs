//! Resolved route table for a rig session
//!
//! The table is resolved once from a profile and then read-only. All string
//! work (candidate-key lookups) happens during resolution.

use gridlink_protocol::TelemetryCategory;

use crate::RigProfile;

/// Resolved category→destination mapping for one session
///
/// Invariants, by construction:
/// - at most one destination per category (the first candidate key that
///   exists in the profile wins)
/// - categories with no configured destination are absent, never routed
///
/// The table holds at most [`TelemetryCategory::ALL`] entries, so lookups
/// scan a short pre-resolved vector.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    /// Resolved routes, in the category order given to `resolve`
    routes: Vec<(TelemetryCategory, String)>,
}

impl RouteTable {
    /// Resolve the route table for a profile
    ///
    /// For each category, the candidate keys from
    /// [`TelemetryCategory::config_keys`] are tried in priority order
    /// against the profile; the first hit supplies the destination.
    /// Categories with no hit are excluded.
    #[must_use]
    pub fn resolve(profile: &RigProfile, categories: &[TelemetryCategory]) -> Self {
        let mut routes = Vec::new();

        for &category in categories {
            let destination = category
                .config_keys()
                .iter()
                .find_map(|key| profile.queue(key));

            if let Some(destination) = destination {
                routes.push((category, destination.to_string()));
            }
        }

        Self { routes }
    }

    /// Destination queue for a category, if routed
    pub fn destination(&self, category: TelemetryCategory) -> Option<&str> {
        self.routes
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, destination)| destination.as_str())
    }

    /// Iterate over resolved (category, destination) pairs
    pub fn iter(&self) -> impl Iterator<Item = (TelemetryCategory, &str)> {
        self.routes.iter().map(|(c, d)| (*c, d.as_str()))
    }

    /// Routed categories, in resolution order
    pub fn categories(&self) -> impl Iterator<Item = TelemetryCategory> + '_ {
        self.routes.iter().map(|(c, _)| *c)
    }

    /// Distinct destination queues, order-preserving
    ///
    /// Several categories may share one queue; the broker needs each queue
    /// declared once.
    pub fn distinct_destinations(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for (_, destination) in &self.routes {
            if !seen.contains(&destination.as_str()) {
                seen.push(destination.as_str());
            }
        }
        seen
    }

    /// Number of routed categories
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no category resolved to a destination
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
