//! Telemetry category enumeration
//!
//! The sim feed tags every datagram with a packet id; each id maps to one
//! category here. The set is fixed at compile time - the agent never learns
//! categories dynamically.

use std::fmt;

/// A telemetry category emitted by the sim feed
///
/// Categories identify the kind of telemetry carried by a packet (lap
/// timing, car status, session info, ...). Routing decisions are made per
/// category: each category either maps to exactly one destination queue or
/// is not forwarded at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TelemetryCategory {
    Motion,
    Session,
    LapData,
    Event,
    Participants,
    CarSetups,
    CarTelemetry,
    CarStatus,
    FinalClassification,
    LobbyInfo,
    CarDamage,
    SessionHistory,
}

impl TelemetryCategory {
    /// All categories, in packet-id order
    pub const ALL: [TelemetryCategory; 12] = [
        Self::Motion,
        Self::Session,
        Self::LapData,
        Self::Event,
        Self::Participants,
        Self::CarSetups,
        Self::CarTelemetry,
        Self::CarStatus,
        Self::FinalClassification,
        Self::LobbyInfo,
        Self::CarDamage,
        Self::SessionHistory,
    ];

    /// Map a wire packet id to its category
    ///
    /// Returns `None` for ids outside the known set (future game versions
    /// add ids; unknown packets are counted and dropped by the source).
    #[must_use]
    pub const fn from_packet_id(id: u8) -> Option<Self> {
        Some(match id {
            0 => Self::Motion,
            1 => Self::Session,
            2 => Self::LapData,
            3 => Self::Event,
            4 => Self::Participants,
            5 => Self::CarSetups,
            6 => Self::CarTelemetry,
            7 => Self::CarStatus,
            8 => Self::FinalClassification,
            9 => Self::LobbyInfo,
            10 => Self::CarDamage,
            11 => Self::SessionHistory,
            _ => return None,
        })
    }

    /// Category name as it appears in logs and route listings
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Motion => "Motion",
            Self::Session => "Session",
            Self::LapData => "LapData",
            Self::Event => "Event",
            Self::Participants => "Participants",
            Self::CarSetups => "CarSetups",
            Self::CarTelemetry => "CarTelemetry",
            Self::CarStatus => "CarStatus",
            Self::FinalClassification => "FinalClassification",
            Self::LobbyInfo => "LobbyInfo",
            Self::CarDamage => "CarDamage",
            Self::SessionHistory => "SessionHistory",
        }
    }

    /// Candidate profile keys for this category, in priority order
    ///
    /// Rig profiles have gone through two naming conventions: an older
    /// all-lowercase form (`lapdataQueue`) and a camelCase form
    /// (`lapDataQueue`). Both are still found in deployed profiles, so
    /// resolution tries the lowercase form first and falls back to
    /// camelCase. For single-word categories the two forms coincide.
    #[must_use]
    pub const fn config_keys(self) -> [&'static str; 2] {
        match self {
            Self::Motion => ["motionQueue", "motionQueue"],
            Self::Session => ["sessionQueue", "sessionQueue"],
            Self::LapData => ["lapdataQueue", "lapDataQueue"],
            Self::Event => ["eventQueue", "eventQueue"],
            Self::Participants => ["participantsQueue", "participantsQueue"],
            Self::CarSetups => ["carsetupsQueue", "carSetupsQueue"],
            Self::CarTelemetry => ["cartelemetryQueue", "carTelemetryQueue"],
            Self::CarStatus => ["carstatusQueue", "carStatusQueue"],
            Self::FinalClassification => {
                ["finalclassificationQueue", "finalClassificationQueue"]
            }
            Self::LobbyInfo => ["lobbyinfoQueue", "lobbyInfoQueue"],
            Self::CarDamage => ["cardamageQueue", "carDamageQueue"],
            Self::SessionHistory => ["sessionhistoryQueue", "sessionHistoryQueue"],
        }
    }
}

impl fmt::Display for TelemetryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_id_round_trip() {
        for (id, category) in TelemetryCategory::ALL.iter().enumerate() {
            assert_eq!(TelemetryCategory::from_packet_id(id as u8), Some(*category));
        }
    }

    #[test]
    fn test_unknown_packet_id() {
        assert_eq!(TelemetryCategory::from_packet_id(12), None);
        assert_eq!(TelemetryCategory::from_packet_id(255), None);
    }

    #[test]
    fn test_all_is_exhaustive() {
        assert_eq!(TelemetryCategory::ALL.len(), 12);
    }

    #[test]
    fn test_config_keys_priority_order() {
        // Lowercase form first, camelCase second
        let [primary, fallback] = TelemetryCategory::CarStatus.config_keys();
        assert_eq!(primary, "carstatusQueue");
        assert_eq!(fallback, "carStatusQueue");
    }

    #[test]
    fn test_config_keys_single_word_coincide() {
        let [primary, fallback] = TelemetryCategory::Motion.config_keys();
        assert_eq!(primary, fallback);
    }

    #[test]
    fn test_config_keys_match_name() {
        // The fallback key is always the name with its first letter
        // lowercased plus the Queue suffix
        for category in TelemetryCategory::ALL {
            let name = category.name();
            let mut chars = name.chars();
            let first = chars.next().unwrap().to_ascii_lowercase();
            let expected = format!("{}{}Queue", first, chars.as_str());
            assert_eq!(category.config_keys()[1], expected);
        }
    }

    #[test]
    fn test_config_keys_primary_is_lowercased() {
        for category in TelemetryCategory::ALL {
            let expected = format!("{}Queue", category.name().to_ascii_lowercase());
            assert_eq!(category.config_keys()[0], expected);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(TelemetryCategory::LapData.to_string(), "LapData");
    }
}
