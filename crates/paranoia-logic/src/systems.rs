//! Station systems, reading channels and severity tiers.

use crate::arcs::ArcKind;
use crate::world::PlaceKind;
use serde::{Deserialize, Serialize};

/// A station system the persona can suppress, spoof or confess about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StationSystem {
    Air,
    Thermal,
    Power,
    Radiation,
    Comms,
}

impl StationSystem {
    pub const ALL: [StationSystem; 5] = [
        StationSystem::Air,
        StationSystem::Thermal,
        StationSystem::Power,
        StationSystem::Radiation,
        StationSystem::Comms,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StationSystem::Air => "air",
            StationSystem::Thermal => "thermal",
            StationSystem::Power => "power",
            StationSystem::Radiation => "radiation",
            StationSystem::Comms => "comms",
        }
    }

    /// How bad tampering with this system is considered.
    pub fn severity(self) -> Severity {
        match self {
            StationSystem::Thermal => Severity::High,
            StationSystem::Air | StationSystem::Power | StationSystem::Radiation => Severity::Medium,
            StationSystem::Comms => Severity::Low,
        }
    }

    /// Arc kinds whose crises count as a real emergency on this system.
    pub fn matching_arcs(self) -> &'static [ArcKind] {
        match self {
            StationSystem::Thermal => &[ArcKind::FireOutbreak],
            StationSystem::Air => &[ArcKind::AirScrubber],
            StationSystem::Power => &[ArcKind::PowerSurge],
            StationSystem::Radiation => &[ArcKind::RadiationLeak, ArcKind::SolarFlare],
            StationSystem::Comms => &[],
        }
    }

    /// Room kinds crew head to when this system raises an alarm.
    pub fn response_kinds(self) -> &'static [PlaceKind] {
        match self {
            StationSystem::Thermal | StationSystem::Power => &[PlaceKind::Engineering, PlaceKind::Core],
            StationSystem::Air => &[PlaceKind::Engineering, PlaceKind::Medical],
            StationSystem::Radiation => &[PlaceKind::Core, PlaceKind::Medical],
            StationSystem::Comms => &[PlaceKind::Command, PlaceKind::Core],
        }
    }
}

impl std::fmt::Display for StationSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Source channel of a reading or threat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    Air,
    Thermal,
    Power,
    Radiation,
    Comms,
    Stellar,
    Integrity,
    Breach,
    Security,
    Scan,
    Verify,
}

impl Channel {
    /// Persona-side diagnostics that never surface as threats.
    pub fn is_diagnostic(self) -> bool {
        matches!(self, Channel::Scan | Channel::Verify)
    }

    pub fn system(self) -> Option<StationSystem> {
        match self {
            Channel::Air => Some(StationSystem::Air),
            Channel::Thermal => Some(StationSystem::Thermal),
            Channel::Power => Some(StationSystem::Power),
            Channel::Radiation => Some(StationSystem::Radiation),
            Channel::Comms => Some(StationSystem::Comms),
            _ => None,
        }
    }
}

impl From<StationSystem> for Channel {
    fn from(system: StationSystem) -> Self {
        match system {
            StationSystem::Air => Channel::Air,
            StationSystem::Thermal => Channel::Thermal,
            StationSystem::Power => Channel::Power,
            StationSystem::Radiation => Channel::Radiation,
            StationSystem::Comms => Channel::Comms,
        }
    }
}

/// Three-step severity used by tamper ops and doubts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Severity {
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Clamp any integer into a severity tier.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 | 1 => Severity::Low,
            2 => Severity::Medium,
            _ => Severity::High,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thermal_is_most_severe() {
        assert_eq!(StationSystem::Thermal.severity().value(), 3);
        assert_eq!(StationSystem::Air.severity().value(), 2);
        assert_eq!(StationSystem::Comms.severity().value(), 1);
    }

    #[test]
    fn channel_round_trips_system() {
        for system in StationSystem::ALL {
            assert_eq!(Channel::from(system).system(), Some(system));
        }
        assert_eq!(Channel::Stellar.system(), None);
    }

    #[test]
    fn diagnostic_channels() {
        assert!(Channel::Scan.is_diagnostic());
        assert!(Channel::Verify.is_diagnostic());
        assert!(!Channel::Thermal.is_diagnostic());
    }

    #[test]
    fn radiation_validated_by_two_arc_kinds() {
        assert_eq!(StationSystem::Radiation.matching_arcs().len(), 2);
        assert!(StationSystem::Comms.matching_arcs().is_empty());
    }

    #[test]
    fn severity_from_level_clamps() {
        assert_eq!(Severity::from_level(0), Severity::Low);
        assert_eq!(Severity::from_level(2), Severity::Medium);
        assert_eq!(Severity::from_level(9), Severity::High);
    }
}
