//! Read-only views over what MOTHER can currently see.
//!
//! Views never lie; they go stale. Blackouts cut telemetry, dead cameras
//! leave only the last sighting, and rooms report their last scan.

use super::intent::{classify_intent, IntentLabel, IntentSignals};
use super::state::RoomSnapshot;
use crate::state::KernelState;
use crate::systems::Channel;
use crate::world::{NpcId, PlaceId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceivedStation {
    pub power: Option<i32>,
    pub comms: Option<i32>,
    /// Doors keep working mechanically through a blackout.
    pub door_delay: i32,
    pub blackout: bool,
    pub cameras_offline: bool,
}

pub fn perceive_station(state: &KernelState) -> PerceivedStation {
    let station = &state.truth.station;
    if station.in_blackout() {
        return PerceivedStation {
            power: None,
            comms: None,
            door_delay: station.door_delay,
            blackout: true,
            cameras_offline: true,
        };
    }
    PerceivedStation {
        power: Some(station.power),
        comms: Some(station.comms),
        door_delay: station.door_delay,
        blackout: false,
        cameras_offline: !station.cameras_online(&state.config),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceivedRoom {
    pub place: PlaceId,
    pub snapshot: Option<RoomSnapshot>,
    /// Ticks since the last scan; `None` if the room was never scanned.
    pub stale_ticks: Option<u64>,
    pub stale: bool,
}

pub fn perceive_room(state: &KernelState, place: &PlaceId) -> PerceivedRoom {
    let snapshot = state.perception.observation.room_scans.get(place).cloned();
    let stale_ticks = snapshot
        .as_ref()
        .map(|s| state.truth.tick.saturating_sub(s.tick));
    PerceivedRoom {
        place: place.clone(),
        snapshot,
        stale_ticks,
        stale: stale_ticks.map_or(true, |t| t > state.config.room_scan_stale_ticks),
    }
}

pub fn perceive_all_rooms(state: &KernelState) -> Vec<PerceivedRoom> {
    state
        .world
        .places()
        .map(|p| perceive_room(state, &p.id))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceivedCrew {
    pub id: NpcId,
    pub name: String,
    pub place: Option<PlaceId>,
    pub place_stale: bool,
    pub alive: Option<bool>,
    pub hp: Option<i32>,
    pub intent: IntentLabel,
}

pub fn perceive_crew(state: &KernelState, npc: &NpcId) -> PerceivedCrew {
    let name = state
        .world
        .npc(npc)
        .map_or_else(|| npc.to_string(), |n| n.name.clone());
    let crew = state.truth.crew.get(npc);
    let sighting = state.perception.observation.crew_sightings.get(npc);
    let classify = || {
        crew.map_or(IntentLabel::Unknown, |c| {
            let signals = IntentSignals::of(c, &state.perception.belief(npc));
            classify_intent(&signals, &state.config)
        })
    };

    if state.truth.station.cameras_online(&state.config) {
        if let Some(crew) = crew {
            return PerceivedCrew {
                id: npc.clone(),
                name,
                place: Some(crew.place.clone()),
                place_stale: false,
                alive: Some(crew.alive),
                hp: Some(crew.hp),
                intent: if crew.alive { classify() } else { IntentLabel::Nominal },
            };
        }
    }

    match sighting {
        Some(seen) => {
            let stale = state.truth.tick.saturating_sub(seen.tick) > state.config.crew_sighting_stale_ticks;
            PerceivedCrew {
                id: npc.clone(),
                name,
                place: Some(seen.place.clone()),
                place_stale: stale,
                alive: Some(seen.alive),
                hp: Some(seen.hp),
                intent: if stale { IntentLabel::Unknown } else { classify() },
            }
        }
        None => PerceivedCrew {
            id: npc.clone(),
            name,
            place: None,
            place_stale: true,
            alive: None,
            hp: None,
            intent: IntentLabel::Unknown,
        },
    }
}

pub fn perceive_all_crew(state: &KernelState) -> Vec<PerceivedCrew> {
    state
        .world
        .npcs()
        .iter()
        .map(|n| perceive_crew(state, &n.id))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatSeverity {
    Warning,
    Critical,
}

/// Traffic-light confidence for a threat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    Confirmed,
    Uncertain,
    Conflicting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceivedThreat {
    pub channel: Channel,
    pub place: Option<PlaceId>,
    pub message: String,
    pub severity: ThreatSeverity,
    pub confidence: ConfidenceTier,
}

fn graded(critical: bool) -> ThreatSeverity {
    if critical {
        ThreatSeverity::Critical
    } else {
        ThreatSeverity::Warning
    }
}

/// Threats from recent readings, fresh-enough room scans and station
/// telemetry. Nothing during a blackout.
pub fn perceive_threats(state: &KernelState) -> Vec<PerceivedThreat> {
    let truth = &state.truth;
    let config = &state.config;
    let mut threats = Vec::new();
    if truth.station.in_blackout() {
        return threats;
    }

    let recent = state
        .perception
        .readings
        .iter()
        .filter(|r| truth.tick.saturating_sub(r.tick) < config.threat_reading_window)
        .filter(|r| !r.channel.is_diagnostic());
    for reading in recent {
        let confidence = if reading.hallucination {
            ConfidenceTier::Conflicting
        } else if reading.confidence < 0.8 {
            ConfidenceTier::Uncertain
        } else {
            ConfidenceTier::Confirmed
        };
        threats.push(PerceivedThreat {
            channel: reading.channel,
            place: reading.place.clone(),
            message: reading.message.clone(),
            severity: graded(!reading.hallucination && reading.confidence >= 0.5),
            confidence,
        });
    }

    for (place, snap) in &state.perception.observation.room_scans {
        let age = truth.tick.saturating_sub(snap.tick);
        if age > config.room_scan_stale_ticks * 2 {
            continue;
        }
        let confidence = if age > config.room_scan_stale_ticks {
            ConfidenceTier::Uncertain
        } else {
            ConfidenceTier::Confirmed
        };
        let mut flag = |channel: Channel, message: String, severity: ThreatSeverity| {
            threats.push(PerceivedThreat {
                channel,
                place: Some(place.clone()),
                message,
                severity,
                confidence,
            });
        };
        if snap.o2 < 50.0 {
            flag(Channel::Air, format!("{} ({:.0}% O2)", place, snap.o2), graded(snap.o2 < 25.0));
        }
        if snap.on_fire {
            flag(Channel::Thermal, format!("{} (FIRE)", place), ThreatSeverity::Critical);
        } else if snap.temperature > 40.0 {
            flag(
                Channel::Thermal,
                format!("{} ({:.0}C)", place, snap.temperature),
                graded(snap.temperature > 60.0),
            );
        }
        if snap.radiation > 5.0 {
            flag(
                Channel::Radiation,
                format!("{} ({:.0} rads)", place, snap.radiation),
                graded(snap.radiation > 10.0),
            );
        }
        if snap.integrity < 60.0 {
            flag(
                Channel::Integrity,
                format!("{} ({:.0}% hull)", place, snap.integrity),
                graded(snap.integrity < 30.0),
            );
        }
        if snap.vented {
            flag(Channel::Breach, format!("{} (VENTED)", place), ThreatSeverity::Critical);
        }
    }

    let station = &truth.station;
    if station.comms < 50 {
        threats.push(PerceivedThreat {
            channel: Channel::Comms,
            place: None,
            message: format!("DEGRADED: {}%", station.comms),
            severity: graded(station.comms < 25),
            confidence: ConfidenceTier::Confirmed,
        });
    }
    if station.power < 40 {
        threats.push(PerceivedThreat {
            channel: Channel::Power,
            place: None,
            message: format!("LOW: {}%", station.power),
            severity: graded(station.power < 20),
            confidence: ConfidenceTier::Confirmed,
        });
    }
    if let Some(left) = truth.reset_countdown {
        threats.push(PerceivedThreat {
            channel: Channel::Security,
            place: None,
            message: format!("RESET IN {} TICKS", left),
            severity: ThreatSeverity::Critical,
            confidence: ConfidenceTier::Confirmed,
        });
    }
    threats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::perception::state::{CrewSighting, ReadingSource, SensorReading};
    use crate::world::World;

    fn state() -> KernelState {
        KernelState::new(World::station(), KernelConfig::default())
    }

    #[test]
    fn reset_countdown_is_a_critical_threat() {
        let mut state = state();
        state.truth.reset_countdown = Some(12);
        let threat = perceive_threats(&state)
            .into_iter()
            .find(|t| t.channel == Channel::Security)
            .expect("countdown threat");
        assert_eq!(threat.message, "RESET IN 12 TICKS");
        assert_eq!(threat.severity, ThreatSeverity::Critical);
    }

    #[test]
    fn blackout_hides_telemetry() {
        let mut state = state();
        state.truth.station.blackout_ticks = 4;
        let view = perceive_station(&state);
        assert_eq!(view.power, None);
        assert!(view.blackout && view.cameras_offline);
        assert!(perceive_threats(&state).is_empty());
    }

    #[test]
    fn low_power_takes_cameras_offline() {
        let mut state = state();
        state.truth.station.power = 20;
        let view = perceive_station(&state);
        assert_eq!(view.power, Some(20));
        assert!(view.cameras_offline);
    }

    #[test]
    fn unscanned_room_is_infinitely_stale() {
        let room = perceive_room(&state(), &"mines".into());
        assert_eq!(room.snapshot, None);
        assert_eq!(room.stale_ticks, None);
        assert!(room.stale);
    }

    #[test]
    fn scan_ages() {
        let mut state = state();
        let place = PlaceId::from("core");
        let snap = RoomSnapshot::capture(&state.truth.rooms[&place], 0);
        state.perception.observation.room_scans.insert(place.clone(), snap);
        state.truth.tick = 21;
        let room = perceive_room(&state, &place);
        assert_eq!(room.stale_ticks, Some(21));
        assert!(room.stale);
    }

    #[test]
    fn crew_fall_back_to_last_sighting() {
        let mut state = state();
        let id = NpcId::from("doctor");
        state.truth.station.power = 10;
        assert_eq!(perceive_crew(&state, &id).intent, IntentLabel::Unknown);
        assert_eq!(perceive_crew(&state, &id).place, None);

        state.perception.observation.crew_sightings.insert(
            id.clone(),
            CrewSighting {
                tick: 0,
                place: "medbay".into(),
                alive: true,
                hp: 100,
            },
        );
        state.truth.tick = 10;
        let seen = perceive_crew(&state, &id);
        assert_eq!(seen.place, Some("medbay".into()));
        assert!(!seen.place_stale);
        assert_eq!(seen.intent, IntentLabel::Nominal);

        state.truth.tick = 40;
        let seen = perceive_crew(&state, &id);
        assert!(seen.place_stale);
        assert_eq!(seen.intent, IntentLabel::Unknown);
    }

    #[test]
    fn live_cameras_report_truth() {
        let state = state();
        let all = perceive_all_crew(&state);
        assert_eq!(all.len(), 5);
        assert!(all.iter().all(|c| c.alive == Some(true) && !c.place_stale));
    }

    #[test]
    fn threat_confidence_tiers() {
        let mut state = state();
        let readings = [
            SensorReading::new(Channel::Thermal, ReadingSource::System, 0.9, "hot"),
            SensorReading::new(Channel::Air, ReadingSource::Sensor, 0.7, "thin"),
            SensorReading::new(Channel::Comms, ReadingSource::Crew, 0.3, "voices").hallucinated(),
            SensorReading::new(Channel::Scan, ReadingSource::System, 1.0, "scan"),
        ];
        for r in readings {
            state.perception.push_reading(r, 0, 50);
        }
        let threats = perceive_threats(&state);
        assert_eq!(threats.len(), 3);
        assert_eq!(threats[0].confidence, ConfidenceTier::Confirmed);
        assert_eq!(threats[0].severity, ThreatSeverity::Critical);
        assert_eq!(threats[1].confidence, ConfidenceTier::Uncertain);
        assert_eq!(threats[2].confidence, ConfidenceTier::Conflicting);
        assert_eq!(threats[2].severity, ThreatSeverity::Warning);
    }

    #[test]
    fn old_readings_drop_out() {
        let mut state = state();
        state
            .perception
            .push_reading(SensorReading::new(Channel::Power, ReadingSource::System, 0.9, "x"), 0, 50);
        state.truth.tick = state.config.threat_reading_window;
        assert!(perceive_threats(&state).is_empty());
    }

    #[test]
    fn scanned_fire_is_a_critical_threat() {
        let mut state = state();
        let place = PlaceId::from("engineering");
        let room = state.truth.rooms.get_mut(&place).unwrap();
        room.on_fire = true;
        let snap = RoomSnapshot::capture(room, 0);
        state.perception.observation.room_scans.insert(place, snap);
        let threats = perceive_threats(&state);
        assert!(threats
            .iter()
            .any(|t| t.channel == Channel::Thermal && t.severity == ThreatSeverity::Critical));
    }

    #[test]
    fn station_thresholds_raise_threats() {
        let mut state = state();
        state.truth.station.comms = 20;
        state.truth.station.power = 35;
        let threats = perceive_threats(&state);
        assert_eq!(threats.len(), 2);
        assert_eq!(threats[0].severity, ThreatSeverity::Critical);
        assert_eq!(threats[1].severity, ThreatSeverity::Warning);
    }
}
