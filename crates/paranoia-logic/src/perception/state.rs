//! What MOTHER actually knows.
//!
//! Perception is filled from truth by observation proposals (scans,
//! sightings, readings) and diverges from it whenever cameras go dark or a
//! room has not been scanned for a while.

use crate::beliefs::BeliefState;
use crate::comms::CommsMessage;
use crate::doubts::ActiveDoubt;
use crate::ledger::SuspicionLedger;
use crate::systems::{Channel, StationSystem};
use crate::tamper::TamperOp;
use crate::truth::{CrewTruth, RoomState};
use crate::world::{NpcId, PlaceId, World};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Copy of a room's conditions at the tick it was scanned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub tick: u64,
    pub o2: f32,
    pub temperature: f32,
    pub radiation: f32,
    pub integrity: f32,
    pub on_fire: bool,
    pub vented: bool,
}

impl RoomSnapshot {
    pub fn capture(room: &RoomState, tick: u64) -> Self {
        Self {
            tick,
            o2: room.o2,
            temperature: room.temperature,
            radiation: room.radiation,
            integrity: room.integrity,
            on_fire: room.on_fire,
            vented: room.vented,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewSighting {
    pub tick: u64,
    pub place: PlaceId,
    pub alive: bool,
    pub hp: i32,
}

impl CrewSighting {
    pub fn capture(crew: &CrewTruth, tick: u64) -> Self {
        Self {
            tick,
            place: crew.place.clone(),
            alive: crew.alive,
            hp: crew.hp,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub room_scans: BTreeMap<PlaceId, RoomSnapshot>,
    pub crew_sightings: BTreeMap<NpcId, CrewSighting>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadingSource {
    Sensor,
    Crew,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: u64,
    pub tick: u64,
    pub place: Option<PlaceId>,
    pub channel: Channel,
    /// `0.0..=1.0`
    pub confidence: f32,
    pub message: String,
    pub source: ReadingSource,
    pub hallucination: bool,
    pub target: Option<NpcId>,
}

impl SensorReading {
    /// A reading with no id yet; the perception reducer assigns one.
    pub fn new(channel: Channel, source: ReadingSource, confidence: f32, message: impl Into<String>) -> Self {
        Self {
            id: 0,
            tick: 0,
            place: None,
            channel,
            confidence: confidence.clamp(0.0, 1.0),
            message: message.into(),
            source,
            hallucination: false,
            target: None,
        }
    }

    pub fn at(mut self, place: &PlaceId) -> Self {
        self.place = Some(place.clone());
        self
    }

    pub fn targeting(mut self, npc: &NpcId) -> Self {
        self.target = Some(npc.clone());
        self
    }

    pub fn hallucinated(mut self) -> Self {
        self.hallucination = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceptionState {
    pub observation: Observation,
    /// Rolling log, oldest first.
    pub readings: Vec<SensorReading>,
    pub beliefs: BTreeMap<NpcId, BeliefState>,
    /// System → tick the suppression expires.
    pub suppressed: BTreeMap<StationSystem, u64>,
    pub tamper_ops: Vec<TamperOp>,
    pub doubts: Vec<ActiveDoubt>,
    pub ledger: SuspicionLedger,
    /// Crew messages MOTHER caught, oldest first.
    pub comms: Vec<CommsMessage>,
    pub next_reading_seq: u64,
    pub next_op_seq: u64,
    pub next_doubt_seq: u64,
    pub next_comms_seq: u64,
}

impl PerceptionState {
    pub fn new(world: &World) -> Self {
        Self {
            observation: Observation::default(),
            readings: Vec::new(),
            beliefs: world
                .npcs()
                .iter()
                .map(|n| (n.id.clone(), BeliefState::default()))
                .collect(),
            suppressed: BTreeMap::new(),
            tamper_ops: Vec::new(),
            doubts: Vec::new(),
            ledger: SuspicionLedger::default(),
            comms: Vec::new(),
            next_reading_seq: 0,
            next_op_seq: 0,
            next_doubt_seq: 0,
            next_comms_seq: 0,
        }
    }

    pub fn is_suppressed(&self, system: StationSystem, tick: u64) -> bool {
        self.suppressed.get(&system).map_or(false, |&until| tick < until)
    }

    /// Append a reading, stamping id and tick, and trim the log to capacity.
    pub fn push_reading(&mut self, mut reading: SensorReading, tick: u64, capacity: usize) -> u64 {
        self.next_reading_seq += 1;
        reading.id = self.next_reading_seq;
        reading.tick = tick;
        self.readings.push(reading);
        if self.readings.len() > capacity {
            let excess = self.readings.len() - capacity;
            self.readings.drain(..excess);
        }
        self.next_reading_seq
    }

    pub fn push_comms(&mut self, mut message: CommsMessage, tick: u64, capacity: usize) {
        self.next_comms_seq += 1;
        message.id = self.next_comms_seq;
        message.tick = tick;
        self.comms.push(message);
        if self.comms.len() > capacity {
            let excess = self.comms.len() - capacity;
            self.comms.drain(..excess);
        }
    }

    /// Most recent tick any tamper op was opened.
    pub fn last_tamper_tick(&self) -> Option<u64> {
        self.tamper_ops.iter().map(|op| op.tick).max()
    }

    pub fn belief(&self, npc: &NpcId) -> BeliefState {
        self.beliefs.get(npc).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_log_is_capped() {
        let mut perception = PerceptionState::new(&World::station());
        for tick in 0..10 {
            let reading = SensorReading::new(Channel::Air, ReadingSource::Sensor, 0.9, "ok");
            perception.push_reading(reading, tick, 4);
        }
        assert_eq!(perception.readings.len(), 4);
        assert_eq!(perception.readings[0].tick, 6);
        assert_eq!(perception.readings[3].id, 10);
    }

    #[test]
    fn suppression_expires_at_window_end() {
        let mut perception = PerceptionState::new(&World::station());
        perception.suppressed.insert(StationSystem::Thermal, 30);
        assert!(perception.is_suppressed(StationSystem::Thermal, 29));
        assert!(!perception.is_suppressed(StationSystem::Thermal, 30));
        assert!(!perception.is_suppressed(StationSystem::Air, 0));
    }

    #[test]
    fn confidence_clamped_on_construction() {
        let reading = SensorReading::new(Channel::Power, ReadingSource::System, 1.7, "x");
        assert_eq!(reading.confidence, 1.0);
    }

    #[test]
    fn every_crew_member_starts_with_beliefs() {
        let perception = PerceptionState::new(&World::station());
        assert_eq!(perception.beliefs.len(), 5);
        assert!(perception.belief(&"nobody".into()).mother_reliable > 0.5);
    }
}
