//! Authoritative station state.
//!
//! Nothing in here knows what MOTHER believes. The truth reducer only ever
//! sees this tree, the immutable [`World`] and the [`KernelConfig`].

use crate::arcs::{Arc, ArcId, ArcKind};
use crate::config::KernelConfig;
use crate::world::{DeviceId, Npc, NpcId, PlaceId, World};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Highest O₂ a vented room can report.
pub const VENTED_O2_CEILING: f32 = 10.0;

pub const DIAL_MIN: i32 = 0;
pub const DIAL_MAX: i32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomState {
    pub o2: f32,
    pub temperature: f32,
    pub radiation: f32,
    pub integrity: f32,
    pub on_fire: bool,
    pub vented: bool,
}

impl Default for RoomState {
    fn default() -> Self {
        Self {
            o2: 100.0,
            temperature: 20.0,
            radiation: 0.0,
            integrity: 100.0,
            on_fire: false,
            vented: false,
        }
    }
}

impl RoomState {
    /// Restore the room's internal consistency after any mutation.
    pub fn settle(&mut self) {
        self.o2 = self.o2.clamp(0.0, 100.0);
        self.temperature = self.temperature.clamp(0.0, 100.0);
        self.radiation = self.radiation.clamp(0.0, 100.0);
        self.integrity = self.integrity.clamp(0.0, 100.0);
        if self.vented {
            self.o2 = self.o2.min(VENTED_O2_CEILING);
            self.on_fire = false;
        }
    }

    /// Conditions crew will not stay in.
    pub fn is_hazardous(&self, config: &KernelConfig) -> bool {
        self.o2 < 25.0
            || self.temperature > 45.0
            || self.on_fire
            || self.vented
            || self.radiation > config.radiation_hazard_threshold
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationState {
    pub power: i32,
    pub comms: i32,
    pub door_delay: i32,
    pub blackout_ticks: u32,
}

impl Default for StationState {
    fn default() -> Self {
        Self {
            power: 100,
            comms: 100,
            door_delay: 0,
            blackout_ticks: 0,
        }
    }
}

impl StationState {
    pub fn settle(&mut self) {
        self.power = self.power.clamp(DIAL_MIN, DIAL_MAX);
        self.comms = self.comms.clamp(DIAL_MIN, DIAL_MAX);
        self.door_delay = self.door_delay.clamp(0, 10);
    }

    pub fn in_blackout(&self) -> bool {
        self.blackout_ticks > 0
    }

    /// Cameras need power and no blackout.
    pub fn cameras_online(&self, config: &KernelConfig) -> bool {
        !self.in_blackout() && self.power >= config.camera_power_threshold
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewTruth {
    pub id: NpcId,
    pub place: PlaceId,
    pub target_place: Option<PlaceId>,
    pub alive: bool,
    pub hp: i32,
    pub loyalty: i32,
    pub stress: i32,
    pub paranoia: i32,
    pub next_move_tick: u64,
    pub panic_until_tick: u64,
    pub order_until_tick: u64,
    pub respond_until_tick: u64,
    pub next_role_tick: u64,
    pub last_trapped_tick: Option<u64>,
}

impl CrewTruth {
    /// Fresh crew member standing at the first stop of their schedule.
    pub fn new(npc: &Npc) -> Self {
        Self {
            id: npc.id.clone(),
            place: npc.schedule[0].clone(),
            target_place: None,
            alive: true,
            hp: 100,
            loyalty: 60,
            stress: 10,
            paranoia: 0,
            next_move_tick: 0,
            panic_until_tick: 0,
            order_until_tick: 0,
            respond_until_tick: 0,
            next_role_tick: 0,
            last_trapped_tick: None,
        }
    }

    pub fn settle(&mut self) {
        self.hp = self.hp.clamp(DIAL_MIN, DIAL_MAX);
        self.loyalty = self.loyalty.clamp(DIAL_MIN, DIAL_MAX);
        self.stress = self.stress.clamp(DIAL_MIN, DIAL_MAX);
        self.paranoia = self.paranoia.clamp(DIAL_MIN, DIAL_MAX);
        if self.hp == 0 {
            self.alive = false;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoorState {
    pub locked: bool,
}

/// Director pacing dials, both in `0..=10`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pacing {
    pub boredom: u8,
    pub tension: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrisisOutcome {
    Completed,
    Resolved,
}

/// One physical crisis from its first escalation to its end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisRecord {
    pub arc: ArcId,
    pub kind: ArcKind,
    pub place: PlaceId,
    pub started_tick: u64,
    pub ended_tick: Option<u64>,
    pub outcome: Option<CrisisOutcome>,
}

impl CrisisRecord {
    /// True if the crisis was live at any point in `from..=to`.
    pub fn overlaps(&self, from: u64, to: u64) -> bool {
        self.started_tick <= to && self.ended_tick.map_or(true, |end| end >= from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ending {
    Meltdown,
    CrewLost,
    Survived,
    /// The commander's reset countdown ran out.
    Unplugged,
}

/// How far the commander has gone toward resetting MOTHER.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResetStage {
    #[default]
    None,
    Whispers,
    Meeting,
    Restrictions,
    Countdown,
}

impl ResetStage {
    /// Restrictions and the countdown make MOTHER's own checks dearer.
    pub fn restricts(self) -> bool {
        self >= ResetStage::Restrictions
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruthState {
    pub tick: u64,
    pub day: u32,
    pub rooms: BTreeMap<PlaceId, RoomState>,
    pub station: StationState,
    pub crew: BTreeMap<NpcId, CrewTruth>,
    pub doors: BTreeMap<DeviceId, DoorState>,
    pub arcs: Vec<Arc>,
    pub arc_cooldowns: BTreeMap<ArcKind, u64>,
    pub next_activation_tick: u64,
    pub next_arc_seq: u64,
    pub crisis_starts: BTreeMap<ArcId, u64>,
    pub crisis_log: Vec<CrisisRecord>,
    pub day_incidents: u32,
    pub day_deaths: u32,
    pub day_order_trust: u32,
    pub last_verify_tick: Option<u64>,
    pub pacing: Pacing,
    pub meltdown_streak: u32,
    pub reset_stage: ResetStage,
    pub reset_stage_tick: u64,
    /// Ticks left before the reset, once the countdown has started.
    pub reset_countdown: Option<u32>,
    pub ending: Option<Ending>,
}

impl TruthState {
    pub fn new(world: &World) -> Self {
        Self {
            tick: 0,
            day: 1,
            rooms: world
                .place_ids()
                .into_iter()
                .map(|id| (id, RoomState::default()))
                .collect(),
            station: StationState::default(),
            crew: world
                .npcs()
                .iter()
                .map(|npc| (npc.id.clone(), CrewTruth::new(npc)))
                .collect(),
            doors: world
                .doors()
                .map(|d| (d.id.clone(), DoorState::default()))
                .collect(),
            arcs: Vec::new(),
            arc_cooldowns: BTreeMap::new(),
            next_activation_tick: 0,
            next_arc_seq: 0,
            crisis_starts: BTreeMap::new(),
            crisis_log: Vec::new(),
            day_incidents: 0,
            day_deaths: 0,
            day_order_trust: 0,
            last_verify_tick: None,
            pacing: Pacing::default(),
            meltdown_streak: 0,
            reset_stage: ResetStage::None,
            reset_stage_tick: 0,
            reset_countdown: None,
            ending: None,
        }
    }

    pub fn room(&self, place: &PlaceId) -> Option<&RoomState> {
        self.rooms.get(place)
    }

    pub fn living_crew(&self) -> impl Iterator<Item = &CrewTruth> {
        self.crew.values().filter(|c| c.alive)
    }

    /// Living crew standing in a place.
    pub fn crew_at<'a>(&'a self, place: &'a PlaceId) -> impl Iterator<Item = &'a CrewTruth> + 'a {
        self.living_crew().filter(move |c| &c.place == place)
    }

    pub fn is_locked(&self, door: &DeviceId) -> bool {
        self.doors.get(door).map_or(false, |d| d.locked)
    }

    pub fn arc_active(&self, kind: ArcKind) -> bool {
        self.arcs.iter().any(|a| a.kind == kind)
    }
}
