//! Proposals: intent values systems emit instead of touching state.
//!
//! Each tick the kernel gathers truth proposals, applies them, then gathers
//! perception proposals and applies those. A [`ProposalBuffer`] is sealed
//! once it has been applied and refuses further pushes.

use crate::arcs::{Arc, ArcId, ArcKind};
use crate::comms::CommsMessage;
use crate::doubts::{DoubtId, NewDoubt};
use crate::ledger::SuspicionChange;
use crate::perception::state::{CrewSighting, RoomSnapshot, SensorReading};
use crate::systems::StationSystem;
use crate::truth::ResetStage;
use crate::world::{DeviceId, NpcId, PlaceId};
use serde::{Deserialize, Serialize};

/// Narrative pacing label carried by every proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalTag {
    Pressure,
    Uncertainty,
    Choice,
    Reaction,
    Telegraph,
    Consequence,
    Background,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Proposal<M> {
    pub mutation: M,
    pub tags: &'static [ProposalTag],
}

impl<M> Proposal<M> {
    pub fn new(mutation: M, tags: &'static [ProposalTag]) -> Self {
        Self { mutation, tags }
    }
}

/// Ordered proposal list for one channel.
///
/// Once [`seal`](ProposalBuffer::seal)ed the buffer is read-only.
#[derive(Debug, Clone)]
pub struct ProposalBuffer<M> {
    items: Vec<Proposal<M>>,
    sealed: bool,
}

impl<M> Default for ProposalBuffer<M> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            sealed: false,
        }
    }
}

impl<M> ProposalBuffer<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if the buffer is sealed. Pushing after application is a kernel
    /// ordering bug, not a recoverable condition.
    pub fn push(&mut self, proposal: Proposal<M>) {
        assert!(!self.sealed, "proposal pushed into a sealed buffer");
        self.items.push(proposal);
    }

    pub fn propose(&mut self, mutation: M, tags: &'static [ProposalTag]) {
        self.push(Proposal::new(mutation, tags));
    }

    pub fn extend(&mut self, proposals: impl IntoIterator<Item = Proposal<M>>) {
        for p in proposals {
            self.push(p);
        }
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal<M>> {
        self.items.iter()
    }
}

// ── Truth mutations ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderIntent {
    Move,
    Report,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RerouteTarget {
    Comms,
    Doors,
    LifeSupport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteMode {
    Schedule,
    Flee,
    Respond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageCause {
    Suffocation,
    Burn,
    Radiation,
    Assault,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RoomEffect {
    DrainO2(f32),
    HeatTo(f32),
    Ignite,
    Damage(f32),
    Irradiate(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TruthMutation {
    VentRoom(PlaceId),
    SealRoom(PlaceId),
    PurgeAir,
    SetDoorLock { door: DeviceId, locked: bool },
    Reroute(RerouteTarget),
    Order {
        npc: NpcId,
        intent: OrderIntent,
        place: Option<PlaceId>,
        accepted: bool,
    },
    ChargeVerify { power: i32 },
    AdjustCrew {
        npc: NpcId,
        stress: i32,
        paranoia: i32,
        loyalty: i32,
    },
    RouteCrew {
        npc: NpcId,
        target: PlaceId,
        mode: RouteMode,
    },
    MoveCrew { npc: NpcId, to: PlaceId },
    DelayCrew { npc: NpcId, until: u64 },
    TrapCrew { npc: NpcId, place: PlaceId },
    DamageCrew {
        npc: NpcId,
        amount: i32,
        cause: DamageCause,
        attacker: Option<NpcId>,
    },
    SetRoleCooldown { npc: NpcId, until: u64 },
    SabotagePower { npc: NpcId, amount: i32 },
    SpawnArc(Arc),
    AdvanceArc {
        id: ArcId,
        step_index: u32,
        next_tick: u64,
    },
    CompleteArc { id: ArcId },
    StartCrisis {
        arc: ArcId,
        kind: ArcKind,
        place: PlaceId,
    },
    AffectRoom { place: PlaceId, effect: RoomEffect },
    PowerSurge { amount: i32 },
    SolarImpact { blackout_ticks: u32, comms_damage: i32 },
    /// Commander moves the reset plan to a new stage.
    SetResetStage { stage: ResetStage },
    /// Pressure went out through crew talk rather than an arc.
    HoldPressure { until: u64 },
}

// ── Incidents ───────────────────────────────────────────────────────────

/// Persona actions crew can see happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WitnessedAction {
    Vent,
    Lock,
    Purge,
    Order,
}

/// Something the truth phase produced that perception must account for.
#[derive(Debug, Clone, PartialEq)]
pub enum Incident {
    CrewInjured {
        npc: NpcId,
        cause: DamageCause,
        amount: i32,
    },
    CrewAttacked { victim: NpcId, attacker: NpcId },
    CrewDied { npc: NpcId, cause: DamageCause },
    TrappedByDoor { npc: NpcId, place: PlaceId },
    OrderRefused { npc: NpcId },
    OrderCompleted { npc: NpcId },
    CrisisWitnessed {
        arc: ArcId,
        kind: ArcKind,
        place: PlaceId,
        witnesses: Vec<NpcId>,
    },
    CrisisResolved {
        arc: ArcId,
        kind: ArcKind,
        ticks_taken: u64,
        heroic: bool,
    },
    ActionWitnessed {
        action: WitnessedAction,
        place: Option<PlaceId>,
        witnesses: Vec<NpcId>,
    },
    QuietDay { day: u32 },
}

// ── Perception mutations ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PerceptionMutation {
    RecordIncident(Incident),
    RecordReading(SensorReading),
    RecordRoomScan { place: PlaceId, snapshot: RoomSnapshot },
    RecordSighting { npc: NpcId, sighting: CrewSighting },
    OpenSuppress { system: StationSystem },
    OpenSpoof { system: StationSystem },
    OpenFabrication { target: NpcId },
    Confess { system: StationSystem },
    Verify { doubt: Option<DoubtId> },
    RecordComms(CommsMessage),
    RaiseDoubt(NewDoubt),
    Suspicion(SuspicionChange),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_keeps_proposal_order() {
        let mut buffer: ProposalBuffer<u8> = ProposalBuffer::new();
        buffer.propose(3, &[ProposalTag::Background]);
        buffer.propose(1, &[ProposalTag::Pressure]);
        let order: Vec<u8> = buffer.iter().map(|p| p.mutation).collect();
        assert_eq!(order, vec![3, 1]);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    #[should_panic(expected = "sealed buffer")]
    fn sealed_buffer_rejects_push() {
        let mut buffer: ProposalBuffer<u8> = ProposalBuffer::new();
        buffer.seal();
        buffer.propose(1, &[]);
    }

    #[test]
    fn seal_keeps_contents() {
        let mut buffer: ProposalBuffer<u8> = ProposalBuffer::new();
        buffer.propose(1, &[ProposalTag::Choice]);
        buffer.seal();
        assert!(buffer.is_sealed());
        assert_eq!(buffer.iter().count(), 1);
    }
}
