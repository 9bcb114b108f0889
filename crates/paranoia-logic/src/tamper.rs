//! Tamper operations: MOTHER's record of every manipulation it performed.
//!
//! An op opens as [`TamperStatus::Pending`] and leaves that state exactly once,
//! through [`TamperOp::settle`]. Ops are never deleted.

use crate::arcs::ArcId;
use crate::perception::state::PerceptionState;
use crate::systems::{Severity, StationSystem};
use crate::world::{NpcId, PlaceId};
use serde::{Deserialize, Serialize};

string_id!(
    /// Identifier of a tamper operation.
    OpId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TamperKind {
    Suppress,
    Spoof,
    Fabricate,
}

impl TamperKind {
    pub fn label(self) -> &'static str {
        match self {
            TamperKind::Suppress => "suppress",
            TamperKind::Spoof => "spoof",
            TamperKind::Fabricate => "fabricate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TamperStatus {
    Pending,
    Resolved,
    Backfired,
    Confessed,
}

/// What an op targets. At least one of the three is always set, including
/// after deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TargetParts")]
pub struct TamperTarget {
    system: Option<StationSystem>,
    place: Option<PlaceId>,
    npc: Option<NpcId>,
}

/// Unchecked wire form of [`TamperTarget`].
#[derive(Deserialize)]
struct TargetParts {
    system: Option<StationSystem>,
    place: Option<PlaceId>,
    npc: Option<NpcId>,
}

impl TryFrom<TargetParts> for TamperTarget {
    type Error = String;

    fn try_from(parts: TargetParts) -> Result<Self, Self::Error> {
        if parts.system.is_none() && parts.place.is_none() && parts.npc.is_none() {
            return Err("tamper target needs a system, place or npc".to_string());
        }
        Ok(Self {
            system: parts.system,
            place: parts.place,
            npc: parts.npc,
        })
    }
}

impl TamperTarget {
    /// # Panics
    ///
    /// Panics if all three parts are `None`. Every op must point somewhere.
    pub fn new(system: Option<StationSystem>, place: Option<PlaceId>, npc: Option<NpcId>) -> Self {
        assert!(
            system.is_some() || place.is_some() || npc.is_some(),
            "tamper target needs a system, place or npc"
        );
        Self { system, place, npc }
    }

    pub fn system(system: StationSystem) -> Self {
        Self::new(Some(system), None, None)
    }

    pub fn npc(npc: &NpcId) -> Self {
        Self::new(None, None, Some(npc.clone()))
    }

    pub fn system_id(&self) -> Option<StationSystem> {
        self.system
    }

    pub fn place_id(&self) -> Option<&PlaceId> {
        self.place.as_ref()
    }

    pub fn npc_id(&self) -> Option<&NpcId> {
        self.npc.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TamperOp {
    pub id: OpId,
    pub kind: TamperKind,
    pub tick: u64,
    pub target: TamperTarget,
    pub window_end_tick: u64,
    pub status: TamperStatus,
    pub severity: Severity,
    /// Crew who acted on the op or exposed it.
    pub crew_affected: Vec<NpcId>,
    pub backfire_tick: Option<u64>,
    pub confessed_tick: Option<u64>,
    pub related_arc: Option<ArcId>,
}

impl TamperOp {
    pub fn open(
        id: OpId,
        kind: TamperKind,
        tick: u64,
        target: TamperTarget,
        window: u64,
        severity: Severity,
    ) -> Self {
        Self {
            id,
            kind,
            tick,
            target,
            window_end_tick: tick + window,
            status: TamperStatus::Pending,
            severity,
            crew_affected: Vec::new(),
            backfire_tick: None,
            confessed_tick: None,
            related_arc: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TamperStatus::Pending
    }

    /// Move a pending op to a final status. Returns `false` and changes nothing
    /// if the op already left Pending or `to` is Pending.
    pub fn settle(&mut self, to: TamperStatus, tick: u64) -> bool {
        if !self.is_pending() || to == TamperStatus::Pending {
            return false;
        }
        self.status = to;
        match to {
            TamperStatus::Backfired => self.backfire_tick = Some(tick),
            TamperStatus::Confessed => self.confessed_tick = Some(tick),
            TamperStatus::Resolved | TamperStatus::Pending => {}
        }
        true
    }

    pub fn note_crew(&mut self, npc: &NpcId) {
        if !self.crew_affected.contains(npc) {
            self.crew_affected.push(npc.clone());
        }
    }
}

/// Open a new pending op and return its index in `perception.tamper_ops`.
pub fn register_op(
    perception: &mut PerceptionState,
    kind: TamperKind,
    tick: u64,
    target: TamperTarget,
    window: u64,
    severity: Severity,
) -> usize {
    perception.next_op_seq += 1;
    let id = OpId(format!("{}-{}-{}", kind.label(), tick, perception.next_op_seq));
    log::debug!("tick {}: opened {}", tick, id);
    perception
        .tamper_ops
        .push(TamperOp::open(id, kind, tick, target, window, severity));
    perception.tamper_ops.len() - 1
}
