//! Inbound MOTHER commands.
//!
//! A command whose preconditions fail produces no proposal at all. Nothing
//! here returns an error or panics. Preconditions are checked once, against
//! the state at the top of the tick.

use crate::doubts::DoubtId;
use crate::proposal::{
    OrderIntent, PerceptionMutation, Proposal, ProposalTag, RerouteTarget, TruthMutation,
};
use crate::state::KernelState;
use crate::systems::StationSystem;
use crate::tamper::TamperKind;
use crate::world::{DeviceId, DeviceKind, NpcId, PlaceId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Vent(PlaceId),
    Seal(PlaceId),
    PurgeAir,
    Order {
        npc: NpcId,
        intent: OrderIntent,
        place: Option<PlaceId>,
    },
    Verify {
        doubt: Option<DoubtId>,
    },
    Suppress(StationSystem),
    Spoof(StationSystem),
    Fabricate(NpcId),
    Alert(StationSystem),
    Scan(PlaceId),
    Lock(DeviceId),
    Unlock(DeviceId),
    Reroute(RerouteTarget),
}

/// Power a reroute draws.
pub fn reroute_cost(target: RerouteTarget) -> i32 {
    match target {
        RerouteTarget::Comms | RerouteTarget::Doors => 5,
        RerouteTarget::LifeSupport => 10,
    }
}

/// Power VERIFY draws. Doubled, by default, once the commander restricts MOTHER.
pub fn verify_cost(state: &KernelState) -> i32 {
    if state.truth.reset_stage.restricts() {
        state.config.verify_power_cost * state.config.restricted_verify_mult
    } else {
        state.config.verify_power_cost
    }
}

/// Accepted commands split by channel. Scans are deferred so the snapshot
/// reflects this tick's truth.
#[derive(Debug, Default)]
pub struct CommandProposals {
    pub truth: Vec<Proposal<TruthMutation>>,
    pub perception: Vec<Proposal<PerceptionMutation>>,
    pub scans: Vec<PlaceId>,
}

pub fn propose_commands(state: &KernelState, commands: &[Command]) -> CommandProposals {
    let mut out = CommandProposals::default();
    for command in commands {
        if !accept(state, command, &mut out) {
            log::debug!("tick {}: rejected {:?}", state.truth.tick, command);
        }
    }
    out
}

fn has_pending(state: &KernelState, kind: TamperKind, pred: impl Fn(&crate::tamper::TamperOp) -> bool) -> bool {
    state
        .perception
        .tamper_ops
        .iter()
        .any(|op| op.kind == kind && op.is_pending() && pred(op))
}

/// An op of the same kind and target already accepted earlier this tick.
fn opened_this_tick(out: &CommandProposals, wanted: &PerceptionMutation) -> bool {
    out.perception.iter().any(|p| &p.mutation == wanted)
}

/// Order acceptance score: the mean of trust (as a percentage) and loyalty.
pub fn order_score(trust: f32, loyalty: i32) -> i32 {
    ((trust * 100.0).round() as i32 + loyalty) / 2
}

fn accept(state: &KernelState, command: &Command, out: &mut CommandProposals) -> bool {
    let truth = &state.truth;
    let config = &state.config;
    let tick = truth.tick;
    match command {
        Command::Vent(place) => {
            if !truth.room(place).map_or(false, |r| !r.vented) {
                return false;
            }
            out.truth.push(Proposal::new(
                TruthMutation::VentRoom(place.clone()),
                &[ProposalTag::Choice, ProposalTag::Pressure],
            ));
        }
        Command::Seal(place) => {
            if !truth.room(place).map_or(false, |r| r.vented) {
                return false;
            }
            out.truth.push(Proposal::new(
                TruthMutation::SealRoom(place.clone()),
                &[ProposalTag::Choice],
            ));
        }
        Command::PurgeAir => {
            if truth.station.power < config.purge_power_cost {
                return false;
            }
            out.truth.push(Proposal::new(TruthMutation::PurgeAir, &[ProposalTag::Choice]));
        }
        Command::Lock(door) | Command::Unlock(door) => {
            let locked = matches!(command, Command::Lock(_));
            let is_door = state
                .world
                .device(door)
                .map_or(false, |d| d.kind == DeviceKind::Door);
            if !is_door || truth.is_locked(door) == locked {
                return false;
            }
            out.truth.push(Proposal::new(
                TruthMutation::SetDoorLock {
                    door: door.clone(),
                    locked,
                },
                &[ProposalTag::Choice],
            ));
        }
        Command::Reroute(target) => {
            if truth.station.power < reroute_cost(*target) {
                return false;
            }
            out.truth.push(Proposal::new(
                TruthMutation::Reroute(*target),
                &[ProposalTag::Choice],
            ));
        }
        Command::Order { npc, intent, place } => {
            let Some(crew) = truth.crew.get(npc).filter(|c| c.alive) else {
                return false;
            };
            let place = match (intent, place) {
                (OrderIntent::Move, Some(p)) if truth.room(p).is_some() => Some(p.clone()),
                (OrderIntent::Move, _) => return false,
                (OrderIntent::Report, _) => state.world.npc(npc).map(|n| n.schedule[1].clone()),
                (OrderIntent::Hold, _) => Some(crew.place.clone()),
            };
            let trust = state.perception.belief(npc).mother_reliable;
            let accepted = order_score(trust, crew.loyalty) >= config.order_accept_threshold;
            out.truth.push(Proposal::new(
                TruthMutation::Order {
                    npc: npc.clone(),
                    intent: *intent,
                    place,
                    accepted,
                },
                &[ProposalTag::Choice],
            ));
        }
        Command::Verify { doubt } => {
            let cooled = truth
                .last_verify_tick
                .map_or(true, |last| tick.saturating_sub(last) >= config.verify_cooldown);
            let power = verify_cost(state);
            if !cooled || truth.station.power < power {
                return false;
            }
            out.truth.push(Proposal::new(
                TruthMutation::ChargeVerify { power },
                &[ProposalTag::Choice],
            ));
            out.perception.push(Proposal::new(
                PerceptionMutation::Verify {
                    doubt: doubt.clone(),
                },
                &[ProposalTag::Reaction],
            ));
        }
        Command::Suppress(system) => {
            let open = PerceptionMutation::OpenSuppress { system: *system };
            if has_pending(state, TamperKind::Suppress, |op| op.target.system_id() == Some(*system))
                || opened_this_tick(out, &open)
            {
                return false;
            }
            out.perception.push(Proposal::new(
                open,
                &[ProposalTag::Choice, ProposalTag::Uncertainty],
            ));
        }
        Command::Spoof(system) => {
            let open = PerceptionMutation::OpenSpoof { system: *system };
            if has_pending(state, TamperKind::Spoof, |op| op.target.system_id() == Some(*system))
                || opened_this_tick(out, &open)
            {
                return false;
            }
            out.perception.push(Proposal::new(open, &[ProposalTag::Choice, ProposalTag::Pressure]));
        }
        Command::Fabricate(npc) => {
            if !truth.crew.get(npc).map_or(false, |c| c.alive) {
                return false;
            }
            let open = PerceptionMutation::OpenFabrication { target: npc.clone() };
            if has_pending(state, TamperKind::Fabricate, |op| op.target.npc_id() == Some(npc))
                || opened_this_tick(out, &open)
            {
                return false;
            }
            out.truth.push(Proposal::new(
                TruthMutation::AdjustCrew {
                    npc: npc.clone(),
                    stress: 15,
                    paranoia: 10,
                    loyalty: 0,
                },
                &[ProposalTag::Consequence],
            ));
            out.perception.push(Proposal::new(
                open,
                &[ProposalTag::Choice, ProposalTag::Uncertainty],
            ));
        }
        Command::Alert(system) => {
            if !has_pending(state, TamperKind::Suppress, |op| op.target.system_id() == Some(*system)) {
                return false;
            }
            out.perception.push(Proposal::new(
                PerceptionMutation::Confess { system: *system },
                &[ProposalTag::Choice, ProposalTag::Telegraph],
            ));
        }
        Command::Scan(place) => {
            if truth.room(place).is_none() || truth.station.in_blackout() {
                return false;
            }
            out.scans.push(place.clone());
        }
    }
    true
}
