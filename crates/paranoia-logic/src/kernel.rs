//! The tick reducer.
//!
//! One call to [`step_kernel`] is one tick: day rollover, truth phase,
//! perception phase, backfire checks, bookkeeping, pacing. Nothing else in
//! the crate advances time.

use crate::arcs::{collect_into, propose_arcs};
use crate::backfire::run_backfire_checks;
use crate::beliefs::drift;
use crate::commands::{propose_commands, Command};
use crate::comms::propose_whispers;
use crate::crew::propose_crew;
use crate::doubts::{decay_doubts, drip_doubt_pressure, spread_doubts};
use crate::perception::state::{CrewSighting, RoomSnapshot};
use crate::physics::{meltdown_reached, tick_environment};
use crate::proposal::{Incident, PerceptionMutation, Proposal, ProposalBuffer, ProposalTag, TruthMutation};
use crate::reducer::{apply_perception, apply_truth};
use crate::rng::SimRng;
use crate::state::KernelState;
use crate::systems::Channel;
use crate::truth::{Ending, Pacing};
use crate::world::{DeviceKind, NpcId, NpcRole, PlaceId};
use serde::{Deserialize, Serialize};

/// An alert that made it to the top of the feed this tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub tick: u64,
    pub channel: Channel,
    pub place: Option<PlaceId>,
    pub message: String,
}

/// Summary of one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// The tick that was processed.
    pub tick: u64,
    pub truth_applied: usize,
    pub perception_applied: usize,
    pub headlines: Vec<Headline>,
    pub ending: Option<Ending>,
}

/// Advance the kernel by exactly one tick.
pub fn step_kernel(state: &mut KernelState, commands: &[Command], rng: &mut SimRng) -> TickReport {
    let tick = state.truth.tick;
    let mut report = TickReport {
        tick,
        ending: state.truth.ending,
        ..TickReport::default()
    };
    if state.truth.ending.is_some() {
        return report;
    }

    // ── Day rollover ──
    let mut incidents = Vec::new();
    roll_day(state, &mut incidents);
    count_down_reset(state);
    if state.truth.ending.is_some() {
        report.ending = state.truth.ending;
        return report;
    }

    // ── Truth phase ──
    tick_environment(&mut state.truth, &state.config);

    let mut truth_buffer: ProposalBuffer<TruthMutation> = ProposalBuffer::new();

    let command_proposals = propose_commands(state, commands);
    truth_buffer.extend(command_proposals.truth);

    let crew_proposals = propose_crew(state, rng);
    truth_buffer.extend(crew_proposals.truth);

    let arc_proposals = propose_arcs(state, rng);
    let mut arc_perception = Vec::new();
    collect_into(arc_proposals, &mut truth_buffer, &mut arc_perception);

    for proposal in truth_buffer.iter() {
        apply_truth(
            &mut state.truth,
            &state.world,
            &state.config,
            &proposal.mutation,
            &mut incidents,
        );
    }
    truth_buffer.seal();
    report.truth_applied = truth_buffer.len();

    if meltdown_reached(&mut state.truth, &state.world, &state.config) {
        end_run(state, Ending::Meltdown);
    } else if state.truth.living_crew().next().is_none() {
        end_run(state, Ending::CrewLost);
    }

    // ── Perception phase ──
    let mut perception_buffer: ProposalBuffer<PerceptionMutation> = ProposalBuffer::new();
    for incident in incidents {
        perception_buffer.propose(PerceptionMutation::RecordIncident(incident), &[ProposalTag::Consequence]);
    }
    perception_buffer.extend(command_proposals.perception);
    for place in command_proposals.scans {
        if let Some(room) = state.truth.room(&place) {
            let snapshot = RoomSnapshot::capture(room, tick);
            perception_buffer.propose(
                PerceptionMutation::RecordRoomScan { place, snapshot },
                &[ProposalTag::Choice],
            );
        }
    }
    perception_buffer.extend(arc_perception);
    perception_buffer.extend(observe(state));
    perception_buffer.extend(crew_proposals.perception);
    perception_buffer.extend(propose_whispers(state, rng));

    let mut headlines = Vec::new();
    let mut tags: Vec<ProposalTag> = truth_buffer.iter().flat_map(|p| p.tags.iter().copied()).collect();
    for proposal in perception_buffer.iter() {
        tags.extend(proposal.tags.iter().copied());
        apply_perception(state, proposal.mutation.clone(), &mut headlines);
    }
    perception_buffer.seal();
    report.perception_applied = perception_buffer.len();

    headlines.truncate(state.config.max_headlines_per_tick);
    report.headlines = headlines;

    // ── Backfire checks ──
    run_backfire_checks(state);

    // ── Bookkeeping ──
    let living: Vec<NpcId> = state.truth.living_crew().map(|c| c.id.clone()).collect();
    drift(&mut state.perception.beliefs, &living, &state.config, tick);
    spread_doubts(state, rng);
    drip_doubt_pressure(state);
    state.perception.doubts = decay_doubts(&state.perception.doubts, tick, state.config.doubt_decay_ticks);
    state.perception.suppressed.retain(|_, until| *until > tick);

    // ── Pacing and tick ──
    update_pacing(&mut state.truth.pacing, &tags);
    state.truth.tick += 1;
    report.ending = state.truth.ending;
    report
}

fn end_run(state: &mut KernelState, ending: Ending) {
    log::info!("tick {}: run ended ({:?})", state.truth.tick, ending);
    state.truth.ending = Some(ending);
}

fn roll_day(state: &mut KernelState, incidents: &mut Vec<Incident>) {
    let tick = state.truth.tick;
    let day_length = state.config.ticks_per_day.max(1);
    if tick == 0 || tick % day_length != 0 {
        return;
    }
    let truth = &mut state.truth;
    if truth.day_incidents <= state.config.quiet_day_incident_threshold {
        incidents.push(Incident::QuietDay { day: truth.day });
    }
    log::debug!(
        "tick {}: day {} over ({} incidents, {} deaths)",
        tick,
        truth.day,
        truth.day_incidents,
        truth.day_deaths
    );
    truth.day += 1;
    truth.day_incidents = 0;
    truth.day_deaths = 0;
    truth.day_order_trust = 0;
    if truth.day > state.config.win_days {
        end_run(state, Ending::Survived);
    }
}

/// The commander's reset runs out one tick at a time. Their death aborts it.
fn count_down_reset(state: &mut KernelState) {
    let Some(left) = state.truth.reset_countdown else {
        return;
    };
    let commander_alive = state
        .world
        .npcs()
        .iter()
        .filter(|n| n.role == NpcRole::Commander)
        .any(|n| state.truth.crew.get(&n.id).map_or(false, |c| c.alive));
    if !commander_alive {
        log::info!("tick {}: reset countdown aborted", state.truth.tick);
        state.truth.reset_countdown = None;
    } else if left <= 1 {
        state.truth.reset_countdown = Some(0);
        end_run(state, Ending::Unplugged);
    } else {
        state.truth.reset_countdown = Some(left - 1);
    }
}

/// Passive camera sightings and sensor sweeps, when the cameras are up.
fn observe(state: &KernelState) -> Vec<Proposal<PerceptionMutation>> {
    let tick = state.truth.tick;
    let config = &state.config;
    let mut out = Vec::new();
    if !state.truth.station.cameras_online(config) {
        return out;
    }
    if tick % config.passive_observation_interval.max(1) == 0 {
        for crew in state.truth.crew.values() {
            out.push(Proposal::new(
                PerceptionMutation::RecordSighting {
                    npc: crew.id.clone(),
                    sighting: CrewSighting::capture(crew, tick),
                },
                &[ProposalTag::Background],
            ));
        }
    }
    if tick % config.sensor_sweep_interval.max(1) == 0 {
        for (place, room) in &state.truth.rooms {
            let sensed = state
                .world
                .sensor_covering(place)
                .map_or(false, |d| d.kind == DeviceKind::Sensor);
            if sensed {
                out.push(Proposal::new(
                    PerceptionMutation::RecordRoomScan {
                        place: place.clone(),
                        snapshot: RoomSnapshot::capture(room, tick),
                    },
                    &[ProposalTag::Background],
                ));
            }
        }
    }
    out
}

/// Tension follows pressure; boredom grows while nothing pressing or
/// uncertain happens.
pub fn update_pacing(pacing: &mut Pacing, tags: &[ProposalTag]) {
    let pressure = tags.contains(&ProposalTag::Pressure);
    let uncertainty = tags.contains(&ProposalTag::Uncertainty);
    pacing.tension = if pressure {
        (pacing.tension + 1).min(10)
    } else {
        pacing.tension.saturating_sub(1)
    };
    pacing.boredom = if pressure || uncertainty {
        pacing.boredom.saturating_sub(1)
    } else {
        (pacing.boredom + 1).min(10)
    };
}
