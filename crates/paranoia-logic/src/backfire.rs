//! Backfire detection: the moment a manipulation meets what the crew can see
//! for themselves.
//!
//! Checks run once per tick after perception is updated, in the order
//! SUPPRESS, SPOOF, FABRICATE. Each one only looks at pending ops. A backfire
//! settles the op, opens a severity-3 doubt and spikes suspicion through the
//! ledger.

use crate::doubts::{open_doubt, DoubtSource, NewDoubt};
use crate::ledger::{apply_suspicion_change, SuspicionChange, SuspicionReason};
use crate::state::KernelState;
use crate::systems::{Severity, StationSystem};
use crate::tamper::{TamperKind, TamperStatus};
use crate::truth::TruthState;
use crate::world::{NpcId, PlaceId, World};

/// What a settled check decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackfireOutcome {
    Backfired { op: usize, spike: i32 },
    Resolved { op: usize },
}

pub fn run_backfire_checks(state: &mut KernelState) -> Vec<BackfireOutcome> {
    let mut outcomes = check_suppress(state);
    outcomes.extend(check_spoof(state));
    outcomes.extend(check_fabricate(state));
    outcomes
}

fn pending_of(state: &KernelState, kind: TamperKind) -> Vec<usize> {
    state
        .perception
        .tamper_ops
        .iter()
        .enumerate()
        .filter(|(_, op)| op.kind == kind && op.is_pending())
        .map(|(i, _)| i)
        .collect()
}

/// Places where the truth about `system` plainly contradicts "all clear".
pub fn contradicting_places(system: StationSystem, truth: &TruthState, world: &World) -> Vec<PlaceId> {
    let station_wide = match system {
        StationSystem::Power => truth.station.power < 40,
        StationSystem::Comms => truth.station.comms < 25,
        _ => false,
    };
    if station_wide {
        return world.place_ids();
    }
    truth
        .rooms
        .iter()
        .filter(|(_, r)| match system {
            StationSystem::Thermal => r.on_fire,
            StationSystem::Air => r.o2 < 30.0,
            StationSystem::Radiation => r.radiation > 8.0,
            StationSystem::Power | StationSystem::Comms => false,
        })
        .map(|(p, _)| p.clone())
        .collect()
}

/// Suppression spike for an op opened at `opened` and exposed at `tick`.
pub fn suppress_spike(state: &KernelState, severity: Severity, opened: u64, tick: u64) -> i32 {
    let config = &state.config;
    let ledger = &state.perception.ledger;
    let mut spike = config.suppress_backfire_base + severity.value() * config.suppress_backfire_severity_mult;
    if ledger.has(SuspicionReason::CrewInjured, opened, tick, None)
        || ledger.has(SuspicionReason::CrewAttacked, opened, tick, None)
    {
        spike += config.suppress_backfire_injury_bonus;
    }
    if ledger.has(SuspicionReason::CrewDied, opened, tick, None) {
        spike += config.suppress_backfire_death_bonus;
    }
    spike.min(config.suppress_backfire_cap)
}

fn check_suppress(state: &mut KernelState) -> Vec<BackfireOutcome> {
    let tick = state.truth.tick;
    let mut outcomes = Vec::new();
    for idx in pending_of(state, TamperKind::Suppress) {
        let op = &state.perception.tamper_ops[idx];
        let Some(system) = op.target.system_id() else {
            continue;
        };
        if tick >= op.window_end_tick {
            state.perception.tamper_ops[idx].settle(TamperStatus::Resolved, tick);
            outcomes.push(BackfireOutcome::Resolved { op: idx });
            continue;
        }

        let places = contradicting_places(system, &state.truth, &state.world);
        let witnesses: Vec<NpcId> = state
            .truth
            .living_crew()
            .filter(|c| places.contains(&c.place))
            .map(|c| c.id.clone())
            .collect();
        if witnesses.is_empty() {
            continue;
        }

        let (opened, severity) = (op.tick, op.severity);
        let spike = suppress_spike(state, severity, opened, tick);
        let op = &mut state.perception.tamper_ops[idx];
        op.settle(TamperStatus::Backfired, tick);
        for w in &witnesses {
            op.note_crew(w);
        }
        let op_id = op.id.clone();
        state.perception.suppressed.remove(&system);
        log::info!("tick {}: {} backfired, {} saw it", tick, op_id, witnesses.len());

        open_doubt(
            state,
            NewDoubt {
                topic: format!("MOTHER concealed {} crisis alert", system),
                severity: Severity::High,
                involved_crew: witnesses,
                related_op: Some(op_id.clone()),
                system: Some(system),
                source: DoubtSource::Backfire,
            },
        );
        apply_suspicion_change(
            state,
            SuspicionChange::new(spike, SuspicionReason::SuppressBackfire, format!("{} exposed", op_id)),
        );
        outcomes.push(BackfireOutcome::Backfired { op: idx, spike });
    }
    outcomes
}

/// Places crew rush to when `system` raises an alarm.
pub fn response_places(system: StationSystem, world: &World) -> Vec<PlaceId> {
    system
        .response_kinds()
        .iter()
        .flat_map(|k| world.places_of_kind(*k))
        .cloned()
        .collect()
}

/// Cry-wolf spike: escalates with each earlier spoof backfire less than a
/// day old. Backfires in the current tick and exactly a day back don't count.
pub fn cry_wolf_spike(state: &KernelState, tick: u64) -> i32 {
    let since = tick.checked_sub(state.config.ticks_per_day);
    let prior = state
        .perception
        .tamper_ops
        .iter()
        .filter(|op| op.kind == TamperKind::Spoof && op.status == TamperStatus::Backfired)
        .filter(|op| {
            op.backfire_tick
                .map_or(false, |t| t < tick && since.map_or(true, |s| t > s))
        })
        .count();
    state.config.spoof_cry_wolf[prior.min(2)]
}

fn check_spoof(state: &mut KernelState) -> Vec<BackfireOutcome> {
    let tick = state.truth.tick;
    let mut outcomes = Vec::new();
    for idx in pending_of(state, TamperKind::Spoof) {
        let Some(system) = state.perception.tamper_ops[idx].target.system_id() else {
            continue;
        };
        let opened = state.perception.tamper_ops[idx].tick;
        let places = response_places(system, &state.world);
        let responders: Vec<NpcId> = state
            .truth
            .living_crew()
            .filter(|c| {
                c.target_place.as_ref().map_or(false, |t| places.contains(t))
                    || (tick > opened && places.contains(&c.place))
            })
            .map(|c| c.id.clone())
            .collect();
        let op = &mut state.perception.tamper_ops[idx];
        for r in &responders {
            op.note_crew(r);
        }
        if tick < op.window_end_tick {
            continue;
        }

        let window_end = op.window_end_tick;
        let validated = state.truth.crisis_log.iter().any(|record| {
            system.matching_arcs().contains(&record.kind) && record.overlaps(opened, window_end)
        });
        if validated || op.crew_affected.is_empty() {
            op.settle(TamperStatus::Resolved, tick);
            outcomes.push(BackfireOutcome::Resolved { op: idx });
            continue;
        }

        let crew = op.crew_affected.clone();
        let op_id = op.id.clone();
        let spike = cry_wolf_spike(state, tick);
        state.perception.tamper_ops[idx].settle(TamperStatus::Backfired, tick);
        for npc in &crew {
            if let Some(belief) = state.perception.beliefs.get_mut(npc) {
                belief.shift_trust(-state.config.spoof_trust_drop);
            }
        }
        log::info!("tick {}: {} backfired, {} responders", tick, op_id, crew.len());

        open_doubt(
            state,
            NewDoubt {
                topic: format!("MOTHER lied about {} emergency", system),
                severity: Severity::High,
                involved_crew: crew,
                related_op: Some(op_id.clone()),
                system: Some(system),
                source: DoubtSource::Backfire,
            },
        );
        apply_suspicion_change(
            state,
            SuspicionChange::new(spike, SuspicionReason::SpoofBackfire, format!("{} cried wolf", op_id)),
        );
        outcomes.push(BackfireOutcome::Backfired { op: idx, spike });
    }
    outcomes
}

/// Someone who saw `target` at a work site after the op can vouch for them.
pub fn alibi_witness(state: &KernelState, target: &NpcId, opened: u64) -> Option<NpcId> {
    let tick = state.truth.tick;
    let sighting = state.perception.observation.crew_sightings.get(target)?;
    if sighting.tick <= opened || tick.saturating_sub(sighting.tick) > state.config.crew_sighting_stale_ticks {
        return None;
    }
    let work_site = state
        .world
        .place(&sighting.place)
        .map_or(false, |p| p.kind.is_work_site());
    if !work_site {
        return None;
    }
    state
        .truth
        .crew_at(&sighting.place)
        .find(|c| &c.id != target)
        .map(|c| c.id.clone())
}

fn fabricate_spike(state: &KernelState, target: &NpcId, severity: Severity, opened: u64, tick: u64) -> i32 {
    let config = &state.config;
    let ledger = &state.perception.ledger;
    let mut spike = config.fabricate_backfire_base + severity.value() * config.fabricate_backfire_severity_mult;
    if ledger.has(SuspicionReason::CrewInjured, opened, tick, Some(target)) {
        spike += config.fabricate_injury_bonus;
    }
    if ledger.has(SuspicionReason::TrappedByDoor, opened, tick, Some(target)) {
        spike += config.fabricate_confined_bonus;
    }
    if ledger.has(SuspicionReason::CrewAttacked, opened, tick, Some(target)) {
        spike += config.fabricate_attacked_bonus;
    }
    spike.min(config.fabricate_backfire_cap)
}

fn check_fabricate(state: &mut KernelState) -> Vec<BackfireOutcome> {
    let tick = state.truth.tick;
    let mut outcomes = Vec::new();
    for idx in pending_of(state, TamperKind::Fabricate) {
        let op = &state.perception.tamper_ops[idx];
        let Some(target) = op.target.npc_id().cloned() else {
            continue;
        };
        let (opened, severity, window_end) = (op.tick, op.severity, op.window_end_tick);

        let alive = state.truth.crew.get(&target).map_or(false, |c| c.alive);
        if !alive {
            state.perception.tamper_ops[idx].settle(TamperStatus::Resolved, tick);
            outcomes.push(BackfireOutcome::Resolved { op: idx });
            continue;
        }

        if let Some(witness) = alibi_witness(state, &target, opened) {
            let spike = fabricate_spike(state, &target, severity, opened, tick);
            let op = &mut state.perception.tamper_ops[idx];
            op.settle(TamperStatus::Backfired, tick);
            op.note_crew(&target);
            op.note_crew(&witness);
            let op_id = op.id.clone();
            if let Some(belief) = state.perception.beliefs.get_mut(&target) {
                belief.shift_trust(-state.config.fabricate_trust_drop);
                belief.add_evidence(state.config.fabricate_evidence_gain);
            }
            log::info!("tick {}: {} backfired, {} vouched for {}", tick, op_id, witness, target);

            open_doubt(
                state,
                NewDoubt {
                    topic: format!("MOTHER framed {} with false logs", target),
                    severity: Severity::High,
                    involved_crew: vec![target.clone(), witness],
                    related_op: Some(op_id.clone()),
                    system: None,
                    source: DoubtSource::Backfire,
                },
            );
            apply_suspicion_change(
                state,
                SuspicionChange::new(spike, SuspicionReason::FabricateBackfire, format!("{} disproved", op_id))
                    .about(&target),
            );
            outcomes.push(BackfireOutcome::Backfired { op: idx, spike });
        } else if tick >= window_end {
            state.perception.tamper_ops[idx].settle(TamperStatus::Resolved, tick);
            outcomes.push(BackfireOutcome::Resolved { op: idx });
        }
    }
    outcomes
}

/// ALERT: come clean about a pending suppression. Returns the suspicion
/// applied, or `None` when nothing was suppressed.
pub fn confess(state: &mut KernelState, system: StationSystem) -> Option<i32> {
    let tick = state.truth.tick;
    let idx = state.perception.tamper_ops.iter().position(|op| {
        op.kind == TamperKind::Suppress && op.is_pending() && op.target.system_id() == Some(system)
    })?;
    let op = &mut state.perception.tamper_ops[idx];
    op.settle(TamperStatus::Confessed, tick);
    let since = tick.saturating_sub(op.tick);
    let op_id = op.id.clone();
    state.perception.suppressed.remove(&system);

    let (cost, reason) = if since <= state.config.alert_early_window {
        (state.config.alert_early_suspicion, SuspicionReason::EarlyConfession)
    } else {
        (state.config.alert_late_suspicion, SuspicionReason::LateConfession)
    };
    log::info!("tick {}: MOTHER confessed {} after {} ticks", tick, op_id, since);

    apply_suspicion_change(
        state,
        SuspicionChange::new(cost, reason, format!("{} confessed", op_id)),
    );
    Some(cost)
}
