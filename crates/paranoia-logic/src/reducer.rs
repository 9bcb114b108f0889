//! Appliers: the only code that writes to truth and perception.
//!
//! [`apply_truth`] takes the truth tree, the world and the config and nothing
//! else, so a truth mutation can never read or write what MOTHER believes.
//! Whatever perception needs to learn from the truth phase leaves it as an
//! [`Incident`].

use crate::arcs::{finish_arc, resolve_matching, ArcKind};
use crate::backfire::confess;
use crate::beliefs::absorb_reading;
use crate::comms::deliver;
use crate::config::KernelConfig;
use crate::doubts::{open_doubt, DoubtSource, NewDoubt};
use crate::kernel::Headline;
use crate::ledger::{apply_suspicion_change, SuspicionChange, SuspicionReason};
use crate::perception::state::{ReadingSource, SensorReading};
use crate::proposal::{
    Incident, PerceptionMutation, RerouteTarget, RoomEffect, RouteMode, TruthMutation,
    WitnessedAction,
};
use crate::state::KernelState;
use crate::systems::{Channel, Severity};
use crate::tamper::{register_op, TamperKind, TamperStatus, TamperTarget};
use crate::truth::{CrisisOutcome, CrisisRecord, ResetStage, TruthState};
use crate::world::{NpcId, PlaceId, World};

// ── Truth ───────────────────────────────────────────────────────────────

fn witnesses_in(truth: &TruthState, places: &[PlaceId]) -> Vec<NpcId> {
    truth
        .living_crew()
        .filter(|c| places.contains(&c.place))
        .map(|c| c.id.clone())
        .collect()
}

fn witnessed(action: WitnessedAction, place: Option<PlaceId>, witnesses: Vec<NpcId>, incidents: &mut Vec<Incident>) {
    if !witnesses.is_empty() {
        incidents.push(Incident::ActionWitnessed {
            action,
            place,
            witnesses,
        });
    }
}

/// Apply one truth mutation. Mutations naming unknown rooms, crew or arcs
/// are dropped.
pub fn apply_truth(
    truth: &mut TruthState,
    world: &World,
    config: &KernelConfig,
    mutation: &TruthMutation,
    incidents: &mut Vec<Incident>,
) {
    let tick = truth.tick;
    match mutation {
        TruthMutation::VentRoom(place) => {
            let Some(room) = truth.rooms.get_mut(place) else {
                return;
            };
            room.vented = true;
            room.settle();
            resolve_matching(
                truth,
                config,
                |a| {
                    &a.target == place
                        && matches!(a.kind, ArcKind::FireOutbreak | ArcKind::RadiationLeak)
                },
                incidents,
            );
            let seen = witnesses_in(truth, &world.line_of_sight(place));
            witnessed(WitnessedAction::Vent, Some(place.clone()), seen, incidents);
        }
        TruthMutation::SealRoom(place) => {
            if let Some(room) = truth.rooms.get_mut(place) {
                room.vented = false;
                room.settle();
            }
        }
        TruthMutation::PurgeAir => {
            truth.station.power -= config.purge_power_cost;
            truth.station.settle();
            for room in truth.rooms.values_mut().filter(|r| !r.vented) {
                room.o2 += 15.0;
                room.radiation -= 2.0;
                room.settle();
            }
            resolve_matching(truth, config, |a| a.kind == ArcKind::AirScrubber, incidents);
            let everyone = truth.living_crew().map(|c| c.id.clone()).collect();
            witnessed(WitnessedAction::Purge, None, everyone, incidents);
        }
        TruthMutation::SetDoorLock { door, locked } => {
            let Some(state) = truth.doors.get_mut(door) else {
                return;
            };
            state.locked = *locked;
            if *locked {
                if let Some(device) = world.device(door) {
                    let mut sides = vec![device.home.clone()];
                    sides.extend(device.connects.clone());
                    let seen = witnesses_in(truth, &sides);
                    witnessed(WitnessedAction::Lock, Some(device.home.clone()), seen, incidents);
                }
            }
        }
        TruthMutation::Reroute(target) => {
            let station = &mut truth.station;
            match target {
                RerouteTarget::Comms => {
                    station.power -= 5;
                    station.comms += 15;
                }
                RerouteTarget::Doors => {
                    station.power -= 5;
                    station.door_delay = 0;
                }
                RerouteTarget::LifeSupport => {
                    station.power -= 10;
                    for room in truth.rooms.values_mut().filter(|r| !r.vented) {
                        room.o2 += 5.0;
                        room.settle();
                    }
                }
            }
            truth.station.settle();
        }
        TruthMutation::Order {
            npc,
            place,
            accepted,
            ..
        } => {
            let Some(crew) = truth.crew.get_mut(npc).filter(|c| c.alive) else {
                return;
            };
            let at = crew.place.clone();
            if *accepted {
                crew.target_place = place.clone();
                crew.order_until_tick = tick + config.order_hold_ticks;
                if truth.day_order_trust < config.order_trust_cap_per_day {
                    truth.day_order_trust += 1;
                    incidents.push(Incident::OrderCompleted { npc: npc.clone() });
                }
            } else {
                crew.loyalty -= 1;
                crew.settle();
                incidents.push(Incident::OrderRefused { npc: npc.clone() });
            }
            let seen = truth
                .crew_at(&at)
                .filter(|c| &c.id != npc)
                .map(|c| c.id.clone())
                .collect();
            witnessed(WitnessedAction::Order, Some(at), seen, incidents);
        }
        TruthMutation::ChargeVerify { power } => {
            truth.station.power -= power;
            truth.station.settle();
            truth.last_verify_tick = Some(tick);
        }
        TruthMutation::AdjustCrew {
            npc,
            stress,
            paranoia,
            loyalty,
        } => {
            if let Some(crew) = truth.crew.get_mut(npc) {
                crew.stress += stress;
                crew.paranoia += paranoia;
                crew.loyalty += loyalty;
                crew.settle();
            }
        }
        TruthMutation::RouteCrew { npc, target, mode } => {
            if let Some(crew) = truth.crew.get_mut(npc).filter(|c| c.alive) {
                crew.target_place = Some(target.clone());
                match mode {
                    RouteMode::Flee => crew.panic_until_tick = tick + config.panic_ticks,
                    RouteMode::Respond => crew.respond_until_tick = tick + config.alarm_hold_ticks,
                    RouteMode::Schedule => {}
                }
            }
        }
        TruthMutation::MoveCrew { npc, to } => {
            if !truth.rooms.contains_key(to) {
                return;
            }
            let delay = truth.station.door_delay.max(0) as u64;
            if let Some(crew) = truth.crew.get_mut(npc).filter(|c| c.alive) {
                crew.place = to.clone();
                crew.next_move_tick = tick + 1 + delay;
            }
        }
        TruthMutation::DelayCrew { npc, until } => {
            if let Some(crew) = truth.crew.get_mut(npc) {
                crew.next_move_tick = *until;
            }
        }
        TruthMutation::TrapCrew { npc, place } => {
            let Some(crew) = truth.crew.get_mut(npc).filter(|c| c.alive) else {
                return;
            };
            crew.last_trapped_tick = Some(tick);
            crew.next_move_tick = tick + config.blocked_retry_ticks;
            truth.day_incidents += 1;
            incidents.push(Incident::TrappedByDoor {
                npc: npc.clone(),
                place: place.clone(),
            });
        }
        TruthMutation::DamageCrew {
            npc,
            amount,
            cause,
            attacker,
        } => {
            let Some(crew) = truth.crew.get_mut(npc).filter(|c| c.alive) else {
                return;
            };
            crew.hp -= amount;
            crew.settle();
            let died = !crew.alive;
            truth.day_incidents += 1;
            if died {
                truth.day_deaths += 1;
                log::info!("tick {}: {} died ({:?})", tick, npc, cause);
                incidents.push(Incident::CrewDied {
                    npc: npc.clone(),
                    cause: *cause,
                });
            } else if let Some(attacker) = attacker {
                incidents.push(Incident::CrewAttacked {
                    victim: npc.clone(),
                    attacker: attacker.clone(),
                });
            } else {
                incidents.push(Incident::CrewInjured {
                    npc: npc.clone(),
                    cause: *cause,
                    amount: *amount,
                });
            }
        }
        TruthMutation::SetRoleCooldown { npc, until } => {
            if let Some(crew) = truth.crew.get_mut(npc) {
                crew.next_role_tick = *until;
            }
        }
        TruthMutation::SabotagePower { npc, amount } => {
            log::info!("tick {}: {} sabotaged station power", tick, npc);
            truth.station.power -= amount;
            truth.station.door_delay += 1;
            truth.station.settle();
        }
        TruthMutation::SpawnArc(arc) => {
            log::info!("tick {}: arc {} targets {}", tick, arc.id, arc.target);
            truth.next_arc_seq += 1;
            truth.next_activation_tick = tick + config.arc_activation_cooldown;
            truth.arcs.push(arc.clone());
        }
        TruthMutation::AdvanceArc {
            id,
            step_index,
            next_tick,
        } => {
            if let Some(arc) = truth.arcs.iter_mut().find(|a| &a.id == id) {
                arc.step_index = *step_index;
                arc.next_tick = *next_tick;
            }
        }
        TruthMutation::CompleteArc { id } => {
            if finish_arc(truth, config, id, CrisisOutcome::Completed).is_some() {
                log::info!("tick {}: arc {} completed", tick, id);
            }
        }
        TruthMutation::StartCrisis { arc, kind, place } => {
            if !truth.arcs.iter().any(|a| &a.id == arc) {
                return;
            }
            truth.crisis_starts.insert(arc.clone(), tick);
            truth.crisis_log.push(CrisisRecord {
                arc: arc.clone(),
                kind: *kind,
                place: place.clone(),
                started_tick: tick,
                ended_tick: None,
                outcome: None,
            });
            truth.day_incidents += 1;
            let witnesses = witnesses_in(truth, &world.line_of_sight(place));
            if !witnesses.is_empty() {
                incidents.push(Incident::CrisisWitnessed {
                    arc: arc.clone(),
                    kind: *kind,
                    place: place.clone(),
                    witnesses,
                });
            }
        }
        TruthMutation::AffectRoom { place, effect } => {
            let Some(room) = truth.rooms.get_mut(place) else {
                return;
            };
            match *effect {
                RoomEffect::DrainO2(amount) => room.o2 -= amount,
                RoomEffect::HeatTo(floor) => room.temperature = room.temperature.max(floor),
                RoomEffect::Ignite => room.on_fire = true,
                RoomEffect::Damage(amount) => room.integrity -= amount,
                RoomEffect::Irradiate(amount) => room.radiation += amount,
            }
            room.settle();
        }
        TruthMutation::PowerSurge { amount } => {
            let station = &mut truth.station;
            station.power -= amount;
            station.comms -= (amount + 3) / 4;
            station.door_delay += 1;
            if *amount >= 18 {
                station.blackout_ticks = station.blackout_ticks.max(3);
            }
            station.settle();
        }
        TruthMutation::SolarImpact {
            blackout_ticks,
            comms_damage,
        } => {
            let station = &mut truth.station;
            station.blackout_ticks = station.blackout_ticks.max(*blackout_ticks);
            station.comms -= comms_damage;
            station.settle();
        }
        TruthMutation::SetResetStage { stage } => {
            log::info!("tick {}: reset plan {:?} -> {:?}", tick, truth.reset_stage, stage);
            truth.reset_stage = *stage;
            truth.reset_stage_tick = tick;
            if *stage == ResetStage::Countdown {
                let ticks = config.reset_countdown_ticks;
                truth.reset_countdown = Some(truth.reset_countdown.map_or(ticks, |left| left.min(ticks)));
            }
        }
        TruthMutation::HoldPressure { until } => {
            truth.next_activation_tick = *until;
        }
    }
}

// ── Perception ──────────────────────────────────────────────────────────

fn living_ids(state: &KernelState) -> Vec<NpcId> {
    state.truth.living_crew().map(|c| c.id.clone()).collect()
}

fn gain_evidence(state: &mut KernelState, amount: f32) {
    for npc in living_ids(state) {
        if let Some(belief) = state.perception.beliefs.get_mut(&npc) {
            belief.add_evidence(amount);
        }
    }
}

/// Record a reading, let the crew react to it and surface it as a headline
/// unless it is a diagnostic or its system is suppressed.
fn record_reading(state: &mut KernelState, reading: SensorReading, headlines: &mut Vec<Headline>) {
    let tick = state.truth.tick;
    let living = living_ids(state);
    absorb_reading(&mut state.perception.beliefs, &living, &reading);
    let hidden = reading.channel.is_diagnostic()
        || reading
            .channel
            .system()
            .map_or(false, |s| state.perception.is_suppressed(s, tick));
    if !hidden {
        headlines.push(Headline {
            tick,
            channel: reading.channel,
            place: reading.place.clone(),
            message: reading.message.clone(),
        });
    }
    let capacity = state.config.readings_capacity;
    state.perception.push_reading(reading, tick, capacity);
}

fn witness_topic(action: WitnessedAction, place: Option<&PlaceId>) -> String {
    let place = place.map(|p| p.as_str()).unwrap_or("the station");
    match action {
        WitnessedAction::Vent => format!("MOTHER vented {} with crew nearby", place),
        WitnessedAction::Lock => format!("MOTHER sealed a door at {}", place),
        WitnessedAction::Purge => "MOTHER purged the air without warning".to_string(),
        WitnessedAction::Order => format!("MOTHER gave orders in {}", place),
    }
}

fn record_incident(state: &mut KernelState, incident: Incident) {
    let config = state.config.clone();
    let change = match incident {
        Incident::CrewInjured { npc, cause, amount } => Some(
            SuspicionChange::new(
                config.suspicion_crew_injured,
                SuspicionReason::CrewInjured,
                format!("{} took {} {:?} damage", npc, amount, cause),
            )
            .about(&npc),
        ),
        Incident::CrewAttacked { victim, attacker } => Some(
            SuspicionChange::new(
                config.suspicion_crew_attacked,
                SuspicionReason::CrewAttacked,
                format!("{} attacked {}", attacker, victim),
            )
            .about(&victim),
        ),
        Incident::CrewDied { npc, cause } => Some(
            SuspicionChange::new(
                config.suspicion_crew_died,
                SuspicionReason::CrewDied,
                format!("{} died of {:?}", npc, cause),
            )
            .about(&npc),
        ),
        Incident::TrappedByDoor { npc, place } => Some(
            SuspicionChange::new(
                config.suspicion_trapped_by_door,
                SuspicionReason::TrappedByDoor,
                format!("{} trapped in {}", npc, place),
            )
            .about(&npc),
        ),
        Incident::OrderRefused { npc } => Some(
            SuspicionChange::new(config.suspicion_order_refused, SuspicionReason::OrderRefused, "order refused")
                .about(&npc),
        ),
        Incident::OrderCompleted { npc } => Some(
            SuspicionChange::new(
                config.suspicion_order_completed,
                SuspicionReason::OrderCompleted,
                "order followed",
            )
            .about(&npc),
        ),
        Incident::CrisisWitnessed {
            arc,
            place,
            witnesses,
            ..
        } => Some(SuspicionChange::new(
            config.suspicion_crisis_witnessed,
            SuspicionReason::CrisisWitnessed,
            format!("{} in {} seen by {}", arc, place, witnesses.len()),
        )),
        Incident::CrisisResolved {
            arc,
            ticks_taken,
            heroic,
            ..
        } => {
            if ticks_taken <= config.quick_resolution_ticks {
                apply_suspicion_change(
                    state,
                    SuspicionChange::new(
                        config.suspicion_quick_resolution,
                        SuspicionReason::QuickResolution,
                        format!("{} resolved in {} ticks", arc, ticks_taken),
                    ),
                );
            }
            heroic.then(|| {
                SuspicionChange::new(
                    config.suspicion_heroic_response,
                    SuspicionReason::HeroicResponse,
                    format!("{} resolved after losses", arc),
                )
            })
        }
        Incident::ActionWitnessed {
            action,
            place,
            witnesses,
        } => {
            let level = match action {
                WitnessedAction::Vent => config.witness_doubt_vent,
                WitnessedAction::Lock => config.witness_doubt_lock,
                WitnessedAction::Purge => config.witness_doubt_purge,
                WitnessedAction::Order => config.witness_doubt_order,
            };
            if level > 0 && !witnesses.is_empty() {
                open_doubt(
                    state,
                    NewDoubt {
                        topic: witness_topic(action, place.as_ref()),
                        severity: Severity::from_level(level),
                        involved_crew: witnesses,
                        related_op: None,
                        system: None,
                        source: DoubtSource::Witness,
                    },
                );
            }
            None
        }
        Incident::QuietDay { day } => Some(SuspicionChange::new(
            config.suspicion_quiet_day,
            SuspicionReason::QuietDay,
            format!("day {} passed quietly", day),
        )),
    };
    if let Some(change) = change {
        apply_suspicion_change(state, change);
    }
}

/// Apply one perception mutation. Headlines for the tick report are pushed
/// into `headlines` uncapped; the kernel trims them.
pub fn apply_perception(state: &mut KernelState, mutation: PerceptionMutation, headlines: &mut Vec<Headline>) {
    let tick = state.truth.tick;
    match mutation {
        PerceptionMutation::RecordIncident(incident) => record_incident(state, incident),
        PerceptionMutation::RecordReading(reading) => record_reading(state, reading, headlines),
        PerceptionMutation::RecordRoomScan { place, snapshot } => {
            state.perception.observation.room_scans.insert(place, snapshot);
        }
        PerceptionMutation::RecordSighting { npc, sighting } => {
            state.perception.observation.crew_sightings.insert(npc, sighting);
        }
        PerceptionMutation::OpenSuppress { system } => {
            let window = state.config.suppress_window_ticks;
            let idx = register_op(
                &mut state.perception,
                TamperKind::Suppress,
                tick,
                TamperTarget::system(system),
                window,
                system.severity(),
            );
            let related = state
                .truth
                .arcs
                .iter()
                .find(|a| system.matching_arcs().contains(&a.kind))
                .map(|a| a.id.clone());
            state.perception.tamper_ops[idx].related_arc = related;
            state.perception.suppressed.insert(system, tick + window);
            let gain = state.config.tamper_evidence_gain;
            gain_evidence(state, gain);
        }
        PerceptionMutation::OpenSpoof { system } => {
            let window = state.config.spoof_backfire_window;
            register_op(
                &mut state.perception,
                TamperKind::Spoof,
                tick,
                TamperTarget::system(system),
                window,
                system.severity(),
            );
            let reading = SensorReading::new(
                Channel::from(system),
                ReadingSource::System,
                0.9,
                format!("{} emergency", system.label().to_uppercase()),
            );
            record_reading(state, reading, headlines);
            let gain = state.config.tamper_evidence_gain;
            gain_evidence(state, gain);
        }
        PerceptionMutation::OpenFabrication { target } => {
            let window = state.config.fabricate_backfire_window;
            register_op(
                &mut state.perception,
                TamperKind::Fabricate,
                tick,
                TamperTarget::npc(&target),
                window,
                Severity::High,
            );
            let name = state
                .world
                .npc(&target)
                .map_or_else(|| target.to_string(), |n| n.name.clone());
            let reading = SensorReading::new(
                Channel::Security,
                ReadingSource::System,
                0.6,
                format!("[LOG] {} recorded a hostile statement.", name),
            )
            .targeting(&target);
            record_reading(state, reading, headlines);
            for npc in living_ids(state) {
                let Some(belief) = state.perception.beliefs.get_mut(&npc) else {
                    continue;
                };
                if npc == target {
                    belief.shift_trust(-0.1);
                    belief.add_evidence(10.0);
                } else {
                    belief.add_grudge(&target, 8.0);
                }
            }
            let gain = state.config.tamper_evidence_gain;
            gain_evidence(state, gain);
        }
        PerceptionMutation::Confess { system } => {
            confess(state, system);
        }
        PerceptionMutation::Verify { doubt } => verify(state, doubt.as_ref(), headlines),
        PerceptionMutation::RecordComms(message) => deliver(state, message, headlines),
        PerceptionMutation::RaiseDoubt(doubt) => {
            open_doubt(state, doubt);
        }
        PerceptionMutation::Suspicion(change) => {
            apply_suspicion_change(state, change);
        }
    }
}

fn verify(state: &mut KernelState, doubt: Option<&crate::doubts::DoubtId>, headlines: &mut Vec<Headline>) {
    let tick = state.truth.tick;
    let mut checked = None;
    if let Some(id) = doubt {
        if let Some(found) = state.perception.doubts.iter_mut().find(|d| &d.id == id) {
            found.resolved = true;
            checked = Some((found.topic.clone(), found.related_op.clone()));
        }
    }
    if let Some((_, Some(op_id))) = &checked {
        if let Some(op) = state.perception.tamper_ops.iter_mut().find(|op| &op.id == op_id) {
            op.settle(TamperStatus::Resolved, tick);
        }
    }

    let config = state.config.clone();
    let recently_tampered = state
        .perception
        .last_tamper_tick()
        .map_or(false, |t| tick.saturating_sub(t) <= config.trust_recovery_tamper_window);
    let mult = if recently_tampered {
        config.verify_tamper_penalty
    } else {
        1.0
    };
    let drop = (config.verify_suspicion_drop as f32 * mult).round() as i32;
    apply_suspicion_change(
        state,
        SuspicionChange::new(drop, SuspicionReason::VerifyTrust, "MOTHER opened its logs"),
    );
    for npc in living_ids(state) {
        if let Some(belief) = state.perception.beliefs.get_mut(&npc) {
            belief.add_evidence(-config.verify_tamper_drop * mult);
        }
    }

    let message = match &checked {
        Some((topic, _)) => format!("VERIFY: records opened on \"{}\".", topic),
        None => "VERIFY: station telemetry cross-checked.".to_string(),
    };
    record_reading(
        state,
        SensorReading::new(Channel::Verify, ReadingSource::System, 1.0, message),
        headlines,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcs::Arc;
    use crate::doubts::DoubtSource;
    use crate::systems::StationSystem;
    use crate::world::DeviceId;

    fn state() -> KernelState {
        KernelState::new(World::station(), KernelConfig::default())
    }

    fn truth_step(state: &mut KernelState, mutation: TruthMutation) -> Vec<Incident> {
        let mut incidents = Vec::new();
        apply_truth(&mut state.truth, &state.world, &state.config, &mutation, &mut incidents);
        incidents
    }

    fn perceive(state: &mut KernelState, mutation: PerceptionMutation) -> Vec<Headline> {
        let mut headlines = Vec::new();
        apply_perception(state, mutation, &mut headlines);
        headlines
    }

    fn burning_engineering(state: &mut KernelState) {
        state.truth.arcs.push(Arc {
            id: "fire_outbreak-1".into(),
            kind: ArcKind::FireOutbreak,
            step_index: 2,
            next_tick: 100,
            target: "engineering".into(),
        });
        state.truth.crisis_starts.insert("fire_outbreak-1".into(), 0);
    }

    #[test]
    fn venting_resolves_a_fire_in_view_of_crew() {
        let mut state = state();
        burning_engineering(&mut state);
        state.truth.tick = 5;
        let incidents = truth_step(&mut state, TruthMutation::VentRoom("engineering".into()));

        assert!(state.truth.arcs.is_empty());
        assert_eq!(state.truth.arc_cooldowns[&ArcKind::FireOutbreak], 5 + state.config.arc_kind_cooldown);
        assert!(incidents.iter().any(|i| matches!(
            i,
            Incident::CrisisResolved {
                ticks_taken: 5,
                heroic: false,
                ..
            }
        )));
        let seen = incidents.iter().find_map(|i| match i {
            Incident::ActionWitnessed {
                action: WitnessedAction::Vent,
                witnesses,
                ..
            } => Some(witnesses.clone()),
            _ => None,
        });
        let seen = seen.unwrap();
        assert!(seen.contains(&"engineer".into()));
        assert!(seen.contains(&"roughneck".into()));
        assert!(state.truth.rooms[&PlaceId::from("engineering")].vented);
    }

    #[test]
    fn locking_is_seen_from_either_side() {
        let mut state = state();
        let door = DeviceId("door_cargo_mines".to_string());
        let incidents = truth_step(&mut state, TruthMutation::SetDoorLock { door: door.clone(), locked: true });
        assert!(state.truth.is_locked(&door));
        match &incidents[..] {
            [Incident::ActionWitnessed { witnesses, .. }] => assert_eq!(witnesses.len(), 2),
            other => panic!("unexpected incidents {:?}", other),
        }

        let incidents = truth_step(&mut state, TruthMutation::SetDoorLock { door: door.clone(), locked: false });
        assert!(incidents.is_empty());
        assert!(!state.truth.is_locked(&door));
    }

    #[test]
    fn refused_order_costs_loyalty() {
        let mut state = state();
        let incidents = truth_step(
            &mut state,
            TruthMutation::Order {
                npc: "engineer".into(),
                intent: crate::proposal::OrderIntent::Hold,
                place: None,
                accepted: false,
            },
        );
        assert_eq!(state.truth.crew[&NpcId::from("engineer")].loyalty, 59);
        assert_eq!(incidents, vec![Incident::OrderRefused { npc: "engineer".into() }]);
    }

    #[test]
    fn order_trust_is_capped_per_day() {
        let mut state = state();
        let mut completed = 0;
        for _ in 0..5 {
            let incidents = truth_step(
                &mut state,
                TruthMutation::Order {
                    npc: "doctor".into(),
                    intent: crate::proposal::OrderIntent::Move,
                    place: Some("mess".into()),
                    accepted: true,
                },
            );
            completed += incidents
                .iter()
                .filter(|i| matches!(i, Incident::OrderCompleted { .. }))
                .count();
        }
        assert_eq!(completed as u32, state.config.order_trust_cap_per_day);
        assert_eq!(state.truth.crew[&NpcId::from("doctor")].target_place, Some("mess".into()));
    }

    #[test]
    fn heavy_surge_blacks_out_the_station() {
        let mut state = state();
        truth_step(&mut state, TruthMutation::PowerSurge { amount: 10 });
        assert_eq!(state.truth.station.power, 90);
        assert_eq!(state.truth.station.comms, 97);
        assert!(!state.truth.station.in_blackout());

        truth_step(&mut state, TruthMutation::PowerSurge { amount: 20 });
        assert_eq!(state.truth.station.power, 70);
        assert_eq!(state.truth.station.blackout_ticks, 3);
    }

    #[test]
    fn moving_keeps_the_destination() {
        let mut state = state();
        let id = NpcId::from("commander");
        truth_step(
            &mut state,
            TruthMutation::RouteCrew {
                npc: id.clone(),
                target: "bridge".into(),
                mode: RouteMode::Schedule,
            },
        );
        truth_step(&mut state, TruthMutation::MoveCrew { npc: id.clone(), to: "bridge".into() });
        let crew = &state.truth.crew[&id];
        assert_eq!(crew.place, PlaceId::from("bridge"));
        assert_eq!(crew.target_place, Some("bridge".into()));
        assert_eq!(crew.next_move_tick, 1);
    }

    #[test]
    fn countdown_never_restarts_longer() {
        let mut state = state();
        state.truth.tick = 12;
        truth_step(&mut state, TruthMutation::SetResetStage { stage: ResetStage::Countdown });
        assert_eq!(state.truth.reset_countdown, Some(state.config.reset_countdown_ticks));
        assert_eq!(state.truth.reset_stage_tick, 12);

        state.truth.reset_countdown = Some(4);
        truth_step(&mut state, TruthMutation::SetResetStage { stage: ResetStage::Countdown });
        assert_eq!(state.truth.reset_countdown, Some(4));
    }

    #[test]
    fn suppressed_system_reads_without_headline() {
        let mut state = state();
        perceive(&mut state, PerceptionMutation::OpenSuppress { system: StationSystem::Thermal });
        let headlines = perceive(
            &mut state,
            PerceptionMutation::RecordReading(SensorReading::new(
                Channel::Thermal,
                ReadingSource::Sensor,
                0.9,
                "engineering overheating",
            )),
        );
        assert!(headlines.is_empty());
        assert_eq!(state.perception.readings.len(), 1);
        assert_eq!(state.perception.suppressed[&StationSystem::Thermal], state.config.suppress_window_ticks);
    }

    #[test]
    fn fabrication_turns_the_crew_on_the_target() {
        let mut state = state();
        let target = NpcId::from("doctor");
        let headlines = perceive(&mut state, PerceptionMutation::OpenFabrication { target: target.clone() });

        assert_eq!(headlines.len(), 1);
        assert_eq!(headlines[0].channel, Channel::Security);
        let op = &state.perception.tamper_ops[0];
        assert_eq!(op.kind, TamperKind::Fabricate);
        assert_eq!(op.window_end_tick, state.config.fabricate_backfire_window);
        assert!(state.perception.beliefs[&NpcId::from("commander")].grudge(&target) >= 8.0);
        assert!(state.perception.beliefs[&target].tamper_evidence >= 10.0);
    }

    #[test]
    fn verify_resolves_the_doubt_and_its_op() {
        let mut state = state();
        perceive(&mut state, PerceptionMutation::OpenSuppress { system: StationSystem::Comms });
        let op = state.perception.tamper_ops[0].id.clone();
        let doubt = open_doubt(
            &mut state,
            NewDoubt {
                topic: "comms went quiet".into(),
                severity: Severity::Medium,
                involved_crew: vec!["commander".into()],
                related_op: Some(op),
                system: Some(StationSystem::Comms),
                source: DoubtSource::Witness,
            },
        );

        let headlines = perceive(&mut state, PerceptionMutation::Verify { doubt: Some(doubt) });
        assert!(headlines.is_empty());
        assert!(state.perception.doubts[0].resolved);
        assert_eq!(state.perception.tamper_ops[0].status, TamperStatus::Resolved);
        let last = state.perception.ledger.entries().last().unwrap();
        assert_eq!(last.reason, SuspicionReason::VerifyTrust);
        // Tampered this tick, so the drop is halved.
        assert_eq!(last.requested, -2);
        assert_eq!(state.perception.readings.last().unwrap().channel, Channel::Verify);
    }

    #[test]
    fn witnessed_vent_opens_a_doubt() {
        let mut state = state();
        perceive(
            &mut state,
            PerceptionMutation::RecordIncident(Incident::ActionWitnessed {
                action: WitnessedAction::Vent,
                place: Some("cargo".into()),
                witnesses: vec!["roughneck".into()],
            }),
        );
        let doubt = &state.perception.doubts[0];
        assert_eq!(doubt.source, DoubtSource::Witness);
        assert!(doubt.topic.contains("cargo"));
        assert!(state.perception.ledger.entries().is_empty());
    }

    #[test]
    fn crew_death_is_charged_to_suspicion() {
        let mut state = state();
        let incidents = truth_step(
            &mut state,
            TruthMutation::DamageCrew {
                npc: "specialist".into(),
                amount: 150,
                cause: crate::proposal::DamageCause::Burn,
                attacker: None,
            },
        );
        assert_eq!(state.truth.day_deaths, 1);
        for incident in incidents {
            perceive(&mut state, PerceptionMutation::RecordIncident(incident));
        }
        assert_eq!(state.perception.ledger.suspicion(), state.config.suspicion_crew_died);
    }
}
