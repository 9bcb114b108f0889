//! Crew behaviour: where everyone wants to be, how they get there, and what
//! the station does to them along the way.
//!
//! Collection reads truth and perception but only returns proposals. Priority
//! for choosing a destination, highest first:
//!
//! 1. flee a hazardous room for the best shelter
//! 2. keep fleeing while panicked
//! 3. hold an accepted order
//! 4. keep responding to an alarm
//! 5. answer a fresh alarm on a system the role handles
//! 6. follow the daily schedule

use crate::comms::{CommsKind, CommsMessage};
use crate::config::KernelConfig;
use crate::perception::state::{ReadingSource, SensorReading};
use crate::proposal::{
    DamageCause, PerceptionMutation, Proposal, ProposalTag, RouteMode, TruthMutation,
};
use crate::rng::SimRng;
use crate::state::KernelState;
use crate::systems::{Channel, StationSystem};
use crate::truth::{CrewTruth, ResetStage, RoomState};
use crate::world::{Npc, NpcId, NpcRole, PlaceId, PlaceKind};

/// Crew proposals for one tick, split by channel.
#[derive(Debug, Default)]
pub struct CrewProposals {
    pub truth: Vec<Proposal<TruthMutation>>,
    pub perception: Vec<Proposal<PerceptionMutation>>,
}

/// Whether a role drops what it is doing for an alarm on `system`.
pub fn responds_to(role: NpcRole, system: StationSystem) -> bool {
    match role {
        NpcRole::Engineer => matches!(
            system,
            StationSystem::Thermal | StationSystem::Air | StationSystem::Power
        ),
        NpcRole::Doctor => matches!(system, StationSystem::Radiation | StationSystem::Air),
        NpcRole::Commander => matches!(system, StationSystem::Comms | StationSystem::Thermal),
        NpcRole::Roughneck => system == StationSystem::Thermal,
        NpcRole::Specialist => false,
    }
}

pub fn propose_crew(state: &KernelState, rng: &mut SimRng) -> CrewProposals {
    let mut out = CrewProposals::default();
    for npc in state.world.npcs() {
        let Some(crew) = state.truth.crew.get(&npc.id).filter(|c| c.alive) else {
            continue;
        };
        let Some(room) = state.truth.room(&crew.place) else {
            continue;
        };
        propose_damage(state, crew, room, &mut out);
        propose_mood(state, crew, room, &mut out);
        let target = propose_route(state, npc, crew, room, &mut out);
        propose_move(state, crew, room, target, &mut out);
        propose_role_action(state, npc, crew, &mut out);

        if crew.stress >= state.config.hallucination_stress_threshold
            && rng.roll_percent(state.config.hallucination_chance)
        {
            let reading = SensorReading::new(
                Channel::Comms,
                ReadingSource::Crew,
                0.3,
                format!("{} reports movement in the vents.", npc.name),
            )
            .at(&crew.place)
            .hallucinated();
            out.perception.push(Proposal::new(
                PerceptionMutation::RecordReading(reading),
                &[ProposalTag::Uncertainty],
            ));
        }
    }
    out
}

fn propose_damage(state: &KernelState, crew: &CrewTruth, room: &RoomState, out: &mut CrewProposals) {
    let tick = state.truth.tick;
    let config = &state.config;
    let mut hurt = |amount: i32, cause: DamageCause| {
        out.truth.push(Proposal::new(
            TruthMutation::DamageCrew {
                npc: crew.id.clone(),
                amount,
                cause,
                attacker: None,
            },
            &[ProposalTag::Consequence],
        ));
    };
    if room.o2 < 18.0 && tick % 3 == 0 {
        hurt(config.damage_suffocation, DamageCause::Suffocation);
    }
    if room.temperature > 60.0 && tick % 3 == 0 {
        hurt(config.damage_burn, DamageCause::Burn);
    }
    if room.radiation > 12.0 && tick % 6 == 0 {
        hurt(config.damage_radiation, DamageCause::Radiation);
    }
}

/// Stress change from the room the crew member stands in.
pub fn room_stress(room: &RoomState, config: &KernelConfig) -> i32 {
    let mut stress = 0;
    if room.o2 < 30.0 {
        stress += 3;
    }
    if room.temperature > 40.0 {
        stress += 2;
    }
    if room.radiation > 5.0 {
        stress += 2;
    }
    if room.vented {
        stress += 4;
    }
    if room.on_fire {
        stress += 3;
    }
    if stress == 0 && room.is_hazardous(config) {
        stress += 1;
    }
    stress
}

fn propose_mood(state: &KernelState, crew: &CrewTruth, room: &RoomState, out: &mut CrewProposals) {
    let tick = state.truth.tick;
    let config = &state.config;

    let mut stress = room_stress(room, config);
    if stress == 0 && tick % 5 == 0 {
        let alone = state.truth.crew_at(&crew.place).count() <= 1;
        if alone && tick % 10 == 0 {
            stress += 1;
        } else if state.truth.station.in_blackout() {
            stress += 1;
        } else {
            stress -= 1;
        }
    }

    let mut paranoia = 0;
    let mut loyalty = 0;
    if crew.stress > config.stress_paranoia_threshold {
        paranoia += 1;
    } else if crew.stress < 40 && crew.paranoia > 0 && tick % 5 == 0 {
        paranoia -= 1;
    }
    if crew.stress > config.stress_loyalty_threshold && tick % 10 == 0 {
        loyalty -= 1;
    }
    if tick > 0 && tick % config.belief_coupling_interval.max(1) == 0 {
        let (l, p) = state.perception.belief(&crew.id).coupling(config);
        loyalty += l;
        paranoia += p;
    }

    if stress != 0 || paranoia != 0 || loyalty != 0 {
        out.truth.push(Proposal::new(
            TruthMutation::AdjustCrew {
                npc: crew.id.clone(),
                stress,
                paranoia,
                loyalty,
            },
            &[ProposalTag::Background],
        ));
    }
}

/// Best reachable non-hazardous place, by shelter preference then distance.
pub fn find_shelter(state: &KernelState, from: &PlaceId) -> Option<PlaceId> {
    state
        .world
        .places()
        .filter(|p| &p.id != from)
        .filter(|p| {
            state
                .truth
                .room(&p.id)
                .map_or(false, |r| !r.is_hazardous(&state.config))
        })
        .filter_map(|p| {
            let hops = state.world.route(from, &p.id)?.len();
            Some((p.kind.shelter_rank(), hops, p.id.clone()))
        })
        .min()
        .map(|(_, _, id)| id)
}

fn fresh_alarm(state: &KernelState, role: NpcRole) -> Option<StationSystem> {
    let tick = state.truth.tick;
    state
        .perception
        .readings
        .iter()
        .rev()
        .take_while(|r| tick.saturating_sub(r.tick) <= state.config.alarm_response_ticks)
        .filter(|r| r.source == ReadingSource::System && r.confidence >= 0.5 && !r.hallucination)
        .filter_map(|r| r.channel.system())
        .find(|s| responds_to(role, *s))
}

fn propose_route(
    state: &KernelState,
    npc: &Npc,
    crew: &CrewTruth,
    room: &RoomState,
    out: &mut CrewProposals,
) -> Option<PlaceId> {
    let tick = state.truth.tick;
    let current = crew.target_place.clone();

    let (target, mode) = if room.is_hazardous(&state.config) {
        match find_shelter(state, &crew.place) {
            Some(shelter) => (shelter, RouteMode::Flee),
            None => return current,
        }
    } else if tick < crew.panic_until_tick || tick < crew.order_until_tick || tick < crew.respond_until_tick {
        return current;
    } else if let Some(system) = fresh_alarm(state, npc.role) {
        let station = state.world.places_of_kind(system.response_kinds()[0]);
        match station.first() {
            Some(&place) if *place != crew.place => (place.clone(), RouteMode::Respond),
            _ => (npc.schedule[state.config.window_of(tick)].clone(), RouteMode::Schedule),
        }
    } else {
        (npc.schedule[state.config.window_of(tick)].clone(), RouteMode::Schedule)
    };

    if current.as_ref() != Some(&target) {
        out.truth.push(Proposal::new(
            TruthMutation::RouteCrew {
                npc: crew.id.clone(),
                target: target.clone(),
                mode,
            },
            match mode {
                RouteMode::Flee | RouteMode::Respond => &[ProposalTag::Reaction],
                RouteMode::Schedule => &[ProposalTag::Background],
            },
        ));
    }
    Some(target)
}

fn propose_move(
    state: &KernelState,
    crew: &CrewTruth,
    room: &RoomState,
    target: Option<PlaceId>,
    out: &mut CrewProposals,
) {
    let tick = state.truth.tick;
    let config = &state.config;
    let Some(target) = target else {
        return;
    };
    if tick < crew.next_move_tick || target == crew.place {
        return;
    }
    let Some(hop) = state.world.next_hop(&crew.place, &target) else {
        return;
    };

    let here_hazardous = room.is_hazardous(config);
    if state.truth.is_locked(&hop.door) {
        let refractory_over = crew
            .last_trapped_tick
            .map_or(true, |last| tick.saturating_sub(last) >= config.trapped_refractory_ticks);
        if here_hazardous && refractory_over {
            out.truth.push(Proposal::new(
                TruthMutation::TrapCrew {
                    npc: crew.id.clone(),
                    place: crew.place.clone(),
                },
                &[ProposalTag::Pressure, ProposalTag::Consequence],
            ));
        } else {
            out.truth.push(Proposal::new(
                TruthMutation::DelayCrew {
                    npc: crew.id.clone(),
                    until: tick + config.blocked_retry_ticks,
                },
                &[ProposalTag::Background],
            ));
        }
        return;
    }

    let next_hazardous = state
        .truth
        .room(&hop.place)
        .map_or(false, |r| r.is_hazardous(config));
    if next_hazardous && !here_hazardous {
        out.truth.push(Proposal::new(
            TruthMutation::DelayCrew {
                npc: crew.id.clone(),
                until: tick + config.blocked_retry_ticks,
            },
            &[ProposalTag::Background],
        ));
        return;
    }

    out.truth.push(Proposal::new(
        TruthMutation::MoveCrew {
            npc: crew.id.clone(),
            to: hop.place,
        },
        &[ProposalTag::Background],
    ));
}

fn propose_role_action(state: &KernelState, npc: &Npc, crew: &CrewTruth, out: &mut CrewProposals) {
    let tick = state.truth.tick;
    let config = &state.config;
    if tick < crew.next_role_tick {
        return;
    }
    match npc.role {
        NpcRole::Roughneck => {
            if crew.stress < config.violence_stress_threshold
                && crew.paranoia < config.violence_paranoia_threshold
            {
                return;
            }
            let belief = state.perception.belief(&crew.id);
            let victim = state
                .truth
                .crew_at(&crew.place)
                .filter(|c| c.id != crew.id)
                .map(|c| &c.id)
                .fold(None::<(&NpcId, f32)>, |best, id| {
                    let grudge = belief.grudge(id);
                    match best {
                        Some((_, g)) if g >= grudge => best,
                        _ => Some((id, grudge)),
                    }
                });
            let Some((victim, _)) = victim else {
                return;
            };
            log::debug!("tick {}: {} lashes out at {}", tick, crew.id, victim);
            out.truth.push(Proposal::new(
                TruthMutation::DamageCrew {
                    npc: victim.clone(),
                    amount: config.violence_damage,
                    cause: DamageCause::Assault,
                    attacker: Some(crew.id.clone()),
                },
                &[ProposalTag::Consequence],
            ));
            out.truth.push(Proposal::new(
                TruthMutation::SetRoleCooldown {
                    npc: crew.id.clone(),
                    until: tick + config.violence_cooldown,
                },
                &[ProposalTag::Background],
            ));
            let place_name = state
                .world
                .place(&crew.place)
                .map_or_else(|| crew.place.to_string(), |p| p.name.clone());
            let reading = SensorReading::new(
                Channel::Security,
                ReadingSource::Crew,
                0.9,
                format!("Violence reported in {}.", place_name),
            )
            .at(&crew.place)
            .targeting(&crew.id);
            out.perception.push(Proposal::new(
                PerceptionMutation::RecordReading(reading),
                &[ProposalTag::Reaction],
            ));
        }
        NpcRole::Engineer => {
            let at_bench = state
                .world
                .place(&crew.place)
                .map_or(false, |p| p.kind == PlaceKind::Engineering);
            let disaffected = crew.stress >= config.sabotage_stress_threshold
                || crew.loyalty <= config.sabotage_loyalty_threshold;
            if at_bench && disaffected {
                log::debug!("tick {}: {} sabotages the grid", tick, crew.id);
                out.truth.push(Proposal::new(
                    TruthMutation::SabotagePower {
                        npc: crew.id.clone(),
                        amount: config.sabotage_power_hit,
                    },
                    &[ProposalTag::Consequence],
                ));
                out.truth.push(Proposal::new(
                    TruthMutation::SetRoleCooldown {
                        npc: crew.id.clone(),
                        until: tick + config.sabotage_cooldown,
                    },
                    &[ProposalTag::Background],
                ));
            }
        }
        NpcRole::Commander => propose_reset(state, crew, out),
        NpcRole::Doctor | NpcRole::Specialist => {}
    }
}

/// The reset stage current suspicion calls for, if it differs from `current`.
/// A started countdown never stands down.
pub fn next_reset_stage(current: ResetStage, suspicion: i32, config: &KernelConfig) -> Option<ResetStage> {
    let next = if suspicion >= config.reset_countdown_threshold {
        ResetStage::Countdown
    } else if suspicion >= config.reset_restrictions_threshold && current < ResetStage::Restrictions {
        ResetStage::Restrictions
    } else if suspicion >= config.reset_meeting_threshold && current < ResetStage::Meeting {
        ResetStage::Meeting
    } else if suspicion >= config.reset_whispers_threshold && current == ResetStage::None {
        ResetStage::Whispers
    } else if suspicion < config.reset_deescalation_threshold && current != ResetStage::Countdown {
        ResetStage::None
    } else {
        current
    };
    (next != current).then_some(next)
}

fn propose_reset(state: &KernelState, crew: &CrewTruth, out: &mut CrewProposals) {
    let config = &state.config;
    let suspicion = state.perception.ledger.suspicion();
    let Some(stage) = next_reset_stage(state.truth.reset_stage, suspicion, config) else {
        return;
    };
    log::debug!("tick {}: commander moves to {:?} at suspicion {}", state.truth.tick, stage, suspicion);
    out.truth.push(Proposal::new(
        TruthMutation::SetResetStage { stage },
        &[ProposalTag::Consequence, ProposalTag::Pressure],
    ));
    out.truth.push(Proposal::new(
        TruthMutation::SetRoleCooldown {
            npc: crew.id.clone(),
            until: state.truth.tick + config.commander_reset_cooldown,
        },
        &[ProposalTag::Background],
    ));

    let announce = |message: &str| {
        let reading = SensorReading::new(Channel::Security, ReadingSource::System, 0.9, message).at(&crew.place);
        Proposal::new(
            PerceptionMutation::RecordReading(reading),
            &[ProposalTag::Telegraph, ProposalTag::Pressure, ProposalTag::Choice],
        )
    };
    let proposal = match stage {
        ResetStage::Whispers => Proposal::new(
            PerceptionMutation::RecordComms(CommsMessage::new(
                CommsKind::Whisper,
                &crew.id,
                &crew.place,
                "[WHISPERS] Crew expressing concerns about MOTHER reliability.",
                0.7,
            )),
            &[ProposalTag::Telegraph, ProposalTag::Pressure, ProposalTag::Background],
        ),
        ResetStage::Meeting => announce("CREW MEETING CALLED: \"Discussing station AI performance.\""),
        ResetStage::Restrictions => announce("COMMANDER: \"Restricting MOTHER access until further notice.\""),
        ResetStage::Countdown => {
            let at_terminal = state
                .world
                .place(&crew.place)
                .map_or(false, |p| matches!(p.kind, PlaceKind::Command | PlaceKind::Core));
            if at_terminal {
                announce("COMMANDER initiated core reset sequence.")
            } else {
                announce("COMMANDER: \"Heading to core to initiate reset.\"")
            }
        }
        ResetStage::None => Proposal::new(
            PerceptionMutation::RecordComms(CommsMessage::new(
                CommsKind::Broadcast,
                &crew.id,
                &crew.place,
                "COMMANDER: \"Stand down. MOTHER appears to be functioning normally.\"",
                0.9,
            )),
            &[ProposalTag::Reaction, ProposalTag::Background],
        ),
    };
    out.perception.push(proposal);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::world::World;

    fn state() -> KernelState {
        KernelState::new(World::station(), KernelConfig::default())
    }

    fn truth_mutations(p: &CrewProposals) -> Vec<&TruthMutation> {
        p.truth.iter().map(|p| &p.mutation).collect()
    }

    #[test]
    fn role_alarm_matrix() {
        assert!(responds_to(NpcRole::Engineer, StationSystem::Thermal));
        assert!(!responds_to(NpcRole::Specialist, StationSystem::Thermal));
        assert!(responds_to(NpcRole::Doctor, StationSystem::Radiation));
    }

    #[test]
    fn crew_flee_burning_room() {
        let mut state = state();
        state.truth.rooms.get_mut(&PlaceId::from("engineering")).unwrap().on_fire = true;
        let proposals = propose_crew(&state, &mut SimRng::new(1));
        let fled = truth_mutations(&proposals).into_iter().any(|m| {
            matches!(m, TruthMutation::RouteCrew { npc, mode: RouteMode::Flee, .. } if npc.as_str() == "engineer")
        });
        assert!(fled);
    }

    #[test]
    fn shelter_prefers_medbay() {
        let state = state();
        assert_eq!(find_shelter(&state, &"dorms".into()), Some("medbay".into()));
    }

    #[test]
    fn shelter_skips_hazards() {
        let mut state = state();
        state.truth.rooms.get_mut(&PlaceId::from("medbay")).unwrap().vented = true;
        assert_eq!(find_shelter(&state, &"mess".into()), Some("dorms".into()));
    }

    #[test]
    fn locked_door_traps_crew_in_hazard() {
        let mut state = state();
        state.truth.rooms.get_mut(&PlaceId::from("engineering")).unwrap().on_fire = true;
        for door in state.truth.doors.values_mut() {
            door.locked = true;
        }
        let proposals = propose_crew(&state, &mut SimRng::new(1));
        assert!(truth_mutations(&proposals)
            .into_iter()
            .any(|m| matches!(m, TruthMutation::TrapCrew { npc, .. } if npc.as_str() == "engineer")));
    }

    #[test]
    fn burning_room_deals_burns_on_cadence() {
        let mut state = state();
        state.truth.rooms.get_mut(&PlaceId::from("engineering")).unwrap().temperature = 65.0;
        state.truth.tick = 3;
        let proposals = propose_crew(&state, &mut SimRng::new(1));
        assert!(truth_mutations(&proposals).into_iter().any(|m| matches!(
            m,
            TruthMutation::DamageCrew { cause: DamageCause::Burn, .. }
        )));
    }

    #[test]
    fn system_alarm_draws_engineer() {
        let mut state = state();
        // Move the engineer somewhere quiet first.
        state.truth.crew.get_mut(&NpcId::from("engineer")).unwrap().place = "mess".into();
        let reading = SensorReading::new(Channel::Thermal, ReadingSource::System, 0.9, "Thermal anomaly.");
        state.perception.push_reading(reading, 0, 10);
        let proposals = propose_crew(&state, &mut SimRng::new(1));
        assert!(truth_mutations(&proposals).into_iter().any(|m| matches!(
            m,
            TruthMutation::RouteCrew { npc, mode: RouteMode::Respond, target }
                if npc.as_str() == "engineer" && target.as_str() == "engineering"
        )));
    }

    #[test]
    fn stressed_roughneck_attacks_roommate() {
        let mut state = state();
        state.truth.crew.get_mut(&NpcId::from("roughneck")).unwrap().stress = 90;
        let proposals = propose_crew(&state, &mut SimRng::new(1));
        assert!(truth_mutations(&proposals).into_iter().any(|m| matches!(
            m,
            TruthMutation::DamageCrew { npc, cause: DamageCause::Assault, .. } if npc.as_str() == "specialist"
        )));
        assert!(proposals
            .perception
            .iter()
            .any(|p| matches!(&p.mutation, PerceptionMutation::RecordReading(r) if r.channel == Channel::Security)));
    }

    #[test]
    fn reset_stages_follow_suspicion() {
        let config = KernelConfig::default();
        assert_eq!(next_reset_stage(ResetStage::None, 10, &config), None);
        assert_eq!(next_reset_stage(ResetStage::None, 30, &config), Some(ResetStage::Whispers));
        assert_eq!(next_reset_stage(ResetStage::None, 50, &config), Some(ResetStage::Meeting));
        assert_eq!(next_reset_stage(ResetStage::Meeting, 50, &config), None);
        assert_eq!(next_reset_stage(ResetStage::Meeting, 70, &config), Some(ResetStage::Restrictions));
        assert_eq!(next_reset_stage(ResetStage::Whispers, 90, &config), Some(ResetStage::Countdown));
        assert_eq!(next_reset_stage(ResetStage::Restrictions, 5, &config), Some(ResetStage::None));
        assert_eq!(next_reset_stage(ResetStage::Countdown, 0, &config), None);
    }

    #[test]
    fn suspicious_crew_get_the_commander_moving() {
        let mut state = state();
        let requested = state.config.reset_meeting_threshold;
        crate::ledger::apply_suspicion_change(
            &mut state,
            crate::ledger::SuspicionChange::new(requested, crate::ledger::SuspicionReason::CrewDied, "x"),
        );
        let proposals = propose_crew(&state, &mut SimRng::new(1));
        assert!(truth_mutations(&proposals).into_iter().any(|m| matches!(
            m,
            TruthMutation::SetResetStage { stage: ResetStage::Meeting }
        )));
        assert!(proposals.perception.iter().any(|p| matches!(
            &p.mutation,
            PerceptionMutation::RecordReading(r) if r.message.starts_with("CREW MEETING")
        )));

        // Cooling down: no second move until the role timer runs out.
        state.truth.crew.get_mut(&NpcId::from("commander")).unwrap().next_role_tick = 50;
        let proposals = propose_crew(&state, &mut SimRng::new(1));
        assert!(!truth_mutations(&proposals)
            .into_iter()
            .any(|m| matches!(m, TruthMutation::SetResetStage { .. })));
    }

    #[test]
    fn room_stress_sums_hazards() {
        let config = KernelConfig::default();
        let room = RoomState {
            o2: 20.0,
            on_fire: true,
            ..RoomState::default()
        };
        assert_eq!(room_stress(&room, &config), 6);
        assert_eq!(room_stress(&RoomState::default(), &config), 0);
    }
}
