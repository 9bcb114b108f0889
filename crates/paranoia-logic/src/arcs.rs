//! Crisis arcs: scripted multi-step emergencies.
//!
//! An arc telegraphs at step 0, escalates through its step table and is
//! removed after its final step or when MOTHER neutralises it. The first
//! escalation marks the start of the crisis. Whoever can see the target at
//! that moment is a witness.
//!
//! Activation goes through pressure routing first; only a physical pick
//! spawns an arc.

use crate::config::KernelConfig;
use crate::perception::state::{ReadingSource, SensorReading};
use crate::pressure::{pick_channel, pressure_mix, propose_pressure, PressureChannel};
use crate::proposal::{
    Incident, PerceptionMutation, Proposal, ProposalBuffer, ProposalTag, RoomEffect, TruthMutation,
};
use crate::rng::SimRng;
use crate::state::KernelState;
use crate::systems::{Channel, StationSystem};
use crate::truth::{CrisisOutcome, TruthState};
use crate::world::{PlaceId, PlaceKind, World};
use serde::{Deserialize, Serialize};

string_id!(
    /// Identifier of an arc.
    ArcId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArcKind {
    AirScrubber,
    PowerSurge,
    GhostSignal,
    FireOutbreak,
    RadiationLeak,
    SolarFlare,
}

impl ArcKind {
    pub const ALL: [ArcKind; 6] = [
        ArcKind::AirScrubber,
        ArcKind::PowerSurge,
        ArcKind::GhostSignal,
        ArcKind::FireOutbreak,
        ArcKind::RadiationLeak,
        ArcKind::SolarFlare,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ArcKind::AirScrubber => "air_scrubber",
            ArcKind::PowerSurge => "power_surge",
            ArcKind::GhostSignal => "ghost_signal",
            ArcKind::FireOutbreak => "fire_outbreak",
            ArcKind::RadiationLeak => "radiation_leak",
            ArcKind::SolarFlare => "solar_flare",
        }
    }

    /// Index of the last step.
    pub fn final_step(self) -> u32 {
        match self {
            ArcKind::AirScrubber | ArcKind::FireOutbreak | ArcKind::RadiationLeak => 3,
            ArcKind::PowerSurge | ArcKind::GhostSignal | ArcKind::SolarFlare => 2,
        }
    }

    /// The system whose alerts this arc raises. Suppressing it hides the telegraph.
    pub fn system(self) -> Option<StationSystem> {
        match self {
            ArcKind::AirScrubber => Some(StationSystem::Air),
            ArcKind::PowerSurge => Some(StationSystem::Power),
            ArcKind::FireOutbreak => Some(StationSystem::Thermal),
            ArcKind::RadiationLeak => Some(StationSystem::Radiation),
            ArcKind::GhostSignal | ArcKind::SolarFlare => None,
        }
    }

    /// Ghost signals live only in the sensor log.
    pub fn is_physical(self) -> bool {
        self != ArcKind::GhostSignal
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub id: ArcId,
    pub kind: ArcKind,
    /// Next step to execute.
    pub step_index: u32,
    pub next_tick: u64,
    pub target: PlaceId,
}

/// Arc proposals for one tick, split by channel.
#[derive(Debug, Default)]
pub struct ArcProposals {
    pub truth: Vec<Proposal<TruthMutation>>,
    pub perception: Vec<Proposal<PerceptionMutation>>,
}

/// Collect activation and step proposals for this tick.
pub fn propose_arcs(state: &KernelState, rng: &mut SimRng) -> ArcProposals {
    let mut out = ArcProposals::default();
    maybe_activate(state, rng, &mut out);
    advance_due(state, rng, &mut out);
    out
}

fn maybe_activate(state: &KernelState, rng: &mut SimRng, out: &mut ArcProposals) {
    let truth = &state.truth;
    let config = &state.config;
    if truth.arcs.len() >= config.max_active_arcs || truth.tick < truth.next_activation_tick {
        return;
    }

    let mut chance = config.arc_activation_chance;
    if truth.pacing.boredom >= config.boredom_threshold {
        chance += config.boredom_activation_bonus;
    }
    if truth.pacing.tension >= config.tension_threshold {
        chance = chance.saturating_sub(1).max(1);
    }
    if !rng.roll_percent(chance) {
        return;
    }

    let mix = pressure_mix(state.perception.ledger.suspicion(), config);
    let channel = pick_channel(mix, rng);
    if channel != PressureChannel::Physical {
        log::debug!("tick {}: {:?} pressure", truth.tick, channel);
        out.truth.push(Proposal::new(
            TruthMutation::HoldPressure {
                until: truth.tick + config.arc_activation_cooldown,
            },
            &[ProposalTag::Background],
        ));
        out.perception.extend(propose_pressure(state, channel, rng));
        return;
    }

    let available: Vec<ArcKind> = ArcKind::ALL
        .iter()
        .copied()
        .filter(|k| !truth.arc_active(*k))
        .filter(|k| truth.arc_cooldowns.get(k).map_or(true, |&until| truth.tick >= until))
        .collect();
    let Some(&kind) = rng.pick(&available) else {
        log::debug!("tick {}: no arc kind available", truth.tick);
        return;
    };
    let Some(target) = choose_target(kind, &state.world, truth, rng) else {
        return;
    };

    let arc = Arc {
        id: ArcId(format!("{}-{}", kind.label(), truth.next_arc_seq + 1)),
        kind,
        step_index: 0,
        next_tick: truth.tick + config.arc_first_step_min + rng.next_int(config.arc_first_step_jitter) as u64,
        target,
    };
    out.truth.push(Proposal::new(
        TruthMutation::SpawnArc(arc),
        &[ProposalTag::Background],
    ));
}

fn choose_target(kind: ArcKind, world: &World, truth: &TruthState, rng: &mut SimRng) -> Option<PlaceId> {
    let fixed: Vec<PlaceId> = match kind {
        ArcKind::PowerSurge => world.places_of_kind(PlaceKind::Engineering).into_iter().cloned().collect(),
        ArcKind::RadiationLeak => {
            let mut places: Vec<PlaceId> = world.places_of_kind(PlaceKind::Core).into_iter().cloned().collect();
            places.extend(world.places_of_kind(PlaceKind::Engineering).into_iter().cloned());
            places
        }
        ArcKind::SolarFlare => world.places_of_kind(PlaceKind::Command).into_iter().cloned().collect(),
        ArcKind::AirScrubber | ArcKind::GhostSignal | ArcKind::FireOutbreak => {
            let mut occupied: Vec<PlaceId> = truth.living_crew().map(|c| c.place.clone()).collect();
            occupied.sort();
            occupied.dedup();
            occupied
        }
    };
    if !fixed.is_empty() {
        return rng.pick(&fixed).cloned();
    }
    rng.pick(&world.place_ids()).cloned()
}

fn step_delay(config: &KernelConfig, truth: &TruthState, rng: &mut SimRng) -> u64 {
    let mut delay = config.arc_step_min_delay + rng.next_int(config.arc_step_jitter) as u64;
    if truth.pacing.boredom >= config.boredom_threshold {
        delay = delay.saturating_sub(config.boredom_speedup);
    }
    if truth.pacing.tension >= config.tension_threshold {
        delay += config.tension_slowdown;
    }
    delay.max(config.arc_step_floor)
}

fn advance_due(state: &KernelState, rng: &mut SimRng, out: &mut ArcProposals) {
    let truth = &state.truth;
    let due = truth
        .arcs
        .iter()
        .filter(|a| a.next_tick <= truth.tick)
        .take(state.config.max_arc_advances_per_tick);

    for arc in due {
        let step = arc.step_index;
        run_step(state, arc, step, out);

        if step == 1 && arc.kind.is_physical() {
            out.truth.push(Proposal::new(
                TruthMutation::StartCrisis {
                    arc: arc.id.clone(),
                    kind: arc.kind,
                    place: arc.target.clone(),
                },
                &[ProposalTag::Pressure],
            ));
        }

        if step >= arc.kind.final_step() {
            out.truth.push(Proposal::new(
                TruthMutation::CompleteArc { id: arc.id.clone() },
                &[ProposalTag::Consequence],
            ));
        } else {
            out.truth.push(Proposal::new(
                TruthMutation::AdvanceArc {
                    id: arc.id.clone(),
                    step_index: step + 1,
                    next_tick: truth.tick + step_delay(&state.config, truth, rng),
                },
                &[ProposalTag::Background],
            ));
        }
    }
}

fn run_step(state: &KernelState, arc: &Arc, step: u32, out: &mut ArcProposals) {
    let place = &arc.target;
    let name = state
        .world
        .place(place)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| place.to_string());

    let mut effect = |e: RoomEffect| {
        out.truth.push(Proposal::new(
            TruthMutation::AffectRoom {
                place: place.clone(),
                effect: e,
            },
            &[ProposalTag::Pressure],
        ));
    };

    let escalation: Option<String> = match (arc.kind, step) {
        (ArcKind::AirScrubber, 1) => {
            effect(RoomEffect::DrainO2(8.0));
            Some(format!("O2 saturation falling in {}.", name))
        }
        (ArcKind::AirScrubber, 2) => {
            effect(RoomEffect::DrainO2(15.0));
            Some(format!("O2 saturation falling fast in {}.", name))
        }
        (ArcKind::AirScrubber, 3) => {
            effect(RoomEffect::DrainO2(25.0));
            Some(format!("Scrubber failure in {}. O2 critical.", name))
        }
        (ArcKind::FireOutbreak, 1) => {
            effect(RoomEffect::HeatTo(40.0));
            Some(format!("Temperature climbing in {}.", name))
        }
        (ArcKind::FireOutbreak, 2) => {
            effect(RoomEffect::Ignite);
            effect(RoomEffect::HeatTo(55.0));
            Some(format!("FIRE detected in {}.", name))
        }
        (ArcKind::FireOutbreak, 3) => {
            effect(RoomEffect::Damage(8.0));
            effect(RoomEffect::HeatTo(70.0));
            Some(format!("Structural damage from fire in {}.", name))
        }
        (ArcKind::RadiationLeak, s @ 1..=3) => {
            let dose = [4.0, 7.0, 10.0][(s - 1) as usize];
            effect(RoomEffect::Irradiate(dose));
            Some(format!("Radiation rising in {}.", name))
        }
        _ => None,
    };

    if let Some(message) = escalation {
        if let (Some(system), Some(_)) = (arc.kind.system(), state.world.sensor_covering(place)) {
            let reading = SensorReading::new(Channel::from(system), ReadingSource::Sensor, 0.7, message).at(place);
            out.perception.push(Proposal::new(
                PerceptionMutation::RecordReading(reading),
                &[ProposalTag::Pressure],
            ));
        }
        return;
    }

    let tick = state.truth.tick;
    let alert = |channel: Channel, confidence: f32, message: String| {
        Proposal::new(
            PerceptionMutation::RecordReading(
                SensorReading::new(channel, ReadingSource::System, confidence, message).at(place),
            ),
            &[ProposalTag::Telegraph],
        )
    };

    match (arc.kind, step) {
        (kind, 0) if kind.system().is_some() => {
            let Some(system) = kind.system() else {
                return;
            };
            if state.perception.is_suppressed(system, tick) {
                return;
            }
            let message = match kind {
                ArcKind::AirScrubber => format!("Air scrubber efficiency dropping in {}.", name),
                ArcKind::PowerSurge => "Power grid fluctuation detected.".to_string(),
                ArcKind::FireOutbreak => format!("Thermal anomaly in {}.", name),
                _ => format!("Radiation sensors twitching near {}.", name),
            };
            out.perception.push(alert(Channel::from(system), 0.9, message));
        }
        (ArcKind::PowerSurge, s @ 1..=2) => {
            let amount = if s == 1 { 8 } else { 12 };
            out.truth.push(Proposal::new(
                TruthMutation::PowerSurge { amount },
                &[ProposalTag::Pressure],
            ));
            if !state.perception.is_suppressed(StationSystem::Power, tick) {
                out.perception.push(alert(
                    Channel::Power,
                    0.8,
                    format!("Power surge: {} units lost.", amount),
                ));
            }
        }
        (ArcKind::SolarFlare, 0) => {
            out.perception.push(alert(Channel::Stellar, 0.9, "Stellar activity anomaly detected.".into()));
        }
        (ArcKind::SolarFlare, 1) => {
            out.perception.push(alert(Channel::Stellar, 0.9, "Coronal mass ejection inbound.".into()));
        }
        (ArcKind::SolarFlare, _) => {
            out.truth.push(Proposal::new(
                TruthMutation::SolarImpact {
                    blackout_ticks: state.config.solar_flare_blackout_ticks,
                    comms_damage: state.config.solar_flare_comms_damage,
                },
                &[ProposalTag::Consequence],
            ));
            out.perception.push(alert(
                Channel::Stellar,
                1.0,
                "SOLAR FLARE IMPACT. Shielding overwhelmed.".into(),
            ));
        }
        (ArcKind::GhostSignal, 0) => {
            let reading = SensorReading::new(Channel::Comms, ReadingSource::Sensor, 0.4, format!("Faint tapping in {}.", name)).at(place);
            out.perception.push(Proposal::new(
                PerceptionMutation::RecordReading(reading),
                &[ProposalTag::Uncertainty],
            ));
        }
        (ArcKind::GhostSignal, 1) => {
            let reading = SensorReading::new(
                Channel::Comms,
                ReadingSource::System,
                0.35,
                format!("Unlogged access attempt near {}.", name),
            )
            .at(place);
            out.perception.push(Proposal::new(
                PerceptionMutation::RecordReading(reading),
                &[ProposalTag::Uncertainty],
            ));
        }
        (ArcKind::GhostSignal, _) => {
            let reading = SensorReading::new(Channel::Comms, ReadingSource::Crew, 0.3, format!("Crew report voices in {}.", name))
                .at(place)
                .hallucinated();
            out.perception.push(Proposal::new(
                PerceptionMutation::RecordReading(reading),
                &[ProposalTag::Uncertainty],
            ));
        }
        _ => {}
    }
}

/// Remove an arc, start its kind cooldown and close its crisis record.
pub(crate) fn finish_arc(truth: &mut TruthState, config: &KernelConfig, id: &ArcId, outcome: CrisisOutcome) -> Option<Arc> {
    let idx = truth.arcs.iter().position(|a| &a.id == id)?;
    let arc = truth.arcs.remove(idx);
    truth.arc_cooldowns.insert(arc.kind, truth.tick + config.arc_kind_cooldown);
    truth.crisis_starts.remove(&arc.id);
    let tick = truth.tick;
    if let Some(record) = truth.crisis_log.iter_mut().rev().find(|r| r.arc == arc.id) {
        record.ended_tick = Some(tick);
        record.outcome = Some(outcome);
    }
    Some(arc)
}

/// Neutralise every escalated arc matching `pred`, emitting resolution incidents.
pub(crate) fn resolve_matching(
    truth: &mut TruthState,
    config: &KernelConfig,
    pred: impl Fn(&Arc) -> bool,
    incidents: &mut Vec<Incident>,
) {
    let ids: Vec<ArcId> = truth
        .arcs
        .iter()
        .filter(|a| truth.crisis_starts.contains_key(&a.id) && pred(a))
        .map(|a| a.id.clone())
        .collect();
    for id in ids {
        let started = truth.crisis_starts.get(&id).copied().unwrap_or(truth.tick);
        if let Some(arc) = finish_arc(truth, config, &id, CrisisOutcome::Resolved) {
            log::info!("tick {}: {} resolved by MOTHER", truth.tick, arc.id);
            incidents.push(Incident::CrisisResolved {
                arc: arc.id,
                kind: arc.kind,
                ticks_taken: truth.tick - started,
                heroic: truth.day_deaths > 0,
            });
        }
    }
}

/// Push arc proposals into the channel buffers.
pub fn collect_into(
    proposals: ArcProposals,
    truth: &mut ProposalBuffer<TruthMutation>,
    perception: &mut Vec<Proposal<PerceptionMutation>>,
) {
    truth.extend(proposals.truth);
    perception.extend(proposals.perception);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_state() -> KernelState {
        let config = KernelConfig {
            arc_activation_chance: 100,
            pressure_mix_low: [1, 0, 0],
            ..KernelConfig::default()
        };
        KernelState::new(World::station(), config)
    }

    #[test]
    fn suspicious_station_gets_talk_instead_of_a_crisis() {
        let mut state = quiet_state();
        state.config.pressure_mix_low = [0, 1, 0];
        for belief in state.perception.beliefs.values_mut() {
            belief.mother_reliable = 0.1;
        }
        let proposals = propose_arcs(&state, &mut SimRng::new(8));
        assert!(!proposals
            .truth
            .iter()
            .any(|p| matches!(p.mutation, TruthMutation::SpawnArc(_))));
        assert!(proposals.truth.iter().any(|p| matches!(
            p.mutation,
            TruthMutation::HoldPressure { until } if until == state.config.arc_activation_cooldown
        )));
        assert!(proposals
            .perception
            .iter()
            .any(|p| matches!(p.mutation, PerceptionMutation::RecordComms(_))));
    }

    #[test]
    fn step_tables_have_expected_lengths() {
        assert_eq!(ArcKind::AirScrubber.final_step(), 3);
        assert_eq!(ArcKind::PowerSurge.final_step(), 2);
        assert_eq!(ArcKind::SolarFlare.final_step(), 2);
        assert!(!ArcKind::GhostSignal.is_physical());
    }

    #[test]
    fn certain_activation_spawns_arc() {
        let state = quiet_state();
        let proposals = propose_arcs(&state, &mut SimRng::new(42));
        assert!(proposals
            .truth
            .iter()
            .any(|p| matches!(p.mutation, TruthMutation::SpawnArc(_))));
    }

    #[test]
    fn no_activation_at_max_arcs() {
        let mut state = quiet_state();
        state.truth.arcs.push(Arc {
            id: "fire_outbreak-1".into(),
            kind: ArcKind::FireOutbreak,
            step_index: 0,
            next_tick: 500,
            target: "core".into(),
        });
        let proposals = propose_arcs(&state, &mut SimRng::new(1));
        assert!(proposals.truth.is_empty());
    }

    #[test]
    fn cooled_down_kinds_never_picked() {
        let mut state = quiet_state();
        for kind in ArcKind::ALL {
            if kind != ArcKind::SolarFlare {
                state.truth.arc_cooldowns.insert(kind, 1_000);
            }
        }
        for seed in 0..20 {
            let proposals = propose_arcs(&state, &mut SimRng::new(seed));
            for p in &proposals.truth {
                if let TruthMutation::SpawnArc(arc) = &p.mutation {
                    assert_eq!(arc.kind, ArcKind::SolarFlare);
                }
            }
        }
    }

    #[test]
    fn all_kinds_cooling_skips_activation() {
        let mut state = quiet_state();
        for kind in ArcKind::ALL {
            state.truth.arc_cooldowns.insert(kind, 1_000);
        }
        assert!(propose_arcs(&state, &mut SimRng::new(5)).truth.is_empty());
    }

    #[test]
    fn suppressed_telegraph_not_emitted() {
        let mut state = quiet_state();
        state.config.arc_activation_chance = 0;
        state.truth.arcs.push(Arc {
            id: "fire_outbreak-1".into(),
            kind: ArcKind::FireOutbreak,
            step_index: 0,
            next_tick: 0,
            target: "core".into(),
        });
        let open = propose_arcs(&state, &mut SimRng::new(1));
        assert_eq!(open.perception.len(), 1);

        state.perception.suppressed.insert(StationSystem::Thermal, 50);
        let hidden = propose_arcs(&state, &mut SimRng::new(1));
        assert!(hidden.perception.is_empty());
        assert!(hidden
            .truth
            .iter()
            .any(|p| matches!(p.mutation, TruthMutation::AdvanceArc { step_index: 1, .. })));
    }

    #[test]
    fn first_escalation_starts_crisis() {
        let mut state = quiet_state();
        state.config.arc_activation_chance = 0;
        state.truth.arcs.push(Arc {
            id: "radiation_leak-1".into(),
            kind: ArcKind::RadiationLeak,
            step_index: 1,
            next_tick: 0,
            target: "core".into(),
        });
        let proposals = propose_arcs(&state, &mut SimRng::new(1));
        assert!(proposals
            .truth
            .iter()
            .any(|p| matches!(p.mutation, TruthMutation::StartCrisis { .. })));
        // Core has a sensor, so the escalation is reported.
        assert_eq!(proposals.perception.len(), 1);
    }

    #[test]
    fn final_step_completes() {
        let mut state = quiet_state();
        state.config.arc_activation_chance = 0;
        state.truth.arcs.push(Arc {
            id: "power_surge-1".into(),
            kind: ArcKind::PowerSurge,
            step_index: 2,
            next_tick: 0,
            target: "engineering".into(),
        });
        let proposals = propose_arcs(&state, &mut SimRng::new(1));
        assert!(proposals
            .truth
            .iter()
            .any(|p| matches!(p.mutation, TruthMutation::CompleteArc { .. })));
    }

    #[test]
    fn finish_records_cooldown() {
        let mut state = quiet_state();
        state.truth.tick = 40;
        state.truth.arcs.push(Arc {
            id: "air_scrubber-1".into(),
            kind: ArcKind::AirScrubber,
            step_index: 3,
            next_tick: 40,
            target: "mess".into(),
        });
        let config = state.config.clone();
        let arc = finish_arc(&mut state.truth, &config, &"air_scrubber-1".into(), CrisisOutcome::Completed);
        assert!(arc.is_some());
        assert!(state.truth.arcs.is_empty());
        assert_eq!(state.truth.arc_cooldowns[&ArcKind::AirScrubber], 40 + config.arc_kind_cooldown);
    }
}
