use paranoia_logic::arcs::{Arc, ArcKind};
use paranoia_logic::commands::Command;
use paranoia_logic::doubts::{open_doubt, DoubtSource, NewDoubt};
use paranoia_logic::ledger::{apply_suspicion_change, SuspicionChange, SuspicionReason};
use paranoia_logic::truth::{Ending, ResetStage};
use paranoia_logic::systems::Severity;
use paranoia_logic::world::{NpcId, PlaceId};
use paranoia_logic::{KernelConfig, Simulation, World};
use std::collections::BTreeSet;

fn restless() -> KernelConfig {
    KernelConfig {
        arc_activation_chance: 100,
        ..KernelConfig::default()
    }
}

fn calm() -> KernelConfig {
    KernelConfig {
        max_active_arcs: 0,
        ..KernelConfig::default()
    }
}

/// An escalated fire in engineering whose crisis began at `started`.
fn burning(sim: &mut Simulation, started: u64) {
    sim.state.truth.arcs.push(Arc {
        id: "fire_outbreak-1".into(),
        kind: ArcKind::FireOutbreak,
        step_index: 2,
        next_tick: 10_000,
        target: "engineering".into(),
    });
    sim.state.truth.crisis_starts.insert("fire_outbreak-1".into(), started);
}

fn has_entry(sim: &Simulation, reason: SuspicionReason) -> bool {
    sim.state
        .perception
        .ledger
        .entries()
        .iter()
        .any(|e| e.reason == reason)
}

#[test]
fn no_arc_starts_during_its_kind_cooldown() {
    for seed in [1_u64, 42, 977] {
        let mut sim = Simulation::new(World::station(), restless(), seed);
        let mut seen = BTreeSet::new();
        for _ in 0..600 {
            if sim.is_over() {
                break;
            }
            let tick = sim.tick();
            let cooldowns = sim.state.truth.arc_cooldowns.clone();
            sim.step(&[]);
            for arc in &sim.state.truth.arcs {
                if seen.insert(arc.id.clone()) {
                    let until = cooldowns.get(&arc.kind).copied().unwrap_or(0);
                    assert!(tick >= until, "{} spawned at {} before {}", arc.id, tick, until);
                }
            }
            assert!(sim.state.truth.arcs.len() <= sim.state.config.max_active_arcs);
        }
        assert!(!seen.is_empty(), "seed {} never started an arc", seed);
    }
}

#[test]
fn finished_arcs_close_their_crisis_records() {
    let mut sim = Simulation::new(World::station(), restless(), 42);
    sim.run(600);
    for record in &sim.state.truth.crisis_log {
        let live = sim.state.truth.arcs.iter().any(|a| a.id == record.arc);
        assert_eq!(record.outcome.is_none(), live, "{} record out of sync", record.arc);
        if let Some(end) = record.ended_tick {
            assert!(end >= record.started_tick);
        }
    }
}

#[test]
fn doubt_is_gone_after_its_decay_window() {
    let mut sim = Simulation::new(World::station(), calm(), 8);
    let id = open_doubt(
        &mut sim.state,
        NewDoubt {
            topic: "MOTHER vented mess with crew nearby".into(),
            severity: Severity::Medium,
            involved_crew: vec!["commander".into()],
            related_op: None,
            system: None,
            source: DoubtSource::Witness,
        },
    );
    let decay = sim.state.config.doubt_decay_ticks;
    let present = |sim: &Simulation| sim.state.perception.doubts.iter().any(|d| d.id == id);

    sim.run(decay);
    assert_eq!(sim.tick(), decay);
    assert!(present(&sim));

    sim.step(&[]);
    assert_eq!(sim.tick(), decay + 1);
    assert!(!present(&sim));
}

#[test]
fn quick_vent_earns_a_resolution_bonus() {
    let mut sim = Simulation::new(World::station(), calm(), 2);
    burning(&mut sim, 0);
    sim.run(5);
    sim.step(&[Command::Vent("engineering".into())]);

    assert!(sim.state.truth.arcs.is_empty());
    assert!(has_entry(&sim, SuspicionReason::QuickResolution));
    assert!(!has_entry(&sim, SuspicionReason::HeroicResponse));
    assert!(sim.state.truth.arc_cooldowns.contains_key(&ArcKind::FireOutbreak));
}

#[test]
fn slow_vent_earns_nothing() {
    let mut sim = Simulation::new(World::station(), calm(), 2);
    burning(&mut sim, 0);
    let slow = sim.state.config.quick_resolution_ticks + 5;
    sim.run(slow);
    sim.step(&[Command::Vent("engineering".into())]);

    assert!(sim.state.truth.arcs.is_empty());
    assert!(!has_entry(&sim, SuspicionReason::QuickResolution));
}

#[test]
fn resolving_after_losses_is_heroic() {
    let mut sim = Simulation::new(World::station(), calm(), 2);
    burning(&mut sim, 0);
    sim.state.truth.day_deaths = 1;
    sim.step(&[Command::Vent("engineering".into())]);

    let heroic = sim
        .state
        .perception
        .ledger
        .entries()
        .iter()
        .find(|e| e.reason == SuspicionReason::HeroicResponse)
        .expect("heroic entry");
    assert_eq!(heroic.requested, sim.state.config.suspicion_heroic_response);
}

#[test]
fn venting_an_occupied_room_opens_a_witness_doubt() {
    let mut sim = Simulation::new(World::station(), calm(), 2);
    sim.step(&[Command::Vent("cargo".into())]);
    let doubt = sim
        .state
        .perception
        .doubts
        .iter()
        .find(|d| d.source == DoubtSource::Witness)
        .expect("witness doubt");
    assert!(doubt.topic.contains("cargo"));
    assert!(sim.state.truth.rooms[&PlaceId::from("cargo")].vented);
}

#[test]
fn commander_unplugs_mother_once_suspicion_boils_over() {
    let mut sim = Simulation::new(World::station(), calm(), 11);
    if let Some(roughneck) = sim.state.truth.crew.get_mut(&NpcId::from("roughneck")) {
        roughneck.next_role_tick = 10_000;
    }
    apply_suspicion_change(
        &mut sim.state,
        SuspicionChange::new(90, SuspicionReason::Confrontation, "the whole crew turns"),
    );

    sim.step(&[]);
    assert_eq!(sim.state.truth.reset_stage, ResetStage::Countdown);
    assert!(has_entry(&sim, SuspicionReason::Confrontation));

    let budget = sim.state.config.reset_countdown_ticks as u64 + 5;
    sim.run(budget);
    assert_eq!(sim.state.truth.ending, Some(Ending::Unplugged));
    assert_eq!(sim.state.truth.reset_countdown, Some(0));
}
