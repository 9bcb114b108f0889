//! Paranoia Headless Kernel Harness
//!
//! Runs seeded station scenarios in-process and checks the kernel's
//! headline properties: determinism, ledger replay, suppress backfire, arc
//! cooldowns and view coverage. Finer scenarios live in the logic crate's
//! integration tests.
//!
//! Usage:
//!   cargo run -p paranoia-simtest
//!   cargo run -p paranoia-simtest -- --verbose --seed 7 --ticks 480
//!   cargo run -p paranoia-simtest -- --config tuning.json

use paranoia_logic::commands::Command;
use paranoia_logic::config::validate_config;
use paranoia_logic::doubts::DoubtSource;
use paranoia_logic::ledger::SuspicionReason;
use paranoia_logic::systems::StationSystem;
use paranoia_logic::tamper::TamperStatus;
use paranoia_logic::truth::Ending;
use paranoia_logic::world::{NpcId, PlaceId};
use paranoia_logic::{KernelConfig, Simulation, World};
use serde::Serialize;
use std::collections::BTreeSet;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

struct Options {
    verbose: bool,
    seed: u64,
    ticks: u64,
    config: KernelConfig,
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_options() -> Result<Options, String> {
    let args: Vec<String> = std::env::args().collect();
    let seed = match arg_value(&args, "--seed") {
        Some(s) => s.parse().map_err(|e| format!("bad --seed {}: {}", s, e))?,
        None => 42,
    };
    let ticks = match arg_value(&args, "--ticks") {
        Some(s) => s.parse().map_err(|e| format!("bad --ticks {}: {}", s, e))?,
        None => 480,
    };
    let config = match arg_value(&args, "--config") {
        Some(path) => {
            let text = std::fs::read_to_string(&path).map_err(|e| format!("cannot read {}: {}", path, e))?;
            serde_json::from_str(&text).map_err(|e| format!("bad config {}: {}", path, e))?
        }
        None => KernelConfig::default(),
    };
    Ok(Options {
        verbose: args.iter().any(|a| a == "--verbose"),
        seed,
        ticks,
        config,
    })
}

fn main() {
    let opts = match parse_options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    println!("=== Paranoia Kernel Harness (seed {}) ===\n", opts.seed);

    let mut results = Vec::new();

    // 1. Configuration
    results.extend(validate_configuration(&opts));

    // 2. Determinism & snapshots
    results.extend(validate_determinism(&opts));

    // 3. Suspicion ledger
    results.extend(validate_ledger(&opts));

    // 4. Suppress backfire scenario
    results.extend(validate_suppress(&opts));

    // 5. Arc cooldowns
    results.push(validate_arcs(&opts));

    // 6. Perception views
    results.extend(validate_views(&opts));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || opts.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!("\n=== RESULT: {}/{} passed, {} failed ===", passed, total, failed);

    if failed > 0 {
        std::process::exit(1);
    }
}

fn sim(opts: &Options, config: KernelConfig) -> Simulation {
    Simulation::new(World::station(), config, opts.seed)
}

/// A short command script exercising every tamper op.
fn script(tick: u64) -> Vec<Command> {
    match tick {
        3 => vec![Command::Suppress(StationSystem::Thermal)],
        10 => vec![Command::Spoof(StationSystem::Air)],
        20 => vec![Command::Fabricate("specialist".into())],
        25 => vec![Command::Alert(StationSystem::Thermal)],
        40 => vec![Command::Verify { doubt: None }],
        60 => vec![Command::Scan("mines".into())],
        _ => Vec::new(),
    }
}

// ── 1. Configuration ────────────────────────────────────────────────────

fn validate_configuration(opts: &Options) -> Vec<TestResult> {
    println!("--- Configuration ---");
    let errors = validate_config(&opts.config);
    let mut results = vec![TestResult {
        name: "config_valid".into(),
        passed: errors.is_empty(),
        detail: if errors.is_empty() {
            format!("{} ticks/day, {} days to survive", opts.config.ticks_per_day, opts.config.win_days)
        } else {
            errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
        },
    }];

    let round_trip = serde_json::to_string(&opts.config)
        .ok()
        .and_then(|json| serde_json::from_str::<KernelConfig>(&json).ok());
    results.push(TestResult {
        name: "config_json_round_trip".into(),
        passed: round_trip.as_ref() == Some(&opts.config),
        detail: "config survives serde_json".into(),
    });
    results
}

// ── 2. Determinism ──────────────────────────────────────────────────────

fn validate_determinism(opts: &Options) -> Vec<TestResult> {
    println!("--- Determinism ---");
    let mut results = Vec::new();

    let run = || {
        let mut s = sim(opts, opts.config.clone());
        for tick in 0..opts.ticks {
            s.step(&script(tick));
        }
        s
    };
    let a = run();
    let b = run();
    let (fa, fb) = (a.state.fingerprint(), b.state.fingerprint());
    let identical = matches!((&fa, &fb), (Ok(x), Ok(y)) if x == y);
    results.push(TestResult {
        name: "same_seed_same_state".into(),
        passed: identical,
        detail: format!(
            "{} ticks, {} bytes of state",
            a.tick(),
            fa.as_ref().map_or(0, |bytes| bytes.len())
        ),
    });

    let restored = fa
        .as_ref()
        .ok()
        .and_then(|bytes| paranoia_logic::KernelState::restore(bytes).ok());
    results.push(TestResult {
        name: "snapshot_restores".into(),
        passed: restored.as_ref() == Some(&a.state),
        detail: "bincode fingerprint decodes to the same state".into(),
    });

    results
}

// ── 3. Ledger ───────────────────────────────────────────────────────────

fn validate_ledger(opts: &Options) -> Vec<TestResult> {
    println!("--- Suspicion Ledger ---");
    let mut s = sim(opts, opts.config.clone());
    let mut mismatches = 0;
    let mut out_of_bounds = 0;
    for tick in 0..opts.ticks {
        s.step(&script(tick));
        let ledger = &s.state.perception.ledger;
        let sum: i32 = ledger.entries().iter().map(|e| e.delta).sum();
        if sum != ledger.suspicion() {
            mismatches += 1;
        }
        if ledger.suspicion() < opts.config.suspicion_min || ledger.suspicion() > opts.config.suspicion_max {
            out_of_bounds += 1;
        }
    }

    if opts.verbose {
        println!("  Ledger tail:");
        for e in s.state.perception.ledger.entries().iter().rev().take(8) {
            println!("    t={:<4} {:>+3} {:<20} {}", e.tick, e.delta, e.reason.code(), e.detail);
        }
    }

    vec![
        TestResult {
            name: "ledger_replays".into(),
            passed: mismatches == 0,
            detail: format!(
                "{} entries, suspicion {}",
                s.state.perception.ledger.entries().len(),
                s.suspicion()
            ),
        },
        TestResult {
            name: "ledger_bounded".into(),
            passed: out_of_bounds == 0,
            detail: format!("{}..={}", opts.config.suspicion_min, opts.config.suspicion_max),
        },
    ]
}

// ── 4. Suppress ─────────────────────────────────────────────────────────

fn validate_suppress(opts: &Options) -> Vec<TestResult> {
    println!("--- SUPPRESS ---");
    // No arcs, so nothing muddies the suppression.
    let mut s = sim(
        opts,
        KernelConfig {
            max_active_arcs: 0,
            ..opts.config.clone()
        },
    );
    if let Some(crew) = s.state.truth.crew.get_mut(&NpcId::from("engineer")) {
        crew.place = "engineering".into();
        crew.next_move_tick = u64::MAX / 2;
    }
    if let Some(room) = s.state.truth.rooms.get_mut(&PlaceId::from("engineering")) {
        room.on_fire = true;
        room.temperature = 30.0;
    }
    s.step(&[Command::Suppress(StationSystem::Thermal)]);
    while s.tick() < s.state.config.suppress_window_ticks && !s.is_over() {
        s.step(&[]);
    }

    let status = s.state.perception.tamper_ops.first().map(|op| op.status);
    let backfire_doubts = s
        .state
        .perception
        .doubts
        .iter()
        .filter(|d| d.source == DoubtSource::Backfire)
        .count();
    let spiked: Vec<i32> = s
        .state
        .perception
        .ledger
        .entries()
        .iter()
        .filter(|e| e.reason == SuspicionReason::SuppressBackfire)
        .map(|e| e.requested)
        .collect();

    vec![
        TestResult {
            name: "suppress_backfires".into(),
            passed: status == Some(TamperStatus::Backfired),
            detail: format!("op status {:?}", status),
        },
        TestResult {
            name: "suppress_one_doubt".into(),
            passed: backfire_doubts == 1,
            detail: format!("{} backfire doubts", backfire_doubts),
        },
        TestResult {
            name: "suppress_ledger_entry".into(),
            passed: spiked.len() == 1,
            detail: format!("spikes {:?}", spiked),
        },
    ]
}

// ── 5. Arcs ───────────────────────────────────────────────────────────────

fn validate_arcs(opts: &Options) -> TestResult {
    println!("--- Arcs ---");
    let mut s = sim(
        opts,
        KernelConfig {
            arc_activation_chance: 100,
            ..opts.config.clone()
        },
    );
    let mut seen = BTreeSet::new();
    let mut violations = 0;
    for _ in 0..opts.ticks {
        if s.is_over() {
            break;
        }
        let tick = s.tick();
        let cooldowns = s.state.truth.arc_cooldowns.clone();
        s.step(&[]);
        for arc in &s.state.truth.arcs {
            if seen.insert(arc.id.clone()) && cooldowns.get(&arc.kind).map_or(false, |&until| tick < until) {
                violations += 1;
            }
        }
    }
    TestResult {
        name: "arc_cooldown_respected".into(),
        passed: violations == 0,
        detail: format!("{} arcs started, {} crises logged", seen.len(), s.state.truth.crisis_log.len()),
    }
}

// ── 6. Perception Views ─────────────────────────────────────────────────

#[derive(Serialize)]
struct RunSummary {
    tick: u64,
    day: u32,
    ending: Option<Ending>,
    suspicion: i32,
    open_doubts: usize,
    tamper_ops: usize,
}

fn validate_views(opts: &Options) -> Vec<TestResult> {
    println!("--- Perception Views ---");
    let mut results = Vec::new();
    let mut s = sim(opts, opts.config.clone());
    for tick in 0..opts.ticks {
        if s.is_over() {
            break;
        }
        s.step(&script(tick));
    }

    let station = s.station();
    let rooms = s.rooms();
    let crew = s.crew();
    let threats = s.threats();
    let bios = s.biometrics();

    results.push(TestResult {
        name: "views_cover_station".into(),
        passed: rooms.len() == s.state.world.place_ids().len() && crew.len() == bios.len(),
        detail: format!("{} rooms, {} crew, {} threats", rooms.len(), crew.len(), threats.len()),
    });
    results.push(TestResult {
        name: "blackout_hides_telemetry".into(),
        passed: !station.blackout || (station.power.is_none() && threats.is_empty()),
        detail: format!("blackout {}, cameras offline {}", station.blackout, station.cameras_offline),
    });

    if opts.verbose {
        let summary = RunSummary {
            tick: s.tick(),
            day: s.state.truth.day,
            ending: s.state.truth.ending,
            suspicion: s.suspicion(),
            open_doubts: s.state.perception.doubts.len(),
            tamper_ops: s.state.perception.tamper_ops.len(),
        };
        if let Ok(json) = serde_json::to_string_pretty(&summary) {
            println!("{}", json);
        }
        println!("  Crew:");
        for c in &crew {
            let place = c.place.as_ref().map_or("?", |p| p.as_str());
            println!("    {:18} {:12} {}", c.name, place, c.intent);
        }
        println!("  Threats:");
        for t in &threats {
            println!("    {:?} {:?} {:?}: {}", t.severity, t.confidence, t.channel, t.message);
        }
        println!("  Biometrics:");
        for b in &bios {
            println!(
                "    {:18} hr {:>4} {}",
                b.name,
                b.heart_rate.map_or("--".to_string(), |h| h.to_string()),
                b.assessment.label()
            );
        }
    }

    results
}
