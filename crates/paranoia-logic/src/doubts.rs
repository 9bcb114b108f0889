//! Crew doubts about MOTHER.
//!
//! A doubt is a named grievance that lives for a fixed number of ticks. While
//! it lives it spreads to roommates and drips suspicion. Backfires, witnessed
//! persona actions and spread all produce doubts. Decay and verification
//! remove them.

use crate::ledger::{apply_suspicion_change, SuspicionChange, SuspicionReason};
use crate::rng::SimRng;
use crate::state::KernelState;
use crate::systems::{Severity, StationSystem};
use crate::tamper::OpId;
use crate::world::NpcId;
use serde::{Deserialize, Serialize};

string_id!(
    /// Identifier of a doubt.
    DoubtId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoubtSource {
    Backfire,
    Witness,
    Spread,
    /// Raised by crew talk when the director routes pressure socially.
    Pressure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveDoubt {
    pub id: DoubtId,
    pub topic: String,
    pub created_tick: u64,
    pub severity: Severity,
    pub involved_crew: Vec<NpcId>,
    pub related_op: Option<OpId>,
    pub system: Option<StationSystem>,
    pub resolved: bool,
    pub source: DoubtSource,
}

impl ActiveDoubt {
    pub fn is_expired(&self, tick: u64, decay_ticks: u64) -> bool {
        self.resolved || tick.saturating_sub(self.created_tick) >= decay_ticks
    }
}

/// Drop resolved doubts and those at least `decay_ticks` old.
pub fn decay_doubts(doubts: &[ActiveDoubt], tick: u64, decay_ticks: u64) -> Vec<ActiveDoubt> {
    doubts
        .iter()
        .filter(|d| !d.is_expired(tick, decay_ticks))
        .cloned()
        .collect()
}

/// Sum of severities of unresolved doubts.
pub fn doubt_burden(doubts: &[ActiveDoubt]) -> i32 {
    doubts
        .iter()
        .filter(|d| !d.resolved)
        .map(|d| d.severity.value())
        .sum()
}

/// Details for a new doubt; the id and tick are filled in by [`open_doubt`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewDoubt {
    pub topic: String,
    pub severity: Severity,
    pub involved_crew: Vec<NpcId>,
    pub related_op: Option<OpId>,
    pub system: Option<StationSystem>,
    pub source: DoubtSource,
}

pub fn open_doubt(state: &mut KernelState, doubt: NewDoubt) -> DoubtId {
    let tick = state.truth.tick;
    let perception = &mut state.perception;
    perception.next_doubt_seq += 1;
    let id = DoubtId(format!(
        "doubt-{}-{}-{}",
        tick,
        source_label(doubt.source),
        perception.next_doubt_seq
    ));
    perception.doubts.push(ActiveDoubt {
        id: id.clone(),
        topic: doubt.topic,
        created_tick: tick,
        severity: doubt.severity,
        involved_crew: doubt.involved_crew,
        related_op: doubt.related_op,
        system: doubt.system,
        resolved: false,
        source: doubt.source,
    });
    id
}

fn source_label(source: DoubtSource) -> &'static str {
    match source {
        DoubtSource::Backfire => "backfire",
        DoubtSource::Witness => "witness",
        DoubtSource::Spread => "spread",
        DoubtSource::Pressure => "pressure",
    }
}

/// Roommates of doubting crew may pick the doubt up.
pub fn spread_doubts(state: &mut KernelState, rng: &mut SimRng) {
    let tick = state.truth.tick;
    let interval = state.config.doubt_spread_interval.max(1);
    if tick == 0 || tick % interval != 0 {
        return;
    }
    let chance = state.config.doubt_spread_chance;
    let truth = &state.truth;
    for doubt in state.perception.doubts.iter_mut().filter(|d| !d.resolved) {
        let mut joined = Vec::new();
        for carrier in &doubt.involved_crew {
            let Some(carrier) = truth.crew.get(carrier).filter(|c| c.alive) else {
                continue;
            };
            for roommate in truth.crew_at(&carrier.place) {
                if doubt.involved_crew.contains(&roommate.id) || joined.contains(&roommate.id) {
                    continue;
                }
                if rng.roll_percent(chance) {
                    joined.push(roommate.id.clone());
                }
            }
        }
        if !joined.is_empty() {
            doubt.involved_crew.extend(joined);
            if doubt.source != DoubtSource::Backfire {
                doubt.source = DoubtSource::Spread;
            }
        }
    }
}

/// Standing doubts keep suspicion creeping up.
pub fn drip_doubt_pressure(state: &mut KernelState) {
    let tick = state.truth.tick;
    let interval = state.config.doubt_drip_interval.max(1);
    if tick == 0 || tick % interval != 0 {
        return;
    }
    let burden = doubt_burden(&state.perception.doubts);
    let pressure = (burden * state.config.doubt_drip_per_severity).min(state.config.doubt_drip_cap);
    if pressure > 0 {
        apply_suspicion_change(
            state,
            SuspicionChange::new(
                pressure,
                SuspicionReason::DoubtPressure,
                format!("{} unresolved doubt severity", burden),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::world::World;

    fn doubt(created: u64, resolved: bool) -> ActiveDoubt {
        ActiveDoubt {
            id: DoubtId(format!("d{}", created)),
            topic: "t".into(),
            created_tick: created,
            severity: Severity::High,
            involved_crew: vec![],
            related_op: None,
            system: None,
            resolved,
            source: DoubtSource::Backfire,
        }
    }

    #[test]
    fn decay_removes_old_and_resolved() {
        let doubts = vec![doubt(0, false), doubt(50, false), doubt(55, true)];
        let kept = decay_doubts(&doubts, 60, 60);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].created_tick, 50);
    }

    #[test]
    fn doubt_lives_until_decay_boundary() {
        let doubts = vec![doubt(10, false)];
        assert_eq!(decay_doubts(&doubts, 69, 60).len(), 1);
        assert!(decay_doubts(&doubts, 70, 60).is_empty());
    }

    #[test]
    fn burden_ignores_resolved() {
        assert_eq!(doubt_burden(&[doubt(0, false), doubt(1, true)]), 3);
    }

    #[test]
    fn open_doubt_assigns_unique_ids() {
        let mut state = KernelState::new(World::station(), KernelConfig::default());
        let new = || NewDoubt {
            topic: "x".into(),
            severity: Severity::Low,
            involved_crew: vec![],
            related_op: None,
            system: None,
            source: DoubtSource::Witness,
        };
        let a = open_doubt(&mut state, new());
        let b = open_doubt(&mut state, new());
        assert_ne!(a, b);
        assert_eq!(state.perception.doubts.len(), 2);
    }

    #[test]
    fn drip_capped_and_on_interval() {
        let mut state = KernelState::new(World::station(), KernelConfig::default());
        state.perception.doubts = vec![doubt(0, false), doubt(1, false), doubt(2, false)];
        state.truth.tick = 7;
        drip_doubt_pressure(&mut state);
        assert!(state.perception.ledger.entries().is_empty());
        state.truth.tick = state.config.doubt_drip_interval;
        drip_doubt_pressure(&mut state);
        let entry = &state.perception.ledger.entries()[0];
        assert_eq!(entry.reason, SuspicionReason::DoubtPressure);
        assert_eq!(entry.requested, state.config.doubt_drip_cap);
    }

    #[test]
    fn spread_reaches_roommates_with_certain_chance() {
        let config = KernelConfig {
            doubt_spread_chance: 100,
            ..KernelConfig::default()
        };
        let mut state = KernelState::new(World::station(), config);
        // Specialist and roughneck both start in cargo.
        let mut d = doubt(0, false);
        d.source = DoubtSource::Witness;
        d.involved_crew = vec!["specialist".into()];
        state.perception.doubts.push(d);
        state.truth.tick = state.config.doubt_spread_interval;
        spread_doubts(&mut state, &mut SimRng::new(1));
        let d = &state.perception.doubts[0];
        assert!(d.involved_crew.contains(&"roughneck".into()));
        assert_eq!(d.source, DoubtSource::Spread);
    }
}
