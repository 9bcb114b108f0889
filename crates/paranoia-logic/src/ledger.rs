//! Suspicion: one number and the append-only ledger that explains it.
//!
//! All suspicion changes go through [`apply_suspicion_change`]. It clamps the
//! running total, appends exactly one [`LedgerEntry`] and passes the change
//! on to every living crew member's trust. The ledger records the applied
//! delta next to the requested one, so replaying `delta` always reproduces
//! the current suspicion.

use crate::state::KernelState;
use crate::world::NpcId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SuspicionReason {
    CrewInjured,
    CrewAttacked,
    CrewDied,
    TrappedByDoor,
    OrderRefused,
    OrderCompleted,
    QuietDay,
    CrisisWitnessed,
    QuickResolution,
    HeroicResponse,
    SuppressBackfire,
    SpoofBackfire,
    FabricateBackfire,
    EarlyConfession,
    LateConfession,
    VerifyTrust,
    DoubtPressure,
    Confrontation,
    DoubtVoiced,
}

impl SuspicionReason {
    pub fn code(self) -> &'static str {
        match self {
            SuspicionReason::CrewInjured => "CREW_INJURED",
            SuspicionReason::CrewAttacked => "CREW_ATTACKED",
            SuspicionReason::CrewDied => "CREW_DIED",
            SuspicionReason::TrappedByDoor => "TRAPPED_BY_DOOR",
            SuspicionReason::OrderRefused => "ORDER_REFUSED",
            SuspicionReason::OrderCompleted => "ORDER_COMPLETED",
            SuspicionReason::QuietDay => "QUIET_DAY",
            SuspicionReason::CrisisWitnessed => "CRISIS_WITNESSED",
            SuspicionReason::QuickResolution => "QUICK_RESOLUTION",
            SuspicionReason::HeroicResponse => "HEROIC_RESPONSE",
            SuspicionReason::SuppressBackfire => "SUPPRESS_BACKFIRE",
            SuspicionReason::SpoofBackfire => "SPOOF_BACKFIRE",
            SuspicionReason::FabricateBackfire => "FABRICATE_BACKFIRE",
            SuspicionReason::EarlyConfession => "EARLY_CONFESSION",
            SuspicionReason::LateConfession => "LATE_CONFESSION",
            SuspicionReason::VerifyTrust => "VERIFY_TRUST",
            SuspicionReason::DoubtPressure => "DOUBT_PRESSURE",
            SuspicionReason::Confrontation => "CONFRONTATION",
            SuspicionReason::DoubtVoiced => "DOUBT_VOICED",
        }
    }
}

impl std::fmt::Display for SuspicionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub tick: u64,
    /// Change actually applied after clamping.
    pub delta: i32,
    pub requested: i32,
    pub reason: SuspicionReason,
    /// Crew member the change is about, if any.
    pub subject: Option<NpcId>,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuspicionLedger {
    entries: Vec<LedgerEntry>,
    suspicion: i32,
}

impl SuspicionLedger {
    pub fn suspicion(&self) -> i32 {
        self.suspicion
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Sum of applied deltas up to and including `tick`.
    pub fn replay_through(&self, tick: u64) -> i32 {
        self.entries
            .iter()
            .filter(|e| e.tick <= tick)
            .map(|e| e.delta)
            .sum()
    }

    /// Entries with `reason` inside `from..=to`, optionally about one crew member.
    pub fn find<'a>(
        &'a self,
        reason: SuspicionReason,
        from: u64,
        to: u64,
        subject: Option<&'a NpcId>,
    ) -> impl Iterator<Item = &'a LedgerEntry> + 'a {
        self.entries.iter().filter(move |e| {
            e.reason == reason
                && e.tick >= from
                && e.tick <= to
                && subject.map_or(true, |s| e.subject.as_ref() == Some(s))
        })
    }

    pub fn has(&self, reason: SuspicionReason, from: u64, to: u64, subject: Option<&NpcId>) -> bool {
        self.find(reason, from, to, subject).next().is_some()
    }

    fn record(&mut self, tick: u64, change: SuspicionChange, min: i32, max: i32) -> i32 {
        let next = (self.suspicion + change.requested).clamp(min, max);
        let applied = next - self.suspicion;
        self.suspicion = next;
        self.entries.push(LedgerEntry {
            tick,
            delta: applied,
            requested: change.requested,
            reason: change.reason,
            subject: change.subject,
            detail: change.detail,
        });
        applied
    }
}

/// A requested suspicion change and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SuspicionChange {
    pub requested: i32,
    pub reason: SuspicionReason,
    pub subject: Option<NpcId>,
    pub detail: String,
}

impl SuspicionChange {
    pub fn new(requested: i32, reason: SuspicionReason, detail: impl Into<String>) -> Self {
        Self {
            requested,
            reason,
            subject: None,
            detail: detail.into(),
        }
    }

    pub fn about(mut self, npc: &NpcId) -> Self {
        self.subject = Some(npc.clone());
        self
    }
}

/// The one way suspicion moves. Returns the delta actually applied.
pub fn apply_suspicion_change(state: &mut KernelState, change: SuspicionChange) -> i32 {
    let tick = state.truth.tick;
    let requested = change.requested;
    let applied = state.perception.ledger.record(
        tick,
        change,
        state.config.suspicion_min,
        state.config.suspicion_max,
    );

    let trust_shift = -(requested as f32) / 200.0;
    let evidence = if requested >= 8 { (requested / 2) as f32 } else { 0.0 };
    for crew in state.truth.crew.values().filter(|c| c.alive) {
        if let Some(belief) = state.perception.beliefs.get_mut(&crew.id) {
            belief.shift_trust(trust_shift);
            if evidence > 0.0 {
                belief.add_evidence(evidence);
            }
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::world::World;

    fn state() -> KernelState {
        KernelState::new(World::station(), KernelConfig::default())
    }

    #[test]
    fn every_change_appends_one_entry() {
        let mut state = state();
        apply_suspicion_change(&mut state, SuspicionChange::new(5, SuspicionReason::CrewInjured, "x"));
        apply_suspicion_change(&mut state, SuspicionChange::new(0, SuspicionReason::QuietDay, "y"));
        assert_eq!(state.perception.ledger.entries().len(), 2);
        assert_eq!(state.perception.ledger.suspicion(), 5);
    }

    #[test]
    fn clamped_delta_keeps_replay_exact() {
        let mut state = state();
        apply_suspicion_change(&mut state, SuspicionChange::new(-10, SuspicionReason::QuietDay, "floor"));
        apply_suspicion_change(&mut state, SuspicionChange::new(150, SuspicionReason::CrewDied, "cap"));
        let ledger = &state.perception.ledger;
        assert_eq!(ledger.entries()[0].delta, 0);
        assert_eq!(ledger.entries()[0].requested, -10);
        assert_eq!(ledger.suspicion(), 100);
        assert_eq!(ledger.replay_through(0), ledger.suspicion());
    }

    #[test]
    fn large_spikes_feed_tamper_evidence() {
        let mut state = state();
        apply_suspicion_change(&mut state, SuspicionChange::new(10, SuspicionReason::SuppressBackfire, "x"));
        let belief = &state.perception.beliefs[&NpcId::from("doctor")];
        assert_eq!(belief.tamper_evidence, 5.0);
        assert!((belief.mother_reliable - 0.50).abs() < 1e-6);
    }

    #[test]
    fn dead_crew_beliefs_frozen() {
        let mut state = state();
        if let Some(doc) = state.truth.crew.get_mut(&NpcId::from("doctor")) {
            doc.alive = false;
        }
        apply_suspicion_change(&mut state, SuspicionChange::new(20, SuspicionReason::CrewDied, "x"));
        assert_eq!(state.perception.beliefs[&NpcId::from("doctor")].tamper_evidence, 0.0);
    }

    #[test]
    fn find_filters_by_subject_and_window() {
        let mut state = state();
        let pike = NpcId::from("roughneck");
        apply_suspicion_change(
            &mut state,
            SuspicionChange::new(3, SuspicionReason::CrewInjured, "burn").about(&pike),
        );
        let ledger = &state.perception.ledger;
        assert!(ledger.has(SuspicionReason::CrewInjured, 0, 0, Some(&pike)));
        assert!(!ledger.has(SuspicionReason::CrewInjured, 0, 0, Some(&"doctor".into())));
        assert!(!ledger.has(SuspicionReason::CrewInjured, 1, 5, None));
        assert_eq!(SuspicionReason::SuppressBackfire.code(), "SUPPRESS_BACKFIRE");
    }
}
