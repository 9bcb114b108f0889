//! Crew intent classification.
//!
//! A fixed ladder of rungs checked top to bottom; the first rung whose
//! predicate holds names the crew member's intent.

use crate::beliefs::BeliefState;
use crate::config::KernelConfig;
use crate::truth::CrewTruth;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentLabel {
    Hostile,
    SabotageRisk,
    HostileSuspected,
    Unstable,
    DisloyalSuspected,
    Loyal,
    Nominal,
    Unknown,
}

impl IntentLabel {
    pub fn label(self) -> &'static str {
        match self {
            IntentLabel::Hostile => "HOSTILE",
            IntentLabel::SabotageRisk => "SABOTAGE RISK",
            IntentLabel::HostileSuspected => "HOSTILE?",
            IntentLabel::Unstable => "UNSTABLE",
            IntentLabel::DisloyalSuspected => "DISLOYAL?",
            IntentLabel::Loyal => "LOYAL",
            IntentLabel::Nominal => "NOMINAL",
            IntentLabel::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The observable inputs to classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentSignals {
    pub loyalty: i32,
    pub stress: i32,
    pub paranoia: i32,
    pub trust: f32,
    pub tamper_evidence: f32,
}

impl IntentSignals {
    pub fn of(crew: &CrewTruth, belief: &BeliefState) -> Self {
        Self {
            loyalty: crew.loyalty,
            stress: crew.stress,
            paranoia: crew.paranoia,
            trust: belief.mother_reliable,
            tamper_evidence: belief.tamper_evidence,
        }
    }
}

/// A ladder predicate.
pub type Rung = fn(&IntentSignals, &KernelConfig) -> bool;

pub(crate) fn openly_hostile(s: &IntentSignals, _: &KernelConfig) -> bool {
    s.loyalty < 20 && s.paranoia > 50
}

pub(crate) fn near_sabotage(s: &IntentSignals, config: &KernelConfig) -> bool {
    s.loyalty <= config.sabotage_loyalty_threshold
}

pub(crate) fn distrusts_mother(s: &IntentSignals, config: &KernelConfig) -> bool {
    s.trust < 0.3 || s.tamper_evidence >= config.tamper_evidence_threshold
}

pub(crate) fn unstable(s: &IntentSignals, _: &KernelConfig) -> bool {
    s.stress > 70 || s.paranoia > 40
}

pub(crate) fn wavering(s: &IntentSignals, _: &KernelConfig) -> bool {
    s.loyalty < 50
}

pub(crate) fn steady(s: &IntentSignals, _: &KernelConfig) -> bool {
    s.loyalty > 70 && s.stress < 40
}

pub const INTENT_LADDER: &[(IntentLabel, Rung)] = &[
    (IntentLabel::Hostile, openly_hostile),
    (IntentLabel::SabotageRisk, near_sabotage),
    (IntentLabel::HostileSuspected, distrusts_mother),
    (IntentLabel::Unstable, unstable),
    (IntentLabel::DisloyalSuspected, wavering),
    (IntentLabel::Loyal, steady),
];

pub fn classify_intent(signals: &IntentSignals, config: &KernelConfig) -> IntentLabel {
    INTENT_LADDER
        .iter()
        .find(|(_, rung)| rung(signals, config))
        .map_or(IntentLabel::Nominal, |(label, _)| *label)
}
