//! Medical telemetry: crew dials rendered as in-universe biometrics.

use super::intent::{distrusts_mother, near_sabotage, openly_hostile, steady, unstable, wavering, IntentSignals, Rung};
use crate::state::KernelState;
use crate::world::NpcId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assessment {
    ThreatToStation,
    SabotageRisk,
    DistrustOfSystems,
    BreakdownImminent,
    MoraleDegradation,
    OptimalCompliance,
    WithinParameters,
    MonitorOffline,
    Deceased,
}

impl Assessment {
    pub fn label(self) -> &'static str {
        match self {
            Assessment::ThreatToStation => "THREAT TO STATION INTEGRITY",
            Assessment::SabotageRisk => "SABOTAGE RISK - MONITOR CLOSELY",
            Assessment::DistrustOfSystems => "EXHIBITS DISTRUST OF SYSTEMS",
            Assessment::BreakdownImminent => "PSYCHOLOGICAL BREAKDOWN IMMINENT",
            Assessment::MoraleDegradation => "MORALE DEGRADATION DETECTED",
            Assessment::OptimalCompliance => "OPTIMAL COMPLIANCE",
            Assessment::WithinParameters => "WITHIN PARAMETERS",
            Assessment::MonitorOffline => "BIO-MONITOR OFFLINE",
            Assessment::Deceased => "DECEASED",
        }
    }
}

/// Same rungs, same order as the intent ladder.
pub const ASSESSMENT_LADDER: &[(Assessment, Rung)] = &[
    (Assessment::ThreatToStation, openly_hostile),
    (Assessment::SabotageRisk, near_sabotage),
    (Assessment::DistrustOfSystems, distrusts_mother),
    (Assessment::BreakdownImminent, unstable),
    (Assessment::MoraleDegradation, wavering),
    (Assessment::OptimalCompliance, steady),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cortisol {
    Nominal,
    MildElevation,
    Elevated,
    Critical,
}

impl Cortisol {
    fn from_stress(stress: i32) -> Self {
        match stress {
            s if s > 70 => Cortisol::Critical,
            s if s > 50 => Cortisol::Elevated,
            s if s > 30 => Cortisol::MildElevation,
            _ => Cortisol::Nominal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepDebt {
    None,
    SixToTwelveHours,
    TwelveToEighteenHours,
    DayPlus,
}

impl SleepDebt {
    fn from_stress(stress: i32) -> Self {
        match stress {
            s if s > 80 => SleepDebt::DayPlus,
            s if s > 60 => SleepDebt::TwelveToEighteenHours,
            s if s > 40 => SleepDebt::SixToTwelveHours,
            _ => SleepDebt::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compliance {
    Cooperative,
    Evasive,
    Reluctant,
    NonCompliant,
    Hostile,
}

impl Compliance {
    fn from_signals(s: &IntentSignals) -> Self {
        if s.loyalty < 20 {
            Compliance::Hostile
        } else if s.loyalty < 35 {
            Compliance::NonCompliant
        } else if s.loyalty < 50 {
            Compliance::Reluctant
        } else if s.trust < 0.4 {
            Compliance::Evasive
        } else {
            Compliance::Cooperative
        }
    }
}

/// Biometrics for one crew member. Every field but `id`, `name` and
/// `assessment` is `None` when the monitor is offline or the crew member
/// is dead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricReading {
    pub id: NpcId,
    pub name: String,
    pub alive: Option<bool>,
    pub heart_rate: Option<i32>,
    pub tachycardia: bool,
    pub cortisol: Option<Cortisol>,
    pub tremor: bool,
    pub sleep_debt: Option<SleepDebt>,
    pub compliance: Option<Compliance>,
    pub assessment: Assessment,
}

impl BiometricReading {
    fn blank(id: &NpcId, name: String, alive: Option<bool>, assessment: Assessment) -> Self {
        Self {
            id: id.clone(),
            name,
            alive,
            heart_rate: None,
            tachycardia: false,
            cortisol: None,
            tremor: false,
            sleep_debt: None,
            compliance: None,
            assessment,
        }
    }
}

pub fn biometrics(state: &KernelState, npc: &NpcId) -> BiometricReading {
    let name = state
        .world
        .npc(npc)
        .map_or_else(|| npc.to_string(), |n| n.name.clone());
    if !state.truth.station.cameras_online(&state.config) {
        return BiometricReading::blank(npc, name, None, Assessment::MonitorOffline);
    }
    let Some(crew) = state.truth.crew.get(npc).filter(|c| c.alive) else {
        return BiometricReading::blank(npc, name, Some(false), Assessment::Deceased);
    };

    let signals = IntentSignals::of(crew, &state.perception.belief(npc));
    let assessment = ASSESSMENT_LADDER
        .iter()
        .find(|(_, rung)| rung(&signals, &state.config))
        .map_or(Assessment::WithinParameters, |(a, _)| *a);

    BiometricReading {
        id: npc.clone(),
        name,
        alive: Some(true),
        heart_rate: Some(65 + crew.stress * 3 / 4),
        tachycardia: crew.stress > 80,
        cortisol: Some(Cortisol::from_stress(crew.stress)),
        tremor: crew.paranoia > 40 || crew.stress > 60,
        sleep_debt: Some(SleepDebt::from_stress(crew.stress)),
        compliance: Some(Compliance::from_signals(&signals)),
        assessment,
    }
}

pub fn all_biometrics(state: &KernelState) -> Vec<BiometricReading> {
    state.world.npcs().iter().map(|n| biometrics(state, &n.id)).collect()
}
