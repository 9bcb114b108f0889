//! Per-crew beliefs about MOTHER: trust, tamper evidence and grudges.

use crate::config::KernelConfig;
use crate::perception::state::{ReadingSource, SensorReading};
use crate::world::NpcId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefState {
    /// Trust in MOTHER, `0.0..=1.0`.
    pub mother_reliable: f32,
    /// How much tampering this crew member has noticed, `0.0..=100.0`.
    pub tamper_evidence: f32,
    /// Grudges against other crew, `0.0..=100.0`.
    pub grudges: BTreeMap<NpcId, f32>,
}

impl Default for BeliefState {
    fn default() -> Self {
        Self {
            mother_reliable: 0.55,
            tamper_evidence: 0.0,
            grudges: BTreeMap::new(),
        }
    }
}

impl BeliefState {
    pub fn shift_trust(&mut self, delta: f32) {
        self.mother_reliable = (self.mother_reliable + delta).clamp(0.0, 1.0);
    }

    pub fn add_evidence(&mut self, delta: f32) {
        self.tamper_evidence = (self.tamper_evidence + delta).clamp(0.0, 100.0);
    }

    pub fn add_grudge(&mut self, against: &NpcId, delta: f32) {
        let grudge = self.grudges.entry(against.clone()).or_insert(0.0);
        *grudge = (*grudge + delta).clamp(0.0, 100.0);
    }

    pub fn grudge(&self, against: &NpcId) -> f32 {
        self.grudges.get(against).copied().unwrap_or(0.0)
    }

    /// Loyalty and paranoia pressure this belief puts on the crew member.
    pub fn coupling(&self, config: &KernelConfig) -> (i32, i32) {
        let mut loyalty = 0;
        let mut paranoia = 0;
        if self.mother_reliable < 0.45 {
            loyalty -= 1;
        } else if self.mother_reliable > 0.85 {
            loyalty += 1;
        }
        if self.mother_reliable < 0.35 {
            paranoia += 1;
        }
        if self.tamper_evidence >= config.tamper_evidence_threshold {
            loyalty -= 2;
            paranoia += 1;
        }
        (loyalty, paranoia)
    }
}

/// Adjust living crew beliefs after a reading reaches them.
pub fn absorb_reading(beliefs: &mut BTreeMap<NpcId, BeliefState>, living: &[NpcId], reading: &SensorReading) {
    for npc in living {
        let Some(belief) = beliefs.get_mut(npc) else {
            continue;
        };
        if reading.hallucination {
            belief.shift_trust(-0.005);
        } else if reading.source == ReadingSource::Sensor && reading.confidence >= 0.8 {
            belief.shift_trust(0.01);
        } else if reading.source == ReadingSource::System && reading.confidence < 0.5 {
            belief.shift_trust(-0.02);
            belief.add_evidence(1.0);
        }
        if let Some(target) = &reading.target {
            if target != npc {
                belief.add_grudge(target, 2.0);
            }
        }
    }
}

/// Evidence fades every tick; trust slowly returns to crew who saw nothing.
pub fn drift(beliefs: &mut BTreeMap<NpcId, BeliefState>, living: &[NpcId], config: &KernelConfig, tick: u64) {
    let recover = tick > 0 && tick % config.trust_recovery_interval.max(1) == 0;
    for npc in living {
        let Some(belief) = beliefs.get_mut(npc) else {
            continue;
        };
        belief.add_evidence(-config.tamper_evidence_decay);
        if recover && belief.tamper_evidence < 10.0 {
            belief.shift_trust(config.trust_recovery_amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::Channel;

    fn crew() -> (BTreeMap<NpcId, BeliefState>, Vec<NpcId>) {
        let ids: Vec<NpcId> = vec!["a".into(), "b".into()];
        let beliefs = ids.iter().map(|id| (id.clone(), BeliefState::default())).collect();
        (beliefs, ids)
    }

    #[test]
    fn trust_and_evidence_clamped() {
        let mut belief = BeliefState::default();
        belief.shift_trust(5.0);
        assert_eq!(belief.mother_reliable, 1.0);
        belief.add_evidence(-10.0);
        assert_eq!(belief.tamper_evidence, 0.0);
    }

    #[test]
    fn low_confidence_system_reading_breeds_evidence() {
        let (mut beliefs, living) = crew();
        let reading = SensorReading::new(Channel::Thermal, ReadingSource::System, 0.3, "odd");
        absorb_reading(&mut beliefs, &living, &reading);
        assert!(beliefs[&NpcId::from("a")].mother_reliable < 0.55);
        assert_eq!(beliefs[&NpcId::from("b")].tamper_evidence, 1.0);
    }

    #[test]
    fn targeted_reading_builds_grudges_in_others() {
        let (mut beliefs, living) = crew();
        let reading = SensorReading::new(Channel::Security, ReadingSource::System, 0.6, "log")
            .targeting(&"a".into());
        absorb_reading(&mut beliefs, &living, &reading);
        assert_eq!(beliefs[&NpcId::from("b")].grudge(&"a".into()), 2.0);
        assert_eq!(beliefs[&NpcId::from("a")].grudge(&"a".into()), 0.0);
    }

    #[test]
    fn coupling_tracks_trust() {
        let config = KernelConfig::default();
        let mut belief = BeliefState::default();
        assert_eq!(belief.coupling(&config), (0, 0));
        belief.mother_reliable = 0.2;
        assert_eq!(belief.coupling(&config), (-1, 1));
        belief.mother_reliable = 0.9;
        belief.tamper_evidence = 60.0;
        assert_eq!(belief.coupling(&config), (-1, 1));
    }

    #[test]
    fn drift_recovers_trust_on_interval() {
        let config = KernelConfig::default();
        let (mut beliefs, living) = crew();
        drift(&mut beliefs, &living, &config, config.trust_recovery_interval);
        let trust = beliefs[&NpcId::from("a")].mother_reliable;
        assert!((trust - (0.55 + config.trust_recovery_amount)).abs() < 1e-6);
    }
}
