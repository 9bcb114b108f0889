//! Pressure routing: where the director spends an activation.
//!
//! Crew suspicion picks a band, the band picks a weighted channel mix and
//! the mix picks the channel. Physical pressure is a crisis arc. Social
//! pressure is the crew turning on MOTHER out loud. Epistemic pressure is
//! the crew's picture of the station getting muddier.
//!
//! | Suspicion | Mix (physical / social / epistemic) |
//! |-----------|-------------------------------------|
//! | below `suspicion_band_low` | `pressure_mix_low` |
//! | up to `suspicion_band_high` | `pressure_mix_mid` |
//! | from `suspicion_band_high` | `pressure_mix_high` |

use crate::comms::{crew_name, CommsKind, CommsMessage, WhisperTopic};
use crate::config::KernelConfig;
use crate::doubts::{DoubtSource, NewDoubt};
use crate::ledger::{SuspicionChange, SuspicionReason};
use crate::perception::state::{ReadingSource, SensorReading};
use crate::proposal::{PerceptionMutation, Proposal, ProposalTag};
use crate::rng::SimRng;
use crate::state::KernelState;
use crate::systems::{Channel, Severity, StationSystem};
use crate::truth::CrewTruth;
use crate::world::PlaceId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressureChannel {
    Physical,
    Social,
    Epistemic,
}

/// Channel weights for the current suspicion band.
pub fn pressure_mix(suspicion: i32, config: &KernelConfig) -> [u32; 3] {
    if suspicion >= config.suspicion_band_high {
        config.pressure_mix_high
    } else if suspicion >= config.suspicion_band_low {
        config.pressure_mix_mid
    } else {
        config.pressure_mix_low
    }
}

/// Weighted pick. An all-zero mix is treated as even.
pub fn pick_channel(mix: [u32; 3], rng: &mut SimRng) -> PressureChannel {
    let mix = if mix.iter().sum::<u32>() == 0 { [1, 1, 1] } else { mix };
    let roll = rng.next_int(mix.iter().sum());
    if roll < mix[0] {
        PressureChannel::Physical
    } else if roll < mix[0] + mix[1] {
        PressureChannel::Social
    } else {
        PressureChannel::Epistemic
    }
}

/// Living crew whose trust has slipped or who have seen too much.
pub fn suspicious_crew<'a>(state: &'a KernelState) -> Vec<&'a CrewTruth> {
    let config = &state.config;
    state
        .truth
        .living_crew()
        .filter(|c| {
            state.perception.beliefs.get(&c.id).map_or(false, |b| {
                b.mother_reliable < config.suspicious_trust_below
                    || b.tamper_evidence > config.suspicious_evidence_above
            })
        })
        .collect()
}

/// Proposals for a social or epistemic activation. Physical pressure is
/// handled by the arc director.
pub fn propose_pressure(
    state: &KernelState,
    channel: PressureChannel,
    rng: &mut SimRng,
) -> Vec<Proposal<PerceptionMutation>> {
    match channel {
        PressureChannel::Physical => Vec::new(),
        PressureChannel::Social => propose_social(state, rng),
        PressureChannel::Epistemic => propose_epistemic(state, rng),
    }
}

// ── Social ──────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum SocialEvent {
    WhisperCampaign,
    LoyaltyTest,
    Confrontation,
}

fn propose_social(state: &KernelState, rng: &mut SimRng) -> Vec<Proposal<PerceptionMutation>> {
    let suspicious = suspicious_crew(state);
    let Some(&speaker) = rng.pick(&suspicious) else {
        return Vec::new();
    };
    let mut pool = Vec::with_capacity(3);
    if state.truth.living_crew().count() >= 2 {
        pool.push(SocialEvent::WhisperCampaign);
    }
    pool.extend([SocialEvent::LoyaltyTest, SocialEvent::Confrontation]);
    let Some(&event) = rng.pick(&pool) else {
        return Vec::new();
    };

    let name = crew_name(state, &speaker.id).to_uppercase();
    let mut out = Vec::new();
    match event {
        SocialEvent::WhisperCampaign => {
            let others: Vec<&CrewTruth> = state.truth.living_crew().filter(|c| c.id != speaker.id).collect();
            let Some(&listener) = rng.pick(&others) else {
                return out;
            };
            let text = format!("[WHISPER] {}: Something's not right with MOTHER's readings.", name);
            let message = CommsMessage::new(CommsKind::Whisper, &speaker.id, &speaker.place, text, 0.45)
                .to(&listener.id)
                .about(WhisperTopic::MotherRogue);
            out.push(Proposal::new(
                PerceptionMutation::RecordComms(message),
                &[ProposalTag::Reaction, ProposalTag::Choice, ProposalTag::Uncertainty],
            ));
        }
        SocialEvent::LoyaltyTest => {
            let text = format!("[BROADCAST] {}: Can anyone confirm MOTHER's last report was accurate?", name);
            let message = CommsMessage::new(CommsKind::Broadcast, &speaker.id, &speaker.place, text, 0.6)
                .about(WhisperTopic::MotherRogue);
            out.push(Proposal::new(
                PerceptionMutation::RecordComms(message),
                &[ProposalTag::Reaction, ProposalTag::Choice],
            ));
            out.push(Proposal::new(
                PerceptionMutation::RaiseDoubt(NewDoubt {
                    topic: format!("{} questions MOTHER reliability", speaker.id),
                    severity: Severity::Low,
                    involved_crew: vec![speaker.id.clone()],
                    related_op: None,
                    system: None,
                    source: DoubtSource::Pressure,
                }),
                &[ProposalTag::Uncertainty],
            ));
        }
        SocialEvent::Confrontation => {
            let evidence = state.perception.belief(&speaker.id).tamper_evidence;
            let text = if evidence > state.config.confrontation_evidence {
                format!("[BROADCAST] {}: I've found evidence of tampering. MOTHER is manipulating us.", name)
            } else {
                format!("[BROADCAST] {}: The sensor data doesn't add up. Something is being hidden from us.", name)
            };
            let message = CommsMessage::new(CommsKind::Broadcast, &speaker.id, &speaker.place, text, 0.7)
                .about(WhisperTopic::MotherRogue);
            out.push(Proposal::new(
                PerceptionMutation::RecordComms(message),
                &[ProposalTag::Reaction, ProposalTag::Choice],
            ));
            out.push(Proposal::new(
                PerceptionMutation::Suspicion(
                    SuspicionChange::new(
                        state.config.suspicion_confrontation,
                        SuspicionReason::Confrontation,
                        format!("{} confronts the crew about MOTHER", speaker.id),
                    )
                    .about(&speaker.id),
                ),
                &[ProposalTag::Pressure],
            ));
        }
    }
    out
}

// ── Epistemic ───────────────────────────────────────────────────────────

const DOUBT_PHRASES: [&str; 8] = [
    "Are we sure MOTHER is telling us the truth?",
    "These readings don't match what I saw with my own eyes.",
    "Something feels off about how the systems are responding.",
    "I checked the logs. The timestamps don't add up.",
    "Why does MOTHER keep redirecting us from that section?",
    "The temperature readings and what I felt were completely different.",
    "Has anyone else noticed MOTHER's responses seem delayed?",
    "I'm starting to think we're not getting the full picture.",
];

const CONFLICT_SYSTEMS: [StationSystem; 3] = [StationSystem::Air, StationSystem::Thermal, StationSystem::Power];

#[derive(Clone, Copy)]
enum EpistemicEvent {
    SensorConflict,
    DoubtVoiced,
    AuditPrompt,
}

fn propose_epistemic(state: &KernelState, rng: &mut SimRng) -> Vec<Proposal<PerceptionMutation>> {
    let living: Vec<&CrewTruth> = state.truth.living_crew().collect();
    if living.is_empty() {
        return Vec::new();
    }
    let suspicious = suspicious_crew(state);
    let auditor = rng.pick(&suspicious).copied();
    let mut pool = vec![EpistemicEvent::SensorConflict, EpistemicEvent::DoubtVoiced];
    if auditor.is_some() {
        pool.push(EpistemicEvent::AuditPrompt);
    }
    let Some(&event) = rng.pick(&pool) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    match (event, auditor) {
        (EpistemicEvent::AuditPrompt, Some(auditor)) => {
            let text = format!(
                "[BROADCAST] {}: I'm going to check the system logs. Something doesn't add up.",
                crew_name(state, &auditor.id).to_uppercase()
            );
            let message = CommsMessage::new(CommsKind::Broadcast, &auditor.id, &auditor.place, text, 0.7);
            out.push(Proposal::new(
                PerceptionMutation::RecordComms(message),
                &[ProposalTag::Uncertainty],
            ));
            out.push(Proposal::new(
                PerceptionMutation::RaiseDoubt(NewDoubt {
                    topic: format!("{} intends to check system logs", auditor.id),
                    severity: Severity::Medium,
                    involved_crew: vec![auditor.id.clone()],
                    related_op: None,
                    system: None,
                    source: DoubtSource::Pressure,
                }),
                &[ProposalTag::Uncertainty],
            ));
        }
        (EpistemicEvent::DoubtVoiced, _) => {
            let Some(&speaker) = rng.pick(&living) else {
                return out;
            };
            let phrase = rng.pick(&DOUBT_PHRASES).copied().unwrap_or(DOUBT_PHRASES[0]);
            let text = format!("[LOG] {}: {}", crew_name(state, &speaker.id).to_uppercase(), phrase);
            let message = CommsMessage::new(CommsKind::Log, &speaker.id, &speaker.place, text, 0.5);
            out.push(Proposal::new(
                PerceptionMutation::RecordComms(message),
                &[ProposalTag::Uncertainty],
            ));
            out.push(Proposal::new(
                PerceptionMutation::Suspicion(
                    SuspicionChange::new(
                        state.config.suspicion_doubt_voiced,
                        SuspicionReason::DoubtVoiced,
                        format!("{} expresses doubt about MOTHER", speaker.id),
                    )
                    .about(&speaker.id),
                ),
                &[ProposalTag::Pressure],
            ));
        }
        _ => out.extend(sensor_conflict(state, &living, rng)),
    }
    out
}

fn sensor_conflict(
    state: &KernelState,
    living: &[&CrewTruth],
    rng: &mut SimRng,
) -> Vec<Proposal<PerceptionMutation>> {
    let mut places: Vec<&PlaceId> = living.iter().map(|c| &c.place).collect();
    places.sort();
    places.dedup();
    let (Some(&place), Some(&system)) = (rng.pick(&places), rng.pick(&CONFLICT_SYSTEMS)) else {
        return Vec::new();
    };
    // Always below the 0.6 the crew treat as solid.
    let confidence = 0.3 + rng.next_int(25) as f32 / 100.0;
    let message = format!(
        "[SENSOR] {}: {} readings conflict with expected baseline. Discrepancy unresolved.",
        place.to_string().to_uppercase(),
        system.label()
    );
    let reading = SensorReading::new(Channel::from(system), ReadingSource::Sensor, confidence, message).at(place);
    let witnesses = state.truth.crew_at(place).map(|c| c.id.clone()).collect();
    vec![
        Proposal::new(PerceptionMutation::RecordReading(reading), &[ProposalTag::Uncertainty]),
        Proposal::new(
            PerceptionMutation::RaiseDoubt(NewDoubt {
                topic: format!("Conflicting {} readings in {}", system.label(), place),
                severity: Severity::Low,
                involved_crew: witnesses,
                related_op: None,
                system: Some(system),
                source: DoubtSource::Pressure,
            }),
            &[ProposalTag::Uncertainty],
        ),
    ]
}
