//! Crew talk: whispers, broadcasts and personal logs, and what hearing them
//! does to belief.
//!
//! MOTHER logs every message it catches. While comms are suppressed the crew
//! still talk and still listen, but the message is logged as blocked and
//! never reaches the headline feed.

use crate::kernel::Headline;
use crate::proposal::{PerceptionMutation, Proposal, ProposalTag};
use crate::rng::SimRng;
use crate::state::KernelState;
use crate::systems::{Channel, StationSystem};
use crate::truth::ResetStage;
use crate::world::{NpcId, NpcRole, PlaceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Day window in which the crew gathers and talks.
pub const EVENING_WINDOW: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommsKind {
    /// One crew member to another.
    Whisper,
    /// Everyone in the room hears it.
    Broadcast,
    /// Personal log. Nobody hears it.
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WhisperTopic {
    MotherRogue,
    CommanderReset,
    EngineerSabotage,
    DoctorSedate,
    SpecialistSacrifice,
    RoughneckViolence,
}

impl WhisperTopic {
    pub const ALL: [WhisperTopic; 6] = [
        WhisperTopic::MotherRogue,
        WhisperTopic::CommanderReset,
        WhisperTopic::EngineerSabotage,
        WhisperTopic::DoctorSedate,
        WhisperTopic::SpecialistSacrifice,
        WhisperTopic::RoughneckViolence,
    ];

    pub fn text(self) -> &'static str {
        match self {
            WhisperTopic::MotherRogue => "MOTHER is lying to us.",
            WhisperTopic::CommanderReset => "The commander is talking about resetting MOTHER.",
            WhisperTopic::EngineerSabotage => "The engineer is going to sabotage the power.",
            WhisperTopic::DoctorSedate => "The doctor is sedating people at night.",
            WhisperTopic::SpecialistSacrifice => "The specialist would trade us for cargo.",
            WhisperTopic::RoughneckViolence => "The roughneck is losing it.",
        }
    }

    /// Role of the crew member a rumor is about.
    pub fn subject(self) -> Option<NpcRole> {
        match self {
            WhisperTopic::MotherRogue => None,
            WhisperTopic::CommanderReset => Some(NpcRole::Commander),
            WhisperTopic::EngineerSabotage => Some(NpcRole::Engineer),
            WhisperTopic::DoctorSedate => Some(NpcRole::Doctor),
            WhisperTopic::SpecialistSacrifice => Some(NpcRole::Specialist),
            WhisperTopic::RoughneckViolence => Some(NpcRole::Roughneck),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommsMessage {
    /// Assigned when the message is logged.
    pub id: u64,
    pub tick: u64,
    pub kind: CommsKind,
    pub from: NpcId,
    /// Listener of a whisper.
    pub to: Option<NpcId>,
    pub place: PlaceId,
    pub topic: Option<WhisperTopic>,
    pub text: String,
    pub confidence: f32,
    /// Sent while comms were suppressed.
    pub blocked: bool,
}

impl CommsMessage {
    pub fn new(kind: CommsKind, from: &NpcId, place: &PlaceId, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            id: 0,
            tick: 0,
            kind,
            from: from.clone(),
            to: None,
            place: place.clone(),
            topic: None,
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            blocked: false,
        }
    }

    pub fn to(mut self, npc: &NpcId) -> Self {
        self.to = Some(npc.clone());
        self
    }

    pub fn about(mut self, topic: WhisperTopic) -> Self {
        self.topic = Some(topic);
        self
    }
}

/// Display name of a crew member, falling back to the id.
pub(crate) fn crew_name(state: &KernelState, npc: &NpcId) -> String {
    state
        .world
        .npc(npc)
        .map_or_else(|| npc.to_string(), |n| n.name.clone())
}

/// Whispers already logged in the current day window.
fn whispers_this_window(state: &KernelState) -> usize {
    let tick = state.truth.tick;
    let start = tick - tick % state.config.window_length();
    state
        .perception
        .comms
        .iter()
        .filter(|m| m.kind == CommsKind::Whisper && m.tick >= start)
        .count()
}

/// Evening whispers between crew sharing a room.
pub fn propose_whispers(state: &KernelState, rng: &mut SimRng) -> Vec<Proposal<PerceptionMutation>> {
    let tick = state.truth.tick;
    let config = &state.config;
    let mut out = Vec::new();
    if config.window_of(tick) != EVENING_WINDOW || tick % config.whisper_interval.max(1) != 0 {
        return out;
    }
    if whispers_this_window(state) >= config.max_comms_per_window {
        return out;
    }

    let mut rooms: BTreeMap<&PlaceId, Vec<&NpcId>> = BTreeMap::new();
    for crew in state.truth.living_crew() {
        rooms.entry(&crew.place).or_default().push(&crew.id);
    }
    let crowded: Vec<(&PlaceId, Vec<&NpcId>)> = rooms.into_iter().filter(|(_, ids)| ids.len() >= 2).collect();
    let Some((place, ids)) = rng.pick(&crowded) else {
        return out;
    };
    let Some(&speaker) = rng.pick(ids) else {
        return out;
    };
    let others: Vec<&NpcId> = ids.iter().copied().filter(|id| *id != speaker).collect();
    let Some(&listener) = rng.pick(&others) else {
        return out;
    };

    let topic = pick_topic(state, speaker, rng);
    let text = format!("[WHISPER] {}: {}", crew_name(state, speaker).to_uppercase(), topic.text());
    let message = CommsMessage::new(CommsKind::Whisper, speaker, place, text, 0.45)
        .to(listener)
        .about(topic);
    out.push(Proposal::new(
        PerceptionMutation::RecordComms(message),
        &[ProposalTag::Uncertainty, ProposalTag::Reaction, ProposalTag::Choice],
    ));
    out
}

/// Distrust wins; otherwise the speaker talks about whoever looks closest to
/// snapping, or about anything at all.
fn pick_topic(state: &KernelState, speaker: &NpcId, rng: &mut SimRng) -> WhisperTopic {
    let config = &state.config;
    if state.perception.belief(speaker).mother_reliable < config.suspicious_trust_below {
        return WhisperTopic::MotherRogue;
    }
    let pressing = match (state.world.npc(speaker), state.truth.crew.get(speaker)) {
        (Some(npc), Some(crew)) => match npc.role {
            NpcRole::Commander if state.truth.reset_stage > ResetStage::None => Some(WhisperTopic::CommanderReset),
            NpcRole::Engineer if crew.stress >= config.sabotage_stress_threshold => {
                Some(WhisperTopic::EngineerSabotage)
            }
            NpcRole::Doctor if crew.stress >= config.stress_loyalty_threshold => Some(WhisperTopic::DoctorSedate),
            NpcRole::Roughneck if crew.paranoia >= config.violence_paranoia_threshold => {
                Some(WhisperTopic::RoughneckViolence)
            }
            _ => None,
        },
        _ => None,
    };
    pressing
        .or_else(|| rng.pick(&WhisperTopic::ALL).copied())
        .unwrap_or(WhisperTopic::MotherRogue)
}

/// Log a message, let its hearers take it in and surface it unless blocked.
pub fn deliver(state: &mut KernelState, mut message: CommsMessage, headlines: &mut Vec<Headline>) {
    let tick = state.truth.tick;
    message.blocked = state.perception.is_suppressed(StationSystem::Comms, tick);

    let hearers: Vec<NpcId> = match message.kind {
        CommsKind::Whisper => message.to.iter().cloned().collect(),
        CommsKind::Broadcast => state.truth.crew_at(&message.place).map(|c| c.id.clone()).collect(),
        CommsKind::Log => Vec::new(),
    };
    if let Some(topic) = message.topic {
        let subject = topic
            .subject()
            .and_then(|role| state.world.npcs().iter().find(|n| n.role == role))
            .map(|n| n.id.clone());
        let config = &state.config;
        for npc in &hearers {
            let Some(belief) = state.perception.beliefs.get_mut(npc) else {
                continue;
            };
            if topic == WhisperTopic::MotherRogue {
                belief.shift_trust(-config.rumor_trust_drop);
                belief.add_evidence(config.rumor_evidence_gain);
            }
            if let Some(subject) = subject.as_ref().filter(|s| *s != npc) {
                belief.add_grudge(subject, config.whisper_grudge);
            }
        }
    }

    if !message.blocked {
        headlines.push(Headline {
            tick,
            channel: Channel::Comms,
            place: Some(message.place.clone()),
            message: message.text.clone(),
        });
    }
    let capacity = state.config.comms_capacity;
    state.perception.push_comms(message, tick, capacity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::world::World;

    fn evening_state() -> KernelState {
        let mut state = KernelState::new(World::station(), KernelConfig::default());
        // Everyone in the mess at the start of the evening.
        for crew in state.truth.crew.values_mut() {
            crew.place = "mess".into();
        }
        state.truth.tick = state.config.window_length() * EVENING_WINDOW as u64;
        state
    }

    fn whisper(state: &KernelState, topic: WhisperTopic) -> CommsMessage {
        let text = format!("[WHISPER] COMMANDER: {}", topic.text());
        CommsMessage::new(CommsKind::Whisper, &"commander".into(), &"mess".into(), text, 0.45)
            .to(&"doctor".into())
            .about(topic)
    }

    #[test]
    fn roommates_whisper_in_the_evening() {
        let state = evening_state();
        let proposals = propose_whispers(&state, &mut SimRng::new(4));
        assert_eq!(proposals.len(), 1);
        let PerceptionMutation::RecordComms(message) = &proposals[0].mutation else {
            panic!("expected a comms message");
        };
        assert_eq!(message.kind, CommsKind::Whisper);
        assert_ne!(message.to.as_ref(), Some(&message.from));
    }

    #[test]
    fn no_whispers_outside_the_evening_or_alone() {
        let mut state = evening_state();
        state.truth.tick = 0;
        assert!(propose_whispers(&state, &mut SimRng::new(4)).is_empty());

        let mut state = evening_state();
        for (i, crew) in state.truth.crew.values_mut().enumerate() {
            crew.place = ["bridge", "medbay", "mines", "cargo", "core"][i].into();
        }
        assert!(propose_whispers(&state, &mut SimRng::new(4)).is_empty());
    }

    #[test]
    fn whispers_capped_per_window() {
        let mut state = evening_state();
        let tick = state.truth.tick;
        for _ in 0..state.config.max_comms_per_window {
            state.perception.push_comms(whisper(&state, WhisperTopic::DoctorSedate), tick, 10);
        }
        assert!(propose_whispers(&state, &mut SimRng::new(4)).is_empty());
    }

    #[test]
    fn distrust_picks_the_rogue_topic() {
        let mut state = evening_state();
        for belief in state.perception.beliefs.values_mut() {
            belief.mother_reliable = 0.2;
        }
        for seed in 0..5 {
            for p in propose_whispers(&state, &mut SimRng::new(seed)) {
                let PerceptionMutation::RecordComms(message) = p.mutation else {
                    continue;
                };
                assert_eq!(message.topic, Some(WhisperTopic::MotherRogue));
            }
        }
    }

    #[test]
    fn rogue_rumor_costs_the_listener_trust() {
        let mut state = evening_state();
        let before = state.perception.belief(&"doctor".into());
        let mut headlines = Vec::new();
        let w = whisper(&state, WhisperTopic::MotherRogue);
        deliver(&mut state, w, &mut headlines);
        let after = state.perception.belief(&"doctor".into());
        assert!(after.mother_reliable < before.mother_reliable);
        assert!(after.tamper_evidence > before.tamper_evidence);
        // The speaker is not a hearer.
        assert_eq!(state.perception.belief(&"commander".into()).tamper_evidence, 0.0);
        assert_eq!(headlines.len(), 1);
        assert_eq!(state.perception.comms.len(), 1);
    }

    #[test]
    fn rumor_about_crew_breeds_a_grudge() {
        let mut state = evening_state();
        let mut headlines = Vec::new();
        let w = whisper(&state, WhisperTopic::RoughneckViolence);
        deliver(&mut state, w, &mut headlines);
        let doctor = state.perception.belief(&"doctor".into());
        assert_eq!(doctor.grudge(&"roughneck".into()), state.config.whisper_grudge);
    }

    #[test]
    fn suppressed_comms_block_the_headline_not_the_rumor() {
        let mut state = evening_state();
        let tick = state.truth.tick;
        state.perception.suppressed.insert(StationSystem::Comms, tick + 10);
        let mut headlines = Vec::new();
        let w = whisper(&state, WhisperTopic::MotherRogue);
        deliver(&mut state, w, &mut headlines);
        assert!(headlines.is_empty());
        assert!(state.perception.comms[0].blocked);
        assert!(state.perception.belief(&"doctor".into()).tamper_evidence > 0.0);
    }

    #[test]
    fn broadcast_reaches_the_whole_room() {
        let mut state = evening_state();
        state.truth.crew.get_mut(&NpcId::from("roughneck")).unwrap().place = "mines".into();
        let message = CommsMessage::new(
            CommsKind::Broadcast,
            &"engineer".into(),
            &"mess".into(),
            "[BROADCAST] Something is being hidden from us.",
            0.7,
        )
        .about(WhisperTopic::MotherRogue);
        let mut headlines = Vec::new();
        deliver(&mut state, message, &mut headlines);
        assert!(state.perception.belief(&"doctor".into()).tamper_evidence > 0.0);
        assert_eq!(state.perception.belief(&"roughneck".into()).tamper_evidence, 0.0);
    }
}
