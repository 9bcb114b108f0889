//! MOTHER's side of the station: the perception tree and the read-only views
//! the UI renders from it.

pub mod biometrics;
pub mod intent;
pub mod state;
pub mod views;

pub use biometrics::{all_biometrics, biometrics, Assessment, BiometricReading};
pub use intent::{classify_intent, IntentLabel, IntentSignals};
pub use state::{
    CrewSighting, Observation, PerceptionState, ReadingSource, RoomSnapshot, SensorReading,
};
pub use views::{
    perceive_all_crew, perceive_all_rooms, perceive_crew, perceive_room, perceive_station,
    perceive_threats, ConfidenceTier, PerceivedCrew, PerceivedRoom, PerceivedStation,
    PerceivedThreat, ThreatSeverity,
};
