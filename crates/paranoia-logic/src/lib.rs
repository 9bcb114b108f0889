//! Deterministic station kernel for Paranoia.
//!
//! The kernel keeps two trees side by side: the authoritative **truth** of the
//! station and the **perception** the station AI (MOTHER) actually has.
//! Systems never mutate either tree directly. They emit proposals each tick and
//! [`kernel::step_kernel`] applies them, truth first, then perception, then runs
//! the backfire checks that catch manipulation the crew can see through.
//!
//! Every run is reproducible from a single `u64` seed.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`arcs`] | Six scripted crisis kinds, activation, step tables, resolution |
//! | [`backfire`] | SUPPRESS / SPOOF / FABRICATE exposure checks and confession |
//! | [`beliefs`] | Crew trust in MOTHER, tamper evidence, grudges, drift |
//! | [`comms`] | Crew whispers, broadcasts and logs, and what hearing them does |
//! | [`commands`] | Inbound MOTHER commands turned into proposals |
//! | [`config`] | Every tunable constant, serde-loadable, with validation |
//! | [`crew`] | Schedules, fleeing, alarm response, damage, mood, violence, reset escalation |
//! | [`doubts`] | Crew doubts: decay, spread, pressure drip, witness doubts |
//! | [`engine`] | `Simulation`: owns state + RNG, the convenient entry point |
//! | [`kernel`] | The tick reducer and `TickReport` |
//! | [`ledger`] | Append-only suspicion ledger and its single entry point |
//! | [`pathfinding`] | BFS over the door graph |
//! | [`perception`] | Perception state and read-only views (station, rooms, crew, threats, biometrics) |
//! | [`physics`] | Passive room and station dynamics |
//! | [`pressure`] | Suspicion-band routing of director pressure: physical, social, epistemic |
//! | [`proposal`] | Pacing tags, truth/perception mutations, incidents, proposal buffers |
//! | [`reducer`] | Appliers for truth and perception mutations |
//! | [`rng`] | Seeded ChaCha stream |
//! | [`state`] | `KernelState` aggregate and its fingerprint |
//! | [`systems`] | Station systems, reading channels, severity |
//! | [`tamper`] | Tamper operations and their lifecycle |
//! | [`truth`] | Authoritative room, station, crew and arc state |
//! | [`world`] | Places, devices, roster; immutable per run |

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

pub mod arcs;
pub mod backfire;
pub mod beliefs;
pub mod commands;
pub mod comms;
pub mod config;
pub mod crew;
pub mod doubts;
pub mod engine;
pub mod kernel;
pub mod ledger;
pub mod pathfinding;
pub mod perception;
pub mod physics;
pub mod pressure;
pub mod proposal;
pub mod reducer;
pub mod rng;
pub mod state;
pub mod systems;
pub mod tamper;
pub mod truth;
pub mod world;

pub use commands::Command;
pub use config::KernelConfig;
pub use engine::Simulation;
pub use kernel::{step_kernel, TickReport};
pub use rng::SimRng;
pub use state::KernelState;
pub use world::World;
