//! The kernel aggregate: world, config, truth and perception in one value.

use crate::config::KernelConfig;
use crate::perception::state::PerceptionState;
use crate::truth::TruthState;
use crate::world::World;
use serde::{Deserialize, Serialize};

/// Everything one run needs, owned by the caller and borrowed `&mut` per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelState {
    pub world: World,
    pub config: KernelConfig,
    pub truth: TruthState,
    pub perception: PerceptionState,
}

impl KernelState {
    pub fn new(world: World, config: KernelConfig) -> Self {
        let truth = TruthState::new(&world);
        let perception = PerceptionState::new(&world);
        Self {
            world,
            config,
            truth,
            perception,
        }
    }

    /// Bincode encoding of the whole state. Two runs are identical exactly
    /// when their fingerprints are.
    pub fn fingerprint(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::serialize(self)?)
    }

    /// Rebuild a state from a [`fingerprint`](KernelState::fingerprint).
    pub fn restore(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Errors from encoding or decoding a state snapshot.
#[derive(Debug)]
pub enum SnapshotError {
    Bincode(Box<bincode::ErrorKind>),
}

impl From<Box<bincode::ErrorKind>> for SnapshotError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SnapshotError::Bincode(e)
    }
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Bincode(e) => write!(f, "snapshot encoding failed: {}", e),
        }
    }
}

impl std::error::Error for SnapshotError {}
