//! Seeded random stream for the kernel.
//!
//! Every stochastic choice in a run draws from one [`SimRng`], so a seed and a
//! command script fully determine the outcome. ChaCha8 keeps the stream
//! identical across platforms and `rand` releases.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone)]
pub struct SimRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform integer in `0..max`. Returns 0 when `max` is 0.
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        self.inner.gen_range(0..max)
    }

    /// True with `percent` chance out of 100.
    pub fn roll_percent(&mut self, percent: u32) -> bool {
        self.next_int(100) < percent
    }

    /// Uniform pick from a slice, `None` if it is empty.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.next_int(items.len() as u32) as usize;
        items.get(idx)
    }
}
