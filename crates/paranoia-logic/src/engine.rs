//! Simulation engine - main entry point for running the kernel

use crate::commands::Command;
use crate::config::KernelConfig;
use crate::kernel::{step_kernel, TickReport};
use crate::perception::{
    all_biometrics, perceive_all_crew, perceive_all_rooms, perceive_station, perceive_threats,
    BiometricReading, PerceivedCrew, PerceivedRoom, PerceivedStation, PerceivedThreat,
};
use crate::rng::SimRng;
use crate::state::KernelState;
use crate::world::World;

/// One seeded run: the kernel state plus the random stream that drives it.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub state: KernelState,
    rng: SimRng,
}

impl Simulation {
    pub fn new(world: World, config: KernelConfig, seed: u64) -> Self {
        Self {
            state: KernelState::new(world, config),
            rng: SimRng::new(seed),
        }
    }

    /// Standard station, default tuning.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(World::station(), KernelConfig::default(), seed)
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn tick(&self) -> u64 {
        self.state.truth.tick
    }

    pub fn suspicion(&self) -> i32 {
        self.state.perception.ledger.suspicion()
    }

    pub fn is_over(&self) -> bool {
        self.state.truth.ending.is_some()
    }

    /// Advance one tick with the given commands.
    pub fn step(&mut self, commands: &[Command]) -> TickReport {
        step_kernel(&mut self.state, commands, &mut self.rng)
    }

    /// Run up to `ticks` idle ticks, stopping early if the run ends.
    pub fn run(&mut self, ticks: u64) -> Vec<TickReport> {
        let mut reports = Vec::new();
        for _ in 0..ticks {
            if self.is_over() {
                break;
            }
            reports.push(self.step(&[]));
        }
        reports
    }

    // ── Views ──

    pub fn station(&self) -> PerceivedStation {
        perceive_station(&self.state)
    }

    pub fn rooms(&self) -> Vec<PerceivedRoom> {
        perceive_all_rooms(&self.state)
    }

    pub fn crew(&self) -> Vec<PerceivedCrew> {
        perceive_all_crew(&self.state)
    }

    pub fn threats(&self) -> Vec<PerceivedThreat> {
        perceive_threats(&self.state)
    }

    pub fn biometrics(&self) -> Vec<BiometricReading> {
        all_biometrics(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_run() {
        let mut a = Simulation::with_seed(9);
        let mut b = Simulation::with_seed(9);
        a.run(120);
        b.run(120);
        assert_eq!(a.state.fingerprint().unwrap(), b.state.fingerprint().unwrap());
    }

    #[test]
    fn run_stops_at_the_ending() {
        let mut sim = Simulation::with_seed(1);
        sim.state.truth.ending = Some(crate::truth::Ending::Meltdown);
        assert!(sim.run(10).is_empty());
        assert_eq!(sim.tick(), 0);
    }

    #[test]
    fn views_cover_the_station() {
        let mut sim = Simulation::with_seed(4);
        sim.step(&[]);
        assert_eq!(sim.rooms().len(), 10);
        assert_eq!(sim.crew().len(), 5);
        assert_eq!(sim.biometrics().len(), 5);
        assert!(sim.station().power.is_some());
        assert_eq!(sim.seed(), 4);
    }
}
