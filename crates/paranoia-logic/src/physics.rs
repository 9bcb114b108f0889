//! Passive station dynamics run at the top of every truth phase.
//!
//! Rooms drift back toward ambient, fires burn, vented rooms bleed air and
//! station systems slowly recover.

use crate::config::KernelConfig;
use crate::truth::{RoomState, TruthState};
use crate::world::{PlaceKind, World};

/// Minimum station power for life support to push O₂ back up.
const LIFE_SUPPORT_POWER: i32 = 40;
/// A fire starves below this O₂ level.
const FIRE_O2_FLOOR: f32 = 10.0;

pub fn tick_environment(truth: &mut TruthState, config: &KernelConfig) {
    let station = &mut truth.station;
    station.blackout_ticks = station.blackout_ticks.saturating_sub(1);
    if station.door_delay > 0 {
        station.door_delay -= 1;
    }
    station.power += 1;
    station.comms += 1;
    station.settle();

    let life_support = station.power >= LIFE_SUPPORT_POWER;
    let decay_radiation = truth.tick % config.radiation_decay_interval.max(1) == 0;
    for room in truth.rooms.values_mut() {
        tick_room(room, config, life_support, decay_radiation);
    }
}

fn tick_room(room: &mut RoomState, config: &KernelConfig, life_support: bool, decay_radiation: bool) {
    if room.vented {
        room.o2 -= 5.0;
        room.temperature -= 10.0;
    } else {
        if room.integrity > 0.0 && life_support {
            room.o2 += 1.0;
        }
        let ambient = config.ambient_temperature;
        if !room.on_fire {
            let gap = ambient - room.temperature;
            room.temperature += gap.clamp(-config.temp_cooling_rate, config.temp_cooling_rate);
        }
    }

    if room.on_fire {
        room.temperature += 2.0;
        room.o2 -= 1.0;
        room.integrity -= 0.2;
        if room.o2 < FIRE_O2_FLOOR {
            room.on_fire = false;
        }
    }

    if decay_radiation && room.radiation > 0.0 {
        room.radiation -= 1.0;
    }
    room.settle();
}

/// Track how long engineering has been burning past the meltdown line.
/// Returns true once the streak reaches `meltdown_ticks`.
pub fn meltdown_reached(truth: &mut TruthState, world: &World, config: &KernelConfig) -> bool {
    let critical = world.places_of_kind(PlaceKind::Engineering).into_iter().any(|place| {
        truth.rooms.get(place).map_or(false, |r| {
            r.on_fire && r.temperature > config.meltdown_temp && r.integrity < 60.0
        })
    });
    if critical {
        truth.meltdown_streak += 1;
    } else {
        truth.meltdown_streak = 0;
    }
    truth.meltdown_streak >= config.meltdown_ticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::PlaceId;

    fn truth() -> TruthState {
        TruthState::new(&World::station())
    }

    #[test]
    fn blackout_and_delay_count_down() {
        let config = KernelConfig::default();
        let mut truth = truth();
        truth.station.blackout_ticks = 2;
        truth.station.door_delay = 1;
        truth.station.power = 50;
        tick_environment(&mut truth, &config);
        assert_eq!(truth.station.blackout_ticks, 1);
        assert_eq!(truth.station.door_delay, 0);
        assert_eq!(truth.station.power, 51);
    }

    #[test]
    fn fire_heats_and_consumes() {
        let config = KernelConfig::default();
        let mut truth = truth();
        let core = PlaceId::from("core");
        truth.rooms.get_mut(&core).unwrap().on_fire = true;
        tick_environment(&mut truth, &config);
        let room = &truth.rooms[&core];
        assert_eq!(room.temperature, 22.0);
        assert!(room.integrity < 100.0);
        assert!(room.on_fire);
    }

    #[test]
    fn fire_starves_without_air() {
        let config = KernelConfig::default();
        let mut truth = truth();
        let core = PlaceId::from("core");
        {
            let room = truth.rooms.get_mut(&core).unwrap();
            room.on_fire = true;
            room.o2 = 9.0;
        }
        truth.station.power = 10;
        tick_environment(&mut truth, &config);
        assert!(!truth.rooms[&core].on_fire);
    }

    #[test]
    fn vented_room_bleeds() {
        let config = KernelConfig::default();
        let mut truth = truth();
        let lock = PlaceId::from("airlock_a");
        truth.rooms.get_mut(&lock).unwrap().vented = true;
        tick_environment(&mut truth, &config);
        let room = &truth.rooms[&lock];
        assert!(room.o2 <= crate::truth::VENTED_O2_CEILING);
        assert_eq!(room.temperature, 10.0);
    }

    #[test]
    fn temperature_returns_to_ambient() {
        let config = KernelConfig::default();
        let mut truth = truth();
        let mess = PlaceId::from("mess");
        truth.rooms.get_mut(&mess).unwrap().temperature = 30.0;
        tick_environment(&mut truth, &config);
        assert_eq!(truth.rooms[&mess].temperature, 29.0);
    }

    #[test]
    fn meltdown_needs_sustained_fire() {
        let config = KernelConfig {
            meltdown_ticks: 2,
            ..KernelConfig::default()
        };
        let world = World::station();
        let mut truth = TruthState::new(&world);
        {
            let room = truth.rooms.get_mut(&PlaceId::from("engineering")).unwrap();
            room.on_fire = true;
            room.temperature = 95.0;
            room.integrity = 40.0;
        }
        assert!(!meltdown_reached(&mut truth, &world, &config));
        assert!(meltdown_reached(&mut truth, &world, &config));
    }
}
