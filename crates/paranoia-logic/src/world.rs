//! Static station topology: places, devices, and the crew roster.
//!
//! A [`World`] is built once per run and never mutated. Place adjacency is
//! derived from door devices, so a room is "next to" another only if a door
//! joins them.

use crate::pathfinding::{DoorEdge, NavGraph, Waypoint};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

string_id!(
    /// Identifier of a room.
    PlaceId
);
string_id!(
    /// Identifier of a crew member.
    NpcId
);
string_id!(
    /// Identifier of a door, sensor, camera or terminal.
    DeviceId
);

/// Functional category of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlaceKind {
    Quarters,
    Mess,
    Medical,
    Command,
    Core,
    Engineering,
    Extraction,
    Storage,
    Airlock,
}

impl PlaceKind {
    /// Preference when crew look for shelter. Lower is better.
    pub fn shelter_rank(self) -> u8 {
        match self {
            PlaceKind::Medical => 0,
            PlaceKind::Quarters => 1,
            PlaceKind::Mess => 2,
            PlaceKind::Command => 3,
            PlaceKind::Core => 4,
            PlaceKind::Storage => 5,
            PlaceKind::Engineering => 6,
            PlaceKind::Extraction => 7,
            PlaceKind::Airlock => 8,
        }
    }

    /// Rooms where crew do hands-on shift work with a witness around.
    pub fn is_work_site(self) -> bool {
        matches!(self, PlaceKind::Engineering | PlaceKind::Extraction)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
    pub kind: PlaceKind,
    /// Door-adjacent places, sorted. Filled in by [`World::new`].
    pub adjacency: Vec<PlaceId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    Door,
    Sensor,
    Camera,
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub kind: DeviceKind,
    pub home: PlaceId,
    /// The far side of a door. Required for doors, ignored otherwise.
    pub connects: Option<PlaceId>,
}

impl Device {
    /// True if this device reports on `place`.
    pub fn covers(&self, place: &PlaceId) -> bool {
        &self.home == place || self.connects.as_ref() == Some(place)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NpcRole {
    Commander,
    Engineer,
    Doctor,
    Specialist,
    Roughneck,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub id: NpcId,
    pub name: String,
    pub role: NpcRole,
    /// Where the crew member wants to be in each of the four day windows.
    pub schedule: [PlaceId; 4],
}

/// World construction error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    DuplicatePlace(PlaceId),
    DuplicateDevice(DeviceId),
    DuplicateNpc(NpcId),
    /// A device or schedule names a place that does not exist.
    UnknownPlace(PlaceId),
    DoorWithoutConnection(DeviceId),
}

impl std::fmt::Display for WorldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorldError::DuplicatePlace(id) => write!(f, "duplicate place id: {}", id),
            WorldError::DuplicateDevice(id) => write!(f, "duplicate device id: {}", id),
            WorldError::DuplicateNpc(id) => write!(f, "duplicate npc id: {}", id),
            WorldError::UnknownPlace(id) => write!(f, "unknown place: {}", id),
            WorldError::DoorWithoutConnection(id) => {
                write!(f, "door {} does not connect two places", id)
            }
        }
    }
}

impl std::error::Error for WorldError {}

/// Immutable station topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    places: BTreeMap<PlaceId, Place>,
    devices: BTreeMap<DeviceId, Device>,
    npcs: Vec<Npc>,
    nav: NavGraph,
}

impl World {
    /// Validate and assemble a world. Place adjacency is rebuilt from doors.
    pub fn new(places: Vec<Place>, devices: Vec<Device>, npcs: Vec<Npc>) -> Result<Self, WorldError> {
        let mut place_map = BTreeMap::new();
        for place in places {
            if place_map.contains_key(&place.id) {
                return Err(WorldError::DuplicatePlace(place.id));
            }
            place_map.insert(place.id.clone(), place);
        }

        let mut device_map = BTreeMap::new();
        let mut edges = Vec::new();
        for device in devices {
            if device_map.contains_key(&device.id) {
                return Err(WorldError::DuplicateDevice(device.id));
            }
            if !place_map.contains_key(&device.home) {
                return Err(WorldError::UnknownPlace(device.home));
            }
            if device.kind == DeviceKind::Door {
                let far = device
                    .connects
                    .clone()
                    .ok_or_else(|| WorldError::DoorWithoutConnection(device.id.clone()))?;
                if !place_map.contains_key(&far) {
                    return Err(WorldError::UnknownPlace(far));
                }
                edges.push(DoorEdge {
                    door: device.id.clone(),
                    place_a: device.home.clone(),
                    place_b: far,
                });
            }
            device_map.insert(device.id.clone(), device);
        }

        let mut seen = BTreeSet::new();
        for npc in &npcs {
            if !seen.insert(npc.id.clone()) {
                return Err(WorldError::DuplicateNpc(npc.id.clone()));
            }
            if let Some(bad) = npc.schedule.iter().find(|p| !place_map.contains_key(*p)) {
                return Err(WorldError::UnknownPlace(bad.clone()));
            }
        }

        let nav = NavGraph::from_doors(&edges);
        for place in place_map.values_mut() {
            place.adjacency = nav.neighbors(&place.id).iter().map(|(p, _)| p.clone()).collect();
            place.adjacency.dedup();
        }

        Ok(Self {
            places: place_map,
            devices: device_map,
            npcs,
            nav,
        })
    }

    /// The standard ten-room mining station with its five crew.
    pub fn station() -> Self {
        let place = |id: &str, name: &str, kind: PlaceKind| Place {
            id: id.into(),
            name: name.to_string(),
            kind,
            adjacency: Vec::new(),
        };
        let places = vec![
            place("dorms", "Crew Dorms", PlaceKind::Quarters),
            place("mess", "Mess Hall", PlaceKind::Mess),
            place("medbay", "Medbay", PlaceKind::Medical),
            place("bridge", "Bridge", PlaceKind::Command),
            place("core", "Reactor Core", PlaceKind::Core),
            place("engineering", "Engineering", PlaceKind::Engineering),
            place("mines", "Mine Shaft", PlaceKind::Extraction),
            place("cargo", "Cargo Bay", PlaceKind::Storage),
            place("airlock_a", "Airlock A", PlaceKind::Airlock),
            place("airlock_b", "Airlock B", PlaceKind::Airlock),
        ];

        let door = |a: &str, b: &str| Device {
            id: DeviceId(format!("door_{}_{}", a, b)),
            kind: DeviceKind::Door,
            home: a.into(),
            connects: Some(b.into()),
        };
        let fixture = |kind: DeviceKind, tag: &str, home: &str| Device {
            id: DeviceId(format!("{}_{}", tag, home)),
            kind,
            home: home.into(),
            connects: None,
        };
        let mut devices = vec![
            door("dorms", "mess"),
            door("mess", "medbay"),
            door("mess", "bridge"),
            door("bridge", "core"),
            door("core", "engineering"),
            door("engineering", "cargo"),
            door("cargo", "mines"),
            door("cargo", "airlock_a"),
            door("cargo", "airlock_b"),
        ];
        for home in ["bridge", "core", "engineering", "medbay", "cargo"] {
            devices.push(fixture(DeviceKind::Sensor, "sensor", home));
        }
        for home in ["dorms", "mess", "medbay", "bridge", "core", "engineering", "mines", "cargo"] {
            devices.push(fixture(DeviceKind::Camera, "cam", home));
        }
        devices.push(fixture(DeviceKind::Terminal, "terminal", "bridge"));

        let npc = |id: &str, name: &str, role: NpcRole, schedule: [&str; 4]| Npc {
            id: id.into(),
            name: name.to_string(),
            role,
            schedule: schedule.map(PlaceId::from),
        };
        let npcs = vec![
            npc("commander", "Commander Hale", NpcRole::Commander, ["mess", "bridge", "mess", "dorms"]),
            npc(
                "engineer",
                "Engineer Rook",
                NpcRole::Engineer,
                ["engineering", "engineering", "mess", "dorms"],
            ),
            npc("doctor", "Doctor Imani", NpcRole::Doctor, ["medbay", "medbay", "mess", "medbay"]),
            npc("specialist", "Specialist Vega", NpcRole::Specialist, ["cargo", "mines", "mess", "dorms"]),
            npc("roughneck", "Roughneck Pike", NpcRole::Roughneck, ["cargo", "cargo", "mess", "dorms"]),
        ];

        match Self::new(places, devices, npcs) {
            Ok(world) => world,
            Err(e) => unreachable!("built-in station layout is invalid: {}", e),
        }
    }

    pub fn place(&self, id: &PlaceId) -> Option<&Place> {
        self.places.get(id)
    }

    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    pub fn place_ids(&self) -> Vec<PlaceId> {
        self.places.keys().cloned().collect()
    }

    pub fn device(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    pub fn doors(&self) -> impl Iterator<Item = &Device> {
        self.devices.values().filter(|d| d.kind == DeviceKind::Door)
    }

    pub fn npc(&self, id: &NpcId) -> Option<&Npc> {
        self.npcs.iter().find(|n| &n.id == id)
    }

    /// Crew roster in declaration order.
    pub fn npcs(&self) -> &[Npc] {
        &self.npcs
    }

    pub fn neighbors(&self, place: &PlaceId) -> &[PlaceId] {
        self.places
            .get(place)
            .map(|p| p.adjacency.as_slice())
            .unwrap_or(&[])
    }

    pub fn places_of_kind(&self, kind: PlaceKind) -> Vec<&PlaceId> {
        self.places
            .values()
            .filter(|p| p.kind == kind)
            .map(|p| &p.id)
            .collect()
    }

    /// The sensor or door sensor reporting on a place. Sensors win over doors.
    pub fn sensor_covering(&self, place: &PlaceId) -> Option<&Device> {
        self.devices
            .values()
            .filter(|d| matches!(d.kind, DeviceKind::Sensor | DeviceKind::Door) && d.covers(place))
            .min_by_key(|d| (d.kind != DeviceKind::Sensor, d.id.clone()))
    }

    /// The place itself followed by every door-adjacent place.
    pub fn line_of_sight(&self, place: &PlaceId) -> Vec<PlaceId> {
        let mut out = vec![place.clone()];
        out.extend(self.neighbors(place).iter().cloned());
        out
    }

    /// Route between two places.
    pub fn route(&self, from: &PlaceId, to: &PlaceId) -> Option<Vec<Waypoint>> {
        self.nav.find_path(from, to)
    }

    pub fn next_hop(&self, from: &PlaceId, to: &PlaceId) -> Option<Waypoint> {
        self.nav.next_hop(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_layout_is_connected() {
        let world = World::station();
        let ids = world.place_ids();
        assert_eq!(ids.len(), 10);
        for id in &ids {
            assert!(
                world.route(&"dorms".into(), id).is_some(),
                "{} unreachable from dorms",
                id
            );
        }
    }

    #[test]
    fn adjacency_comes_from_doors() {
        let world = World::station();
        let cargo: Vec<&str> = world.neighbors(&"cargo".into()).iter().map(|p| p.as_str()).collect();
        assert_eq!(cargo, vec!["airlock_a", "airlock_b", "engineering", "mines"]);
    }

    #[test]
    fn sensor_preferred_over_door() {
        let world = World::station();
        let dev = world.sensor_covering(&"engineering".into()).unwrap();
        assert_eq!(dev.kind, DeviceKind::Sensor);
        // Mines has no sensor; the cargo door covers it.
        let dev = world.sensor_covering(&"mines".into()).unwrap();
        assert_eq!(dev.kind, DeviceKind::Door);
    }

    #[test]
    fn isolated_place_has_no_coverage() {
        let world = World::new(
            vec![Place {
                id: "vault".into(),
                name: "Vault".into(),
                kind: PlaceKind::Storage,
                adjacency: vec![],
            }],
            vec![],
            vec![],
        )
        .unwrap();
        assert!(world.sensor_covering(&"vault".into()).is_none());
        assert_eq!(world.line_of_sight(&"vault".into()), vec![PlaceId::from("vault")]);
    }

    #[test]
    fn rejects_duplicate_place() {
        let p = Place {
            id: "a".into(),
            name: "A".into(),
            kind: PlaceKind::Mess,
            adjacency: vec![],
        };
        let err = World::new(vec![p.clone(), p], vec![], vec![]).unwrap_err();
        assert_eq!(err, WorldError::DuplicatePlace("a".into()));
    }

    #[test]
    fn rejects_door_without_far_side() {
        let p = Place {
            id: "a".into(),
            name: "A".into(),
            kind: PlaceKind::Mess,
            adjacency: vec![],
        };
        let door = Device {
            id: "d".into(),
            kind: DeviceKind::Door,
            home: "a".into(),
            connects: None,
        };
        let err = World::new(vec![p], vec![door], vec![]).unwrap_err();
        assert_eq!(err, WorldError::DoorWithoutConnection("d".into()));
    }

    #[test]
    fn rejects_schedule_to_unknown_place() {
        let p = Place {
            id: "a".into(),
            name: "A".into(),
            kind: PlaceKind::Mess,
            adjacency: vec![],
        };
        let npc = Npc {
            id: "x".into(),
            name: "X".into(),
            role: NpcRole::Engineer,
            schedule: ["a".into(), "a".into(), "b".into(), "a".into()],
        };
        let err = World::new(vec![p], vec![], vec![npc]).unwrap_err();
        assert_eq!(err, WorldError::UnknownPlace("b".into()));
    }

    #[test]
    fn work_sites_and_shelter() {
        assert!(PlaceKind::Extraction.is_work_site());
        assert!(!PlaceKind::Mess.is_work_site());
        assert!(PlaceKind::Medical.shelter_rank() < PlaceKind::Airlock.shelter_rank());
    }
}
