//! BFS pathfinding over the station door graph.
//!
//! `NavGraph` holds an adjacency list built from door edges. Neighbour lists
//! are kept sorted so every search visits places in the same order on every
//! run.

use crate::world::{DeviceId, PlaceId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A door edge in the navigation graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorEdge {
    pub door: DeviceId,
    pub place_a: PlaceId,
    pub place_b: PlaceId,
}

/// A single step of a route: pass through this door, enter this place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waypoint {
    pub door: DeviceId,
    pub place: PlaceId,
}

/// Pre-built navigation graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavGraph {
    /// place → sorted list of (neighbour, door)
    adj: BTreeMap<PlaceId, Vec<(PlaceId, DeviceId)>>,
}

impl NavGraph {
    /// Build a navigation graph from door edges.
    pub fn from_doors(doors: &[DoorEdge]) -> Self {
        let mut adj: BTreeMap<PlaceId, Vec<(PlaceId, DeviceId)>> = BTreeMap::new();
        for door in doors {
            adj.entry(door.place_a.clone())
                .or_default()
                .push((door.place_b.clone(), door.door.clone()));
            adj.entry(door.place_b.clone())
                .or_default()
                .push((door.place_a.clone(), door.door.clone()));
        }
        for list in adj.values_mut() {
            list.sort();
        }
        Self { adj }
    }

    /// Find a route from `from` to `to`.
    ///
    /// Returns an empty route if the places are the same, `None` if
    /// unreachable.
    pub fn find_path(&self, from: &PlaceId, to: &PlaceId) -> Option<Vec<Waypoint>> {
        if from == to {
            return Some(vec![]);
        }

        let mut visited = BTreeSet::new();
        let mut queue: VecDeque<(&PlaceId, Vec<Waypoint>)> = VecDeque::new();
        visited.insert(from);
        queue.push_back((from, vec![]));

        while let Some((current, path)) = queue.pop_front() {
            for (next, door) in self.neighbors(current) {
                if !visited.insert(next) {
                    continue;
                }
                let mut extended = path.clone();
                extended.push(Waypoint {
                    door: door.clone(),
                    place: next.clone(),
                });
                if next == to {
                    return Some(extended);
                }
                queue.push_back((next, extended));
            }
        }

        None
    }

    /// First step of the route from `from` to `to`, if one exists.
    pub fn next_hop(&self, from: &PlaceId, to: &PlaceId) -> Option<Waypoint> {
        self.find_path(from, to)
            .and_then(|path| path.into_iter().next())
    }

    /// Neighbours of a place with the door joining them.
    pub fn neighbors(&self, place: &PlaceId) -> &[(PlaceId, DeviceId)] {
        self.adj.get(place).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Check if a place has at least one door.
    pub fn has_place(&self, place: &PlaceId) -> bool {
        self.adj.contains_key(place)
    }

    /// Number of connected places in the graph.
    pub fn place_count(&self) -> usize {
        self.adj.len()
    }
}
