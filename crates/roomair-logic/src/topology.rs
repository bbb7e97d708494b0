//! Building topology: rooms, floors and the apertures connecting them.
//!
//! Room id `0` is outdoors; indoor rooms are numbered `1..=nroom`. An
//! aperture is a directed row (origin → destination) with an opening area;
//! rows towards outdoors also carry the facade side they open onto.
//! Apertures with zero area are inert and only record that a relation
//! exists without an opening.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Room identifier. `0` is outdoors.
pub type RoomId = usize;

/// The outdoors pseudo-room.
pub const OUTDOORS: RoomId = 0;

/// Cubic centimetres per cubic metre.
pub const CM3_PER_M3: f64 = 1.0e6;

/// Facade side of an outdoor-facing aperture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
    Front,
    Back,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::Left => "Left",
            Side::Right => "Right",
            Side::Front => "Front",
            Side::Back => "Back",
        };
        f.write_str(s)
    }
}

/// An indoor room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub floor: i32,
    /// Air volume in m³.
    pub volume_m3: f64,
    /// Internal surface area in m².
    #[serde(default)]
    pub surface_area_m2: f64,
}

impl Room {
    pub fn new(id: RoomId, floor: i32, volume_m3: f64) -> Self {
        Self {
            id,
            floor,
            volume_m3,
            surface_area_m2: 0.0,
        }
    }

    pub fn with_surface_area(mut self, surface_area_m2: f64) -> Self {
        self.surface_area_m2 = surface_area_m2;
        self
    }
}

/// A directed opening between two rooms, or between a room and outdoors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aperture {
    pub origin: RoomId,
    pub destination: RoomId,
    pub floor: i32,
    /// Opening area in m². Zero means closed.
    pub area_m2: f64,
    /// Facade side, only meaningful when `destination` is outdoors.
    #[serde(default)]
    pub side: Option<Side>,
}

impl Aperture {
    /// Room-to-room opening.
    pub fn indoor(origin: RoomId, destination: RoomId, floor: i32, area_m2: f64) -> Self {
        Self {
            origin,
            destination,
            floor,
            area_m2,
            side: None,
        }
    }

    /// Room-to-outdoors opening on the given facade side.
    pub fn outdoor(origin: RoomId, floor: i32, area_m2: f64, side: Side) -> Self {
        Self {
            origin,
            destination: OUTDOORS,
            floor,
            area_m2,
            side: Some(side),
        }
    }

    pub fn is_open(&self) -> bool {
        self.area_m2 > 0.0
    }

    pub fn is_outdoor(&self) -> bool {
        self.destination == OUTDOORS
    }
}

/// Rooms plus the aperture table that fully describes their connectivity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingTopology {
    pub rooms: Vec<Room>,
    pub apertures: Vec<Aperture>,
}

impl BuildingTopology {
    pub fn new(rooms: Vec<Room>, apertures: Vec<Aperture>) -> Self {
        let mut rooms = rooms;
        rooms.sort_by_key(|r| r.id);
        Self { rooms, apertures }
    }

    /// Number of indoor rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    /// Volume of a room in m³ (0 for outdoors or unknown rooms).
    pub fn volume_m3(&self, id: RoomId) -> f64 {
        self.room(id).map_or(0.0, |r| r.volume_m3)
    }

    /// Distinct floor ids, ascending.
    pub fn floors(&self) -> Vec<i32> {
        let floors: BTreeSet<i32> = self
            .rooms
            .iter()
            .map(|r| r.floor)
            .chain(self.apertures.iter().map(|a| a.floor))
            .collect();
        floors.into_iter().collect()
    }

    /// Apertures with a positive opening area.
    pub fn open_apertures(&self) -> impl Iterator<Item = &Aperture> {
        self.apertures.iter().filter(|a| a.is_open())
    }

    /// First open aperture listed from `origin` to `destination`.
    pub fn open_aperture(&self, origin: RoomId, destination: RoomId) -> Option<&Aperture> {
        self.open_apertures()
            .find(|a| a.origin == origin && a.destination == destination)
    }

    /// Largest open area between two rooms, in either listed direction.
    pub fn opening_area_between(&self, a: RoomId, b: RoomId) -> f64 {
        self.open_apertures()
            .filter(|ap| {
                (ap.origin == a && ap.destination == b) || (ap.origin == b && ap.destination == a)
            })
            .map(|ap| ap.area_m2)
            .fold(0.0, f64::max)
    }

    /// Whether a room has at least one open aperture to outdoors.
    pub fn has_outdoor_opening(&self, room: RoomId) -> bool {
        self.open_apertures()
            .any(|a| a.origin == room && a.is_outdoor())
    }

    /// Check the room table and aperture references.
    ///
    /// Any error here is fatal: transport must not run on a building whose
    /// apertures point at rooms with no volume to hold the molecules.
    pub fn validate(&self) -> Result<(), TransportError> {
        let n = self.rooms.len();
        let ids: Vec<RoomId> = self.rooms.iter().map(|r| r.id).collect();
        let unique: HashSet<RoomId> = ids.iter().copied().collect();
        if unique.len() != n || ids.iter().any(|&id| id == OUTDOORS || id > n) {
            return Err(TransportError::NonContiguousRooms {
                expected: n,
                found: ids,
            });
        }

        for room in &self.rooms {
            if !(room.volume_m3.is_finite() && room.volume_m3 > 0.0) {
                return Err(TransportError::NonPositiveVolume {
                    room: room.id,
                    volume_m3: room.volume_m3,
                });
            }
        }

        for (i, ap) in self.apertures.iter().enumerate() {
            if ap.origin == OUTDOORS {
                return Err(TransportError::OutdoorOrigin { aperture: i });
            }
            for room in [ap.origin, ap.destination] {
                if room != OUTDOORS && !unique.contains(&room) {
                    return Err(TransportError::UnknownRoom { aperture: i, room });
                }
            }
        }
        Ok(())
    }
}
