//! Cross-ventilation path search.
//!
//! On each floor, cross ventilation is possible when there is exactly one
//! open aperture on the entry facade (left or front) and exactly one on the
//! exit facade (right or back), in different rooms. The path is the
//! shortest sequence of rooms linking the two, found breadth-first.
//!
//! Floors are independent: the result is one outcome per floor id.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::topology::{BuildingTopology, RoomId, Side, OUTDOORS};

/// Facade pair along which cross ventilation is searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VentilationAxis {
    /// Left facade → right facade (`"LR"`).
    LeftRight,
    /// Front facade → back facade (`"FB"`).
    FrontBack,
}

impl VentilationAxis {
    pub fn entry(self) -> Side {
        match self {
            VentilationAxis::LeftRight => Side::Left,
            VentilationAxis::FrontBack => Side::Front,
        }
    }

    pub fn exit(self) -> Side {
        match self {
            VentilationAxis::LeftRight => Side::Right,
            VentilationAxis::FrontBack => Side::Back,
        }
    }
}

impl fmt::Display for VentilationAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VentilationAxis::LeftRight => f.write_str("left/right"),
            VentilationAxis::FrontBack => f.write_str("front/back"),
        }
    }
}

impl FromStr for VentilationAxis {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LR" => Ok(VentilationAxis::LeftRight),
            "FB" => Ok(VentilationAxis::FrontBack),
            other => Err(ConfigurationError::UnknownAxis(other.to_string())),
        }
    }
}

/// Outcome of the path search on one floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloorVentilation {
    /// Cross ventilation through these rooms, wrapped in outdoors: `[0, .., 0]`.
    Path(Vec<RoomId>),
    /// Entry and exit openings are in the same room: treated as enhanced
    /// indoor-outdoor exchange, no search performed.
    SameRoom(RoomId),
    /// A facade side has no open aperture on this floor.
    NoOpenings,
    /// A facade side has more than one open aperture on this floor.
    Misconfigured,
    /// Both openings exist but no room sequence connects them.
    Exhausted,
}

impl FloorVentilation {
    /// Room sequence including outdoor endpoints, or `[0]` when there is no path.
    pub fn sequence(&self) -> Vec<RoomId> {
        match self {
            FloorVentilation::Path(seq) => seq.clone(),
            _ => vec![OUTDOORS],
        }
    }

    pub fn is_path(&self) -> bool {
        matches!(self, FloorVentilation::Path(_))
    }
}

/// Cross-ventilation outcomes for every floor along one axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VentilationPaths {
    pub axis: VentilationAxis,
    pub floors: BTreeMap<i32, FloorVentilation>,
}

impl VentilationPaths {
    /// No cross ventilation anywhere (used when the axis itself is invalid).
    pub fn none(axis: VentilationAxis) -> Self {
        Self {
            axis,
            floors: BTreeMap::new(),
        }
    }

    /// Sequence for a floor, `[0]` when the floor has none.
    pub fn sequence(&self, floor: i32) -> Vec<RoomId> {
        self.floors
            .get(&floor)
            .map_or_else(|| vec![OUTDOORS], FloorVentilation::sequence)
    }

    /// All found paths, floor by floor.
    pub fn paths(&self) -> impl Iterator<Item = (i32, &[RoomId])> {
        self.floors.iter().filter_map(|(&floor, v)| match v {
            FloorVentilation::Path(seq) => Some((floor, seq.as_slice())),
            _ => None,
        })
    }

    /// Whether an indoor room lies on any floor's path.
    pub fn contains_room(&self, room: RoomId) -> bool {
        room != OUTDOORS && self.paths().any(|(_, seq)| seq.contains(&room))
    }
}

/// Search every floor along `axis`.
///
/// Returns one outcome per floor plus the configuration issues met on the
/// way. Issues are already logged; they never abort the search.
pub fn cross_ventilation_paths(
    topology: &BuildingTopology,
    axis: VentilationAxis,
) -> (VentilationPaths, Vec<ConfigurationError>) {
    let mut floors = BTreeMap::new();
    let mut issues = Vec::new();
    for floor in topology.floors() {
        log::info!("{} cross ventilation: now on floor {}", axis, floor);
        let (outcome, issue) = floor_path(topology, floor, axis);
        if let Some(issue) = issue {
            issues.push(issue);
        }
        floors.insert(floor, outcome);
    }
    (VentilationPaths { axis, floors }, issues)
}

/// Same as [`cross_ventilation_paths`] but with the axis given as `"LR"` / `"FB"`.
///
/// An unknown direction is a configuration error: it is logged and the
/// result is "no cross ventilation" on every floor, along the left/right axis.
pub fn cross_ventilation_paths_str(
    topology: &BuildingTopology,
    direction: &str,
) -> (VentilationPaths, Vec<ConfigurationError>) {
    match direction.parse::<VentilationAxis>() {
        Ok(axis) => cross_ventilation_paths(topology, axis),
        Err(e) => {
            log::warn!("input error: {}", e);
            (VentilationPaths::none(VentilationAxis::LeftRight), vec![e])
        }
    }
}

/// Search a single floor.
pub fn floor_path(
    topology: &BuildingTopology,
    floor: i32,
    axis: VentilationAxis,
) -> (FloorVentilation, Option<ConfigurationError>) {
    let facade_rooms = |side: Side| -> Vec<RoomId> {
        topology
            .open_apertures()
            .filter(|a| a.floor == floor && a.is_outdoor() && a.side == Some(side))
            .map(|a| a.origin)
            .collect()
    };
    let entry = facade_rooms(axis.entry());
    let exit = facade_rooms(axis.exit());

    if entry.len() > 1 || exit.len() > 1 {
        let (side, count) = if entry.len() > 1 {
            (axis.entry(), entry.len())
        } else {
            (axis.exit(), exit.len())
        };
        let issue = ConfigurationError::MultipleOpenings { floor, side, count };
        log::warn!("{}", issue);
        return (FloorVentilation::Misconfigured, Some(issue));
    }
    if entry.len() != 1 || exit.len() != 1 {
        log::info!("--> {} cross ventilation does not occur on floor {}", axis, floor);
        return (FloorVentilation::NoOpenings, None);
    }

    let (entry_room, exit_room) = (entry[0], exit[0]);
    log::info!(
        "rooms with opening on the {} sides: {} {}",
        axis,
        entry_room,
        exit_room
    );
    if entry_room == exit_room {
        log::info!(
            "--> {} cross ventilation is treated as enhanced indoor-outdoor exchange on floor {}",
            axis,
            floor
        );
        return (FloorVentilation::SameRoom(entry_room), None);
    }

    match shortest_sequence(topology, floor, entry_room, exit_room) {
        Some(rooms) => {
            let mut seq = Vec::with_capacity(rooms.len() + 2);
            seq.push(OUTDOORS);
            seq.extend(rooms);
            seq.push(OUTDOORS);
            log::info!(
                "--> {} cross ventilation occurs via rooms {:?} on floor {}",
                axis,
                seq,
                floor
            );
            (FloorVentilation::Path(seq), None)
        }
        None => {
            log::info!(
                "--> {} cross ventilation is not possible on floor {}",
                axis,
                floor
            );
            (FloorVentilation::Exhausted, None)
        }
    }
}

/// Breadth-first search from `start` to `goal` over this floor's open indoor apertures.
///
/// Neighbours are visited in ascending id order and each room is entered at
/// most once, so among the shortest sequences the first one reached wins.
fn shortest_sequence(
    topology: &BuildingTopology,
    floor: i32,
    start: RoomId,
    goal: RoomId,
) -> Option<Vec<RoomId>> {
    let mut neighbors: BTreeMap<RoomId, Vec<RoomId>> = BTreeMap::new();
    for ap in topology.open_apertures() {
        if ap.floor == floor && !ap.is_outdoor() {
            neighbors.entry(ap.origin).or_default().push(ap.destination);
        }
    }
    for next in neighbors.values_mut() {
        next.sort_unstable();
        next.dedup();
    }

    let mut came_from: BTreeMap<RoomId, RoomId> = BTreeMap::new();
    let mut visited = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(room) = queue.pop_front() {
        for &next in neighbors.get(&room).into_iter().flatten() {
            if !visited.insert(next) {
                continue;
            }
            came_from.insert(next, room);
            if next == goal {
                let mut seq = vec![goal];
                let mut at = goal;
                while let Some(&prev) = came_from.get(&at) {
                    seq.push(prev);
                    at = prev;
                }
                seq.reverse();
                return Some(seq);
            }
            queue.push_back(next);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Aperture, Room};

    fn rooms(n: usize, floor: i32) -> Vec<Room> {
        (1..=n).map(|id| Room::new(id, floor, 30.0)).collect()
    }

    /// Both directions of an indoor opening.
    fn door(a: RoomId, b: RoomId, floor: i32) -> [Aperture; 2] {
        [
            Aperture::indoor(a, b, floor, 1.0),
            Aperture::indoor(b, a, floor, 1.0),
        ]
    }

    #[test]
    fn test_two_room_left_right() {
        let mut aps = vec![
            Aperture::outdoor(1, 0, 1.0, Side::Left),
            Aperture::outdoor(2, 0, 1.0, Side::Right),
        ];
        aps.push(Aperture::indoor(1, 2, 0, 1.0));
        let t = BuildingTopology::new(rooms(2, 0), aps);
        let (paths, issues) = cross_ventilation_paths(&t, VentilationAxis::LeftRight);
        assert!(issues.is_empty());
        assert_eq!(paths.sequence(0), vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_same_room_is_enhanced_exchange() {
        let t = BuildingTopology::new(
            rooms(2, 0),
            vec![
                Aperture::outdoor(1, 0, 1.0, Side::Front),
                Aperture::outdoor(1, 0, 1.0, Side::Back),
                Aperture::indoor(1, 2, 0, 1.0),
            ],
        );
        let (outcome, issue) = floor_path(&t, 0, VentilationAxis::FrontBack);
        assert_eq!(outcome, FloorVentilation::SameRoom(1));
        assert!(issue.is_none());
        assert_eq!(outcome.sequence(), vec![0]);
    }

    #[test]
    fn test_missing_side_means_no_path() {
        let t = BuildingTopology::new(
            rooms(2, 0),
            vec![
                Aperture::outdoor(1, 0, 1.0, Side::Left),
                Aperture::outdoor(2, 0, 0.0, Side::Right),
                Aperture::indoor(1, 2, 0, 1.0),
            ],
        );
        let (outcome, _) = floor_path(&t, 0, VentilationAxis::LeftRight);
        assert_eq!(outcome, FloorVentilation::NoOpenings);
        assert_eq!(outcome.sequence(), vec![0]);
    }

    #[test]
    fn test_two_openings_on_one_side_is_configuration_error() {
        let t = BuildingTopology::new(
            rooms(3, 0),
            vec![
                Aperture::outdoor(1, 0, 1.0, Side::Left),
                Aperture::outdoor(2, 0, 1.0, Side::Left),
                Aperture::outdoor(3, 0, 1.0, Side::Right),
            ],
        );
        let (outcome, issue) = floor_path(&t, 0, VentilationAxis::LeftRight);
        assert_eq!(outcome, FloorVentilation::Misconfigured);
        assert_eq!(
            issue,
            Some(ConfigurationError::MultipleOpenings {
                floor: 0,
                side: Side::Left,
                count: 2
            })
        );
    }

    #[test]
    fn test_disconnected_rooms_exhaust_search() {
        let mut aps = vec![
            Aperture::outdoor(1, 0, 1.0, Side::Left),
            Aperture::outdoor(3, 0, 1.0, Side::Right),
        ];
        aps.extend(door(1, 2, 0));
        let t = BuildingTopology::new(rooms(3, 0), aps);
        let (outcome, _) = floor_path(&t, 0, VentilationAxis::LeftRight);
        assert_eq!(outcome, FloorVentilation::Exhausted);
    }

    #[test]
    fn test_shortest_of_two_routes() {
        // 1 - 2 - 3 - 4 (long way) and 1 - 5 - 4 (short way)
        let mut aps = vec![
            Aperture::outdoor(1, 0, 1.0, Side::Left),
            Aperture::outdoor(4, 0, 1.0, Side::Right),
        ];
        for (a, b) in [(1, 2), (2, 3), (3, 4), (1, 5), (5, 4)] {
            aps.extend(door(a, b, 0));
        }
        let t = BuildingTopology::new(rooms(5, 0), aps);
        let (outcome, _) = floor_path(&t, 0, VentilationAxis::LeftRight);
        assert_eq!(outcome, FloorVentilation::Path(vec![0, 1, 5, 4, 0]));
    }

    #[test]
    fn test_tie_broken_by_ascending_room_id() {
        // 1 -> {3, 2} -> 4: both routes have two hops; room 2 comes first.
        let mut aps = vec![
            Aperture::outdoor(1, 0, 1.0, Side::Front),
            Aperture::outdoor(4, 0, 1.0, Side::Back),
        ];
        for (a, b) in [(1, 3), (3, 4), (1, 2), (2, 4)] {
            aps.extend(door(a, b, 0));
        }
        let t = BuildingTopology::new(rooms(4, 0), aps);
        let (outcome, _) = floor_path(&t, 0, VentilationAxis::FrontBack);
        assert_eq!(outcome, FloorVentilation::Path(vec![0, 1, 2, 4, 0]));
    }

    #[test]
    fn test_closed_apertures_are_not_traversed() {
        let t = BuildingTopology::new(
            rooms(2, 0),
            vec![
                Aperture::outdoor(1, 0, 1.0, Side::Left),
                Aperture::outdoor(2, 0, 1.0, Side::Right),
                Aperture::indoor(1, 2, 0, 0.0),
            ],
        );
        let (outcome, _) = floor_path(&t, 0, VentilationAxis::LeftRight);
        assert_eq!(outcome, FloorVentilation::Exhausted);
    }

    #[test]
    fn test_floors_are_independent() {
        let mut rs = rooms(2, 0);
        rs.push(Room::new(3, 1, 30.0));
        rs.push(Room::new(4, 1, 30.0));
        let mut aps = vec![
            Aperture::outdoor(1, 0, 1.0, Side::Left),
            Aperture::outdoor(2, 0, 1.0, Side::Right),
            Aperture::indoor(1, 2, 0, 1.0),
            Aperture::outdoor(3, 1, 1.0, Side::Left),
        ];
        // Room 4 opens on the right but is not connected to room 3.
        aps.push(Aperture::outdoor(4, 1, 1.0, Side::Right));
        let t = BuildingTopology::new(rs, aps);
        let (paths, _) = cross_ventilation_paths(&t, VentilationAxis::LeftRight);
        assert_eq!(paths.sequence(0), vec![0, 1, 2, 0]);
        assert_eq!(paths.floors[&1], FloorVentilation::Exhausted);
        assert!(paths.contains_room(2));
        assert!(!paths.contains_room(3));
        assert!(!paths.contains_room(OUTDOORS));
    }

    #[test]
    fn test_parse_axis() {
        assert_eq!("LR".parse(), Ok(VentilationAxis::LeftRight));
        assert_eq!("FB".parse(), Ok(VentilationAxis::FrontBack));
        assert_eq!(
            "XY".parse::<VentilationAxis>(),
            Err(ConfigurationError::UnknownAxis("XY".into()))
        );
    }

    #[test]
    fn test_unknown_direction_degrades_to_no_path() {
        let t = BuildingTopology::new(
            rooms(2, 0),
            vec![
                Aperture::outdoor(1, 0, 1.0, Side::Left),
                Aperture::outdoor(2, 0, 1.0, Side::Right),
                Aperture::indoor(1, 2, 0, 1.0),
            ],
        );
        let (paths, issues) = cross_ventilation_paths_str(&t, "diagonal");
        assert_eq!(issues.len(), 1);
        assert_eq!(paths.sequence(0), vec![0]);
        assert_eq!(paths.paths().count(), 0);
    }

    #[test]
    fn test_dense_floor_with_unreachable_exit() {
        // Rooms 1..=11 all connected to each other; exit room 12 has no door.
        let mut aps = vec![
            Aperture::outdoor(1, 0, 1.0, Side::Left),
            Aperture::outdoor(12, 0, 1.0, Side::Right),
        ];
        for a in 1..=11 {
            for b in 1..=11 {
                if a != b {
                    aps.push(Aperture::indoor(a, b, 0, 1.0));
                }
            }
        }
        let t = BuildingTopology::new(rooms(12, 0), aps.clone());
        let (outcome, _) = floor_path(&t, 0, VentilationAxis::LeftRight);
        assert_eq!(outcome, FloorVentilation::Exhausted);

        aps.extend(door(11, 12, 0));
        let t = BuildingTopology::new(rooms(12, 0), aps);
        let (outcome, _) = floor_path(&t, 0, VentilationAxis::LeftRight);
        assert_eq!(outcome, FloorVentilation::Path(vec![0, 1, 11, 12, 0]));
    }
}
