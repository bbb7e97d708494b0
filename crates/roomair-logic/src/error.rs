//! Error taxonomy for the transport subsystem.
//!
//! Two kinds of problem are distinguished:
//!
//! - [`TransportError`]: data-integrity failures. These are fatal: transport
//!   must not run, otherwise mass could be silently dropped.
//! - [`ConfigurationError`]: ventilation configuration the path finder cannot
//!   honour. These are logged and the floor falls back to "no cross
//!   ventilation"; the run continues.

use crate::topology::{RoomId, Side};

/// Fatal data-integrity error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// An aperture references a room that is not in the room table.
    #[error("aperture #{aperture} references unknown room {room}")]
    UnknownRoom { aperture: usize, room: RoomId },

    /// An aperture starts outdoors; apertures are always listed from the indoor side.
    #[error("aperture #{aperture} has outdoors as its origin")]
    OutdoorOrigin { aperture: usize },

    /// Room ids must be exactly `1..=nroom`, each listed once.
    #[error("room table must list ids 1..={expected} exactly once, found {found:?}")]
    NonContiguousRooms { expected: usize, found: Vec<RoomId> },

    /// A room volume is zero, negative or not finite.
    #[error("room {room} has non-positive volume {volume_m3} m³")]
    NonPositiveVolume { room: RoomId, volume_m3: f64 },

    /// Number of snapshots differs from number of rooms.
    #[error("expected {expected} room snapshots, got {actual}")]
    RoomCountMismatch { expected: usize, actual: usize },

    /// A snapshot is stored under the wrong room position.
    #[error("snapshot at position {position} belongs to room {room}")]
    SnapshotOutOfOrder { position: usize, room: RoomId },

    /// A room's species set differs from the reference room's.
    #[error("room {room} (window {window}) species mismatch: missing {missing:?}, unexpected {unexpected:?}")]
    SnapshotMismatch {
        room: RoomId,
        window: usize,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
}

/// Non-fatal ventilation configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// More than one open aperture on one facade side of a floor.
    #[error("floor {floor}: {count} openings on the {side} side, only one is supported")]
    MultipleOpenings { floor: i32, side: Side, count: usize },

    /// Ventilation direction other than `LR` or `FB`.
    #[error("unknown ventilation direction {0:?}, expected \"LR\" or \"FB\"")]
    UnknownAxis(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_offending_room() {
        let err = TransportError::SnapshotMismatch {
            room: 3,
            window: 7,
            missing: vec!["O3".into()],
            unexpected: vec![],
        };
        let msg = err.to_string();
        assert!(msg.contains("room 3"));
        assert!(msg.contains("window 7"));
        assert!(msg.contains("O3"));
    }

    #[test]
    fn test_configuration_message() {
        let err = ConfigurationError::MultipleOpenings {
            floor: 1,
            side: Side::Left,
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "floor 1: 2 openings on the Left side, only one is supported"
        );
    }
}
