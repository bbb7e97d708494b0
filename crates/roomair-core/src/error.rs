//! Engine errors.
//!
//! Everything here aborts the run. Non-fatal ventilation issues never reach
//! this type; they are logged by the path finder and kept on the engine.

use std::time::Duration;

use roomair_logic::error::TransportError;
use roomair_logic::topology::RoomId;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The kinetics collaborator reported an error or panicked.
    #[error("room {room} failed to integrate window {window}: {message}")]
    IntegrationFailure {
        room: RoomId,
        window: usize,
        message: String,
    },

    #[error("window {window}: {pending} room(s) still integrating after {waited:?}")]
    IntegrationTimeout {
        window: usize,
        pending: usize,
        waited: Duration,
    },

    /// Room workers dropped the result channel before answering.
    #[error("window {window}: no result received for rooms {rooms:?}")]
    WorkersLost { window: usize, rooms: Vec<RoomId> },

    #[error("snapshot I/O error: {0}")]
    SnapshotIo(#[from] std::io::Error),

    #[error("snapshot serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),

    #[error("snapshot version mismatch: expected {expected}, found {found}")]
    SnapshotVersion { expected: u32, found: u32 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no snapshot stored for room {room}, window {window}")]
    MissingSnapshot { room: RoomId, window: usize },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
