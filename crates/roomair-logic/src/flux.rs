//! Room-to-room flux matrix.
//!
//! Square, indexed `[0..=nroom] × [0..=nroom]` with index 0 for outdoors.
//! Entry `(i, j)` is the flow carried from room `i` to room `j`, in the
//! units of the [`crate::flow::FlowModel`] that produced it. Advection
//! populates a single direction of a pair; exchange populates both with
//! the same value. A pair holding any non-zero entry is "claimed" and is
//! never overwritten.

use serde::{Deserialize, Serialize};

use crate::topology::RoomId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxMatrix {
    size: usize,
    values: Vec<f64>,
}

impl FluxMatrix {
    /// All-zero matrix for a building with `nroom` indoor rooms.
    pub fn new(nroom: usize) -> Self {
        let size = nroom + 1;
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    /// Number of indoor rooms.
    pub fn nroom(&self) -> usize {
        self.size - 1
    }

    /// Matrix dimension (`nroom + 1`).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Flow from `from` to `to`; zero outside the matrix.
    pub fn get(&self, from: RoomId, to: RoomId) -> f64 {
        if from < self.size && to < self.size {
            self.values[from * self.size + to]
        } else {
            0.0
        }
    }

    /// Set the flow from `from` to `to`. Out-of-range indices are ignored.
    pub fn set(&mut self, from: RoomId, to: RoomId, value: f64) {
        if from < self.size && to < self.size {
            self.values[from * self.size + to] = value;
        } else {
            log::warn!(
                "flux ({} -> {}) outside {}x{} matrix ignored",
                from,
                to,
                self.size,
                self.size
            );
        }
    }

    /// Whether either direction of the pair already carries a flow.
    pub fn is_claimed(&self, a: RoomId, b: RoomId) -> bool {
        self.get(a, b) != 0.0 || self.get(b, a) != 0.0
    }

    /// Non-zero entries as `(from, to, value)`, row-major.
    pub fn nonzero(&self) -> impl Iterator<Item = (RoomId, RoomId, f64)> + '_ {
        let size = self.size;
        self.values
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0.0)
            .map(move |(k, &v)| (k / size, k % size, v))
    }
}
