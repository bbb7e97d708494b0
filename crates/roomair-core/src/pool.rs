//! Parallel room integration with a barrier.
//!
//! Each room of a window is spawned on the rayon pool; results come back on
//! a crossbeam channel and the caller blocks until every room has answered.
//! The window fails as a whole on the first error, panic or timeout, and
//! nothing is returned for the rooms that did succeed.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError};

use roomair_logic::topology::RoomId;
use roomair_logic::transport::{RoomSnapshot, SpeciesState};

use crate::error::{EngineError, EngineResult};
use crate::kinetics::{IntegrationRequest, KineticsIntegrator};

type RoomResult = (RoomId, Result<SpeciesState, String>);

#[derive(Debug, Clone, Copy, Default)]
pub struct RoomPool {
    timeout: Option<Duration>,
}

impl RoomPool {
    /// `timeout` bounds the wait for all rooms of one window; `None` waits forever.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Integrate every request of `window` and return the end snapshots in
    /// room order.
    pub fn integrate_window(
        &self,
        window: usize,
        integrator: &Arc<dyn KineticsIntegrator>,
        requests: Vec<IntegrationRequest>,
    ) -> EngineResult<Vec<RoomSnapshot>> {
        let rooms: Vec<RoomId> = requests.iter().map(|r| r.room).collect();
        let (tx, rx) = channel::unbounded::<RoomResult>();

        for request in requests {
            let tx = tx.clone();
            let integrator = Arc::clone(integrator);
            rayon::spawn(move || {
                let room = request.room;
                let result = catch_unwind(AssertUnwindSafe(|| integrator.integrate(&request)))
                    .unwrap_or_else(|panic| Err(panic_message(panic.as_ref())));
                // The receiver is gone once the window has already failed.
                let _ = tx.send((room, result));
            });
        }
        drop(tx);

        barrier(window, &rooms, &rx, self.timeout)
    }
}

/// Wait for one result per room in `rooms` and return the snapshots in room order.
fn barrier(
    window: usize,
    rooms: &[RoomId],
    rx: &Receiver<RoomResult>,
    timeout: Option<Duration>,
) -> EngineResult<Vec<RoomSnapshot>> {
    let started = Instant::now();
    let mut snapshots = Vec::with_capacity(rooms.len());
    while snapshots.len() < rooms.len() {
        let received = match timeout {
            Some(limit) => {
                let remaining = limit.saturating_sub(started.elapsed());
                rx.recv_timeout(remaining)
            }
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok((room, Ok(state))) => {
                log::debug!("window {}: room {} integrated", window, room);
                snapshots.push(RoomSnapshot::new(room, window, state));
            }
            Ok((room, Err(message))) => {
                log::error!("window {}: room {} failed: {}", window, room, message);
                return Err(EngineError::IntegrationFailure {
                    room,
                    window,
                    message,
                });
            }
            Err(RecvTimeoutError::Timeout) => {
                let pending = rooms.len() - snapshots.len();
                log::error!(
                    "window {}: {} room(s) did not finish within {:?}",
                    window,
                    pending,
                    started.elapsed()
                );
                return Err(EngineError::IntegrationTimeout {
                    window,
                    pending,
                    waited: started.elapsed(),
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                let outstanding: Vec<RoomId> = rooms
                    .iter()
                    .copied()
                    .filter(|room| !snapshots.iter().any(|s| s.room == *room))
                    .collect();
                log::error!(
                    "window {}: workers exited without results for rooms {:?}",
                    window,
                    outstanding
                );
                return Err(EngineError::WorkersLost {
                    window,
                    rooms: outstanding,
                });
            }
        }
    }

    snapshots.sort_by_key(|s| s.room);
    Ok(snapshots)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
