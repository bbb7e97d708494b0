//! RoomAir Core - Multi-Room Indoor Air Engine
//!
//! Advances per-room chemistry in fixed chemistry-only windows. Rooms of a
//! window integrate independently and in parallel; between windows the
//! transport logic of [`roomair_logic`] moves species between rooms and
//! outdoors.
//!
//! # Architecture
//!
//! - **Settings**: JSON run description with hourly environment tables
//! - **Forcing**: the tables resolved into one [`forcing::WindowForcing`] per window
//! - **Kinetics**: the [`kinetics::KineticsIntegrator`] boundary to the chemistry solver
//! - **Pool**: rayon fan-out with a crossbeam barrier per window
//! - **Snapshots**: per-room, per-window state in memory or on disk
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use roomair_core::prelude::*;
//!
//! # fn main() -> EngineResult<()> {
//! let topology: BuildingTopology = serde_json::from_str(&std::fs::read_to_string("building.json")?)?;
//! let settings = SimulationSettings::from_json(&std::fs::read_to_string("settings.json")?)?;
//! let store = DirectoryStore::open("output")?;
//!
//! let mut engine = SimulationEngine::new(topology, settings, Arc::new(FirstOrderDecay::new()), store)?;
//! for summary in engine.run()? {
//!     println!("window {} used hour {}", summary.window, summary.hour);
//! }
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod forcing;
pub mod kinetics;
pub mod pool;
pub mod settings;
pub mod snapshot;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::engine::{SimulationEngine, WindowSummary};
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::forcing::{RoomEnvironment, WindowForcing};
    pub use crate::kinetics::{FirstOrderDecay, IntegrationRequest, KineticsIntegrator};
    pub use crate::settings::{SimulationSettings, TransportSettings};
    pub use crate::snapshot::{DirectoryStore, MemoryStore, SnapshotStore};
    pub use roomair_logic::topology::BuildingTopology;
}
