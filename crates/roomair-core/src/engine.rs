//! Simulation engine - chemistry-only windows separated by transport.
//!
//! ```text
//! window 0:  {rooms integrate in parallel} → barrier → commit snapshots
//! window w:  transport on window w-1 snapshots → {rooms integrate} → barrier → commit
//! ```
//!
//! Transport runs at every boundary after the first window, and only when
//! the building has at least two rooms. It uses the forcing of the window
//! that just ended. The transported snapshots are only committed once the
//! following window has integrated, so a failed window commits nothing and
//! a retry transports the same stored state again.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use roomair_logic::apertures::set_exchange_flows;
use roomair_logic::error::ConfigurationError;
use roomair_logic::flow::FlowModel;
use roomair_logic::flux::FluxMatrix;
use roomair_logic::topology::BuildingTopology;
use roomair_logic::transport::{apply_transport, RoomSnapshot, TransportReport, TransportStep};
use roomair_logic::ventilation::{cross_ventilation_paths, VentilationAxis, VentilationPaths};
use roomair_logic::wind::set_wind_flows;

use crate::error::{EngineError, EngineResult};
use crate::forcing::WindowForcing;
use crate::kinetics::{IntegrationRequest, KineticsIntegrator};
use crate::pool::RoomPool;
use crate::settings::{ensure_valid, SimulationSettings};
use crate::snapshot::SnapshotStore;

/// What happened in one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub window: usize,
    pub hour: usize,
    /// Report of the transport applied before this window, if any.
    pub transport: Option<TransportReport>,
}

pub struct SimulationEngine<S: SnapshotStore> {
    topology: BuildingTopology,
    settings: SimulationSettings,
    integrator: Arc<dyn KineticsIntegrator>,
    flow_model: Box<dyn FlowModel>,
    store: S,
    pool: RoomPool,
    left_right: VentilationPaths,
    front_back: VentilationPaths,
    issues: Vec<ConfigurationError>,
    /// Next window to run.
    next_window: usize,
}

impl<S: SnapshotStore> SimulationEngine<S> {
    /// Validate the inputs and search the cross-ventilation paths once.
    pub fn new(
        topology: BuildingTopology,
        settings: SimulationSettings,
        integrator: Arc<dyn KineticsIntegrator>,
        store: S,
    ) -> EngineResult<Self> {
        topology.validate()?;
        ensure_valid(&settings, &topology)?;

        let (left_right, mut issues) = cross_ventilation_paths(&topology, VentilationAxis::LeftRight);
        let (front_back, fb_issues) = cross_ventilation_paths(&topology, VentilationAxis::FrontBack);
        issues.extend(fb_issues);

        let flow_model = settings.transport.flow_model.build();
        let pool = RoomPool::new(settings.window_timeout_s.map(Duration::from_secs_f64));
        log::info!(
            "{}: {} rooms, {} windows of {} s, kinetics '{}', flow model '{}'",
            settings.name,
            topology.room_count(),
            settings.nchem_only,
            settings.tchem_only,
            integrator.name(),
            flow_model.name()
        );
        if let Some(limit) = pool.timeout() {
            log::info!("room integrations bounded to {:?} per window", limit);
        }

        Ok(Self {
            topology,
            settings,
            integrator,
            flow_model,
            store,
            pool,
            left_right,
            front_back,
            issues,
            next_window: 0,
        })
    }

    pub fn topology(&self) -> &BuildingTopology {
        &self.topology
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn ventilation(&self) -> (&VentilationPaths, &VentilationPaths) {
        (&self.left_right, &self.front_back)
    }

    /// Ventilation configuration problems found at construction.
    pub fn configuration_issues(&self) -> &[ConfigurationError] {
        &self.issues
    }

    pub fn next_window(&self) -> usize {
        self.next_window
    }

    pub fn is_finished(&self) -> bool {
        self.next_window >= self.settings.nchem_only
    }

    /// Advection and exchange flows under a window's forcing.
    pub fn flux_for(&self, forcing: &WindowForcing) -> FluxMatrix {
        let wind = forcing.wind(self.settings.front_aspect_deg);
        let model = self.flow_model.as_ref();
        let mut flux = set_wind_flows(&self.topology, &self.left_right, &self.front_back, wind, model);
        set_exchange_flows(
            &self.topology,
            &self.left_right,
            &self.front_back,
            &mut flux,
            model,
        );
        flux
    }

    /// Run all remaining windows.
    pub fn run(&mut self) -> EngineResult<Vec<WindowSummary>> {
        let mut summaries = Vec::new();
        while !self.is_finished() {
            summaries.push(self.step()?);
        }
        Ok(summaries)
    }

    /// Run the next window, preceded by its transport boundary.
    ///
    /// The transported snapshots of the previous window are committed
    /// together with the new window, so a failed step leaves the store as it
    /// was and can be retried.
    pub fn step(&mut self) -> EngineResult<WindowSummary> {
        let window = self.next_window;
        let transported = if window > 0 {
            self.transport_boundary(window)?
        } else {
            None
        };

        let forcing = WindowForcing::build(&self.settings, &self.topology, window);
        log::info!(
            "window {} (t0 = {} s, hour {}): integrating {} rooms",
            window,
            forcing.start_s,
            forcing.hour,
            self.topology.room_count()
        );

        let carried = transported.as_ref().map(|(snapshots, _)| snapshots.as_slice());
        let requests = self.requests(&forcing, carried)?;
        let snapshots = self
            .pool
            .integrate_window(window, &self.integrator, requests)?;

        let transport = match transported {
            Some((previous, report)) => {
                self.store.save_all(&previous)?;
                log::info!("==> transport applied at iteration {}", window);
                Some(report)
            }
            None => None,
        };
        self.store.save_all(&snapshots)?;
        self.next_window += 1;

        Ok(WindowSummary {
            window,
            hour: forcing.hour,
            transport,
        })
    }

    /// Transport the stored end snapshots of `window - 1`, without saving them.
    fn transport_boundary(
        &self,
        window: usize,
    ) -> EngineResult<Option<(Vec<RoomSnapshot>, TransportReport)>> {
        let nroom = self.topology.room_count();
        if nroom < 2 {
            log::warn!("==> transport not applied at iteration {} (single room)", window);
            return Ok(None);
        }

        let previous = window - 1;
        let forcing = WindowForcing::build(&self.settings, &self.topology, previous);
        let flux = self.flux_for(&forcing);
        let mut snapshots = self.store.load_window(nroom, previous)?;
        let step = TransportStep {
            tchem_only: self.settings.tchem_only,
            volumetric_scale: self.flow_model.volumetric_scale(),
            outdoor_basis: self.settings.transport.outdoor_basis,
        };
        let report = apply_transport(&mut snapshots, &self.topology, &flux, step)?;
        Ok(Some((snapshots, report)))
    }

    /// Initial state of every room: the settings for window 0, otherwise the
    /// transported snapshots if any, else the stored end of the previous window.
    fn requests(
        &self,
        forcing: &WindowForcing,
        carried: Option<&[RoomSnapshot]>,
    ) -> EngineResult<Vec<IntegrationRequest>> {
        let window = forcing.window;
        forcing
            .rooms
            .iter()
            .map(|env| {
                let transported = carried.and_then(|c| c.iter().find(|s| s.room == env.room));
                let initial = match (window, transported) {
                    (0, _) => self.settings.initial_concentrations.clone(),
                    (_, Some(snap)) => snap.concentrations.clone(),
                    _ => self.store.load(env.room, window - 1)?.concentrations,
                };
                Ok(IntegrationRequest {
                    room: env.room,
                    window,
                    start_s: forcing.start_s,
                    duration_s: self.settings.tchem_only,
                    environment: env.clone(),
                    initial,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()
    }
}
