//! Run settings, loaded from JSON.
//!
//! Hourly tables hold 24 entries, hour 0 covering 00:00–01:00. Which entry
//! applies to a window is decided by [`crate::forcing::hour_index`].

use serde::{Deserialize, Serialize};

use roomair_logic::flow::{FlowModel, OrificeFlowModel, PlaceholderFlowModel};
use roomair_logic::topology::{BuildingTopology, RoomId};
use roomair_logic::transport::{OutdoorBasis, SpeciesState};

use crate::error::{EngineError, EngineResult};

pub const HOURS_PER_DAY: usize = 24;

/// Which [`FlowModel`] resolves flow magnitudes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowModelKind {
    #[default]
    Placeholder,
    Orifice(OrificeFlowModel),
}

impl FlowModelKind {
    pub fn build(&self) -> Box<dyn FlowModel> {
        match self {
            FlowModelKind::Placeholder => Box::new(PlaceholderFlowModel),
            FlowModelKind::Orifice(model) => Box::new(*model),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportSettings {
    #[serde(default)]
    pub outdoor_basis: OutdoorBasis,
    #[serde(default)]
    pub flow_model: FlowModelKind,
}

/// Hourly environment of one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConditions {
    /// Temperature (K).
    pub temperature_k: Vec<f64>,
    /// Relative humidity (%).
    pub relative_humidity: Vec<f64>,
    /// Pressure (Pa).
    pub pressure_pa: Vec<f64>,
    /// Air exchange rate with outdoors (fraction of room per second).
    pub air_exchange_rate: Vec<f64>,
}

impl RoomConditions {
    /// Same value every hour.
    pub fn constant(temperature_k: f64, relative_humidity: f64, pressure_pa: f64, aer: f64) -> Self {
        Self {
            temperature_k: vec![temperature_k; HOURS_PER_DAY],
            relative_humidity: vec![relative_humidity; HOURS_PER_DAY],
            pressure_pa: vec![pressure_pa; HOURS_PER_DAY],
            air_exchange_rate: vec![aer; HOURS_PER_DAY],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub name: String,
    /// Start of the run, seconds from midnight of day 1.
    pub t0: f64,
    /// Length of a chemistry-only window (s).
    pub tchem_only: f64,
    /// Number of chemistry-only windows.
    pub nchem_only: usize,
    /// Bearing the building front faces (degrees from north).
    pub front_aspect_deg: f64,
    /// Hourly bearing the wind comes from (degrees).
    pub wind_direction_deg: Vec<f64>,
    /// Hourly wind speed (m/s).
    pub wind_speed: Vec<f64>,
    /// One entry per room, in room id order.
    pub rooms: Vec<RoomConditions>,
    /// Concentrations every room starts from (molecules/cm³).
    #[serde(default)]
    pub initial_concentrations: SpeciesState,
    #[serde(default)]
    pub transport: TransportSettings,
    /// Longest wait for a window's room integrations (s). None waits forever.
    #[serde(default)]
    pub window_timeout_s: Option<f64>,
}

impl SimulationSettings {
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Start time of a window (s).
    pub fn window_start(&self, window: usize) -> f64 {
        self.t0 + window as f64 * self.tchem_only
    }

    pub fn room_conditions(&self, room: RoomId) -> Option<&RoomConditions> {
        room.checked_sub(1).and_then(|i| self.rooms.get(i))
    }
}

/// Problems that stop a run before it starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsIssue {
    #[error("tchem_only must be positive, got {0}")]
    NonPositiveWindow(f64),
    #[error("nchem_only must be at least 1")]
    NoWindows,
    #[error("{table} has {len} entries, expected 24")]
    TableLength { table: String, len: usize },
    #[error("{expected} rooms in the building but {actual} room condition tables")]
    RoomCount { expected: usize, actual: usize },
    #[error("{table} hour {hour} has invalid value {value}")]
    InvalidValue {
        table: String,
        hour: usize,
        value: f64,
    },
    #[error("window timeout must be positive, got {0}")]
    NonPositiveTimeout(f64),
}

/// Check settings against the building. Empty means the run can start.
pub fn validate_settings(
    settings: &SimulationSettings,
    topology: &BuildingTopology,
) -> Vec<SettingsIssue> {
    let mut issues = Vec::new();

    if !(settings.tchem_only.is_finite() && settings.tchem_only > 0.0) {
        issues.push(SettingsIssue::NonPositiveWindow(settings.tchem_only));
    }
    if settings.nchem_only == 0 {
        issues.push(SettingsIssue::NoWindows);
    }
    if let Some(t) = settings.window_timeout_s {
        if !(t.is_finite() && t > 0.0) {
            issues.push(SettingsIssue::NonPositiveTimeout(t));
        }
    }

    check_table(&mut issues, "wind_direction_deg", &settings.wind_direction_deg, |v| {
        v.is_finite()
    });
    check_table(&mut issues, "wind_speed", &settings.wind_speed, |v| {
        v.is_finite() && v >= 0.0
    });

    if settings.rooms.len() != topology.room_count() {
        issues.push(SettingsIssue::RoomCount {
            expected: topology.room_count(),
            actual: settings.rooms.len(),
        });
    }
    for (i, room) in settings.rooms.iter().enumerate() {
        let id = i + 1;
        check_table(
            &mut issues,
            &format!("room {id} temperature_k"),
            &room.temperature_k,
            |v| v.is_finite() && v > 0.0,
        );
        check_table(
            &mut issues,
            &format!("room {id} relative_humidity"),
            &room.relative_humidity,
            |v| (0.0..=100.0).contains(&v),
        );
        check_table(
            &mut issues,
            &format!("room {id} pressure_pa"),
            &room.pressure_pa,
            |v| v.is_finite() && v > 0.0,
        );
        check_table(
            &mut issues,
            &format!("room {id} air_exchange_rate"),
            &room.air_exchange_rate,
            |v| v.is_finite() && v >= 0.0,
        );
    }
    issues
}

fn check_table(
    issues: &mut Vec<SettingsIssue>,
    table: &str,
    values: &[f64],
    valid: impl Fn(f64) -> bool,
) {
    if values.len() != HOURS_PER_DAY {
        issues.push(SettingsIssue::TableLength {
            table: table.to_string(),
            len: values.len(),
        });
    }
    if let Some((hour, &value)) = values.iter().enumerate().find(|(_, &v)| !valid(v)) {
        issues.push(SettingsIssue::InvalidValue {
            table: table.to_string(),
            hour,
            value,
        });
    }
}

/// Turn validation issues into a single fatal error.
pub fn ensure_valid(settings: &SimulationSettings, topology: &BuildingTopology) -> EngineResult<()> {
    let issues = validate_settings(settings, topology);
    if issues.is_empty() {
        return Ok(());
    }
    for issue in &issues {
        log::error!("settings: {}", issue);
    }
    let joined: Vec<String> = issues.iter().map(ToString::to_string).collect();
    Err(EngineError::InvalidSettings(joined.join("; ")))
}
