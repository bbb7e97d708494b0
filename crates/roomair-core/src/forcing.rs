//! Per-window forcing.
//!
//! Everything that varies with time of day is resolved once per
//! chemistry-only window into a [`WindowForcing`], which is then handed to
//! the kinetics integrations and to the transport boundary that follows.

use serde::{Deserialize, Serialize};

use roomair_logic::topology::{BuildingTopology, RoomId};
use roomair_logic::wind::{wind_components, WindComponents};

use crate::settings::{SimulationSettings, HOURS_PER_DAY};

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const SECONDS_PER_HOUR: f64 = 3_600.0;
/// Molar gas constant (J mol⁻¹ K⁻¹).
pub const GAS_CONSTANT: f64 = 8.314_462_6;
/// Avogadro constant (mol⁻¹).
pub const AVOGADRO: f64 = 6.022_140_8e23;

/// Hourly table index for a window starting at `t0` (s) and lasting `tchem_only` (s).
///
/// The hour containing the window's midpoint, with the window folded into
/// a single day. A window crossing midnight uses the midpoint measured from
/// the following midnight.
pub fn hour_index(t0: f64, tchem_only: f64) -> usize {
    let day_offset = ((t0 / SECONDS_PER_DAY).ceil() - 1.0) * SECONDS_PER_DAY;
    let start = t0 - day_offset;
    let end = t0 + tchem_only - day_offset;

    let mut mid = 0.5 * (start + end);
    if end > SECONDS_PER_DAY {
        mid -= SECONDS_PER_DAY;
        if mid < 0.0 {
            mid += SECONDS_PER_DAY;
        }
    }
    let hour = (mid / SECONDS_PER_HOUR).ceil() as i64 - 1;
    hour.clamp(0, HOURS_PER_DAY as i64 - 1) as usize
}

/// Environment one room integrates under during a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomEnvironment {
    pub room: RoomId,
    pub temperature_k: f64,
    pub relative_humidity: f64,
    /// Air number density `M` (molecules/cm³).
    pub number_density: f64,
    /// Air exchange rate with outdoors (1/s).
    pub air_exchange_rate: f64,
    /// Surface-to-volume ratio `AV` (cm⁻¹).
    pub surface_to_volume: f64,
}

impl RoomEnvironment {
    /// `M = P / (R·T) · N_A / 1e6`.
    pub fn number_density(pressure_pa: f64, temperature_k: f64) -> f64 {
        pressure_pa / (GAS_CONSTANT * temperature_k) * (AVOGADRO / 1.0e6)
    }

    /// `AV = (surface / volume) / 100`, m²/m³ → cm⁻¹.
    pub fn surface_to_volume(surface_m2: f64, volume_m3: f64) -> f64 {
        if volume_m3 > 0.0 {
            surface_m2 / volume_m3 / 100.0
        } else {
            0.0
        }
    }
}

/// Resolved forcing of one chemistry-only window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowForcing {
    pub window: usize,
    /// Window start, seconds since midnight of day 1.
    pub start_s: f64,
    pub end_s: f64,
    /// Entry of the hourly tables in use.
    pub hour: usize,
    pub wind_direction_deg: f64,
    pub wind_speed: f64,
    /// One per room, in room id order.
    pub rooms: Vec<RoomEnvironment>,
}

impl WindowForcing {
    /// Resolve a window from validated settings.
    pub fn build(settings: &SimulationSettings, topology: &BuildingTopology, window: usize) -> Self {
        let start_s = settings.window_start(window);
        let hour = hour_index(start_s, settings.tchem_only);
        let at = |table: &[f64]| table.get(hour).copied().unwrap_or(0.0);

        let rooms = topology
            .rooms
            .iter()
            .filter_map(|room| {
                let cond = settings.room_conditions(room.id)?;
                let temperature_k = at(&cond.temperature_k);
                Some(RoomEnvironment {
                    room: room.id,
                    temperature_k,
                    relative_humidity: at(&cond.relative_humidity),
                    number_density: RoomEnvironment::number_density(
                        at(&cond.pressure_pa),
                        temperature_k,
                    ),
                    air_exchange_rate: at(&cond.air_exchange_rate),
                    surface_to_volume: RoomEnvironment::surface_to_volume(
                        room.surface_area_m2,
                        room.volume_m3,
                    ),
                })
            })
            .collect();

        Self {
            window,
            start_s,
            end_s: start_s + settings.tchem_only,
            hour,
            wind_direction_deg: at(&settings.wind_direction_deg),
            wind_speed: at(&settings.wind_speed),
            rooms,
        }
    }

    /// Wind projected on the building axes.
    pub fn wind(&self, front_aspect_deg: f64) -> WindComponents {
        wind_components(front_aspect_deg, self.wind_direction_deg, self.wind_speed)
    }

    pub fn room(&self, room: RoomId) -> Option<&RoomEnvironment> {
        self.rooms.iter().find(|r| r.room == room)
    }
}
