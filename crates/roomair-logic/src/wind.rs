//! Wind forcing → directional advection flows.
//!
//! The wind vector is projected onto the two facade axes of the building:
//!
//! - `lr = speed · cos((aspect + 90°) − direction)`, positive blows left → right
//! - `fb = −speed · cos(direction − aspect)`, positive blows front → back
//!
//! Angles are in degrees from north. Each cross-ventilation path then gets a
//! one-directional flow along its consecutive room pairs.

use serde::{Deserialize, Serialize};

use crate::flow::{AdvectionPath, FlowModel};
use crate::flux::FluxMatrix;
use crate::topology::{BuildingTopology, RoomId, OUTDOORS};
use crate::ventilation::{VentilationAxis, VentilationPaths};

/// Components below this magnitude (m/s) count as calm.
pub const CALM_THRESHOLD: f64 = 1.0e-9;

/// Wind speed projected onto the building axes (m/s).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindComponents {
    /// Positive: left → right. Negative: right → left.
    pub left_right: f64,
    /// Positive: front → back. Negative: back → front.
    pub front_back: f64,
}

/// Project the wind onto the left/right and front/back axes.
///
/// `front_aspect_deg` is the bearing the building front faces,
/// `wind_direction_deg` the bearing the wind comes from.
pub fn wind_components(
    front_aspect_deg: f64,
    wind_direction_deg: f64,
    wind_speed: f64,
) -> WindComponents {
    let lr_angle = ((front_aspect_deg + 90.0) - wind_direction_deg).to_radians();
    let fb_angle = (wind_direction_deg - front_aspect_deg).to_radians();
    WindComponents {
        left_right: wind_speed * lr_angle.cos(),
        front_back: wind_speed * (-fb_angle.cos()),
    }
}

/// Build a flux matrix holding only the wind-driven advection flows.
///
/// Every consecutive room pair of every path gets one directional entry:
/// from the earlier room to the later one for a positive component, the
/// reverse for a negative one, nothing when calm. Pairs already claimed
/// (by an earlier path) are left alone.
pub fn set_wind_flows(
    topology: &BuildingTopology,
    left_right: &VentilationPaths,
    front_back: &VentilationPaths,
    wind: WindComponents,
    model: &dyn FlowModel,
) -> FluxMatrix {
    let mut flux = FluxMatrix::new(topology.room_count());
    add_path_flows(topology, left_right, wind.left_right, model, &mut flux);
    add_path_flows(topology, front_back, wind.front_back, model, &mut flux);
    flux
}

fn add_path_flows(
    topology: &BuildingTopology,
    paths: &VentilationPaths,
    component: f64,
    model: &dyn FlowModel,
    flux: &mut FluxMatrix,
) {
    for (floor, rooms) in paths.paths() {
        if component.abs() < CALM_THRESHOLD {
            log::info!(
                "floor {}: {} cross ventilation does not occur (calm)",
                floor,
                paths.axis
            );
            continue;
        }
        let path = AdvectionPath {
            rooms,
            min_area_m2: path_min_area(topology, floor, paths.axis, rooms),
        };
        let magnitude = model.advection_flow(&path, component);
        if magnitude == 0.0 {
            continue;
        }

        for pair in rooms.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if flux.is_claimed(a, b) {
                continue;
            }
            let (from, to) = if component > 0.0 { (a, b) } else { (b, a) };
            log::debug!(
                "{} advection flow: {} -> {} = {}",
                paths.axis,
                from,
                to,
                magnitude
            );
            flux.set(from, to, magnitude);
        }
    }
}

/// Smallest open area between consecutive rooms of a path.
///
/// The outdoor legs only count the facade opening on the path's own entry
/// and exit sides.
fn path_min_area(
    topology: &BuildingTopology,
    floor: i32,
    axis: VentilationAxis,
    rooms: &[RoomId],
) -> f64 {
    let leg_area = |a: RoomId, b: RoomId| -> f64 {
        let side = if a == OUTDOORS {
            Some(axis.entry())
        } else if b == OUTDOORS {
            Some(axis.exit())
        } else {
            None
        };
        topology
            .open_apertures()
            .filter(|ap| ap.floor == floor && (side.is_none() || ap.side == side))
            .filter(|ap| {
                (ap.origin == a && ap.destination == b) || (ap.origin == b && ap.destination == a)
            })
            .map(|ap| ap.area_m2)
            .fold(0.0, f64::max)
    };
    let min = rooms
        .windows(2)
        .map(|pair| leg_area(pair[0], pair[1]))
        .fold(f64::INFINITY, f64::min);
    if min.is_finite() {
        min
    } else {
        0.0
    }
}
