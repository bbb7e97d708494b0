//! Aperture classification: exchange flows for every unclaimed opening.
//!
//! Runs after the advection flows are in the matrix. Each open aperture
//! whose room pair is still unclaimed falls in one of four categories:
//!
//! | # | Category | Condition |
//! |---|----------|-----------|
//! | 1 | cross-ventilated | origin room on a left/right or front/back path |
//! | 2 | outdoor | not on a path, destination outdoors |
//! | 3 | indoor, room has outdoor opening | not on a path, destination indoor, origin opens outdoors |
//! | 4 | indoor, room has no outdoor opening | as 3, origin has no outdoor opening |
//!
//! Categories are assigned in passes, 1 to 4, each pass over every ordered
//! room pair. A classified pair gets the same flow in both directions and
//! is then claimed, so later passes skip it.

use crate::flow::{ApertureCategory, FlowModel};
use crate::flux::FluxMatrix;
use crate::topology::{BuildingTopology, RoomId, OUTDOORS};
use crate::ventilation::VentilationPaths;

/// Category of the aperture `origin → destination`, ignoring claims.
pub fn classify_aperture(
    topology: &BuildingTopology,
    left_right: &VentilationPaths,
    front_back: &VentilationPaths,
    origin: RoomId,
    destination: RoomId,
) -> ApertureCategory {
    if left_right.contains_room(origin) || front_back.contains_room(origin) {
        ApertureCategory::CrossVentilated
    } else if destination == OUTDOORS {
        ApertureCategory::Outdoor
    } else if topology.has_outdoor_opening(origin) {
        ApertureCategory::IndoorWithOutdoor
    } else {
        ApertureCategory::IndoorOnly
    }
}

/// Fill every unclaimed open aperture with its category's exchange flow.
///
/// Returns the number of room pairs classified in this call. Running it a
/// second time on the same matrix classifies nothing.
pub fn set_exchange_flows(
    topology: &BuildingTopology,
    left_right: &VentilationPaths,
    front_back: &VentilationPaths,
    flux: &mut FluxMatrix,
    model: &dyn FlowModel,
) -> usize {
    let size = flux.size();
    let mut classified = 0;

    for category in ApertureCategory::ALL {
        log::debug!("* CAT {} apertures", category.number());
        for origin in 0..size {
            for destination in 0..size {
                if origin == destination || flux.is_claimed(origin, destination) {
                    continue;
                }
                let Some(aperture) = topology.open_aperture(origin, destination) else {
                    continue;
                };
                if classify_aperture(topology, left_right, front_back, origin, destination)
                    != category
                {
                    continue;
                }

                let value = model.exchange_flow(category, aperture);
                if value == 0.0 {
                    continue;
                }
                flux.set(origin, destination, value);
                flux.set(destination, origin, value);
                classified += 1;
                log::debug!("\t{} -> {} = {}", origin, destination, value);
            }
        }
    }
    classified
}
