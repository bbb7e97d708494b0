//! Flow-rate models.
//!
//! The classification of apertures and the direction of advection are fixed
//! logic; the magnitude assigned to each flow is not. It comes from a
//! [`FlowModel`], so a physically derived model can replace the placeholder
//! without touching the classifier or the transport executor.

use serde::{Deserialize, Serialize};

use crate::topology::{Aperture, RoomId};

/// Exchange-flow category of an aperture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApertureCategory {
    /// Origin room lies on a cross-ventilation path.
    CrossVentilated,
    /// Opening to outdoors in a room without cross ventilation.
    Outdoor,
    /// Indoor opening in a room that also has an outdoor opening.
    IndoorWithOutdoor,
    /// Indoor opening in a room with no outdoor opening.
    IndoorOnly,
}

impl ApertureCategory {
    /// Classification order. Earlier categories claim room pairs first.
    pub const ALL: [ApertureCategory; 4] = [
        ApertureCategory::CrossVentilated,
        ApertureCategory::Outdoor,
        ApertureCategory::IndoorWithOutdoor,
        ApertureCategory::IndoorOnly,
    ];

    /// Category number, 1 to 4.
    pub fn number(self) -> u8 {
        match self {
            ApertureCategory::CrossVentilated => 1,
            ApertureCategory::Outdoor => 2,
            ApertureCategory::IndoorWithOutdoor => 3,
            ApertureCategory::IndoorOnly => 4,
        }
    }
}

/// A cross-ventilation path handed to [`FlowModel::advection_flow`].
#[derive(Debug, Clone, Copy)]
pub struct AdvectionPath<'a> {
    /// Rooms including outdoor endpoints, `[0, .., 0]`.
    pub rooms: &'a [RoomId],
    /// Smallest open area along the path (m²); the path's bottleneck.
    pub min_area_m2: f64,
}

/// Source of flow magnitudes.
pub trait FlowModel: Send + Sync {
    /// Human-readable identifier for logs.
    fn name(&self) -> &'static str;

    /// Wind-driven flow along a path for a wind component (m/s, signed).
    /// Must return a non-negative magnitude; direction is handled by the caller.
    fn advection_flow(&self, path: &AdvectionPath<'_>, wind_component: f64) -> f64;

    /// Bidirectional exchange flow through an open aperture.
    fn exchange_flow(&self, category: ApertureCategory, aperture: &Aperture) -> f64;

    /// Factor turning the model's flow units into m³/s.
    fn volumetric_scale(&self) -> f64 {
        1.0
    }
}

/// Fixed magnitudes that only encode the category: 999 for advection,
/// 111 / 222 / 333 / 444 for exchange, scaled by 1e-5 into m³/s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderFlowModel;

impl PlaceholderFlowModel {
    pub const ADVECTION: f64 = 999.0;
    pub const SCALE: f64 = 1.0e-5;

    pub fn exchange_value(category: ApertureCategory) -> f64 {
        match category {
            ApertureCategory::CrossVentilated => 111.0,
            ApertureCategory::Outdoor => 222.0,
            ApertureCategory::IndoorWithOutdoor => 333.0,
            ApertureCategory::IndoorOnly => 444.0,
        }
    }
}

impl FlowModel for PlaceholderFlowModel {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    fn advection_flow(&self, _path: &AdvectionPath<'_>, _wind_component: f64) -> f64 {
        Self::ADVECTION
    }

    fn exchange_flow(&self, category: ApertureCategory, _aperture: &Aperture) -> f64 {
        Self::exchange_value(category)
    }

    fn volumetric_scale(&self) -> f64 {
        Self::SCALE
    }
}

/// Orifice-equation flows in m³/s.
///
/// - advection: `Q = Cd · A_min · |U| · √ΔCp`
/// - exchange:  `Q = Cd · A · v_mix`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrificeFlowModel {
    /// Discharge coefficient of a sharp-edged opening.
    pub discharge_coefficient: f64,
    /// Windward minus leeward wind pressure coefficient.
    pub pressure_coefficient_difference: f64,
    /// Effective bidirectional mixing velocity through an opening (m/s).
    pub mixing_velocity: f64,
}

impl Default for OrificeFlowModel {
    fn default() -> Self {
        Self {
            discharge_coefficient: 0.6,
            pressure_coefficient_difference: 0.9,
            mixing_velocity: 0.05,
        }
    }
}

impl FlowModel for OrificeFlowModel {
    fn name(&self) -> &'static str {
        "orifice"
    }

    fn advection_flow(&self, path: &AdvectionPath<'_>, wind_component: f64) -> f64 {
        self.discharge_coefficient
            * path.min_area_m2.max(0.0)
            * wind_component.abs()
            * self.pressure_coefficient_difference.max(0.0).sqrt()
    }

    fn exchange_flow(&self, _category: ApertureCategory, aperture: &Aperture) -> f64 {
        self.discharge_coefficient * aperture.area_m2.max(0.0) * self.mixing_velocity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Side;

    #[test]
    fn test_placeholder_values() {
        let m = PlaceholderFlowModel;
        let ap = Aperture::outdoor(1, 0, 1.0, Side::Left);
        let values: Vec<f64> = ApertureCategory::ALL
            .iter()
            .map(|&c| m.exchange_flow(c, &ap))
            .collect();
        assert_eq!(values, vec![111.0, 222.0, 333.0, 444.0]);
        let path = AdvectionPath {
            rooms: &[0, 1, 0],
            min_area_m2: 1.0,
        };
        assert_eq!(m.advection_flow(&path, -4.0), 999.0);
        assert_eq!(m.volumetric_scale(), 1e-5);
    }

    #[test]
    fn test_orifice_advection_is_non_negative_and_linear_in_speed() {
        let m = OrificeFlowModel::default();
        let path = AdvectionPath {
            rooms: &[0, 1, 2, 0],
            min_area_m2: 2.0,
        };
        let q1 = m.advection_flow(&path, 1.0);
        let q2 = m.advection_flow(&path, -2.0);
        assert!(q1 > 0.0);
        assert!((q2 - 2.0 * q1).abs() < 1e-12);
        assert!((q1 - 0.6 * 2.0 * 0.9_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_orifice_exchange_scales_with_area() {
        let m = OrificeFlowModel::default();
        let small = Aperture::indoor(1, 2, 0, 0.5);
        let large = Aperture::indoor(1, 2, 0, 1.5);
        let qs = m.exchange_flow(ApertureCategory::IndoorOnly, &small);
        let ql = m.exchange_flow(ApertureCategory::IndoorOnly, &large);
        assert!((ql - 3.0 * qs).abs() < 1e-12);
        assert_eq!(m.volumetric_scale(), 1.0);
    }

    #[test]
    fn test_category_numbers_follow_order() {
        let numbers: Vec<u8> = ApertureCategory::ALL.iter().map(|c| c.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }
}
