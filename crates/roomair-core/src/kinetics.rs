//! Kinetics integration boundary.
//!
//! The engine never solves the reaction network itself. Each room of a
//! window is handed to a [`KineticsIntegrator`] with its initial
//! concentrations and environment; the integrator returns the final
//! concentrations. Integrators run concurrently on the room pool, so they
//! must be `Send + Sync` and must not share mutable state between rooms.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use roomair_logic::species::{is_transportable, OUTDOOR_SUFFIX};
use roomair_logic::topology::RoomId;
use roomair_logic::transport::SpeciesState;

use crate::forcing::RoomEnvironment;

/// Everything one room needs to integrate one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationRequest {
    pub room: RoomId,
    pub window: usize,
    /// Window start, seconds since midnight of day 1.
    pub start_s: f64,
    pub duration_s: f64,
    pub environment: RoomEnvironment,
    pub initial: SpeciesState,
}

pub trait KineticsIntegrator: Send + Sync {
    fn name(&self) -> &str;

    /// Integrate one room over one window. An `Err` fails the whole window.
    fn integrate(&self, request: &IntegrationRequest) -> Result<SpeciesState, String>;
}

/// Reference integrator with no reactions.
///
/// Every indoor species `X` follows
/// `dX/dt = AER · (XOUT − X) − k_X · X`, solved exactly over the window,
/// where `XOUT` is its outdoor partner (zero when absent) and `k_X` its
/// first-order loss rate (1/s, zero when not listed). Outdoor species and
/// non-transportable variables are carried through unchanged, except the
/// environment variables `temp`, `M`, `AV` and `ACRate`, which are
/// refreshed from the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirstOrderDecay {
    #[serde(default)]
    pub loss_rates: BTreeMap<String, f64>,
}

impl FirstOrderDecay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loss(mut self, species: &str, rate: f64) -> Self {
        self.loss_rates.insert(species.to_string(), rate);
        self
    }
}

impl KineticsIntegrator for FirstOrderDecay {
    fn name(&self) -> &str {
        "first-order-decay"
    }

    fn integrate(&self, request: &IntegrationRequest) -> Result<SpeciesState, String> {
        let env = &request.environment;
        let dt = request.duration_s;
        if !(dt.is_finite() && dt >= 0.0) {
            return Err(format!("invalid window length {dt}"));
        }

        let mut state = request.initial.clone();
        for (name, value) in state.iter_mut() {
            if !value.is_finite() {
                return Err(format!("{name} is not finite ({value})"));
            }
            if !is_transportable(name) || name.ends_with(OUTDOOR_SUFFIX) {
                continue;
            }
            let outdoor = request
                .initial
                .get(&format!("{name}{OUTDOOR_SUFFIX}"))
                .copied()
                .unwrap_or(0.0);
            let loss = self.loss_rates.get(name).copied().unwrap_or(0.0);
            let total = env.air_exchange_rate + loss;
            if total > 0.0 {
                let equilibrium = env.air_exchange_rate * outdoor / total;
                *value = equilibrium + (*value - equilibrium) * (-total * dt).exp();
            }
        }

        state.insert("temp".into(), env.temperature_k);
        state.insert("M".into(), env.number_density);
        state.insert("AV".into(), env.surface_to_volume);
        state.insert("ACRate".into(), env.air_exchange_rate);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(initial: &[(&str, f64)], aer: f64, duration_s: f64) -> IntegrationRequest {
        IntegrationRequest {
            room: 1,
            window: 0,
            start_s: 0.0,
            duration_s,
            environment: RoomEnvironment {
                room: 1,
                temperature_k: 293.0,
                relative_humidity: 50.0,
                number_density: 2.5e19,
                air_exchange_rate: aer,
                surface_to_volume: 0.02,
            },
            initial: initial.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn test_pure_decay() {
        let kin = FirstOrderDecay::new().with_loss("O3", 1e-3);
        let out = kin
            .integrate(&request(&[("O3", 100.0)], 0.0, 1000.0))
            .unwrap();
        assert!((out["O3"] - 100.0 * (-1.0f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn test_relaxes_toward_outdoor() {
        let kin = FirstOrderDecay::new();
        let out = kin
            .integrate(&request(&[("NO2", 0.0), ("NO2OUT", 40.0)], 1.0, 100.0))
            .unwrap();
        assert!((out["NO2"] - 40.0).abs() < 1e-9);
        assert_eq!(out["NO2OUT"], 40.0);
    }

    #[test]
    fn test_non_transportable_kept_and_environment_written() {
        let kin = FirstOrderDecay::new().with_loss("J4", 1.0);
        let out = kin
            .integrate(&request(&[("J4", 5.0), ("HCHO", 2.0)], 0.0, 60.0))
            .unwrap();
        assert_eq!(out["J4"], 5.0);
        assert_eq!(out["HCHO"], 2.0);
        assert_eq!(out["temp"], 293.0);
        assert_eq!(out["ACRate"], 0.0);
        assert_eq!(out["AV"], 0.02);
        assert_eq!(out["M"], 2.5e19);
    }

    #[test]
    fn test_rejects_non_finite_input() {
        let kin = FirstOrderDecay::new();
        let err = kin
            .integrate(&request(&[("O3", f64::NAN)], 0.0, 60.0))
            .unwrap_err();
        assert!(err.contains("O3"));
    }
}
