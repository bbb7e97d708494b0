//! Pure multi-room transport logic for RoomAir.
//!
//! This crate contains the inter-room mass transport that runs between
//! chemistry-only integration windows. It is independent of any solver,
//! file format, or thread pool: functions take plain data and return
//! results, so every step can be unit-tested on hand-built buildings.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`topology`] | Rooms, floors, apertures and facade sides |
//! | [`ventilation`] | Cross-ventilation path search per floor |
//! | [`wind`] | Wind vector → left/right and front/back components, advection flows |
//! | [`flow`] | Replaceable flow-rate models (placeholder and orifice) |
//! | [`flux`] | Square room-to-room flux matrix (index 0 = outdoors) |
//! | [`apertures`] | Four-category exchange-flow classification |
//! | [`species`] | Transportable / non-transportable species partitioning |
//! | [`transport`] | Mass-conserving transport of molecule counts between rooms |
//! | [`error`] | Fatal transport errors and non-fatal configuration issues |
//!
//! # Pipeline
//!
//! ```
//! use roomair_logic::apertures::set_exchange_flows;
//! use roomair_logic::flow::PlaceholderFlowModel;
//! use roomair_logic::topology::{Aperture, BuildingTopology, Room, Side};
//! use roomair_logic::ventilation::{cross_ventilation_paths, VentilationAxis};
//! use roomair_logic::wind::{set_wind_flows, wind_components};
//!
//! let topology = BuildingTopology::new(
//!     vec![Room::new(1, 0, 30.0), Room::new(2, 0, 30.0)],
//!     vec![
//!         Aperture::outdoor(1, 0, 1.0, Side::Left),
//!         Aperture::indoor(1, 2, 0, 1.0),
//!         Aperture::outdoor(2, 0, 1.0, Side::Right),
//!     ],
//! );
//! let (lr, _) = cross_ventilation_paths(&topology, VentilationAxis::LeftRight);
//! let (fb, _) = cross_ventilation_paths(&topology, VentilationAxis::FrontBack);
//! assert_eq!(lr.sequence(0), vec![0, 1, 2, 0]);
//!
//! let model = PlaceholderFlowModel;
//! let wind = wind_components(0.0, 90.0, 3.0);
//! let mut flux = set_wind_flows(&topology, &lr, &fb, wind, &model);
//! set_exchange_flows(&topology, &lr, &fb, &mut flux, &model);
//! assert!(flux.get(1, 2) != 0.0);
//! ```

pub mod apertures;
pub mod error;
pub mod flow;
pub mod flux;
pub mod species;
pub mod topology;
pub mod transport;
pub mod ventilation;
pub mod wind;
