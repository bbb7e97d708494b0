//! Mass-conserving transport between rooms.
//!
//! Runs once at each chemistry-only window boundary. Concentrations
//! (molecules/cm³) are turned into absolute molecule counts so that moving
//! molecules from one room to another is a plain subtraction and addition.
//!
//! Order of the legs:
//!
//! 1. indoor → indoor, for every indoor-transportable species,
//! 2. outdoors → room, for every indoor species with an `…OUT` partner,
//!    carrying the room's outdoor concentration,
//! 3. room → outdoors, for the same paired species.
//!
//! Species without an `…OUT` partner only move between rooms. Indoor legs
//! and the outdoor concentrations always come from the pre-transport
//! snapshot. The outflow leg reads either the same pre-transport values or
//! the state left by the indoor legs, see [`OutdoorBasis`].
//!
//! For every species: `after = before + inflow − outflow` summed over rooms.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::flux::FluxMatrix;
use crate::species::{partition_species, SpeciesPartition};
use crate::topology::{BuildingTopology, RoomId, CM3_PER_M3, OUTDOORS};

/// Species name → concentration (molecules/cm³).
pub type SpeciesState = BTreeMap<String, f64>;

/// End-of-window state of one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room: RoomId,
    /// Chemistry-only window the snapshot closes.
    pub window: usize,
    pub concentrations: SpeciesState,
}

impl RoomSnapshot {
    pub fn new(room: RoomId, window: usize, concentrations: SpeciesState) -> Self {
        Self {
            room,
            window,
            concentrations,
        }
    }

    pub fn get(&self, species: &str) -> f64 {
        self.concentrations.get(species).copied().unwrap_or(0.0)
    }
}

/// Concentrations the outflow leg is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutdoorBasis {
    /// Snapshot taken before any transport of this boundary.
    #[default]
    PreTransport,
    /// State after the indoor → indoor legs.
    PostIndoorTransport,
}

/// Parameters of one transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportStep {
    /// Length of the chemistry-only window (s).
    pub tchem_only: f64,
    /// Flux-matrix units → m³/s, see [`crate::flow::FlowModel::volumetric_scale`].
    pub volumetric_scale: f64,
    pub outdoor_basis: OutdoorBasis,
}

/// Outdoor exchange totals of one transport boundary, in molecules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportReport {
    /// Molecules brought in from outdoors, per indoor species.
    pub inflow: BTreeMap<String, f64>,
    /// Molecules carried out to outdoors, per indoor species.
    pub outflow: BTreeMap<String, f64>,
    /// Rooms and species left with a negative count (flows too large for the window).
    pub negative: Vec<(RoomId, String)>,
}

impl TransportReport {
    /// Net molecules gained from outdoors for a species.
    pub fn net_outdoor(&self, species: &str) -> f64 {
        self.inflow.get(species).copied().unwrap_or(0.0)
            - self.outflow.get(species).copied().unwrap_or(0.0)
    }
}

/// Molecules held by a room at a given concentration.
pub fn molecule_count(concentration: f64, volume_m3: f64) -> f64 {
    concentration * volume_m3 * CM3_PER_M3
}

/// Concentration of a molecule count in a room.
pub fn concentration(count: f64, volume_m3: f64) -> f64 {
    count / (volume_m3 * CM3_PER_M3)
}

pub fn to_molecule_counts(state: &SpeciesState, volume_m3: f64) -> SpeciesState {
    state
        .iter()
        .map(|(k, &c)| (k.clone(), molecule_count(c, volume_m3)))
        .collect()
}

pub fn from_molecule_counts(counts: &SpeciesState, volume_m3: f64) -> SpeciesState {
    counts
        .iter()
        .map(|(k, &n)| (k.clone(), concentration(n, volume_m3)))
        .collect()
}

/// Check that the snapshots line up with the building and share one schema.
///
/// Snapshot `i` must belong to room `i + 1`; every room must carry exactly
/// the species of room 1.
pub fn validate_snapshots(
    snapshots: &[RoomSnapshot],
    topology: &BuildingTopology,
) -> Result<(), TransportError> {
    if snapshots.len() != topology.room_count() {
        return Err(TransportError::RoomCountMismatch {
            expected: topology.room_count(),
            actual: snapshots.len(),
        });
    }
    for (position, snap) in snapshots.iter().enumerate() {
        if snap.room != position + 1 {
            return Err(TransportError::SnapshotOutOfOrder {
                position,
                room: snap.room,
            });
        }
    }

    let Some(reference) = snapshots.first() else {
        return Ok(());
    };
    let expected: BTreeSet<&String> = reference.concentrations.keys().collect();
    for snap in &snapshots[1..] {
        let found: BTreeSet<&String> = snap.concentrations.keys().collect();
        if found != expected {
            return Err(TransportError::SnapshotMismatch {
                room: snap.room,
                window: snap.window,
                missing: expected.difference(&found).map(|s| s.to_string()).collect(),
                unexpected: found.difference(&expected).map(|s| s.to_string()).collect(),
            });
        }
    }
    Ok(())
}

/// Move transportable species between rooms and outdoors over one window.
///
/// Snapshots are updated in place and become the initial conditions of the
/// next window. Non-transportable variables are never touched. On error no
/// snapshot is modified.
pub fn apply_transport(
    snapshots: &mut [RoomSnapshot],
    topology: &BuildingTopology,
    flux: &FluxMatrix,
    step: TransportStep,
) -> Result<TransportReport, TransportError> {
    topology.validate()?;
    if flux.nroom() != topology.room_count() {
        return Err(TransportError::RoomCountMismatch {
            expected: topology.room_count(),
            actual: flux.nroom(),
        });
    }
    validate_snapshots(snapshots, topology)?;

    let mut report = TransportReport::default();
    let Some(first) = snapshots.first() else {
        return Ok(report);
    };
    let species: SpeciesPartition = partition_species(first.concentrations.keys());
    let pairs: Vec<(String, String)> = species
        .paired()
        .map(|(i, o)| (i.to_string(), o.to_string()))
        .collect();

    // Index 0 stays empty so rooms index directly.
    let volumes: Vec<f64> = std::iter::once(0.0)
        .chain(snapshots.iter().map(|s| topology.volume_m3(s.room)))
        .collect();
    let before: Vec<&SpeciesState> = snapshots.iter().map(|s| &s.concentrations).collect();
    let pre = |room: RoomId, name: &str| -> f64 {
        before[room - 1].get(name).copied().unwrap_or(0.0)
    };

    let mut counts: Vec<SpeciesState> = vec![SpeciesState::new(); volumes.len()];
    for room in 1..volumes.len() {
        counts[room] = species
            .indoor
            .iter()
            .map(|name| (name.clone(), molecule_count(pre(room, name), volumes[room])))
            .collect();
    }

    let volume_per_window = |value: f64| value * step.volumetric_scale * step.tchem_only * CM3_PER_M3;

    for (from, to, value) in flux.nonzero() {
        if from == OUTDOORS || to == OUTDOORS {
            continue;
        }
        let moved_cm3 = volume_per_window(value);
        for name in &species.indoor {
            let moved = moved_cm3 * pre(from, name);
            add(&mut counts[from], name, -moved);
            add(&mut counts[to], name, moved);
        }
    }

    let outdoor_basis: Vec<SpeciesState> = match step.outdoor_basis {
        OutdoorBasis::PreTransport => Vec::new(),
        OutdoorBasis::PostIndoorTransport => counts
            .iter()
            .zip(&volumes)
            .map(|(c, &v)| if v > 0.0 { from_molecule_counts(c, v) } else { SpeciesState::new() })
            .collect(),
    };
    let basis = |room: RoomId, name: &str| -> f64 {
        match step.outdoor_basis {
            OutdoorBasis::PreTransport => pre(room, name),
            OutdoorBasis::PostIndoorTransport => {
                outdoor_basis[room].get(name).copied().unwrap_or(0.0)
            }
        }
    };

    for room in 1..volumes.len() {
        let inflow = flux.get(OUTDOORS, room);
        if inflow != 0.0 {
            let moved_cm3 = volume_per_window(inflow);
            for (indoor, outdoor) in &pairs {
                let moved = moved_cm3 * pre(room, outdoor);
                add(&mut counts[room], indoor, moved);
                *report.inflow.entry(indoor.clone()).or_insert(0.0) += moved;
            }
        }

        let outflow = flux.get(room, OUTDOORS);
        if outflow != 0.0 {
            let moved_cm3 = volume_per_window(outflow);
            for (name, _) in &pairs {
                let moved = moved_cm3 * basis(room, name);
                add(&mut counts[room], name, -moved);
                *report.outflow.entry(name.clone()).or_insert(0.0) += moved;
            }
        }
    }

    for (snap, room_counts) in snapshots.iter_mut().zip(counts.iter().skip(1)) {
        let volume = topology.volume_m3(snap.room);
        for (name, &count) in room_counts {
            if count < 0.0 {
                log::warn!(
                    "room {} window {}: {} went negative after transport ({:.3e} molecules)",
                    snap.room,
                    snap.window,
                    name,
                    count
                );
                report.negative.push((snap.room, name.clone()));
            }
            snap.concentrations
                .insert(name.clone(), concentration(count, volume));
        }
    }

    log::debug!(
        "transport applied to {} rooms, {} indoor species, {} outdoor pairs",
        snapshots.len(),
        species.indoor.len(),
        pairs.len()
    );
    Ok(report)
}

fn add(counts: &mut SpeciesState, name: &str, delta: f64) {
    if let Some(n) = counts.get_mut(name) {
        *n += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Aperture, Room, Side};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    fn state(pairs: &[(&str, f64)]) -> SpeciesState {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn building() -> BuildingTopology {
        BuildingTopology::new(
            vec![Room::new(1, 0, 1.0), Room::new(2, 0, 2.0)],
            vec![
                Aperture::outdoor(1, 0, 1.0, Side::Left),
                Aperture::indoor(1, 2, 0, 1.0),
                Aperture::outdoor(2, 0, 1.0, Side::Right),
            ],
        )
    }

    fn snapshots(o3_room1: f64, o3_room2: f64) -> Vec<RoomSnapshot> {
        vec![
            RoomSnapshot::new(
                1,
                1,
                state(&[("O3", o3_room1), ("O3OUT", 50.0), ("J4", 1e-5), ("ACRate", 2.0)]),
            ),
            RoomSnapshot::new(
                2,
                1,
                state(&[("O3", o3_room2), ("O3OUT", 40.0), ("J4", 2e-5), ("ACRate", 3.0)]),
            ),
        ]
    }

    fn step(basis: OutdoorBasis) -> TransportStep {
        TransportStep {
            tchem_only: 1.0,
            volumetric_scale: 1.0,
            outdoor_basis: basis,
        }
    }

    fn total(snaps: &[RoomSnapshot], topology: &BuildingTopology, name: &str) -> f64 {
        snaps
            .iter()
            .map(|s| molecule_count(s.get(name), topology.volume_m3(s.room)))
            .sum()
    }

    #[test]
    fn test_round_trip_without_flux() {
        let original = state(&[("O3", 7.5e11), ("NO2", 3.25e10)]);
        let back = from_molecule_counts(&to_molecule_counts(&original, 37.2), 37.2);
        for (k, v) in &original {
            assert!(close(back[k], *v));
        }

        let t = building();
        let mut snaps = snapshots(100.0, 20.0);
        let copy = snaps.clone();
        let report =
            apply_transport(&mut snaps, &t, &FluxMatrix::new(2), step(OutdoorBasis::PreTransport))
                .unwrap();
        for (a, b) in snaps.iter().zip(&copy) {
            for (k, v) in &b.concentrations {
                assert!(close(a.get(k), *v));
            }
        }
        assert!(report.inflow.is_empty());
        assert!(report.outflow.is_empty());
    }

    #[test]
    fn test_indoor_leg_moves_molecules() {
        let t = building();
        let mut snaps = snapshots(100.0, 0.0);
        let mut flux = FluxMatrix::new(2);
        flux.set(1, 2, 0.1);
        apply_transport(&mut snaps, &t, &flux, step(OutdoorBasis::PreTransport)).unwrap();
        // 0.1 m³ of room 1 (1 m³) moves into room 2 (2 m³).
        assert!(close(snaps[0].get("O3"), 90.0));
        assert!(close(snaps[1].get("O3"), 5.0));
    }

    #[test]
    fn test_inflow_carries_outdoor_concentration() {
        let t = building();
        let mut snaps = snapshots(0.0, 0.0);
        let mut flux = FluxMatrix::new(2);
        flux.set(OUTDOORS, 1, 0.1);
        let report = apply_transport(&mut snaps, &t, &flux, step(OutdoorBasis::PreTransport)).unwrap();
        assert!(close(snaps[0].get("O3"), 5.0));
        assert!(close(report.inflow["O3"], 5.0e6));
        assert_eq!(snaps[0].get("O3OUT"), 50.0);
        assert_eq!(snaps[1].get("O3"), 0.0);
    }

    #[test]
    fn test_outdoor_basis_changes_outflow() {
        let t = building();
        let mut flux = FluxMatrix::new(2);
        flux.set(1, 2, 0.1);
        flux.set(1, OUTDOORS, 0.1);

        let mut pre = snapshots(100.0, 0.0);
        apply_transport(&mut pre, &t, &flux, step(OutdoorBasis::PreTransport)).unwrap();
        assert!(close(pre[0].get("O3"), 80.0));

        let mut post = snapshots(100.0, 0.0);
        apply_transport(&mut post, &t, &flux, step(OutdoorBasis::PostIndoorTransport)).unwrap();
        assert!(close(post[0].get("O3"), 81.0));
    }

    #[test]
    fn test_mass_balance_both_bases() {
        let t = building();
        let mut flux = FluxMatrix::new(2);
        flux.set(OUTDOORS, 1, 0.05);
        flux.set(1, 2, 0.2);
        flux.set(2, OUTDOORS, 0.3);
        flux.set(2, 1, 0.01);
        flux.set(1, OUTDOORS, 0.05);

        for basis in [OutdoorBasis::PreTransport, OutdoorBasis::PostIndoorTransport] {
            let mut snaps = snapshots(80.0, 30.0);
            let before = total(&snaps, &t, "O3");
            let report = apply_transport(&mut snaps, &t, &flux, step(basis)).unwrap();
            let after = total(&snaps, &t, "O3");
            assert!(
                close(after, before + report.net_outdoor("O3")),
                "{basis:?}: {after} != {before} + {}",
                report.net_outdoor("O3")
            );
            assert!(report.negative.is_empty());
        }
    }

    #[test]
    fn test_non_transportable_untouched() {
        let t = building();
        let mut flux = FluxMatrix::new(2);
        flux.set(1, 2, 0.2);
        flux.set(OUTDOORS, 2, 0.2);
        flux.set(2, OUTDOORS, 0.2);
        let mut snaps = snapshots(10.0, 10.0);
        apply_transport(&mut snaps, &t, &flux, step(OutdoorBasis::PreTransport)).unwrap();
        assert_eq!(snaps[0].get("J4"), 1e-5);
        assert_eq!(snaps[1].get("J4"), 2e-5);
        assert_eq!(snaps[0].get("ACRate"), 2.0);
        assert_eq!(snaps[1].get("ACRate"), 3.0);
        assert_eq!(snaps[1].get("O3OUT"), 40.0);
    }

    #[test]
    fn test_schema_mismatch_is_fatal() {
        let t = building();
        let mut snaps = snapshots(1.0, 1.0);
        snaps[1].concentrations.remove("O3");
        snaps[1].concentrations.insert("NO".into(), 1.0);
        let copy = snaps.clone();
        let err = apply_transport(
            &mut snaps,
            &t,
            &FluxMatrix::new(2),
            step(OutdoorBasis::PreTransport),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransportError::SnapshotMismatch {
                room: 2,
                window: 1,
                missing: vec!["O3".into()],
                unexpected: vec!["NO".into()],
            }
        );
        assert_eq!(snaps, copy);
    }

    #[test]
    fn test_snapshot_order_and_count() {
        let t = building();
        let mut snaps = snapshots(1.0, 1.0);
        snaps.swap(0, 1);
        assert_eq!(
            validate_snapshots(&snaps, &t),
            Err(TransportError::SnapshotOutOfOrder {
                position: 0,
                room: 2
            })
        );
        assert_eq!(
            validate_snapshots(&snaps[..1], &t),
            Err(TransportError::RoomCountMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_unknown_room_aborts_before_transport() {
        let mut t = building();
        t.apertures.push(Aperture::indoor(2, 9, 0, 1.0));
        let mut snaps = snapshots(1.0, 1.0);
        let err = apply_transport(
            &mut snaps,
            &t,
            &FluxMatrix::new(2),
            step(OutdoorBasis::PreTransport),
        )
        .unwrap_err();
        assert!(matches!(err, TransportError::UnknownRoom { room: 9, .. }));
    }

    #[test]
    fn test_oversized_flow_reports_negative() {
        let t = building();
        let mut flux = FluxMatrix::new(2);
        flux.set(1, OUTDOORS, 5.0);
        let mut snaps = snapshots(10.0, 10.0);
        let report = apply_transport(&mut snaps, &t, &flux, step(OutdoorBasis::PreTransport)).unwrap();
        assert_eq!(report.negative, vec![(1, "O3".to_string())]);
    }

    /// Rooms of 1 m³ and 2 m³ with paired O3 and unpaired HCHO.
    fn mixed_snapshots() -> Vec<RoomSnapshot> {
        vec![
            RoomSnapshot::new(1, 1, state(&[("O3", 80.0), ("O3OUT", 50.0), ("HCHO", 10.0)])),
            RoomSnapshot::new(2, 1, state(&[("O3", 30.0), ("O3OUT", 40.0), ("HCHO", 20.0)])),
        ]
    }

    fn mixed_flux() -> FluxMatrix {
        let mut flux = FluxMatrix::new(2);
        flux.set(OUTDOORS, 1, 0.05);
        flux.set(1, 2, 0.2);
        flux.set(1, OUTDOORS, 0.1);
        flux.set(2, OUTDOORS, 0.3);
        flux
    }

    #[test]
    fn test_outdoor_legs_pre_transport_counts() {
        // Indoor: 0.2e6 cm³ · 80 = 1.6e7 O3 from room 1 to room 2.
        // Inflow: 0.05e6 · 50 = 2.5e6 into room 1.
        // Outflow: 0.1e6 · 80 = 8e6 from room 1, 0.3e6 · 30 = 9e6 from room 2.
        let t = building();
        let mut snaps = mixed_snapshots();
        let report =
            apply_transport(&mut snaps, &t, &mixed_flux(), step(OutdoorBasis::PreTransport)).unwrap();
        assert!(close(report.inflow["O3"], 2.5e6));
        assert!(close(report.outflow["O3"], 1.7e7));
        assert!(close(snaps[0].get("O3"), 58.5));
        assert!(close(snaps[1].get("O3"), 33.5));
    }

    #[test]
    fn test_outdoor_legs_post_indoor_counts() {
        // After the indoor leg room 1 holds 64 and room 2 holds 38 O3.
        // Inflow still carries the outdoor value: 2.5e6.
        // Outflow: 0.1e6 · 64 = 6.4e6 and 0.3e6 · 38 = 1.14e7.
        let t = building();
        let mut snaps = mixed_snapshots();
        let report = apply_transport(
            &mut snaps,
            &t,
            &mixed_flux(),
            step(OutdoorBasis::PostIndoorTransport),
        )
        .unwrap();
        assert!(close(report.inflow["O3"], 2.5e6));
        assert!(close(report.outflow["O3"], 1.78e7));
        assert!(close(snaps[0].get("O3"), 60.1));
        assert!(close(snaps[1].get("O3"), 32.3));
    }

    #[test]
    fn test_unpaired_species_only_moves_indoors() {
        for basis in [OutdoorBasis::PreTransport, OutdoorBasis::PostIndoorTransport] {
            let t = building();
            let mut snaps = mixed_snapshots();
            let report = apply_transport(&mut snaps, &t, &mixed_flux(), step(basis)).unwrap();
            // 0.2e6 · 10 = 2e6 HCHO moves from room 1 to room 2; nothing leaves.
            assert!(close(snaps[0].get("HCHO"), 8.0));
            assert!(close(snaps[1].get("HCHO"), 21.0));
            assert!(!report.inflow.contains_key("HCHO"));
            assert!(!report.outflow.contains_key("HCHO"));
            assert!(close(total(&snaps, &t, "HCHO"), 5.0e7));
        }
    }
}
