//! RoomAir Headless Simulation Harness
//!
//! Validates the transport logic and a full engine run on the bundled
//! building. Runs entirely in-process with the reference kinetics
//! integrator and an in-memory snapshot store.
//!
//! Usage:
//!   cargo run -p roomair-simtest
//!   cargo run -p roomair-simtest -- --verbose
//!   RUST_LOG=debug cargo run -p roomair-simtest

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use roomair_core::engine::SimulationEngine;
use roomair_core::kinetics::FirstOrderDecay;
use roomair_core::settings::{validate_settings, SimulationSettings};
use roomair_core::snapshot::{MemoryStore, SnapshotStore};
use roomair_logic::apertures::set_exchange_flows;
use roomair_logic::flow::{FlowModel, PlaceholderFlowModel};
use roomair_logic::flux::FluxMatrix;
use roomair_logic::species::partition_species;
use roomair_logic::topology::{Aperture, BuildingTopology, Room, Side};
use roomair_logic::transport::{
    apply_transport, from_molecule_counts, molecule_count, to_molecule_counts, OutdoorBasis,
    RoomSnapshot, SpeciesState, TransportStep,
};
use roomair_logic::ventilation::{
    cross_ventilation_paths, cross_ventilation_paths_str, FloorVentilation, VentilationAxis,
    VentilationPaths,
};
use roomair_logic::wind::{set_wind_flows, wind_components, WindComponents};

// ── Bundled building and run settings ───────────────────────────────────
const BUILDING_JSON: &str = include_str!("../../../data/building.json");
const SETTINGS_JSON: &str = include_str!("../../../data/settings.json");

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== RoomAir Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Building data
    results.extend(validate_building_data(verbose));

    // 2. Cross-ventilation path finder
    results.extend(validate_path_finder(verbose));

    // 3. Wind resolver
    results.extend(validate_wind(verbose));

    // 4. Aperture classification on the bundled building
    results.extend(validate_classifier(verbose));

    // 5. Species partitioning
    results.extend(validate_species(verbose));

    // 6. Transport conservation sweep
    results.extend(validate_transport(verbose));

    // 7. End-to-end engine run
    results.extend(validate_engine_run(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

fn load_building() -> Result<BuildingTopology, String> {
    serde_json::from_str(BUILDING_JSON).map_err(|e| format!("building JSON: {}", e))
}

fn load_settings() -> Result<SimulationSettings, String> {
    SimulationSettings::from_json(SETTINGS_JSON).map_err(|e| e.to_string())
}

fn resolve_flux(
    topology: &BuildingTopology,
    wind: WindComponents,
) -> (FluxMatrix, VentilationPaths, VentilationPaths) {
    let model = PlaceholderFlowModel;
    let (lr, _) = cross_ventilation_paths(topology, VentilationAxis::LeftRight);
    let (fb, _) = cross_ventilation_paths(topology, VentilationAxis::FrontBack);
    let mut flux = set_wind_flows(topology, &lr, &fb, wind, &model);
    set_exchange_flows(topology, &lr, &fb, &mut flux, &model);
    (flux, lr, fb)
}

// ── 1. Building Data ────────────────────────────────────────────────────

fn validate_building_data(verbose: bool) -> Vec<TestResult> {
    println!("--- Building Data ---");
    let mut results = Vec::new();

    let topology = match load_building() {
        Ok(t) => t,
        Err(e) => {
            results.push(check("building_parse", false, e));
            return results;
        }
    };

    results.push(check(
        "building_valid",
        topology.validate().is_ok(),
        format!(
            "{} rooms on floors {:?}, {} apertures ({} open)",
            topology.room_count(),
            topology.floors(),
            topology.apertures.len(),
            topology.open_apertures().count()
        ),
    ));

    match load_settings() {
        Ok(settings) => {
            let issues = validate_settings(&settings, &topology);
            if verbose {
                for issue in &issues {
                    println!("    settings issue: {}", issue);
                }
            }
            results.push(check(
                "settings_valid",
                issues.is_empty(),
                format!(
                    "{} windows of {} s, {} issues",
                    settings.nchem_only,
                    settings.tchem_only,
                    issues.len()
                ),
            ));
        }
        Err(e) => results.push(check("settings_parse", false, e)),
    }

    results
}

// ── 2. Path Finder ──────────────────────────────────────────────────────

fn validate_path_finder(verbose: bool) -> Vec<TestResult> {
    println!("--- Cross-Ventilation Paths ---");
    let mut results = Vec::new();

    // Two-room building, left → right.
    let two_rooms = BuildingTopology::new(
        vec![Room::new(1, 0, 30.0), Room::new(2, 0, 30.0)],
        vec![
            Aperture::outdoor(1, 0, 1.0, Side::Left),
            Aperture::indoor(1, 2, 0, 1.0),
            Aperture::outdoor(2, 0, 1.0, Side::Right),
        ],
    );
    let (lr, _) = cross_ventilation_paths_str(&two_rooms, "LR");
    results.push(check(
        "path_two_room_lr",
        lr.sequence(0) == vec![0, 1, 2, 0],
        format!("sequence {:?}", lr.sequence(0)),
    ));

    // Entry and exit in the same room.
    let same_room = BuildingTopology::new(
        vec![Room::new(1, 0, 30.0)],
        vec![
            Aperture::outdoor(1, 0, 1.0, Side::Front),
            Aperture::outdoor(1, 0, 1.0, Side::Back),
        ],
    );
    let (fb, _) = cross_ventilation_paths(&same_room, VentilationAxis::FrontBack);
    results.push(check(
        "path_same_room",
        fb.floors.get(&0) == Some(&FloorVentilation::SameRoom(1)) && fb.sequence(0) == vec![0],
        format!("{:?}", fb.floors.get(&0)),
    ));

    // Two openings on the entry side.
    let mut crowded = two_rooms.clone();
    crowded.apertures.push(Aperture::outdoor(2, 0, 0.5, Side::Left));
    let (lr, issues) = cross_ventilation_paths(&crowded, VentilationAxis::LeftRight);
    results.push(check(
        "path_two_openings_degrades",
        lr.sequence(0) == vec![0] && issues.len() == 1,
        format!("{} configuration issue(s)", issues.len()),
    ));

    // Unknown direction.
    let (none, issues) = cross_ventilation_paths_str(&two_rooms, "NS");
    results.push(check(
        "path_unknown_axis",
        none.paths().next().is_none() && issues.len() == 1,
        issues
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no issue reported".into()),
    ));

    // Shortest path on random corridors with shortcuts.
    let mut rng = StdRng::seed_from_u64(42);
    let mut shortest_ok = 0;
    let trials = 100;
    for _ in 0..trials {
        let n = rng.gen_range(3..=9);
        let mut aps = vec![
            Aperture::outdoor(1, 0, 1.0, Side::Left),
            Aperture::outdoor(n, 0, 1.0, Side::Right),
        ];
        for a in 1..n {
            aps.push(Aperture::indoor(a, a + 1, 0, 1.0));
        }
        // One forward shortcut skipping at least one room.
        let from = rng.gen_range(1..n - 1);
        let to = rng.gen_range(from + 2..=n);
        aps.push(Aperture::indoor(from, to, 0, 1.0));
        let t = BuildingTopology::new((1..=n).map(|id| Room::new(id, 0, 20.0)).collect(), aps);

        let (lr, _) = cross_ventilation_paths(&t, VentilationAxis::LeftRight);
        let seq = lr.sequence(0);
        let expected_rooms = n - (to - from) + 1;
        let no_repeat = seq.windows(2).all(|w| w[0] != w[1]);
        if seq.len() == expected_rooms + 2 && seq[0] == 0 && seq[seq.len() - 1] == 0 && no_repeat {
            shortest_ok += 1;
        } else if verbose {
            println!("    n={} shortcut {}->{} gave {:?}", n, from, to, seq);
        }
    }
    results.push(check(
        "path_shortest_sweep",
        shortest_ok == trials,
        format!("{}/{} random corridors took the shortcut", shortest_ok, trials),
    ));

    // Bundled building.
    if let Ok(topology) = load_building() {
        let (lr, _) = cross_ventilation_paths(&topology, VentilationAxis::LeftRight);
        let (fb, _) = cross_ventilation_paths(&topology, VentilationAxis::FrontBack);
        results.push(check(
            "path_bundled_building",
            lr.sequence(0) == vec![0, 1, 2, 3, 0] && fb.paths().next().is_none(),
            format!("LR floor 0 {:?}, FB paths {}", lr.sequence(0), fb.paths().count()),
        ));
    }

    results
}

// ── 3. Wind ─────────────────────────────────────────────────────────────

fn validate_wind(_verbose: bool) -> Vec<TestResult> {
    println!("--- Wind Resolver ---");
    let mut results = Vec::new();

    // lr = 2·cos(0°) = 2, fb = −2·cos(90°) = 0.
    let w = wind_components(0.0, 90.0, 2.0);
    results.push(check(
        "wind_boundary_case",
        (w.left_right - 2.0).abs() < 1e-9 && w.front_back.abs() < 1e-9,
        format!("lr = {:.6}, fb = {:.6}", w.left_right, w.front_back),
    ));

    let mut rng = StdRng::seed_from_u64(7);
    let mut magnitude_ok = true;
    for _ in 0..1000 {
        let aspect = rng.gen_range(0.0..360.0);
        let dir = rng.gen_range(0.0..360.0);
        let speed = rng.gen_range(0.0..20.0);
        let w = wind_components(aspect, dir, speed);
        // The two axes are orthogonal projections of the same vector.
        let norm = (w.left_right.powi(2) + w.front_back.powi(2)).sqrt();
        magnitude_ok &= (norm - speed).abs() < 1e-9;
    }
    results.push(check(
        "wind_projection_preserves_speed",
        magnitude_ok,
        "1000 random wind vectors",
    ));

    results
}

// ── 4. Classifier ───────────────────────────────────────────────────────

fn validate_classifier(verbose: bool) -> Vec<TestResult> {
    println!("--- Aperture Classification ---");
    let mut results = Vec::new();
    let topology = match load_building() {
        Ok(t) => t,
        Err(e) => {
            results.push(check("classifier_building", false, e));
            return results;
        }
    };

    let wind = wind_components(0.0, 90.0, 3.0);
    let (flux, lr, fb) = resolve_flux(&topology, wind);
    if verbose {
        for (from, to, v) in flux.nonzero() {
            println!("    {} -> {} = {}", from, to, v);
        }
    }

    let mut found: Vec<u32> = flux.nonzero().map(|(_, _, v)| v as u32).collect();
    found.sort_unstable();
    found.dedup();
    results.push(check(
        "classifier_all_categories",
        found == vec![111, 222, 333, 444, 999],
        format!("values present {:?}", found),
    ));

    let one_way = flux
        .nonzero()
        .filter(|&(_, _, v)| v == PlaceholderFlowModel::ADVECTION)
        .all(|(from, to, _)| flux.get(to, from) == 0.0);
    let symmetric = flux
        .nonzero()
        .filter(|&(_, _, v)| v != PlaceholderFlowModel::ADVECTION)
        .all(|(from, to, v)| flux.get(to, from) == v);
    results.push(check(
        "classifier_pair_shapes",
        one_way && symmetric,
        "advection one-way, exchange mirrored",
    ));

    let mut again = flux.clone();
    let added = set_exchange_flows(&topology, &lr, &fb, &mut again, &PlaceholderFlowModel);
    results.push(check(
        "classifier_idempotent",
        added == 0 && again == flux,
        format!("second pass classified {} pairs", added),
    ));

    results
}

// ── 5. Species ──────────────────────────────────────────────────────────

fn validate_species(_verbose: bool) -> Vec<TestResult> {
    println!("--- Species Partitioning ---");
    let p = partition_species(["O3", "J4", "NO_SURF", "LIMONENEOUT", "LIMONENE", "vd_NO2"]);
    vec![check(
        "species_mixed_snapshot",
        p.indoor == ["O3", "LIMONENE"] && p.outdoor == ["LIMONENEOUT"],
        format!("indoor {:?}, outdoor {:?}", p.indoor, p.outdoor),
    )]
}

// ── 6. Transport ────────────────────────────────────────────────────────

fn validate_transport(verbose: bool) -> Vec<TestResult> {
    println!("--- Transport ---");
    let mut results = Vec::new();
    let topology = match load_building() {
        Ok(t) => t,
        Err(e) => {
            results.push(check("transport_building", false, e));
            return results;
        }
    };

    // Round trip without flux.
    let state: SpeciesState = [("O3".to_string(), 7.3e11), ("NO2".to_string(), 1.1e12)]
        .into_iter()
        .collect();
    let back = from_molecule_counts(&to_molecule_counts(&state, 42.0), 42.0);
    let round_trip = state
        .iter()
        .all(|(k, v)| (back[k] - v).abs() <= 1e-12 * v.abs());
    results.push(check(
        "transport_round_trip",
        round_trip,
        "concentration → count → concentration",
    ));

    let species = ["O3", "O3OUT", "NO2", "NO2OUT", "HCHO", "J4", "ACRate"];
    let partition = partition_species(species);
    let model = PlaceholderFlowModel;
    let mut rng = StdRng::seed_from_u64(2024);
    let mut worst: f64 = 0.0;
    let mut runs = 0;
    for basis in [OutdoorBasis::PreTransport, OutdoorBasis::PostIndoorTransport] {
        for _ in 0..50 {
            let wind = wind_components(0.0, rng.gen_range(0.0..360.0), rng.gen_range(0.0..6.0));
            let (flux, _, _) = resolve_flux(&topology, wind);
            let mut snaps: Vec<RoomSnapshot> = topology
                .rooms
                .iter()
                .map(|r| {
                    let state = species
                        .iter()
                        .map(|s| (s.to_string(), rng.gen_range(1.0e9..1.0e12)))
                        .collect();
                    RoomSnapshot::new(r.id, 0, state)
                })
                .collect();
            let total = |snaps: &[RoomSnapshot], name: &str| -> f64 {
                snaps
                    .iter()
                    .map(|s| molecule_count(s.get(name), topology.volume_m3(s.room)))
                    .sum()
            };
            let before: Vec<f64> = partition
                .indoor
                .iter()
                .map(|s| total(&snaps, s.as_str()))
                .collect();
            let step = TransportStep {
                tchem_only: 600.0,
                volumetric_scale: model.volumetric_scale(),
                outdoor_basis: basis,
            };
            match apply_transport(&mut snaps, &topology, &flux, step) {
                Ok(report) => {
                    for (name, pre) in partition.indoor.iter().zip(&before) {
                        let post = total(&snaps, name.as_str());
                        let rel = (post - (pre + report.net_outdoor(name))).abs() / pre.abs().max(1.0);
                        worst = worst.max(rel);
                    }
                    runs += 1;
                }
                Err(e) => {
                    results.push(check("transport_sweep", false, e.to_string()));
                    return results;
                }
            }
        }
    }
    if verbose {
        println!("    worst relative imbalance {:.3e} over {} runs", worst, runs);
    }
    results.push(check(
        "transport_mass_conservation",
        worst < 1e-9,
        format!("{} runs, worst relative imbalance {:.2e}", runs, worst),
    ));

    results
}

// ── 7. Engine ───────────────────────────────────────────────────────────

fn validate_engine_run(verbose: bool) -> Vec<TestResult> {
    println!("--- Engine Run ---");
    let mut results = Vec::new();
    let (topology, settings) = match (load_building(), load_settings()) {
        (Ok(t), Ok(s)) => (t, s),
        (Err(e), _) | (_, Err(e)) => {
            results.push(check("engine_inputs", false, e));
            return results;
        }
    };

    let nroom = topology.room_count();
    let nchem_only = settings.nchem_only;
    let integrator = Arc::new(
        FirstOrderDecay::new()
            .with_loss("O3", 2.0e-4)
            .with_loss("LIMONENE", 5.0e-5),
    );
    let mut engine = match SimulationEngine::new(topology, settings, integrator, MemoryStore::new()) {
        Ok(e) => e,
        Err(e) => {
            results.push(check("engine_start", false, e.to_string()));
            return results;
        }
    };

    let summaries = match engine.run() {
        Ok(s) => s,
        Err(e) => {
            log::error!("engine run failed: {}", e);
            results.push(check("engine_run", false, e.to_string()));
            return results;
        }
    };
    let transports = summaries.iter().filter(|s| s.transport.is_some()).count();
    results.push(check(
        "engine_all_windows",
        summaries.len() == nchem_only && transports == nchem_only - 1,
        format!("{} windows, {} transport boundaries", summaries.len(), transports),
    ));

    let store = engine.store();
    let committed = (1..=nroom).all(|room| (0..nchem_only).all(|w| store.contains(room, w)));
    results.push(check(
        "engine_snapshots_committed",
        committed && store.len() == nroom * nchem_only,
        format!("{} snapshots", store.len()),
    ));

    let last = store.load_window(nroom, nchem_only - 1).unwrap_or_default();
    let sane = !last.is_empty()
        && last
            .iter()
            .all(|s| s.concentrations.values().all(|v| v.is_finite() && *v >= 0.0));
    if verbose {
        for s in &last {
            println!(
                "    room {} O3 {:.3e} NO2 {:.3e} HCHO {:.3e}",
                s.room,
                s.get("O3"),
                s.get("NO2"),
                s.get("HCHO")
            );
        }
    }
    results.push(check(
        "engine_final_state_sane",
        sane,
        "final concentrations finite and non-negative",
    ));

    results
}
