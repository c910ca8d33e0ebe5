//! End-to-end evaluation of the district demo against its recorded solution.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use mvs_app::{
    AppError, ReplayOptimizer, RunOptions, RunResponse, RunRequest, ensure_run, list_runs,
    load_run, query,
};
use mvs_graph::SolveOutputRecord;

fn demo_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

fn demo_available() -> bool {
    let ok = demo_path("district_energy.yaml").exists()
        && demo_path("district_energy_solution.json").exists();
    if !ok {
        eprintln!("Warning: district demo not found, skipping");
    }
    ok
}

fn run(options: RunOptions) -> RunResponse {
    let project_path = demo_path("district_energy.yaml");
    let optimizer = ReplayOptimizer::from_path(&demo_path("district_energy_solution.json"))
        .expect("recorded solution should parse");
    let request = RunRequest {
        project_path: &project_path,
        optimizer: &optimizer,
        options,
    };
    ensure_run(&request).expect("demo run failed")
}

fn transient(parallel: bool) -> RunOptions {
    RunOptions {
        parallel,
        persist: false,
        use_cache: false,
        ..RunOptions::default()
    }
}

fn stored(root: &Path) -> RunOptions {
    RunOptions {
        store_root: Some(root.to_path_buf()),
        ..RunOptions::default()
    }
}

#[test]
fn demo_busses_balance() {
    if !demo_available() {
        return;
    }
    let response = run(transient(false));
    assert!(!response.loaded_from_cache);
    assert_eq!(response.bus_balances.len(), 2);

    for bus in &response.bus_balances {
        let net = bus.net();
        assert_eq!(net.len(), 24);
        for (t, v) in net.iter().enumerate() {
            assert!(v.abs() < 1e-5, "{} unbalanced at {t}: {v}", bus.bus);
        }
    }
    let el = query::extract_bus_series(&response.bus_balances, "Electricity bus", "battery")
        .expect("battery column");
    assert_eq!(el.len(), 24);
}

#[test]
fn demo_assets_are_evaluated() {
    if !demo_available() {
        return;
    }
    let response = run(transient(false));
    let project = &response.record.project;

    // pv invested 10 against a profile peaking at 0.8
    let pv = &project.energy_production["pv"];
    let cap = pv.derived.optimized_add_cap.as_ref().unwrap().as_scalar("cap").unwrap();
    assert!((cap - 12.5).abs() < 1e-9);
    assert!(pv.derived.costs.is_some());

    let soc = project.energy_storage["battery"]
        .timeseries_soc
        .as_ref()
        .unwrap()
        .as_series("soc")
        .unwrap();
    assert!(soc.iter().all(|v| (0.0..=1.0 + 1e-9).contains(v)));

    let report = &response.record.report;
    for label in ["heat pump", "pv", "battery capacity", "grid_consumption", "project planning"] {
        assert!(
            report.cost_matrix.row(label).is_some(),
            "{label} missing from cost matrix"
        );
    }
    assert!(report.levelized_costs.contains_key("pv"));
    assert!(report.scalars["costs_total"] > 0.0);
    assert!(report.sector_kpis.contains_key("Electricity"));
    assert!(report.sector_kpis.contains_key("Heat"));

    let share = report.project_kpis.renewable_share;
    assert!(share > 0.0 && share < 1.0);
}

#[test]
fn heat_pump_efficiency_is_flagged() {
    if !demo_available() {
        return;
    }
    let response = run(transient(false));
    assert!(response.diagnostics.iter().any(|d| {
        d.name == "efficiency" && d.context.contains("heat pump")
    }));
}

#[test]
fn parallel_matches_sequential() {
    if !demo_available() {
        return;
    }
    let sequential = run(transient(false));
    let parallel = run(transient(true));
    assert_eq!(sequential.run_id, parallel.run_id);
    assert_eq!(
        serde_json::to_string(&sequential.record).unwrap(),
        serde_json::to_string(&parallel.record).unwrap()
    );
}

#[test]
fn second_run_is_loaded_from_cache() {
    if !demo_available() {
        return;
    }
    let root = unique_temp_dir("mvs_cache");
    let first = run(stored(&root));
    let second = run(stored(&root));

    assert!(!first.loaded_from_cache);
    assert!(second.loaded_from_cache);
    assert_eq!(first.run_id, second.run_id);
    assert_eq!(first.bus_balances.len(), second.bus_balances.len());

    let runs = list_runs(&root, "district energy").unwrap();
    assert_eq!(runs.len(), 1);

    let (manifest, record, busses) = load_run(&root, &first.run_id).unwrap();
    assert_eq!(manifest.scenario_name, "heat pump and pv");
    let summary = query::get_run_summary(&record, &busses);
    assert_eq!(summary.bus_count, 2);
    assert_eq!(summary.period_count, 24);

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn recording_without_an_edge_is_rejected() {
    if !demo_available() {
        return;
    }
    let content = std::fs::read_to_string(demo_path("district_energy_solution.json")).unwrap();
    let mut record: SolveOutputRecord = serde_json::from_str(&content).unwrap();
    record.variables.retain(|v| v.to.as_deref() != Some("heat demand"));
    let optimizer = ReplayOptimizer::from_record(record).unwrap();

    let project_path = demo_path("district_energy.yaml");
    let request = RunRequest {
        project_path: &project_path,
        optimizer: &optimizer,
        options: transient(false),
    };
    match ensure_run(&request) {
        Err(AppError::Solver(msg)) => assert!(msg.contains("heat demand"), "{msg}"),
        other => panic!("expected solver error, got {:?}", other.map(|r| r.run_id)),
    }
}
