//! Loading, checking and normalizing the district demo project.

use std::path::{Path, PathBuf};

use mvs_project::{Violation, load_project, normalize, validate_store};

fn demo_project() -> Option<PathBuf> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/district_energy.yaml");
    if !path.exists() {
        eprintln!("Warning: district demo not found at {:?}, skipping", path);
        return None;
    }
    Some(path)
}

#[test]
fn only_the_heat_pump_cop_is_out_of_range() {
    let Some(path) = demo_project() else { return };
    let project = load_project(&path).unwrap();
    let diagnostics = validate_store(&project.params).unwrap();

    assert_eq!(diagnostics.len(), 1, "{diagnostics:?}");
    let d = &diagnostics[0];
    assert_eq!(d.name, "efficiency");
    assert_eq!(d.context, "energy_conversion/heat pump");
    assert!(matches!(d.violation, Violation::AboveMaximum { .. }));
}

#[test]
fn normalization_expands_the_demo() {
    let Some(path) = demo_project() else { return };
    let mut model = load_project(&path).unwrap().model;
    normalize(&mut model).unwrap();

    assert_eq!(model.project_data.sectors, ["Heat", "Electricity"]);
    assert!(model.storage_components.is_empty());

    let battery = &model.energy_storage["battery"];
    let parts = battery.components.as_ref().unwrap();
    assert_eq!(parts.storage_capacity.label, "battery capacity");
    assert_eq!(parts.storage_capacity.optimize_cap, Some(true));
    assert_eq!(parts.input_power.input_bus_name.as_deref(), Some("Electricity bus"));

    assert!(model.energy_production.contains_key("grid_consumption"));
    assert!(model.energy_consumption.contains_key("grid_feedin"));
    assert_eq!(
        model.energy_providers["grid"].connected_feedin_sinks,
        ["grid_feedin"]
    );

    let hp = &model.energy_conversion["heat pump"];
    assert_eq!(hp.input_bus_name.as_deref(), Some("Electricity bus"));
    assert_eq!(hp.output_bus_name.as_deref(), Some("Heat bus"));

    let pv = &model.energy_production["pv"];
    assert_eq!(
        pv.derived.timeseries_peak.as_ref().unwrap().as_scalar("peak").unwrap(),
        0.8
    );

    let horizon = model.simulation_settings.horizon.as_ref().unwrap();
    assert_eq!(horizon.periods, 24);

    let fix = &model.fix_cost["project planning"];
    assert_eq!(
        fix.derived.optimized_add_cap.as_ref().unwrap().as_scalar("cap").unwrap(),
        1.0
    );
}

#[test]
fn normalizing_twice_changes_nothing() {
    let Some(path) = demo_project() else { return };
    let mut model = load_project(&path).unwrap().model;
    normalize(&mut model).unwrap();
    let once = model.clone();
    normalize(&mut model).unwrap();
    assert_eq!(once, model);
}
