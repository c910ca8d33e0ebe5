//! Loading hand-written project documents from disk.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use mvs_project::{ParamValue, load_project, normalize, validate_store};

const PROJECT: &str = r#"
simulation_settings:
  start_date: "2020-01-01 00:00"
  evaluated_period: {value: 1, unit: day}
  timestep: {value: 60, unit: minute}
project_data:
  project_name: order test
  scenario_name: base
economic_data:
  currency: EUR
  discount_factor: {value: 0.05, unit: factor}
  project_duration: {value: 20, unit: year}
energy_production:
  wind:
    type_asset: source
    energy_vector: Electricity
    outflow_direction: Electricity
    maximum_cap: {value: null, unit: kW}
energy_consumption:
  zz electricity demand:
    type_asset: sink
    energy_vector: Electricity
    inflow_direction: Electricity
  heat demand:
    type_asset: sink
    energy_vector: Heat
    inflow_direction: Heat
energy_storage:
  battery:
    energy_vector: Electricity
    inflow_direction: Electricity
    outflow_direction: Electricity
    soc_initial: {value: null, unit: factor}
    soc_min: {value: 0.1, unit: factor}
    input_power: battery charge
    output_power: battery discharge
    storage_capacity: battery capacity
storage_components:
  battery charge: {}
  battery discharge: {}
  battery capacity: {}
"#;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

fn write_project(prefix: &str) -> PathBuf {
    let dir = unique_temp_dir(prefix);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("project.yaml");
    std::fs::write(&path, PROJECT).unwrap();
    path
}

#[test]
fn unset_quantities_load_as_none() {
    let path = write_project("mvs_unset");
    let project = load_project(&path).expect("unset values must not abort loading");

    let battery = &project.model.energy_storage["battery"];
    assert_eq!(battery.soc_initial, None);
    assert!(battery.soc_min.is_some());
    assert_eq!(project.model.energy_production["wind"].maximum_cap, None);

    let soc = project
        .params
        .value(&["energy_storage", "battery", "soc_initial"])
        .unwrap();
    assert_eq!(soc.inner(), &ParamValue::Unset);
    assert!(validate_store(&project.params).unwrap().is_empty());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn file_order_is_kept() {
    let path = write_project("mvs_order");
    let project = load_project(&path).unwrap();

    let top: Vec<&str> = project.params.iter().map(|(k, _)| k).collect();
    assert_eq!(
        top,
        [
            "simulation_settings",
            "project_data",
            "economic_data",
            "energy_production",
            "energy_consumption",
            "energy_storage",
            "storage_components",
        ]
    );

    let mut model = project.model;
    let consumption: Vec<&str> = model.energy_consumption.keys().map(String::as_str).collect();
    assert_eq!(consumption, ["zz electricity demand", "heat demand"]);

    normalize(&mut model).unwrap();
    assert_eq!(model.project_data.sectors, ["Electricity", "Heat"]);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
