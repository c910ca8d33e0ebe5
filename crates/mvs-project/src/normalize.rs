//! Turns a loaded project into the model every later stage works on.
//!
//! Fills defaults, derives bus names and the simulation horizon, resolves
//! storage sub-records and expands energy providers into plain assets.
//! Running it twice leaves the model unchanged.

use indexmap::IndexMap;
use mvs_core::{Quantity, labels};
use tracing::{debug, info, warn};

use crate::schema::{
    Asset, AssetGroup, AssetType, EnergyProvider, ProjectModel, SimulationHorizon,
    StorageAsset, StorageComponents, parse_timestamp,
};
use crate::validate::{ConfigError, label_of};
use crate::{ProjectError, ProjectResult};

pub const CONSUMPTION_SUFFIX: &str = "_consumption";
pub const FEEDIN_SUFFIX: &str = "_feedin";

/// Bus label for a direction (energy carrier base name).
pub fn bus_name(direction: &str) -> String {
    format!("{direction} bus")
}

pub fn normalize(model: &mut ProjectModel) -> ProjectResult<()> {
    fill_labels(model);
    derive_bus_names(model);
    resolve_storage_components(model)?;
    expand_providers(model)?;
    preset_fix_costs(model);
    complete_missing_cost_data(model);
    normalize_profiles(model);
    model.project_data.sectors = collect_sectors(model);
    let horizon = simulation_horizon(model)?;
    check_profile_lengths(model, horizon.periods);
    model.simulation_settings.horizon = Some(horizon);
    info!(
        sectors = ?model.project_data.sectors,
        "Project normalized"
    );
    Ok(())
}

fn fill_labels(model: &mut ProjectModel) {
    fn fill(records: &mut IndexMap<String, Asset>) {
        for (key, asset) in records.iter_mut() {
            if asset.label.is_empty() {
                asset.label = key.clone();
            }
        }
    }
    fill(&mut model.energy_conversion);
    fill(&mut model.energy_production);
    fill(&mut model.energy_consumption);
    fill(&mut model.storage_components);
    fill(&mut model.fix_cost);
    for (key, storage) in model.energy_storage.iter_mut() {
        if storage.label.is_empty() {
            storage.label = key.clone();
        }
    }
    for (key, provider) in model.energy_providers.iter_mut() {
        if provider.label.is_empty() {
            provider.label = key.clone();
        }
    }
}

fn set_bus_names(
    inflow: Option<&String>,
    outflow: Option<&String>,
    input_bus: &mut Option<String>,
    output_bus: &mut Option<String>,
) {
    if input_bus.is_none() {
        *input_bus = inflow.map(|d| bus_name(d));
    }
    if output_bus.is_none() {
        *output_bus = outflow.map(|d| bus_name(d));
    }
}

fn derive_bus_names(model: &mut ProjectModel) {
    for asset in model
        .energy_conversion
        .values_mut()
        .chain(model.energy_production.values_mut())
        .chain(model.energy_consumption.values_mut())
    {
        set_bus_names(
            asset.inflow_direction.as_ref(),
            asset.outflow_direction.as_ref(),
            &mut asset.input_bus_name,
            &mut asset.output_bus_name,
        );
    }
    for storage in model.energy_storage.values_mut() {
        set_bus_names(
            storage.inflow_direction.as_ref(),
            storage.outflow_direction.as_ref(),
            &mut storage.input_bus_name,
            &mut storage.output_bus_name,
        );
    }
}

fn take_component(
    pool: &mut IndexMap<String, Asset>,
    reference: &str,
    storage: &str,
) -> Result<Asset, ConfigError> {
    let key = pool
        .iter()
        .find(|(k, a)| label_of(k, &a.label) == reference)
        .map(|(k, _)| k.clone());
    key.and_then(|k| pool.shift_remove(&k))
        .ok_or_else(|| ConfigError::MissingReference {
            id: reference.to_string(),
            context: format!("storage_components (referenced by {storage})"),
        })
}

/// Move the referenced sub-records out of `storage_components` into their
/// storage. Sub-records inherit the storage's directions, vector and flag.
fn resolve_storage_components(model: &mut ProjectModel) -> Result<(), ConfigError> {
    let pool = &mut model.storage_components;
    for storage in model.energy_storage.values_mut() {
        if storage.components.is_some() {
            continue;
        }
        let mut input_power = take_component(pool, &storage.input_power, &storage.label)?;
        let mut output_power = take_component(pool, &storage.output_power, &storage.label)?;
        let mut storage_capacity =
            take_component(pool, &storage.storage_capacity, &storage.label)?;

        for sub in [&mut input_power, &mut output_power, &mut storage_capacity] {
            inherit(sub, storage);
        }
        input_power.inflow_direction = storage.inflow_direction.clone();
        input_power.input_bus_name = storage.input_bus_name.clone();
        output_power.outflow_direction = storage.outflow_direction.clone();
        output_power.output_bus_name = storage.output_bus_name.clone();

        debug!(storage = %storage.label, "Resolved storage sub-records");
        storage.components = Some(StorageComponents {
            input_power,
            output_power,
            storage_capacity,
        });
    }
    for label in pool.keys() {
        warn!(%label, "Storage sub-record is not referenced by any storage");
    }
    Ok(())
}

fn inherit(sub: &mut Asset, storage: &StorageAsset) {
    if sub.type_asset.is_empty() {
        sub.type_asset = AssetType::Storage.as_str().to_string();
    }
    if sub.energy_vector.is_none() {
        sub.energy_vector = storage.energy_vector.clone();
    }
    if sub.optimize_cap.is_none() {
        sub.optimize_cap = storage.optimize_cap;
    }
}

/// One consumption source and one feed-in sink per provider.
fn expand_providers(model: &mut ProjectModel) -> ProjectResult<()> {
    let duration = model.economic_data.project_duration.clone();
    for provider in model.energy_providers.values_mut() {
        if !provider.connected_consumption_sources.is_empty()
            || !provider.connected_feedin_sinks.is_empty()
        {
            continue;
        }
        if provider.outflow_direction.is_some() {
            let source = consumption_source(provider, &duration);
            insert_unique(&mut model.energy_production, source.clone(), AssetGroup::Production)?;
            provider.connected_consumption_sources.push(source.label);
        }
        if provider.inflow_direction.is_some() {
            let sink = feedin_sink(provider, &duration);
            insert_unique(&mut model.energy_consumption, sink.clone(), AssetGroup::Consumption)?;
            provider.connected_feedin_sinks.push(sink.label);
        }
        debug!(provider = %provider.label, "Expanded energy provider");
    }
    Ok(())
}

fn provider_asset(
    provider: &EnergyProvider,
    suffix: &str,
    ty: AssetType,
    duration: &Quantity,
) -> Asset {
    let mut asset = Asset::new(format!("{}{suffix}", provider.label), ty);
    asset.energy_vector = provider.energy_vector.clone();
    asset.optimize_cap = provider.optimize_cap;
    asset.lifetime = Some(duration.clone());
    asset.installed_cap = Some(Quantity::scalar(0.0, labels::KW));
    asset
}

fn consumption_source(provider: &EnergyProvider, duration: &Quantity) -> Asset {
    let mut asset = provider_asset(provider, CONSUMPTION_SUFFIX, AssetType::Source, duration);
    asset.outflow_direction = provider.outflow_direction.clone();
    asset.output_bus_name = provider.outflow_direction.as_deref().map(bus_name);
    asset.dispatch_price = Some(provider.energy_price.clone());
    asset
}

fn feedin_sink(provider: &EnergyProvider, duration: &Quantity) -> Asset {
    let mut asset = provider_asset(provider, FEEDIN_SUFFIX, AssetType::Sink, duration);
    asset.inflow_direction = provider.inflow_direction.clone();
    asset.input_bus_name = provider.inflow_direction.as_deref().map(bus_name);
    asset.dispatch_price = Some(provider.feedin_tariff.scaled(-1.0));
    asset
}

fn insert_unique(
    records: &mut IndexMap<String, Asset>,
    asset: Asset,
    group: AssetGroup,
) -> Result<(), ConfigError> {
    if records.contains_key(&asset.label) || records.values().any(|a| a.label == asset.label) {
        return Err(ConfigError::DuplicateLabel {
            label: asset.label,
            context: group.key().to_string(),
        });
    }
    records.insert(asset.label.clone(), asset);
    Ok(())
}

/// Fix-cost items have no dispatch: count them as one unit of added
/// capacity with nothing installed.
fn preset_fix_costs(model: &mut ProjectModel) {
    for item in model.fix_cost.values_mut() {
        item.derived.optimized_add_cap = Some(Quantity::scalar(1.0, labels::NONE));
        if item.installed_cap.is_none() {
            item.installed_cap = Some(Quantity::scalar(0.0, labels::NONE));
        }
    }
}

/// Absent capex and fixed opex count as zero for assets that take part in
/// dispatch. Consumption assets are left alone.
pub fn complete_missing_cost_data(model: &mut ProjectModel) {
    let currency = model.economic_data.currency.clone();
    let storage_subs = model
        .energy_storage
        .values_mut()
        .filter_map(|s| s.components.as_mut())
        .flat_map(|c| c.iter_mut());
    for asset in model
        .energy_conversion
        .values_mut()
        .chain(model.energy_production.values_mut())
        .chain(storage_subs)
    {
        if asset.specific_costs.is_none() {
            debug!(asset = %asset.label, "specific_costs not given, using 0");
            asset.specific_costs = Some(Quantity::scalar(0.0, currency.clone()));
        }
        if asset.specific_costs_om.is_none() {
            debug!(asset = %asset.label, "specific_costs_om not given, using 0");
            asset.specific_costs_om = Some(Quantity::scalar(0.0, currency.clone()));
        }
    }
}

/// Peak and peak-normalized profile of every production asset with a
/// time series.
fn normalize_profiles(model: &mut ProjectModel) {
    for asset in model.energy_production.values_mut() {
        let Some(series) = asset.timeseries.as_ref() else {
            continue;
        };
        let Ok(values) = series.as_series("timeseries") else {
            warn!(asset = %asset.label, "Production profile is a scalar, not normalized");
            continue;
        };
        let peak = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        asset.derived.timeseries_peak = Some(Quantity::scalar(peak, series.unit.clone()));
        if peak > 0.0 {
            asset.derived.timeseries_normalized =
                Some(Quantity::series(values.iter().map(|v| v / peak).collect(), labels::FACTOR));
        } else {
            warn!(asset = %asset.label, peak, "Production profile peak is not positive");
            asset.derived.timeseries_normalized = None;
        }
    }
}

/// Distinct energy vectors in order of first appearance.
pub fn collect_sectors(model: &ProjectModel) -> Vec<String> {
    let vectors = model
        .energy_conversion
        .values()
        .chain(model.energy_production.values())
        .chain(model.energy_consumption.values())
        .filter_map(|a| a.energy_vector.as_ref())
        .chain(model.energy_storage.values().filter_map(|s| s.energy_vector.as_ref()))
        .chain(model.energy_providers.values().filter_map(|p| p.energy_vector.as_ref()));
    let mut sectors: Vec<String> = Vec::new();
    for v in vectors {
        if !sectors.contains(v) {
            sectors.push(v.clone());
        }
    }
    sectors
}

pub fn simulation_horizon(model: &ProjectModel) -> ProjectResult<SimulationHorizon> {
    let settings = &model.simulation_settings;
    let start = parse_timestamp(&settings.start_date).ok_or_else(|| {
        ProjectError::Validation(ConfigError::InvalidValue {
            field: "start_date".to_string(),
            value: settings.start_date.clone(),
            reason: "not a valid timestamp".to_string(),
        })
    })?;
    let period_days = settings.evaluated_period.as_scalar("evaluated_period")?;
    let step_minutes = settings.timestep.as_scalar("timestep")?;
    if !(period_days > 0.0 && step_minutes > 0.0) {
        return Err(ProjectError::Validation(ConfigError::InvalidValue {
            field: "evaluated_period/timestep".to_string(),
            value: format!("{period_days}/{step_minutes}"),
            reason: "must be greater than zero".to_string(),
        }));
    }
    let periods = mvs_core::steps_in(mvs_core::days(period_days), mvs_core::minutes(step_minutes));
    let periods = periods as usize;
    let timestep_minutes = step_minutes.round() as i64;
    let last_offset = timestep_minutes * periods.saturating_sub(1) as i64;
    let end = start + chrono::Duration::minutes(last_offset);
    Ok(SimulationHorizon {
        start,
        end,
        periods,
        timestep_minutes,
    })
}

fn check_profile_lengths(model: &ProjectModel, periods: usize) {
    let assets = model
        .energy_production
        .values()
        .chain(model.energy_consumption.values());
    for asset in assets {
        if let Some(ts) = &asset.timeseries
            && let Ok(values) = ts.as_series("timeseries")
            && values.len() != periods
        {
            warn!(
                asset = %asset.label,
                len = values.len(),
                periods,
                "Time series length differs from the number of simulated periods"
            );
        }
    }
}
