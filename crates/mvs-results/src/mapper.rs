//! Map solver output back onto the project's assets.
//!
//! Every mapping call first clears what an earlier mapping wrote, so mapping
//! the same solution twice leaves the asset unchanged.

use indexmap::IndexMap;
use mvs_core::{Quantity, constants::DAYS_PER_YEAR, ensure_finite, labels};
use mvs_graph::{EdgeKey, EnergyGraph, PortKind, SolveOutput};
use mvs_project::{Asset, DerivedFields, StorageAsset};
use tracing::{debug, warn};

use crate::types::BusBalance;
use crate::{ResultsError, ResultsResult};

fn flow<'a>(solution: &'a SolveOutput, asset: &str, edge: &EdgeKey) -> ResultsResult<&'a [f64]> {
    let series = solution
        .flow(edge)
        .ok_or_else(|| ResultsError::MissingFlow {
            asset: asset.to_string(),
            edge: edge.clone(),
        })?;
    if series.is_empty() {
        return Err(ResultsError::EmptySeries {
            asset: asset.to_string(),
            edge: edge.clone(),
        });
    }
    Ok(series)
}

/// Flow statistics of the primary series.
fn record_flow(derived: &mut DerivedFields, series: &[f64], evaluated_days: f64) -> ResultsResult<()> {
    let total: f64 = series.iter().sum();
    let annual = ensure_finite(total * DAYS_PER_YEAR / evaluated_days, "annual_total_flow")?;
    let peak = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let average = total / series.len() as f64;

    derived.flow = Some(Quantity::series(series.to_vec(), labels::KW));
    derived.total_flow = Some(Quantity::scalar(total, labels::KWH));
    derived.annual_total_flow = Some(Quantity::scalar(annual, labels::KWH));
    derived.peak_flow = Some(Quantity::scalar(peak, labels::KW));
    derived.average_flow = Some(Quantity::scalar(average, labels::KW));
    Ok(())
}

/// Investment on `edge` when the asset optimizes its capacity, zero
/// otherwise.
fn optimized_add_cap(asset: &Asset, solution: &SolveOutput, edge: &EdgeKey) -> ResultsResult<Quantity> {
    let unit = asset.unit.clone().unwrap_or_else(|| labels::KW.to_string());
    if !asset.optimizes_capacity() {
        return Ok(Quantity::scalar(0.0, unit));
    }
    let value = solution
        .invest(edge)
        .ok_or_else(|| ResultsError::MissingInvestment {
            asset: asset.label.clone(),
            edge: edge.clone(),
        })?;
    Ok(Quantity::scalar(value, unit))
}

/// Flows, flow statistics and optimized capacity of a non-storage asset.
///
/// The output edge is the primary one when declared, else the input edge.
pub fn map_results(asset: &mut Asset, solution: &SolveOutput, evaluated_days: f64) -> ResultsResult<()> {
    asset.derived.clear_results();

    let input = asset
        .input_bus_name
        .as_ref()
        .map(|bus| EdgeKey::flow(bus.clone(), asset.label.clone()));
    let output = asset
        .output_bus_name
        .as_ref()
        .map(|bus| EdgeKey::flow(asset.label.clone(), bus.clone()));
    let Some(primary) = output.clone().or_else(|| input.clone()) else {
        return Err(ResultsError::MissingBusDirection {
            asset: asset.label.clone(),
        });
    };

    if let Some(edge) = &input {
        let series = flow(solution, &asset.label, edge)?;
        asset.derived.input_flow = Some(Quantity::series(series.to_vec(), labels::KW));
    }
    if let Some(edge) = &output {
        let series = flow(solution, &asset.label, edge)?;
        asset.derived.output_flow = Some(Quantity::series(series.to_vec(), labels::KW));
    }

    let series = flow(solution, &asset.label, &primary)?;
    record_flow(&mut asset.derived, series, evaluated_days)?;
    asset.derived.optimized_add_cap = Some(optimized_add_cap(asset, solution, &primary)?);

    debug!(asset = %asset.label, edge = %primary, "Mapped flows");
    Ok(())
}

/// Scale the optimized capacity of a production asset back from its
/// normalized profile to installed units.
pub fn rescale_by_profile_peak(asset: &mut Asset) -> ResultsResult<()> {
    if !asset.optimizes_capacity() {
        return Ok(());
    }
    let (Some(cap), Some(peak)) = (&asset.derived.optimized_add_cap, &asset.derived.timeseries_peak)
    else {
        return Ok(());
    };
    let peak = peak.as_scalar("timeseries_peak")?;
    let value = cap.as_scalar("optimized_add_cap")?;
    let unit = cap.unit.clone();

    let rescaled = if peak >= 1.0 {
        value * peak
    } else if peak > 0.0 {
        value / peak
    } else {
        warn!(asset = %asset.label, peak, "Profile peak is not positive, no optimized capacity derived");
        asset.derived.optimized_add_cap = None;
        return Ok(());
    };
    asset.derived.optimized_add_cap = Some(Quantity::scalar(rescaled, unit));
    Ok(())
}

/// Charge, discharge and stored energy of a storage onto its sub-records,
/// plus the state of charge.
pub fn map_storage(storage: &mut StorageAsset, solution: &SolveOutput, evaluated_days: f64) -> ResultsResult<()> {
    let label = storage.label.clone();
    let (Some(input_bus), Some(output_bus)) = (&storage.input_bus_name, &storage.output_bus_name)
    else {
        return Err(ResultsError::MissingBusDirection { asset: label });
    };
    let charge = EdgeKey::flow(input_bus.clone(), label.clone());
    let discharge = EdgeKey::flow(label.clone(), output_bus.clone());
    let capacity = EdgeKey::capacity(label.clone());

    let Some(components) = storage.components.as_mut() else {
        return Err(ResultsError::Core(mvs_core::MvsError::Invariant {
            what: "storage sub-records resolved before mapping",
        }));
    };
    let edges = [
        (&mut components.input_power, &charge),
        (&mut components.output_power, &discharge),
        (&mut components.storage_capacity, &capacity),
    ];
    for (sub, edge) in edges {
        sub.derived.clear_results();
        let series = flow(solution, &label, edge)?;
        record_flow(&mut sub.derived, series, evaluated_days)?;
        sub.derived.optimized_add_cap = Some(optimized_add_cap(sub, solution, edge)?);
    }
    components.input_power.derived.input_flow = components.input_power.derived.flow.clone();
    components.output_power.derived.output_flow = components.output_power.derived.flow.clone();

    let content = flow(solution, &label, &capacity)?;
    let cap = &components.storage_capacity;
    let installed = match &cap.installed_cap {
        Some(q) => q.as_scalar("installed_cap")?,
        None => 0.0,
    };
    let added = match &cap.derived.optimized_add_cap {
        Some(q) => q.as_scalar("optimized_add_cap")?,
        None => 0.0,
    };
    let total = installed + added;
    storage.timeseries_soc = if total > 0.0 {
        Some(Quantity::series(
            content.iter().map(|v| v / total).collect(),
            labels::FACTOR,
        ))
    } else {
        warn!(storage = %label, total, "Storage capacity is not positive, no state of charge derived");
        None
    };

    debug!(storage = %label, "Mapped storage flows");
    Ok(())
}

/// Balance series per bus: inflows positive, outflows negative, one column
/// per asset. A storage charging from and discharging into the same bus
/// gets a single net column.
pub fn bus_timeseries(graph: &EnergyGraph, solution: &SolveOutput) -> ResultsResult<Vec<BusBalance>> {
    graph
        .busses()
        .iter()
        .map(|bus| {
            let mut columns: IndexMap<String, Vec<f64>> = IndexMap::new();
            for (kind, asset, edge) in graph.bus_edges(bus.id) {
                let series = flow(solution, &asset.label, &edge)?;
                let sign = match kind {
                    PortKind::Outlet => 1.0,
                    PortKind::Inlet => -1.0,
                };
                let column = columns.entry(asset.label.clone()).or_default();
                if column.len() < series.len() {
                    column.resize(series.len(), 0.0);
                }
                for (c, v) in column.iter_mut().zip(series) {
                    *c += sign * v;
                }
            }
            Ok(BusBalance {
                bus: bus.label.clone(),
                columns,
            })
        })
        .collect()
}
