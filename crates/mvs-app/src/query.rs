//! Query helpers for loaded runs.

use mvs_results::{BusBalance, EvaluationRecord};

use crate::error::{AppError, AppResult};

/// Headline figures of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub objective: f64,
    pub asset_count: usize,
    pub bus_count: usize,
    pub period_count: usize,
    pub costs_total: f64,
    pub annuity_total: f64,
    pub renewable_share: f64,
}

pub fn get_run_summary(record: &EvaluationRecord, busses: &[BusBalance]) -> RunSummary {
    let scalar = |name: &str| record.report.scalars.get(name).copied().unwrap_or(0.0);
    RunSummary {
        objective: record.meta.objective,
        asset_count: record.report.cost_matrix.len(),
        bus_count: busses.len(),
        period_count: busses
            .iter()
            .flat_map(|b| b.columns.values())
            .map(Vec::len)
            .max()
            .unwrap_or(0),
        costs_total: scalar("costs_total"),
        annuity_total: scalar("annuity_total"),
        renewable_share: record.report.project_kpis.renewable_share,
    }
}

/// Labels of the busses in a run.
pub fn list_bus_labels(busses: &[BusBalance]) -> Vec<String> {
    busses.iter().map(|b| b.bus.clone()).collect()
}

/// Balance column of one asset on one bus.
pub fn extract_bus_series<'a>(
    busses: &'a [BusBalance],
    bus: &str,
    asset: &str,
) -> AppResult<&'a [f64]> {
    let balance = busses
        .iter()
        .find(|b| b.bus == bus)
        .ok_or_else(|| AppError::InvalidInput(format!("Bus '{}' not found", bus)))?;
    balance
        .columns
        .get(asset)
        .map(Vec::as_slice)
        .ok_or_else(|| {
            AppError::InvalidInput(format!("Asset '{}' is not connected to '{}'", asset, bus))
        })
}
