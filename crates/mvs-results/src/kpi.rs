//! Key performance indicators over an evaluated project.

use indexmap::IndexMap;
use mvs_project::{Asset, AssetGroup, ProjectModel};
use tracing::{info, warn};

use crate::tables::{ResultTable, aggregate_totals, append_to_tables};
use crate::types::{KpiReport, ProjectKpis, SectorKpis};
use crate::weights::WeightTable;
use crate::ResultsResult;

/// Renewable part of a total. A zero total gives NaN.
pub fn renewable_share(total_res: f64, total_non_res: f64) -> f64 {
    let total = total_res + total_non_res;
    if total == 0.0 {
        warn!("No energy use at all, renewable share is undefined");
        return f64::NAN;
    }
    total_res / total
}

/// Sum of per-sector values weighted into electricity equivalent.
pub fn sector_weighted_kpi(
    per_sector: &IndexMap<String, f64>,
    weights: &WeightTable,
) -> ResultsResult<f64> {
    let mut total = 0.0;
    for (sector, value) in per_sector {
        total += value * weights.weight(sector)?;
    }
    Ok(total)
}

/// Annuity per kWh generated in a year. `None` before costs and flows are
/// known; NaN when nothing was generated.
pub fn levelized_cost(asset: &Asset) -> ResultsResult<Option<f64>> {
    let d = &asset.derived;
    let (Some(costs), Some(flow)) = (d.costs.as_ref(), d.annual_total_flow.as_ref()) else {
        return Ok(None);
    };
    let annuity = costs.annuity_total.as_scalar("annuity_total")?;
    let flow = flow.as_scalar("annual_total_flow")?;
    if flow == 0.0 {
        warn!(asset = %asset.label, "No generation, levelized cost is undefined");
        return Ok(Some(f64::NAN));
    }
    Ok(Some(annuity / flow))
}

/// Yearly flow, zero before results are mapped.
fn annual_flow(asset: &Asset) -> ResultsResult<f64> {
    match &asset.derived.annual_total_flow {
        Some(q) => Ok(q.as_scalar("annual_total_flow")?),
        None => Ok(0.0),
    }
}

/// Origin and use of energy per sector.
pub fn sector_kpis(model: &ProjectModel) -> ResultsResult<IndexMap<String, SectorKpis>> {
    let mut sectors: IndexMap<String, SectorKpis> = model
        .project_data
        .sectors
        .iter()
        .map(|s| (s.clone(), SectorKpis::default()))
        .collect();

    // supply share per expanded provider source
    let mut provider_share: IndexMap<&str, f64> = IndexMap::new();
    for provider in model.energy_providers.values() {
        let share = match &provider.renewable_share {
            Some(q) => q.as_scalar("renewable_share")?,
            None => 0.0,
        };
        for source in &provider.connected_consumption_sources {
            provider_share.insert(source.as_str(), share);
        }
    }
    let feedin_sinks: Vec<&str> = model
        .energy_providers
        .values()
        .flat_map(|p| p.connected_feedin_sinks.iter().map(String::as_str))
        .collect();

    for asset in model.energy_production.values() {
        let Some(sector) = &asset.energy_vector else { continue };
        let kpis = sectors.entry(sector.clone()).or_default();
        let flow = annual_flow(asset)?;
        if let Some(share) = provider_share.get(asset.label.as_str()) {
            kpis.renewable_supply += flow * share;
            kpis.non_renewable_supply += flow * (1.0 - share);
        } else if asset.is_renewable() {
            kpis.renewable_generation += flow;
        } else {
            kpis.non_renewable_generation += flow;
        }
    }
    for asset in model.energy_consumption.values() {
        let Some(sector) = &asset.energy_vector else { continue };
        let kpis = sectors.entry(sector.clone()).or_default();
        if feedin_sinks.contains(&asset.label.as_str()) {
            kpis.total_feedin += annual_flow(asset)?;
        } else {
            kpis.total_demand += annual_flow(asset)?;
        }
    }

    for kpis in sectors.values_mut() {
        kpis.total_renewable_energy_use = kpis.renewable_generation + kpis.renewable_supply;
        kpis.total_non_renewable_energy_use =
            kpis.non_renewable_generation + kpis.non_renewable_supply;
        kpis.renewable_share = renewable_share(
            kpis.total_renewable_energy_use,
            kpis.total_non_renewable_energy_use,
        );
    }
    Ok(sectors)
}

fn weighted(
    sectors: &IndexMap<String, SectorKpis>,
    weights: &WeightTable,
    pick: impl Fn(&SectorKpis) -> f64,
) -> ResultsResult<f64> {
    let per_sector: IndexMap<String, f64> = sectors
        .iter()
        .map(|(sector, kpis)| (sector.clone(), pick(kpis)))
        .collect();
    sector_weighted_kpi(&per_sector, weights)
}

/// Sector-coupled totals. Every sector needs a weight.
pub fn project_kpis(
    sectors: &IndexMap<String, SectorKpis>,
    weights: &WeightTable,
) -> ResultsResult<ProjectKpis> {
    let res_use = weighted(sectors, weights, |k| k.total_renewable_energy_use)?;
    let non_res_use = weighted(sectors, weights, |k| k.total_non_renewable_energy_use)?;
    Ok(ProjectKpis {
        total_renewable_generation_eleq: weighted(sectors, weights, |k| k.renewable_generation)?,
        total_non_renewable_generation_eleq: weighted(sectors, weights, |k| {
            k.non_renewable_generation
        })?,
        total_renewable_energy_use_eleq: res_use,
        total_non_renewable_energy_use_eleq: non_res_use,
        renewable_share: renewable_share(res_use, non_res_use),
    })
}

/// Assets in table order: storage sub-records, conversion, production,
/// consumption, fix costs.
pub fn table_order(model: &ProjectModel) -> impl Iterator<Item = &Asset> {
    let storage = model
        .energy_storage
        .values()
        .filter_map(|s| s.components.as_ref())
        .flat_map(|c| c.iter());
    let groups = [
        AssetGroup::Conversion,
        AssetGroup::Production,
        AssetGroup::Consumption,
        AssetGroup::FixCost,
    ]
    .into_iter()
    .filter_map(|g| model.group(g))
    .flat_map(|g| g.values());
    storage.chain(groups)
}

/// Tables, totals and KPIs of an evaluated project.
pub fn build_report(model: &ProjectModel, weights: &WeightTable) -> ResultsResult<KpiReport> {
    let mut cost_matrix = ResultTable::cost_matrix();
    let mut scalar_matrix = ResultTable::scalar_matrix();
    for asset in table_order(model) {
        append_to_tables(&mut cost_matrix, &mut scalar_matrix, asset)?;
    }
    let scalars = aggregate_totals(&cost_matrix);

    let sector_kpis = sector_kpis(model)?;
    let project_kpis = project_kpis(&sector_kpis, weights)?;

    let mut levelized_costs = IndexMap::new();
    for asset in model.energy_production.values() {
        if let Some(cost) = levelized_cost(asset)? {
            levelized_costs.insert(asset.label.clone(), cost);
        }
    }

    info!(
        assets = cost_matrix.len(),
        sectors = sector_kpis.len(),
        "KPI report built"
    );
    Ok(KpiReport {
        cost_matrix,
        scalar_matrix,
        scalars,
        sector_kpis,
        project_kpis,
        levelized_costs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvs_core::{Quantity, labels};
    use mvs_project::{AssetType, CostBreakdown, EnergyProvider};
    use proptest::prelude::*;

    use crate::ResultsError;

    #[test]
    fn share_of_zero_is_nan() {
        assert!(renewable_share(0.0, 0.0).is_nan());
        assert_eq!(renewable_share(1.0, 3.0), 0.25);
    }

    #[test]
    fn weighted_sum() {
        let per_sector: IndexMap<String, f64> =
            [("Electricity".to_string(), 10.0), ("H2".to_string(), 1.0)].into();
        let total = sector_weighted_kpi(&per_sector, &WeightTable::default()).unwrap();
        assert!((total - 42.87).abs() < 1e-12);
    }

    #[test]
    fn unweighted_sector_is_fatal() {
        let per_sector: IndexMap<String, f64> = [("Steam".to_string(), 1.0)].into();
        assert!(matches!(
            sector_weighted_kpi(&per_sector, &WeightTable::default()),
            Err(ResultsError::MissingSectorWeight { .. })
        ));
    }

    fn producing(label: &str, renewable: bool, annual: f64) -> Asset {
        let mut asset = Asset::new(label, AssetType::Source);
        asset.energy_vector = Some("Electricity".into());
        asset.renewable_asset = Some(renewable);
        asset.derived.annual_total_flow = Some(Quantity::scalar(annual, labels::KWH));
        asset
    }

    fn model() -> ProjectModel {
        let yaml = r#"
project_data: {project_name: p, scenario_name: s}
economic_data:
  currency: EUR
  discount_factor: {value: 0.0, unit: factor}
  project_duration: {value: 20, unit: year}
simulation_settings:
  start_date: "2020-01-01 00:00"
  evaluated_period: {value: 1, unit: day}
  timestep: {value: 60, unit: minute}
"#;
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn provider_supply_is_split_by_share() {
        let mut model = model();
        model.project_data.sectors = vec!["Electricity".into()];
        model.energy_production.insert("pv".into(), producing("pv", true, 300.0));
        model
            .energy_production
            .insert("grid_consumption".into(), producing("grid_consumption", false, 100.0));
        model.energy_providers.insert(
            "grid".into(),
            EnergyProvider {
                label: "grid".into(),
                renewable_share: Some(Quantity::scalar(0.5, labels::FACTOR)),
                connected_consumption_sources: vec!["grid_consumption".into()],
                ..EnergyProvider::default()
            },
        );

        let sectors = sector_kpis(&model).unwrap();
        let el = &sectors["Electricity"];
        assert_eq!(el.renewable_generation, 300.0);
        assert_eq!(el.non_renewable_generation, 0.0);
        assert_eq!(el.renewable_supply, 50.0);
        assert_eq!(el.total_renewable_energy_use, 350.0);
        assert_eq!(el.renewable_share, 350.0 / 400.0);

        let project = project_kpis(&sectors, &WeightTable::default()).unwrap();
        assert_eq!(project.total_renewable_generation_eleq, 300.0);
        assert_eq!(project.renewable_share, 350.0 / 400.0);
    }

    #[test]
    fn report_rows_and_levelized_cost() {
        let mut model = model();
        let mut pv = producing("pv", true, 1000.0);
        let money = |v| Quantity::scalar(v, "EUR");
        pv.derived.costs = Some(CostBreakdown {
            costs_investment: Some(money(1000.0)),
            costs_upfront: None,
            costs_dispatch: None,
            costs_om_fix: None,
            costs_total: money(1000.0),
            costs_om_total: money(0.0),
            annuity_total: money(50.0),
            annuity_om: money(0.0),
        });
        model.energy_production.insert("pv".into(), pv);
        model
            .energy_production
            .insert("idle".into(), producing("idle", false, 0.0));
        model.project_data.sectors = vec!["Electricity".into()];

        let report = build_report(&model, &WeightTable::default()).unwrap();
        assert_eq!(report.cost_matrix.len(), 2);
        assert_eq!(report.scalars["costs_total"], 1000.0);
        assert_eq!(report.levelized_costs["pv"], 0.05);
        assert_eq!(levelized_cost(&model.energy_production["pv"]).unwrap(), Some(0.05));
        // no cost data yet
        assert!(!report.levelized_costs.contains_key("idle"));
    }

    #[test]
    fn sector_without_energy_use_has_no_share() {
        let mut model = model();
        model.project_data.sectors = vec!["Heat".into()];
        let mut demand = Asset::new("heat demand", AssetType::Sink);
        demand.energy_vector = Some("Heat".into());
        demand.derived.annual_total_flow = Some(Quantity::scalar(500.0, labels::KWH));
        model.energy_consumption.insert("heat demand".into(), demand);

        let sectors = sector_kpis(&model).unwrap();
        let heat = &sectors["Heat"];
        assert_eq!(heat.total_demand, 500.0);
        assert!(heat.renewable_share.is_nan());

        let project = project_kpis(&sectors, &WeightTable::default()).unwrap();
        assert_eq!(project.total_renewable_energy_use_eleq, 0.0);
        assert!(project.renewable_share.is_nan());

        let report = build_report(&model, &WeightTable::default()).unwrap();
        assert!(report.sector_kpis["Heat"].renewable_share.is_nan());
        assert!(report.project_kpis.renewable_share.is_nan());
    }

    #[test]
    fn series_valued_flow_is_rejected() {
        let mut model = model();
        let mut pv = producing("pv", true, 0.0);
        pv.derived.annual_total_flow = Some(Quantity::series(vec![1.0, 2.0], labels::KWH));
        model.energy_production.insert("pv".into(), pv);
        assert!(matches!(
            sector_kpis(&model),
            Err(ResultsError::Core(mvs_core::MvsError::ShapeMismatch { .. }))
        ));
    }

    proptest! {
        #[test]
        fn share_is_a_fraction(res in 0.0f64..1e9, non_res in 0.0f64..1e9) {
            prop_assume!(res + non_res > 0.0);
            let share = renewable_share(res, non_res);
            prop_assert!((0.0..=1.0).contains(&share));
        }
    }
}
