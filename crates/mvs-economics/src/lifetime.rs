//! Lifetime-adjusted specific costs.
//!
//! Turns the per-unit inputs of an asset into figures over the whole
//! project duration. Runs once per asset before dispatch results exist.

use mvs_core::{MvsError, Quantity, constants::DAYS_PER_YEAR};
use mvs_project::{Asset, ProjectModel};
use tracing::debug;

use crate::context::EconomicContext;
use crate::error::{EconomicsError, EconomicsResult};

/// Present value of buying an asset at `investment_t0` and replacing it
/// every `lifetime` years until the project ends.
///
/// The first purchase is taxed. Replacements are discounted to year zero.
/// When the last purchase outlives the project, its linearly depreciated
/// remaining value, discounted from the project end, is subtracted.
pub fn capex_from_investment(
    investment_t0: f64,
    lifetime: f64,
    project_duration: f64,
    discount_rate: f64,
    tax: f64,
) -> EconomicsResult<f64> {
    if !(project_duration > 0.0) {
        return Err(EconomicsError::NonPositiveDuration(project_duration));
    }
    if !(lifetime > 0.0) {
        return Err(MvsError::InvalidArg {
            what: format!("lifetime must be greater than zero (got {lifetime})"),
        }
        .into());
    }
    let discount = |years: f64| (1.0 + discount_rate).powf(years);

    let first = investment_t0 * (1.0 + tax);
    let purchases = (project_duration / lifetime).ceil() as u32;
    let mut capex = first;
    for k in 1..purchases {
        capex += first / discount(f64::from(k) * lifetime);
    }

    let covered = f64::from(purchases) * lifetime;
    if covered > project_duration {
        let remaining_years = covered - project_duration;
        let residual = first * remaining_years / lifetime;
        capex -= residual / discount(project_duration);
    }
    Ok(capex)
}

/// Fill the lifetime figures of one asset. A figure whose inputs are
/// missing is cleared.
pub fn evaluate_lifetime_costs(
    asset: &mut Asset,
    ctx: &EconomicContext,
    evaluated_days: f64,
) -> EconomicsResult<()> {
    let label = asset.label.clone();
    let wrap = |source: MvsError| EconomicsError::Asset {
        label: label.clone(),
        source,
    };

    let lifetime_specific_cost = match (&asset.specific_costs, &asset.lifetime) {
        (Some(costs), Some(lifetime)) => {
            let investment = costs.as_scalar("specific_costs").map_err(wrap)?;
            let lifetime = lifetime.as_scalar("lifetime").map_err(wrap)?;
            let capex = capex_from_investment(
                investment,
                lifetime,
                ctx.project_duration,
                ctx.discount_rate,
                ctx.tax,
            )
            .map_err(|e| match e {
                EconomicsError::Core(source) => wrap(source),
                other => other,
            })?;
            Some(Quantity::scalar(capex, costs.unit.clone()))
        }
        _ => None,
    };

    let lifetime_specific_cost_om = asset
        .specific_costs_om
        .as_ref()
        .map(|om| om.scaled(ctx.annuity_factor));

    let lifetime_price_dispatch = asset
        .dispatch_price
        .as_ref()
        .map(|price| price.scaled(ctx.annuity_factor));

    let annuity_specific_investment_om = match (&lifetime_specific_cost, &asset.specific_costs_om) {
        (Some(capex), Some(om)) => {
            let om = om.as_scalar("specific_costs_om").map_err(wrap)?;
            let capex_value = capex.as_scalar("lifetime_specific_cost").map_err(wrap)?;
            Some(Quantity::scalar(
                capex_value * ctx.crf + om,
                ctx.annuity_unit(),
            ))
        }
        _ => None,
    };

    let simulation_annuity = annuity_specific_investment_om
        .as_ref()
        .map(|a| a.scaled(evaluated_days / DAYS_PER_YEAR));

    debug!(
        asset = %label,
        capex = ?lifetime_specific_cost.as_ref().map(|q| &q.value),
        "Evaluated lifetime costs"
    );

    let derived = &mut asset.derived;
    derived.lifetime_specific_cost = lifetime_specific_cost;
    derived.lifetime_specific_cost_om = lifetime_specific_cost_om;
    derived.lifetime_price_dispatch = lifetime_price_dispatch;
    derived.annuity_specific_investment_om = annuity_specific_investment_om;
    derived.simulation_annuity = simulation_annuity;
    Ok(())
}

/// Lifetime figures for every asset of the project, storage sub-records
/// and fix-cost items included.
pub fn evaluate_project_lifetime_costs(
    model: &mut ProjectModel,
    ctx: &EconomicContext,
) -> EconomicsResult<()> {
    let days = model.evaluated_days()?;
    let storage_subs = model
        .energy_storage
        .values_mut()
        .filter_map(|s| s.components.as_mut())
        .flat_map(|c| c.iter_mut());
    let assets = model
        .energy_conversion
        .values_mut()
        .chain(storage_subs)
        .chain(model.energy_production.values_mut())
        .chain(model.energy_consumption.values_mut())
        .chain(model.fix_cost.values_mut());
    for asset in assets {
        evaluate_lifetime_costs(asset, ctx, days)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::derive_context;
    use mvs_core::Value;
    use mvs_project::AssetType;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn single_purchase_covers_project() {
        let capex = capex_from_investment(1000.0, 20.0, 20.0, 0.1, 0.0).unwrap();
        assert!(close(capex, 1000.0));
    }

    #[test]
    fn replacement_is_discounted() {
        let capex = capex_from_investment(1000.0, 10.0, 20.0, 0.1, 0.0).unwrap();
        assert!(close(capex, 1000.0 + 1000.0 / 1.1f64.powi(10)));
    }

    #[test]
    fn residual_value_is_subtracted() {
        let capex = capex_from_investment(1000.0, 15.0, 20.0, 0.1, 0.0).unwrap();
        let expected = 1000.0 + 1000.0 / 1.1f64.powi(15) - 1000.0 * (10.0 / 15.0) / 1.1f64.powi(20);
        assert!(close(capex, expected));
    }

    #[test]
    fn long_lifetime_leaves_residual() {
        let capex = capex_from_investment(1000.0, 25.0, 20.0, 0.0, 0.0).unwrap();
        assert!(close(capex, 1000.0 - 1000.0 * 5.0 / 25.0));
    }

    #[test]
    fn tax_applies_to_every_purchase() {
        let taxed = capex_from_investment(1000.0, 10.0, 20.0, 0.0, 0.2).unwrap();
        assert!(close(taxed, 2400.0));
    }

    #[test]
    fn zero_lifetime_is_rejected() {
        assert!(capex_from_investment(1000.0, 0.0, 20.0, 0.1, 0.0).is_err());
    }

    #[test]
    fn lifetime_figures() {
        let ctx = derive_context(20.0, 0.0).unwrap();
        let mut asset = Asset::new("pv", AssetType::Source);
        asset.lifetime = Some(Quantity::scalar(20.0, "year"));
        asset.specific_costs = Some(Quantity::scalar(1000.0, "EUR/kW"));
        asset.specific_costs_om = Some(Quantity::scalar(10.0, "EUR/kW/year"));
        asset.dispatch_price = Some(Quantity::series(vec![0.1, 0.2], "EUR/kWh"));

        evaluate_lifetime_costs(&mut asset, &ctx, 365.0).unwrap();
        let d = &asset.derived;
        assert_eq!(d.lifetime_specific_cost, Some(Quantity::scalar(1000.0, "EUR/kW")));
        assert_eq!(d.lifetime_specific_cost_om.as_ref().unwrap().value, Value::Scalar(200.0));
        assert_eq!(
            d.lifetime_price_dispatch.as_ref().unwrap().value,
            Value::Series(vec![2.0, 4.0])
        );
        let annuity = d.annuity_specific_investment_om.as_ref().unwrap();
        assert!(close(annuity.as_scalar("a").unwrap(), 1000.0 / 20.0 + 10.0));
        assert!(close(
            d.simulation_annuity.as_ref().unwrap().as_scalar("s").unwrap(),
            60.0
        ));
    }

    #[test]
    fn missing_inputs_leave_figures_absent() {
        let ctx = derive_context(20.0, 0.05).unwrap();
        let mut asset = Asset::new("demand", AssetType::Sink);
        evaluate_lifetime_costs(&mut asset, &ctx, 365.0).unwrap();
        assert!(asset.derived.is_empty());
    }

    #[test]
    fn series_capex_names_the_asset() {
        let ctx = derive_context(20.0, 0.05).unwrap();
        let mut asset = Asset::new("chp", AssetType::Transformer);
        asset.lifetime = Some(Quantity::scalar(20.0, "year"));
        asset.specific_costs = Some(Quantity::series(vec![1.0, 2.0], "EUR/kW"));
        let err = evaluate_lifetime_costs(&mut asset, &ctx, 365.0).unwrap_err();
        assert!(err.to_string().contains("chp"));
    }
}
