//! Per-asset cost terms, totals and annuities.
//!
//! Each `CostTerm` declares the asset fields it needs. A term whose fields
//! are not all present is skipped and left empty, never counted as zero.

use mvs_core::{MvsError, Quantity};
use mvs_project::{Asset, CostBreakdown};
use tracing::debug;

use crate::context::EconomicContext;
use crate::error::{EconomicsError, EconomicsResult};

/// Asset fields a cost term can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostInput {
    OptimizedAddCap,
    InstalledCap,
    SpecificCosts,
    DevelopmentCosts,
    LifetimeSpecificCost,
    LifetimeSpecificCostOm,
    LifetimePriceDispatch,
    AnnualTotalFlow,
}

impl CostInput {
    pub fn name(self) -> &'static str {
        match self {
            CostInput::OptimizedAddCap => "optimized_add_cap",
            CostInput::InstalledCap => "installed_cap",
            CostInput::SpecificCosts => "specific_costs",
            CostInput::DevelopmentCosts => "development_costs",
            CostInput::LifetimeSpecificCost => "lifetime_specific_cost",
            CostInput::LifetimeSpecificCostOm => "lifetime_specific_cost_om",
            CostInput::LifetimePriceDispatch => "lifetime_price_dispatch",
            CostInput::AnnualTotalFlow => "annual_total_flow",
        }
    }

    fn lookup(self, asset: &Asset) -> Option<&Quantity> {
        let d = &asset.derived;
        match self {
            CostInput::OptimizedAddCap => d.optimized_add_cap.as_ref(),
            CostInput::InstalledCap => asset.installed_cap.as_ref(),
            CostInput::SpecificCosts => asset.specific_costs.as_ref(),
            CostInput::DevelopmentCosts => asset.development_costs.as_ref(),
            CostInput::LifetimeSpecificCost => d.lifetime_specific_cost.as_ref(),
            CostInput::LifetimeSpecificCostOm => d.lifetime_specific_cost_om.as_ref(),
            CostInput::LifetimePriceDispatch => d.lifetime_price_dispatch.as_ref(),
            CostInput::AnnualTotalFlow => d.annual_total_flow.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostTerm {
    Investment,
    Upfront,
    Dispatch,
    OmFix,
}

impl CostTerm {
    pub const ALL: [CostTerm; 4] = [
        CostTerm::Investment,
        CostTerm::Upfront,
        CostTerm::Dispatch,
        CostTerm::OmFix,
    ];

    pub fn required(self) -> &'static [CostInput] {
        use CostInput::*;
        match self {
            CostTerm::Investment => &[OptimizedAddCap, LifetimeSpecificCost, DevelopmentCosts],
            CostTerm::Upfront => &[OptimizedAddCap, SpecificCosts, DevelopmentCosts],
            CostTerm::Dispatch => &[LifetimePriceDispatch, AnnualTotalFlow],
            CostTerm::OmFix => &[LifetimeSpecificCostOm, InstalledCap, OptimizedAddCap],
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            CostTerm::Investment => "costs_investment",
            CostTerm::Upfront => "costs_upfront",
            CostTerm::Dispatch => "costs_dispatch",
            CostTerm::OmFix => "costs_om_fix",
        }
    }

    /// Part of the operation and maintenance subtotal.
    pub fn is_om(self) -> bool {
        matches!(self, CostTerm::Dispatch | CostTerm::OmFix)
    }

    /// `Ok(None)` when a required input is absent or the term does not apply.
    pub fn compute(self, asset: &Asset) -> Result<Option<f64>, MvsError> {
        let mut values = [0.0; 3];
        for (slot, input) in values.iter_mut().zip(self.required()) {
            match input.lookup(asset) {
                Some(q) => *slot = q.as_scalar(input.name())?,
                None => return Ok(None),
            }
        }
        let value = match self {
            CostTerm::Investment | CostTerm::Upfront => {
                let [add_cap, specific, development] = values;
                if add_cap <= 0.0 {
                    return Ok(None);
                }
                add_cap * specific + development
            }
            CostTerm::Dispatch => {
                let [price, annual_flow, _] = values;
                price * annual_flow
            }
            CostTerm::OmFix => {
                let [om, installed, added] = values;
                om * (installed + added)
            }
        };
        Ok(Some(value))
    }
}

/// Rebuild the cost record of `asset` from its current inputs.
pub fn lifetime_costs(asset: &mut Asset, ctx: &EconomicContext) -> EconomicsResult<()> {
    let money = |v: f64| Quantity::scalar(v, ctx.money_unit());
    let mut terms = [None; 4];
    for (slot, term) in terms.iter_mut().zip(CostTerm::ALL) {
        *slot = term.compute(asset).map_err(|source| EconomicsError::Asset {
            label: asset.label.clone(),
            source,
        })?;
    }

    let total: f64 = terms.iter().flatten().sum();
    let om_total: f64 = CostTerm::ALL
        .iter()
        .zip(&terms)
        .filter(|(term, _)| term.is_om())
        .filter_map(|(_, v)| *v)
        .sum();
    let [investment, upfront, dispatch, om_fix] = terms;

    let breakdown = CostBreakdown {
        costs_investment: investment.map(money),
        costs_upfront: upfront.map(money),
        costs_dispatch: dispatch.map(money),
        costs_om_fix: om_fix.map(money),
        costs_total: money(total),
        costs_om_total: money(om_total),
        annuity_total: Quantity::scalar(total * ctx.crf, ctx.annuity_unit()),
        annuity_om: Quantity::scalar(om_total * ctx.crf, ctx.annuity_unit()),
    };
    debug!(asset = %asset.label, total, om_total, "Computed asset costs");
    asset.derived.costs = Some(breakdown);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::derive_context;
    use mvs_project::AssetType;

    fn scalar(v: f64) -> Option<Quantity> {
        Some(Quantity::scalar(v, "NA"))
    }

    fn ctx() -> EconomicContext {
        let mut ctx = derive_context(20.0, 0.15).unwrap();
        ctx.currency = "EUR".into();
        ctx
    }

    #[test]
    fn investment_and_annuity() {
        let mut asset = Asset::new("chp", AssetType::Transformer);
        asset.development_costs = scalar(0.0);
        asset.derived.optimized_add_cap = scalar(10.0);
        asset.derived.lifetime_specific_cost = scalar(1000.0);

        lifetime_costs(&mut asset, &ctx()).unwrap();
        let costs = asset.derived.costs.unwrap();
        assert_eq!(costs.costs_investment, Some(Quantity::scalar(10000.0, "EUR")));
        assert_eq!(costs.costs_upfront, None);
        assert_eq!(costs.costs_total.as_scalar("t").unwrap(), 10000.0);
        assert_eq!(costs.costs_om_total.as_scalar("o").unwrap(), 0.0);
        let annuity = costs.annuity_total.as_scalar("a").unwrap();
        assert!((annuity - 1598.0).abs() < 1.0, "annuity = {annuity}");
        assert_eq!(costs.annuity_total.unit, "EUR/year");
    }

    #[test]
    fn dispatch_counts_in_total_and_om() {
        let mut asset = Asset::new("grid_consumption", AssetType::Source);
        asset.derived.lifetime_price_dispatch = scalar(0.1);
        asset.derived.annual_total_flow = scalar(1000.0);

        lifetime_costs(&mut asset, &ctx()).unwrap();
        let costs = asset.derived.costs.unwrap();
        let dispatch = costs.costs_dispatch.unwrap().as_scalar("d").unwrap();
        assert!((dispatch - 100.0).abs() < 1e-9);
        assert!((costs.costs_total.as_scalar("t").unwrap() - 100.0).abs() < 1e-9);
        assert!((costs.costs_om_total.as_scalar("o").unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn series_dispatch_price_is_a_shape_error() {
        let mut asset = Asset::new("grid_consumption", AssetType::Source);
        asset.derived.lifetime_price_dispatch = Some(Quantity::series(vec![0.1, 0.2], "EUR/kWh"));
        asset.derived.annual_total_flow = scalar(1000.0);
        let err = lifetime_costs(&mut asset, &ctx()).unwrap_err();
        assert!(matches!(
            err,
            EconomicsError::Asset {
                source: MvsError::ShapeMismatch { .. },
                ..
            }
        ));
    }

    #[test]
    fn mandatory_fields_only_costs_nothing() {
        let mut asset = Asset::new("demand", AssetType::Sink);
        lifetime_costs(&mut asset, &ctx()).unwrap();
        let costs = asset.derived.costs.unwrap();
        assert_eq!(costs.costs_total.as_scalar("t").unwrap(), 0.0);
        assert!(costs.costs_investment.is_none());
        assert!(costs.costs_dispatch.is_none());
    }

    #[test]
    fn upfront_and_fixed_om() {
        let mut asset = Asset::new("pv", AssetType::Source);
        asset.specific_costs = scalar(800.0);
        asset.development_costs = scalar(500.0);
        asset.installed_cap = scalar(5.0);
        asset.derived.optimized_add_cap = scalar(2.0);
        asset.derived.lifetime_specific_cost_om = scalar(100.0);

        lifetime_costs(&mut asset, &ctx()).unwrap();
        let costs = asset.derived.costs.unwrap();
        assert_eq!(costs.costs_upfront.unwrap().as_scalar("u").unwrap(), 2100.0);
        assert_eq!(costs.costs_om_fix.unwrap().as_scalar("f").unwrap(), 700.0);
        assert_eq!(costs.costs_total.as_scalar("t").unwrap(), 2800.0);
        assert_eq!(costs.costs_om_total.as_scalar("o").unwrap(), 700.0);
    }

    #[test]
    fn no_added_capacity_means_no_investment() {
        let mut asset = Asset::new("chp", AssetType::Transformer);
        asset.development_costs = scalar(100.0);
        asset.derived.optimized_add_cap = scalar(0.0);
        asset.derived.lifetime_specific_cost = scalar(1000.0);
        lifetime_costs(&mut asset, &ctx()).unwrap();
        assert!(asset.derived.costs.unwrap().costs_investment.is_none());
    }

    #[test]
    fn recomputation_is_idempotent() {
        let mut asset = Asset::new("chp", AssetType::Transformer);
        asset.development_costs = scalar(50.0);
        asset.installed_cap = scalar(1.0);
        asset.derived.optimized_add_cap = scalar(3.0);
        asset.derived.lifetime_specific_cost = scalar(900.0);
        asset.derived.lifetime_specific_cost_om = scalar(12.0);
        asset.derived.lifetime_price_dispatch = scalar(0.05);
        asset.derived.annual_total_flow = scalar(4000.0);

        let ctx = ctx();
        lifetime_costs(&mut asset, &ctx).unwrap();
        let first = asset.clone();
        lifetime_costs(&mut asset, &ctx).unwrap();
        assert_eq!(asset, first);
    }
}
