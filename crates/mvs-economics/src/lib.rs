//! mvs-economics: financial constants, lifetime-adjusted specific costs and
//! per-asset cost terms.

pub mod context;
pub mod costs;
pub mod error;
pub mod lifetime;

pub use context::{EconomicContext, annuity_factor, crf, derive_context};
pub use costs::{CostInput, CostTerm, lifetime_costs};
pub use error::{EconomicsError, EconomicsResult};
pub use lifetime::{capex_from_investment, evaluate_lifetime_costs, evaluate_project_lifetime_costs};
