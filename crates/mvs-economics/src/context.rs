//! Project-wide financial constants.

use mvs_core::labels;
use mvs_project::EconomicData;
use serde::{Deserialize, Serialize};

use crate::error::{EconomicsError, EconomicsResult};

fn check_inputs(discount_rate: f64, duration_years: f64) -> EconomicsResult<()> {
    if !duration_years.is_finite() || duration_years <= 0.0 {
        return Err(EconomicsError::NonPositiveDuration(duration_years));
    }
    if !discount_rate.is_finite() || discount_rate <= -1.0 {
        return Err(EconomicsError::InvalidDiscountRate(discount_rate));
    }
    Ok(())
}

/// Capital recovery factor: the share of a present value paid back each
/// year over `duration_years` at rate `discount_rate`.
pub fn crf(discount_rate: f64, duration_years: f64) -> EconomicsResult<f64> {
    check_inputs(discount_rate, duration_years)?;
    if discount_rate == 0.0 {
        return Ok(1.0 / duration_years);
    }
    let r = discount_rate;
    Ok(r / (1.0 - (1.0 + r).powf(-duration_years)))
}

/// Present value of one unit paid at the end of every year.
/// Reciprocal of `crf`.
pub fn annuity_factor(discount_rate: f64, duration_years: f64) -> EconomicsResult<f64> {
    check_inputs(discount_rate, duration_years)?;
    if discount_rate == 0.0 {
        return Ok(duration_years);
    }
    let r = discount_rate;
    Ok((1.0 - (1.0 + r).powf(-duration_years)) / r)
}

/// Computed once per run and borrowed by every cost calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicContext {
    pub discount_rate: f64,
    pub project_duration: f64,
    pub tax: f64,
    pub currency: String,
    pub crf: f64,
    pub annuity_factor: f64,
}

impl EconomicContext {
    pub fn from_economic_data(data: &EconomicData) -> EconomicsResult<Self> {
        let duration = data.project_duration.as_scalar("project_duration")?;
        let rate = data.discount_factor.as_scalar("discount_factor")?;
        let tax = match &data.tax {
            Some(q) => q.as_scalar("tax")?,
            None => 0.0,
        };
        let mut ctx = derive_context(duration, rate)?;
        ctx.tax = tax;
        ctx.currency = data.currency.clone();
        Ok(ctx)
    }

    /// Unit label for money totals.
    pub fn money_unit(&self) -> &str {
        &self.currency
    }

    /// Unit label for yearly payments.
    pub fn annuity_unit(&self) -> String {
        labels::per_year(&self.currency)
    }
}

pub fn derive_context(duration_years: f64, discount_rate: f64) -> EconomicsResult<EconomicContext> {
    let crf = crf(discount_rate, duration_years)?;
    let annuity_factor = annuity_factor(discount_rate, duration_years)?;
    tracing::debug!(crf, annuity_factor, "Derived economic context");
    Ok(EconomicContext {
        discount_rate,
        project_duration: duration_years,
        tax: 0.0,
        currency: labels::NONE.to_string(),
        crf,
        annuity_factor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvs_core::Quantity;
    use proptest::prelude::*;

    #[test]
    fn crf_reference_value() {
        let v = crf(0.15, 20.0).unwrap();
        assert!((v - 0.1598).abs() < 1e-4, "crf = {v}");
    }

    #[test]
    fn zero_rate_is_linear() {
        assert_eq!(crf(0.0, 20.0).unwrap(), 1.0 / 20.0);
        assert_eq!(annuity_factor(0.0, 20.0).unwrap(), 20.0);
    }

    #[test]
    fn duration_must_be_positive() {
        assert_eq!(
            crf(0.05, 0.0).unwrap_err(),
            EconomicsError::NonPositiveDuration(0.0)
        );
        assert!(derive_context(-1.0, 0.05).is_err());
        assert!(crf(f64::NAN, 10.0).is_err());
    }

    #[test]
    fn context_from_project_data() {
        let data = EconomicData {
            currency: "EUR".into(),
            discount_factor: Quantity::scalar(0.06, "factor"),
            project_duration: Quantity::scalar(25.0, "year"),
            tax: Some(Quantity::scalar(0.19, "factor")),
        };
        let ctx = EconomicContext::from_economic_data(&data).unwrap();
        assert_eq!(ctx.currency, "EUR");
        assert_eq!(ctx.tax, 0.19);
        assert_eq!(ctx.annuity_unit(), "EUR/year");
        assert!((ctx.crf * ctx.annuity_factor - 1.0).abs() < 1e-12);
    }

    #[test]
    fn series_rate_is_rejected() {
        let data = EconomicData {
            currency: "EUR".into(),
            discount_factor: Quantity::series(vec![0.05, 0.06], "factor"),
            project_duration: Quantity::scalar(25.0, "year"),
            tax: None,
        };
        assert!(matches!(
            EconomicContext::from_economic_data(&data),
            Err(EconomicsError::Core(_))
        ));
    }

    proptest! {
        #[test]
        fn crf_decreases_with_duration(r in 0.001f64..0.5, n in 1.0f64..80.0) {
            let shorter = crf(r, n).unwrap();
            let longer = crf(r, n + 1.0).unwrap();
            prop_assert!(longer < shorter);
        }

        #[test]
        fn annuity_factor_is_reciprocal(r in 0.001f64..0.5, n in 1.0f64..80.0) {
            let product = crf(r, n).unwrap() * annuity_factor(r, n).unwrap();
            prop_assert!((product - 1.0).abs() < 1e-9);
        }
    }
}
