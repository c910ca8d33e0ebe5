use crate::MvsError;

/// Floating point type used throughout system
pub type Real = f64;

/// Decimal places kept when results are written into result tables.
pub const RESULT_DECIMALS: i32 = 5;

pub fn ensure_finite(v: Real, what: &str) -> Result<Real, MvsError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(MvsError::NonFinite {
            what: what.to_string(),
            value: v,
        })
    }
}

/// Round half away from zero to `decimals` places.
///
/// Non-finite values pass through unchanged.
pub fn round_to(v: Real, decimals: i32) -> Real {
    if !v.is_finite() {
        return v;
    }
    let scale = 10_f64.powi(decimals);
    (v * scale).round() / scale
}
