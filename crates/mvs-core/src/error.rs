use thiserror::Error;

use crate::quantity::ValueKind;

pub type MvsResult<T> = Result<T, MvsError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MvsError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: String, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Value of {what} is a {found}, expected a {expected}")]
    ShapeMismatch {
        what: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("Invariant violated: {what}")]
    Invariant { what: &'static str },
}
