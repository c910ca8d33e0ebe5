use mvs_core::MvsError;

pub type EconomicsResult<T> = Result<T, EconomicsError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EconomicsError {
    #[error("Project duration must be greater than zero (got {0})")]
    NonPositiveDuration(f64),

    #[error("Discount rate must be finite and greater than -1 (got {0})")]
    InvalidDiscountRate(f64),

    #[error("Asset {label}: {source}")]
    Asset {
        label: String,
        #[source]
        source: MvsError,
    },

    #[error(transparent)]
    Core(#[from] MvsError),
}
