//! mvs-core: stable foundation for the multi-vector energy system tools.
//!
//! Contains:
//! - quantity (value + unit pairs, scalar or time series)
//! - units (uom time helpers, unit labels)
//! - numeric (Real, rounding and finiteness helpers)
//! - ids (stable compact IDs for graph objects)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod quantity;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{MvsError, MvsResult};
pub use ids::*;
pub use numeric::*;
pub use quantity::{Quantity, Value, ValueKind};
pub use units::*;
