//! mvs-results: mapping solver output back onto assets, KPI aggregation and
//! run storage.

pub mod hash;
pub mod kpi;
pub mod mapper;
pub mod store;
pub mod tables;
pub mod types;
pub mod weights;

pub use hash::compute_run_id;
pub use kpi::{build_report, levelized_cost, renewable_share, sector_weighted_kpi};
pub use mapper::{bus_timeseries, map_results, map_storage, rescale_by_profile_peak};
pub use store::RunStore;
pub use tables::{COST_COLUMNS, ResultTable, SCALAR_COLUMNS, aggregate_totals, append_to_tables};
pub use types::*;
pub use weights::WeightTable;

use mvs_core::MvsError;
use mvs_graph::EdgeKey;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("No flow series for edge {edge} of asset {asset}")]
    MissingFlow { asset: String, edge: EdgeKey },

    #[error("Capacity of {asset} was optimized but edge {edge} has no investment value")]
    MissingInvestment { asset: String, edge: EdgeKey },

    #[error("Asset {asset} declares neither an input nor an output bus")]
    MissingBusDirection { asset: String },

    #[error("No electricity-equivalent weight for sector {sector}")]
    MissingSectorWeight { sector: String },

    #[error("Flow series of edge {edge} of asset {asset} is empty")]
    EmptySeries { asset: String, edge: EdgeKey },

    #[error("Table {table} already has a row for {label}")]
    DuplicateRow { table: String, label: String },

    #[error(transparent)]
    Core(#[from] MvsError),
}
