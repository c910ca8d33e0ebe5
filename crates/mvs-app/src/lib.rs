//! Shared application service layer for the multi-vector energy system
//! evaluator.
//!
//! Centralizes loading and preparing projects, dispatching them through an
//! `Optimizer`, evaluating the solution and querying stored runs, so the
//! CLI stays thin.

pub mod error;
pub mod progress;
pub mod project_service;
pub mod query;
pub mod replay;
pub mod run_service;

// Re-export key types for convenience
pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage};
pub use project_service::{
    PreparedProject, ProjectSummary, load_project, prepare, prepare_project, save_project,
    summarize, validate_parameters,
};
pub use query::{RunSummary, extract_bus_series, get_run_summary, list_bus_labels};
pub use replay::ReplayOptimizer;
pub use run_service::{
    RunOptions, RunRequest, RunResponse, RunTimingSummary, default_store_root, ensure_run,
    ensure_run_with_progress, evaluate_assets, list_runs, load_run,
};
