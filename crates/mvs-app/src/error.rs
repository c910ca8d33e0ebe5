//! Error types for the mvs-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// gives the CLI one error to report.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to write project file: {path}")]
    ProjectFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Project validation failed: {0}")]
    Validation(String),

    #[error("Economic evaluation failed: {0}")]
    Economics(String),

    #[error("Graph assembly failed: {0}")]
    Graph(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mvs-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<mvs_project::ProjectError> for AppError {
    fn from(err: mvs_project::ProjectError) -> Self {
        match err {
            mvs_project::ProjectError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<mvs_economics::EconomicsError> for AppError {
    fn from(err: mvs_economics::EconomicsError) -> Self {
        AppError::Economics(err.to_string())
    }
}

impl From<mvs_graph::GraphError> for AppError {
    fn from(err: mvs_graph::GraphError) -> Self {
        AppError::Graph(err.to_string())
    }
}

impl From<mvs_graph::SolveError> for AppError {
    fn from(err: mvs_graph::SolveError) -> Self {
        AppError::Solver(err.to_string())
    }
}

impl From<mvs_results::ResultsError> for AppError {
    fn from(err: mvs_results::ResultsError) -> Self {
        match err {
            mvs_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_run_keeps_its_id() {
        let err: AppError = mvs_results::ResultsError::RunNotFound {
            run_id: "abc".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Run not found: abc");
    }

    #[test]
    fn configuration_errors_are_validation_failures() {
        let err: AppError = mvs_project::ProjectError::Validation(
            mvs_project::ConfigError::DuplicateLabel {
                label: "pv".into(),
                context: "energy_production".into(),
            },
        )
        .into();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
