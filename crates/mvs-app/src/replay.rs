//! Optimizer that answers with a recorded solution.

use std::path::Path;

use mvs_graph::{EnergyGraph, Optimizer, SolveError, SolveOutput, SolveOutputRecord};
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Replays a `SolveOutputRecord` written by an earlier dispatch. The graph
/// must not have edges the recording lacks.
#[derive(Debug, Clone)]
pub struct ReplayOptimizer {
    output: SolveOutput,
}

impl ReplayOptimizer {
    pub fn new(output: SolveOutput) -> Self {
        Self { output }
    }

    pub fn from_record(record: SolveOutputRecord) -> AppResult<Self> {
        Ok(Self::new(record.into_output()?))
    }

    pub fn from_path(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let record: SolveOutputRecord = serde_json::from_str(&content).map_err(|e| {
            AppError::InvalidInput(format!("Failed to parse solution {}: {e}", path.display()))
        })?;
        Self::from_record(record)
    }
}

impl Optimizer for ReplayOptimizer {
    fn solve(&self, graph: &EnergyGraph) -> Result<SolveOutput, SolveError> {
        if let Some(edge) = self.output.missing_flows(graph).into_iter().next() {
            return Err(SolveError::MissingFlow { edge });
        }
        debug!(edges = self.output.flows.len(), "Replaying recorded solution");
        Ok(self.output.clone())
    }
}
