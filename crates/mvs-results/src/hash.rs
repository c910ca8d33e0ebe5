//! Content-based hashing for run IDs.

use mvs_graph::SolveOutputRecord;
use mvs_project::ProjectModel;
use sha2::{Digest, Sha256};

/// Same project, same solver output and same tool version give the same ID.
pub fn compute_run_id(
    project: &ProjectModel,
    solution: &SolveOutputRecord,
    tool_version: &str,
) -> String {
    let mut hasher = Sha256::new();

    let project_json = serde_json::to_string(project).unwrap_or_default();
    hasher.update(project_json.as_bytes());

    let solution_json = serde_json::to_string(solution).unwrap_or_default();
    hasher.update(solution_json.as_bytes());

    hasher.update(tool_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
