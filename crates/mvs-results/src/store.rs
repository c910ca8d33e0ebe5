//! Run storage API.
//!
//! Layout under the store root: `<run_id>/manifest.json`,
//! `<run_id>/results.json` and `<run_id>/bus_timeseries.jsonl` (one bus per
//! line).

use crate::types::{BusBalance, EvaluationRecord, RunManifest};
use crate::{ResultsError, ResultsResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const MANIFEST: &str = "manifest.json";
const RESULTS: &str = "results.json";
const BUS_TIMESERIES: &str = "bus_timeseries.jsonl";

#[derive(Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store next to a project file, in `.mvs/runs`.
    pub fn for_project(project_path: &Path) -> ResultsResult<Self> {
        let project_dir = project_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: "project path has no parent directory".to_string(),
            })?;
        let runs_dir = project_dir.join(".mvs").join("runs");
        Self::new(runs_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join(MANIFEST).exists()
    }

    pub fn save_run(
        &self,
        manifest: &RunManifest,
        record: &EvaluationRecord,
        busses: &[BusBalance],
    ) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        fs::write(run_dir.join(MANIFEST), serde_json::to_string_pretty(manifest)?)?;
        fs::write(run_dir.join(RESULTS), serde_json::to_string_pretty(record)?)?;

        let mut lines = String::new();
        for bus in busses {
            lines.push_str(&serde_json::to_string(bus)?);
            lines.push('\n');
        }
        fs::write(run_dir.join(BUS_TIMESERIES), lines)?;

        info!(run_id = %manifest.run_id, dir = %run_dir.display(), "Run saved");
        Ok(())
    }

    fn run_file(&self, run_id: &str, name: &str) -> ResultsResult<PathBuf> {
        let path = self.run_dir(run_id).join(name);
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        Ok(path)
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let content = fs::read_to_string(self.run_file(run_id, MANIFEST)?)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_results(&self, run_id: &str) -> ResultsResult<EvaluationRecord> {
        let content = fs::read_to_string(self.run_file(run_id, RESULTS)?)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_bus_timeseries(&self, run_id: &str) -> ResultsResult<Vec<BusBalance>> {
        let content = fs::read_to_string(self.run_file(run_id, BUS_TIMESERIES)?)?;
        let mut busses = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                busses.push(serde_json::from_str(line)?);
            }
        }
        Ok(busses)
    }

    /// Manifests of all runs of one project, oldest first.
    pub fn list_runs(&self, project_name: &str) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id)
                    && manifest.project_name == project_name
                {
                    runs.push(manifest);
                }
            }
        }
        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}
