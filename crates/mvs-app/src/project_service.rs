//! Project loading, saving, validation and pre-processing.

use std::path::Path;

use mvs_economics::{EconomicContext, evaluate_project_lifetime_costs};
use mvs_project::{Diagnostic, LoadedProject, ProjectModel, normalize, validate_store};
use tracing::info;

use crate::error::{AppError, AppResult};

/// A project ready for dispatch: normalized, validated and with its
/// lifetime cost figures in place.
#[derive(Debug, Clone)]
pub struct PreparedProject {
    pub model: ProjectModel,
    pub context: EconomicContext,
    pub diagnostics: Vec<Diagnostic>,
}

/// Asset counts of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub project_name: String,
    pub scenario_name: String,
    pub conversion: usize,
    pub production: usize,
    pub consumption: usize,
    pub storage: usize,
    pub providers: usize,
    pub fix_cost: usize,
    pub sectors: Vec<String>,
}

/// Load a YAML or JSON project.
pub fn load_project(path: &Path) -> AppResult<LoadedProject> {
    Ok(mvs_project::load_project(path)?)
}

/// Save a project; JSON for `.json` paths, YAML otherwise.
pub fn save_project(path: &Path, model: &ProjectModel) -> AppResult<()> {
    let json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let saved = if json {
        mvs_project::save_json(path, model)
    } else {
        mvs_project::save_yaml(path, model)
    };
    saved.map_err(|e| match e {
        mvs_project::ProjectError::Io(source) => AppError::ProjectFileWrite {
            path: path.to_path_buf(),
            source,
        },
        other => other.into(),
    })
}

/// Range and type check of every parameter. Findings are warnings only.
pub fn validate_parameters(project: &LoadedProject) -> AppResult<Vec<Diagnostic>> {
    Ok(validate_store(&project.params)?)
}

/// Normalize the model and derive the economic context and lifetime costs.
pub fn prepare(project: LoadedProject, diagnostics: Vec<Diagnostic>) -> AppResult<PreparedProject> {
    let mut model = project.model;
    normalize(&mut model)?;
    let context = EconomicContext::from_economic_data(&model.economic_data)?;
    evaluate_project_lifetime_costs(&mut model, &context)?;
    info!(
        project = %model.project_data.project_name,
        crf = context.crf,
        "Project prepared"
    );
    Ok(PreparedProject {
        model,
        context,
        diagnostics,
    })
}

/// Load, check and prepare a project file.
pub fn prepare_project(path: &Path) -> AppResult<PreparedProject> {
    let project = load_project(path)?;
    let diagnostics = validate_parameters(&project)?;
    prepare(project, diagnostics)
}

pub fn summarize(model: &ProjectModel) -> ProjectSummary {
    ProjectSummary {
        project_name: model.project_data.project_name.clone(),
        scenario_name: model.project_data.scenario_name.clone(),
        conversion: model.energy_conversion.len(),
        production: model.energy_production.len(),
        consumption: model.energy_consumption.len(),
        storage: model.energy_storage.len(),
        providers: model.energy_providers.len(),
        fix_cost: model.fix_cost.len(),
        sectors: model.project_data.sectors.clone(),
    }
}
