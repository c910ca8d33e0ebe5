//! mvs-project: project file format, parameter tree, validation and
//! normalization.

pub mod normalize;
pub mod params;
pub mod schema;
pub mod validate;

use std::path::Path;

use mvs_core::MvsError;
use serde_json::Value as JsonValue;

pub use normalize::{bus_name, normalize};
pub use params::{ParamNode, ParamValue, ParameterStore};
pub use schema::*;
pub use validate::{ConfigError, Diagnostic, Violation, validate, validate_project, validate_store};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Configuration error: {0}")]
    Validation(#[from] ConfigError),

    #[error("Parameter nesting too deep at {path}")]
    NestingTooDeep { path: String },

    #[error(transparent)]
    Core(#[from] MvsError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A project document read twice: as the untyped parameter tree and as
/// the typed model.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub params: ParameterStore,
    pub model: ProjectModel,
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Load a YAML or JSON project, chosen by file extension.
pub fn load_project(path: &Path) -> ProjectResult<LoadedProject> {
    let content = std::fs::read_to_string(path)?;
    let doc: JsonValue = if is_json(path) {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    let params = ParameterStore::from_json(&doc)?;
    let model: ProjectModel = serde_json::from_value(doc)?;
    validate_project(&model)?;
    Ok(LoadedProject { params, model })
}

pub fn load_yaml(path: &Path) -> ProjectResult<ProjectModel> {
    let content = std::fs::read_to_string(path)?;
    let project: ProjectModel = serde_yaml::from_str(&content)?;
    validate_project(&project)?;
    Ok(project)
}

pub fn save_yaml(path: &Path, project: &ProjectModel) -> ProjectResult<()> {
    validate_project(project)?;
    let content = serde_yaml::to_string(project)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<ProjectModel> {
    let content = std::fs::read_to_string(path)?;
    let project: ProjectModel = serde_json::from_str(&content)?;
    validate_project(&project)?;
    Ok(project)
}

pub fn save_json(path: &Path, project: &ProjectModel) -> ProjectResult<()> {
    validate_project(project)?;
    let content = serde_json::to_string_pretty(project)?;
    std::fs::write(path, content)?;
    Ok(())
}
