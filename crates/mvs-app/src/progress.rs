//! Stage events emitted while a run is evaluated.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingProject,
    ValidatingParameters,
    DerivingCosts,
    CheckingCache,
    LoadingCachedResult,
    AssemblingGraph,
    Solving,
    MappingResults,
    AggregatingKpis,
    SavingResults,
    Completed,
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
        }
    }
}

impl RunStage {
    pub fn label(self) -> &'static str {
        match self {
            RunStage::LoadingProject => "loading project",
            RunStage::ValidatingParameters => "validating parameters",
            RunStage::DerivingCosts => "deriving costs",
            RunStage::CheckingCache => "checking cache",
            RunStage::LoadingCachedResult => "loading cached result",
            RunStage::AssemblingGraph => "assembling graph",
            RunStage::Solving => "solving",
            RunStage::MappingResults => "mapping results",
            RunStage::AggregatingKpis => "aggregating KPIs",
            RunStage::SavingResults => "saving results",
            RunStage::Completed => "completed",
        }
    }
}
