//! Run execution and caching service.
//!
//! One evaluation: prepare the project, assemble the graph, dispatch it,
//! map the solution back onto the assets, compute their costs, aggregate
//! KPIs and optionally persist everything.

use std::path::{Path, PathBuf};
use std::time::Instant;

use mvs_core::Quantity;
use mvs_economics::{EconomicContext, lifetime_costs};
use mvs_graph::{Optimizer, SolveOutput, SolveOutputRecord, assemble_graph};
use mvs_project::{Asset, AssetGroup, Diagnostic, ProjectModel};
use mvs_results::{
    BusBalance, EvaluationRecord, RunManifest, RunStore, WeightTable, build_report,
    bus_timeseries, compute_run_id, levelized_cost, map_results, map_storage,
    rescale_by_profile_peak,
};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::progress::{RunProgressEvent, RunStage};
use crate::project_service::{self, PreparedProject};

/// Options for evaluating a project.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Evaluate conversion, production and consumption concurrently.
    pub parallel: bool,
    pub persist: bool,
    pub use_cache: bool,
    /// Defaults to `.mvs/runs` next to the project file.
    pub store_root: Option<PathBuf>,
    pub tool_version: String,
    pub weights: WeightTable,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            persist: true,
            use_cache: true,
            store_root: None,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            weights: WeightTable::default(),
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub project_path: &'a Path,
    pub optimizer: &'a dyn Optimizer,
    pub options: RunOptions,
}

/// Wall time per phase.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub prepare_time_s: f64,
    pub solve_time_s: f64,
    pub evaluate_time_s: f64,
    pub save_time_s: f64,
    pub load_cache_time_s: f64,
    pub total_time_s: f64,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub record: EvaluationRecord,
    pub bus_balances: Vec<BusBalance>,
    pub diagnostics: Vec<Diagnostic>,
    pub loaded_from_cache: bool,
    pub timing: RunTimingSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            message,
        ));
    }
}

/// Execute or load a run based on request.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream stage events.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();
    let options = &request.options;

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingProject,
        started,
        Some(format!("Loading {}", request.project_path.display())),
    );
    let project = project_service::load_project(request.project_path)?;

    emit_progress(&mut progress_cb, RunStage::ValidatingParameters, started, None);
    let diagnostics = project_service::validate_parameters(&project)?;

    emit_progress(&mut progress_cb, RunStage::DerivingCosts, started, None);
    let PreparedProject {
        mut model,
        context,
        diagnostics,
    } = project_service::prepare(project, diagnostics)?;
    timing.prepare_time_s = started.elapsed().as_secs_f64();

    emit_progress(&mut progress_cb, RunStage::AssemblingGraph, started, None);
    let graph = assemble_graph(&model)?;

    emit_progress(&mut progress_cb, RunStage::Solving, started, None);
    let solve_start = Instant::now();
    let solution = request.optimizer.solve(&graph)?;
    timing.solve_time_s = solve_start.elapsed().as_secs_f64();
    let missing = solution.missing_flows(&graph);
    if let Some(edge) = missing.first() {
        return Err(AppError::Solver(format!(
            "optimizer returned no flow for {edge} ({} edges missing)",
            missing.len()
        )));
    }

    let run_id = compute_run_id(
        &model,
        &SolveOutputRecord::from(&solution),
        &options.tool_version,
    );

    let store = if options.persist {
        Some(match &options.store_root {
            Some(root) => RunStore::new(root.clone())?,
            None => RunStore::for_project(request.project_path)?,
        })
    } else {
        None
    };

    if let Some(store) = &store
        && options.use_cache
    {
        emit_progress(&mut progress_cb, RunStage::CheckingCache, started, None);
        if store.has_run(&run_id) {
            emit_progress(&mut progress_cb, RunStage::LoadingCachedResult, started, None);
            let load_start = Instant::now();
            let manifest = store.load_manifest(&run_id)?;
            let record = store.load_results(&run_id)?;
            let bus_balances = store.load_bus_timeseries(&run_id)?;
            timing.load_cache_time_s = load_start.elapsed().as_secs_f64();
            timing.total_time_s = started.elapsed().as_secs_f64();
            emit_progress(&mut progress_cb, RunStage::Completed, started, None);
            info!(%run_id, "Loaded cached run");
            return Ok(RunResponse {
                run_id,
                manifest,
                record,
                bus_balances,
                diagnostics,
                loaded_from_cache: true,
                timing,
            });
        }
    }

    emit_progress(&mut progress_cb, RunStage::MappingResults, started, None);
    let evaluate_start = Instant::now();
    evaluate_assets(&mut model, &context, &solution, options.parallel)?;
    let bus_balances = bus_timeseries(&graph, &solution)?;

    emit_progress(&mut progress_cb, RunStage::AggregatingKpis, started, None);
    let report = build_report(&model, &options.weights)?;
    timing.evaluate_time_s = evaluate_start.elapsed().as_secs_f64();

    let manifest = RunManifest {
        run_id: run_id.clone(),
        project_name: model.project_data.project_name.clone(),
        scenario_name: model.project_data.scenario_name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        tool_version: options.tool_version.clone(),
        objective: Some(solution.meta.objective),
    };
    let record = EvaluationRecord {
        meta: solution.meta.clone(),
        report,
        project: model,
    };

    if let Some(store) = &store {
        emit_progress(&mut progress_cb, RunStage::SavingResults, started, None);
        let save_start = Instant::now();
        store.save_run(&manifest, &record, &bus_balances)?;
        timing.save_time_s = save_start.elapsed().as_secs_f64();
    }

    timing.total_time_s = started.elapsed().as_secs_f64();
    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some(format!("Run {run_id} evaluated")),
    );
    info!(%run_id, total_s = timing.total_time_s, "Run completed");

    Ok(RunResponse {
        run_id,
        manifest,
        record,
        bus_balances,
        diagnostics,
        loaded_from_cache: false,
        timing,
    })
}

/// Flows first, costs second, per asset.
fn evaluate_asset(
    asset: &mut Asset,
    group: AssetGroup,
    solution: &SolveOutput,
    ctx: &EconomicContext,
    days: f64,
) -> AppResult<()> {
    map_results(asset, solution, days)?;
    if group == AssetGroup::Production {
        rescale_by_profile_peak(asset)?;
    }
    lifetime_costs(asset, ctx)?;
    if group == AssetGroup::Production {
        asset.derived.levelized_cost = levelized_cost(asset)?
            .map(|v| Quantity::scalar(v, format!("{}/kWh", ctx.money_unit())));
    }
    debug!(asset = %asset.label, %group, "Evaluated asset");
    Ok(())
}

fn evaluate_group<'a>(
    group: AssetGroup,
    assets: impl Iterator<Item = &'a mut Asset>,
    solution: &SolveOutput,
    ctx: &EconomicContext,
    days: f64,
) -> AppResult<()> {
    for asset in assets {
        evaluate_asset(asset, group, solution, ctx, days)?;
    }
    Ok(())
}

/// Map and cost every asset of the model. Storage is always sequential;
/// the other dispatch groups run concurrently when `parallel` is set.
/// Row order of the later report does not depend on it.
pub fn evaluate_assets(
    model: &mut ProjectModel,
    ctx: &EconomicContext,
    solution: &SolveOutput,
    parallel: bool,
) -> AppResult<()> {
    let days = model.evaluated_days().map_err(mvs_results::ResultsError::from)?;

    for storage in model.energy_storage.values_mut() {
        map_storage(storage, solution, days)?;
        for sub in storage.components.iter_mut().flat_map(|c| c.iter_mut()) {
            lifetime_costs(sub, ctx)?;
        }
    }

    let mut groups = vec![
        (AssetGroup::Conversion, &mut model.energy_conversion),
        (AssetGroup::Production, &mut model.energy_production),
        (AssetGroup::Consumption, &mut model.energy_consumption),
    ];
    if parallel {
        groups
            .par_iter_mut()
            .map(|(group, assets)| evaluate_group(*group, assets.values_mut(), solution, ctx, days))
            .collect::<AppResult<Vec<()>>>()?;
    } else {
        for (group, assets) in groups {
            evaluate_group(group, assets.values_mut(), solution, ctx, days)?;
        }
    }

    for item in model.fix_cost.values_mut() {
        lifetime_costs(item, ctx)?;
    }
    info!(parallel, "Assets evaluated");
    Ok(())
}

/// Runs of one project, most recent first.
pub fn list_runs(store_root: &Path, project_name: &str) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::new(store_root.to_path_buf())?;
    let mut runs = store.list_runs(project_name)?;
    runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(runs)
}

/// Load a specific run.
pub fn load_run(
    store_root: &Path,
    run_id: &str,
) -> AppResult<(RunManifest, EvaluationRecord, Vec<BusBalance>)> {
    let store = RunStore::new(store_root.to_path_buf())?;
    let manifest = store.load_manifest(run_id)?;
    let record = store.load_results(run_id)?;
    let busses = store.load_bus_timeseries(run_id)?;
    Ok((manifest, record, busses))
}

/// Store directory used for a project file unless overridden.
pub fn default_store_root(project_path: &Path) -> AppResult<PathBuf> {
    Ok(RunStore::for_project(project_path)?.root().to_path_buf())
}
