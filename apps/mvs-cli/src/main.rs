use clap::{Parser, Subcommand};
use mvs_app::{
    AppResult, ReplayOptimizer, RunOptions, RunProgressEvent, RunRequest, RunTimingSummary,
    project_service, query, run_service,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::Level;

#[derive(Parser)]
#[command(name = "mvs-cli")]
#[command(about = "MVS CLI - multi-vector energy system evaluation", long_about = None)]
struct Cli {
    /// Log every asset computation
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every input parameter against its allowed range
    Validate {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Show the asset groups and sectors of a normalized project
    Summary {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Show the economic context and lifetime costs of every asset
    Economics {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Write the normalized project to a new file
    Normalize {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Output file; JSON for `.json`, YAML otherwise
        output: PathBuf,
    },
    /// Evaluate a project against a recorded solver output
    Evaluate {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Recorded solver output (JSON)
        #[arg(long)]
        solution: PathBuf,
        /// Skip cache and force re-evaluation
        #[arg(long)]
        no_cache: bool,
        /// Do not write the run to the store
        #[arg(long)]
        no_persist: bool,
        /// Evaluate asset groups concurrently
        #[arg(long)]
        parallel: bool,
        /// Run store directory (defaults to .mvs/runs next to the project)
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// List stored runs of a project
    Runs {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Show details of a stored run
    ShowRun {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Run ID to display
        run_id: String,
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Export the balance column of one asset on one bus
    ExportBus {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Run ID
        run_id: String,
        /// Bus label, e.g. "Electricity bus"
        bus: String,
        /// Asset label
        asset: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Summary { project_path } => cmd_summary(&project_path),
        Commands::Economics { project_path } => cmd_economics(&project_path),
        Commands::Normalize {
            project_path,
            output,
        } => cmd_normalize(&project_path, &output),
        Commands::Evaluate {
            project_path,
            solution,
            no_cache,
            no_persist,
            parallel,
            store,
        } => {
            let options = RunOptions {
                parallel,
                persist: !no_persist,
                use_cache: !no_cache,
                store_root: store,
                ..RunOptions::default()
            };
            cmd_evaluate(&project_path, &solution, options)
        }
        Commands::Runs {
            project_path,
            store,
        } => cmd_runs(&project_path, store),
        Commands::ShowRun {
            project_path,
            run_id,
            store,
        } => cmd_show_run(&project_path, &run_id, store),
        Commands::ExportBus {
            project_path,
            run_id,
            bus,
            asset,
            output,
            store,
        } => cmd_export_bus(&project_path, &run_id, &bus, &asset, output.as_deref(), store),
    }
}

fn store_root(project_path: &Path, store: Option<PathBuf>) -> AppResult<PathBuf> {
    match store {
        Some(root) => Ok(root),
        None => run_service::default_store_root(project_path),
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    let diagnostics = project_service::validate_parameters(&project)?;
    if diagnostics.is_empty() {
        println!("✓ Project is valid");
    } else {
        println!("{} warning(s):", diagnostics.len());
        for d in &diagnostics {
            println!("  {}", d);
        }
    }
    Ok(())
}

fn cmd_summary(project_path: &Path) -> AppResult<()> {
    let prepared = project_service::prepare_project(project_path)?;
    let summary = project_service::summarize(&prepared.model);

    println!(
        "Project '{}' (scenario '{}')",
        summary.project_name, summary.scenario_name
    );
    println!("  Conversion:  {}", summary.conversion);
    println!("  Production:  {}", summary.production);
    println!("  Consumption: {}", summary.consumption);
    println!("  Storage:     {}", summary.storage);
    println!("  Providers:   {}", summary.providers);
    println!("  Fix costs:   {}", summary.fix_cost);
    println!("  Sectors:     {}", summary.sectors.join(", "));
    if let Some(horizon) = &prepared.model.simulation_settings.horizon {
        println!(
            "  Horizon:     {} .. {} ({} periods)",
            horizon.start, horizon.end, horizon.periods
        );
    }
    Ok(())
}

fn cmd_economics(project_path: &Path) -> AppResult<()> {
    let prepared = project_service::prepare_project(project_path)?;
    let ctx = &prepared.context;

    println!("Economic context:");
    println!("  Discount rate:    {:.4}", ctx.discount_rate);
    println!("  Project duration: {} years", ctx.project_duration);
    println!("  CRF:              {:.6}", ctx.crf);
    println!("  Annuity factor:   {:.6}", ctx.annuity_factor);

    let model = &prepared.model;
    let storage_subs = model
        .energy_storage
        .values()
        .filter_map(|s| s.components.as_ref())
        .flat_map(|c| c.iter());
    let assets = model
        .energy_conversion
        .values()
        .chain(storage_subs)
        .chain(model.energy_production.values())
        .chain(model.energy_consumption.values())
        .chain(model.fix_cost.values());

    println!("\nLifetime specific costs:");
    for asset in assets {
        let show = |q: &Option<mvs_core::Quantity>| match q {
            Some(q) => q
                .as_scalar("figure")
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|_| "series".to_string()),
            None => "-".to_string(),
        };
        println!(
            "  {:<24} capex={:>12}  om={:>12}  dispatch={:>10}",
            asset.label,
            show(&asset.derived.lifetime_specific_cost),
            show(&asset.derived.lifetime_specific_cost_om),
            show(&asset.derived.lifetime_price_dispatch),
        );
    }
    Ok(())
}

fn cmd_normalize(project_path: &Path, output: &Path) -> AppResult<()> {
    let prepared = project_service::prepare_project(project_path)?;
    project_service::save_project(output, &prepared.model)?;
    println!("✓ Normalized project written to {}", output.display());
    Ok(())
}

fn cmd_evaluate(project_path: &Path, solution: &Path, options: RunOptions) -> AppResult<()> {
    println!("Evaluating project: {}", project_path.display());
    let optimizer = ReplayOptimizer::from_path(solution)?;
    let request = RunRequest {
        project_path,
        optimizer: &optimizer,
        options,
    };

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let response = run_service::ensure_run_with_progress(
        &request,
        Some(&mut |event: RunProgressEvent| {
            let emit_now =
                last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Evaluation completed: {}", response.run_id);
    }
    if !response.diagnostics.is_empty() {
        println!("  {} validation warning(s)", response.diagnostics.len());
    }

    print_timing_summary(&response.timing);

    let summary = query::get_run_summary(&response.record, &response.bus_balances);
    print_run_summary(&summary);

    println!("\nCost matrix:");
    for row in &response.record.report.cost_matrix.rows {
        let total = row.values.first().copied().flatten().unwrap_or(0.0);
        println!("  {:<24} {:>14.2}", row.label, total);
    }
    if !response.record.report.levelized_costs.is_empty() {
        println!("\nLevelized cost of generation:");
        for (label, lcoe) in &response.record.report.levelized_costs {
            println!("  {:<24} {:>10.4}", label, lcoe);
        }
    }

    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} {}  elapsed={:.2}s",
        spinner[spin_idx],
        event.stage.label(),
        event.elapsed_wall_s
    );
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {}", msg));
    }
    print!("{}", line);
    let _ = io::stdout().flush();
}

fn print_timing_summary(timing: &RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    let pct = |t: f64| 100.0 * t / total;

    println!("\nTiming summary:");
    println!(
        "  Prepare:  {:.3}s ({:.1}%)",
        timing.prepare_time_s,
        pct(timing.prepare_time_s)
    );
    println!(
        "  Solve:    {:.3}s ({:.1}%)",
        timing.solve_time_s,
        pct(timing.solve_time_s)
    );
    println!(
        "  Evaluate: {:.3}s ({:.1}%)",
        timing.evaluate_time_s,
        pct(timing.evaluate_time_s)
    );
    println!(
        "  Save:     {:.3}s ({:.1}%)",
        timing.save_time_s,
        pct(timing.save_time_s)
    );
    if timing.load_cache_time_s > 0.0 {
        println!("  Cache load: {:.3}s", timing.load_cache_time_s);
    }
    println!("  Total:    {:.3}s", timing.total_time_s);
}

fn print_run_summary(summary: &query::RunSummary) {
    println!("\nRun summary:");
    println!("  Objective:       {:.2}", summary.objective);
    println!("  Assets:          {}", summary.asset_count);
    println!("  Busses:          {}", summary.bus_count);
    println!("  Periods:         {}", summary.period_count);
    println!("  Total costs:     {:.2}", summary.costs_total);
    println!("  Total annuity:   {:.2}", summary.annuity_total);
    if summary.renewable_share.is_nan() {
        println!("  Renewable share: undefined");
    } else {
        println!("  Renewable share: {:.1}%", 100.0 * summary.renewable_share);
    }
}

fn cmd_runs(project_path: &Path, store: Option<PathBuf>) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let name = &project.model.project_data.project_name;
    let runs = run_service::list_runs(&store_root(project_path, store)?, name)?;

    if runs.is_empty() {
        println!("No stored runs found for project: {}", name);
    } else {
        println!("Stored runs for project '{}':", name);
        for manifest in runs {
            println!(
                "  {} ({}, scenario {})",
                manifest.run_id, manifest.timestamp, manifest.scenario_name
            );
        }
    }
    Ok(())
}

fn cmd_show_run(project_path: &Path, run_id: &str, store: Option<PathBuf>) -> AppResult<()> {
    println!("Loading run: {}", run_id);

    let (manifest, record, busses) = run_service::load_run(&store_root(project_path, store)?, run_id)?;
    println!("  Evaluated: {} (tool {})", manifest.timestamp, manifest.tool_version);

    let summary = query::get_run_summary(&record, &busses);
    print_run_summary(&summary);

    println!("\nBusses:");
    for label in query::list_bus_labels(&busses) {
        println!("  {}", label);
    }

    println!("\nSectors:");
    for (sector, kpis) in &record.report.sector_kpis {
        println!(
            "  {:<12} demand={:.1} kWh  renewable use={:.1} kWh",
            sector, kpis.total_demand, kpis.total_renewable_energy_use
        );
    }

    Ok(())
}

fn cmd_export_bus(
    project_path: &Path,
    run_id: &str,
    bus: &str,
    asset: &str,
    output: Option<&Path>,
    store: Option<PathBuf>,
) -> AppResult<()> {
    let (_manifest, record, busses) = run_service::load_run(&store_root(project_path, store)?, run_id)?;
    let series = query::extract_bus_series(&busses, bus, asset)?;

    let index = record
        .project
        .simulation_settings
        .horizon
        .as_ref()
        .map(|h| h.time_index())
        .unwrap_or_default();

    let mut csv = String::from("timestamp,value\n");
    for (i, val) in series.iter().enumerate() {
        let stamp = index.get(i).map(|t| t.to_string()).unwrap_or_else(|| i.to_string());
        csv.push_str(&format!("{},{}\n", stamp, val));
    }

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} data points to {}",
            series.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(())
}
