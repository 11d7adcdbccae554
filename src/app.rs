//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initializes logging
//! - loads the project graph and dispatches to the scoring/scenario layers
//! - prints reports and writes optional exports

use std::path::Path;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::{Cli, Command, ContribArgs, DemoArgs, ScenarioArgs, ScoreArgs, SynthesizeArgs};
use crate::domain::{FunctionalUnit, ModifyMode};
use crate::error::AppError;
use crate::graph::GraphStore;
use crate::scenario::{run_batch, scenario_db_name, Anchors, BatchConfig};
use crate::scoring::Scorer;

pub mod pipeline;

/// Entry point for the `lcs` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Contrib(args) => handle_contrib(args),
        Command::Score(args) => handle_score(args),
        Command::Scenario(args) => handle_scenario(args),
        Command::Synthesize(args) => handle_synthesize(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "lca_scenarios=debug" } else { "lca_scenarios=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // try_init: a subscriber may already be installed when embedded.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_contrib(args: ContribArgs) -> Result<(), AppError> {
    let ws = pipeline::load_workspace(&args.graph.graph)?;
    let methods = ws.usable_methods(args.methods.resolve())?;
    let targets = args.targets.resolve();

    let reports = crate::contribution::calculate_impacts_for_activities(
        &ws.store,
        &ws.scorer,
        &args.database,
        &targets,
        &methods,
    );
    if reports.is_empty() {
        return Err(AppError::new(3, "No contributions could be computed for the given targets."));
    }

    for report in &reports {
        println!("{}", crate::report::format_contributions(report, args.top));
    }

    if let Some(path) = &args.export {
        let rows = crate::report::contribution_rows(&args.graph.project, &args.database, &reports);
        crate::io::export::write_contributions_csv(path, &rows)?;
    }
    Ok(())
}

fn handle_score(args: ScoreArgs) -> Result<(), AppError> {
    let ws = pipeline::load_workspace(&args.graph.graph)?;
    let methods = ws.usable_methods(args.methods.resolve())?;
    let targets = args.targets.resolve();

    let results = crate::scoring::run_comparative(&ws.store, &ws.scorer, &args.database, &targets, &methods);
    if results.is_empty() {
        return Err(AppError::new(3, "None of the targets could be scored."));
    }
    let unit_of = |m: &crate::domain::ImpactMethod| ws.scorer.method_unit(m).map(str::to_string);
    println!("{}", crate::report::format_scores(&results, &methods, unit_of));

    if args.hotspots == 0 {
        return Ok(());
    }
    let name_of = |key: &crate::domain::NodeKey| {
        ws.store
            .get(key)
            .found()
            .map(|a| a.name)
            .unwrap_or_else(|| key.to_string())
    };
    for target in &targets {
        let Some(activity) = ws
            .store
            .find_by_name_product_location(
                &args.database,
                &target.name,
                target.reference_product.as_deref(),
                target.location.as_deref(),
            )
            .found()
        else {
            continue;
        };
        for method in &methods {
            let unit = FunctionalUnit::single(activity.key.clone(), 1.0);
            match ws.scorer.evaluate(&ws.store, &unit, method) {
                Ok(eval) => {
                    println!("{} | {method}", target.label());
                    println!("{}", crate::report::format_hotspots(&eval.top_contributors(args.hotspots), &name_of));
                }
                Err(e) => tracing::warn!(activity = %target.label(), %method, error = %e, "hotspot scoring failed"),
            }
        }
    }
    Ok(())
}

fn handle_scenario(args: ScenarioArgs) -> Result<(), AppError> {
    let mut ws = pipeline::load_workspace(&args.graph.graph)?;
    let methods = ws.usable_methods(args.methods.resolve())?;

    let databases = match (&args.model, &args.pathway, &args.suffix) {
        (Some(model), Some(pathway), Some(suffix)) => args
            .years
            .iter()
            .map(|&y| scenario_db_name(model, pathway, y, suffix))
            .collect(),
        _ => args.databases.clone(),
    };
    let config = BatchConfig {
        databases,
        years: args.years.clone(),
        methods,
        mode: args.mode,
        interpolation: args.interpolate,
    };
    config.validate()?;

    let tables = load_tables(&args.coefficients)?;
    let save_to = args.save_graph.as_deref().unwrap_or(&args.graph.graph);
    let runs = ws.run_scenarios(&tables, &config, save_to)?;
    if runs.is_empty() {
        return Err(AppError::new(3, "No scenario rows were produced."));
    }
    println!("{}", crate::report::format_scenario_runs(&runs));

    if let Some(path) = &args.export {
        crate::io::export::write_results_csv(path, &runs)?;
    }
    Ok(())
}

fn load_tables(dir: &Path) -> Result<Vec<crate::scenario::CoefficientTable>, AppError> {
    let ingested = crate::io::ingest::load_coefficient_dir(dir)?;
    let mut tables = Vec::with_capacity(ingested.len());
    for ingest in ingested {
        for e in &ingest.row_errors {
            tracing::warn!(
                activity_id = %ingest.table.activity_id,
                line = e.line,
                row = e.id.as_deref().unwrap_or("-"),
                "{}",
                e.message
            );
        }
        tables.push(ingest.table);
    }
    Ok(tables)
}

fn handle_synthesize(args: SynthesizeArgs) -> Result<(), AppError> {
    if args.early >= args.late {
        return Err(AppError::new(2, "--early must be before --late."));
    }
    let baseline = crate::io::ingest::load_scenario_runs(&args.baseline)?;
    let scenario = crate::io::ingest::load_scenario_runs(&args.scenario)?;
    let targets = args.targets.resolve();

    let changes = crate::synthesis::compute_changes(&baseline, &scenario, &targets, args.early, args.late);
    if changes.is_empty() {
        return Err(AppError::new(3, "No matching activities in the results files."));
    }
    println!("{}", crate::report::format_changes(&changes, args.early, args.late));

    if let Some(path) = &args.export {
        crate::io::export::write_changes_csv(path, &changes)?;
    }
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = crate::data::DemoConfig {
        seed: args.seed,
        processes: args.processes,
        years: args.years.clone(),
        ..crate::data::DemoConfig::default()
    };
    let demo = crate::data::generate_demo(&config)?;

    let coeff_dir = args.out.join("coefficients");
    std::fs::create_dir_all(&coeff_dir)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", coeff_dir.display())))?;
    let graph_path = args.out.join("graph.json");
    crate::io::graph::write_graph_json(&graph_path, &demo.graph)?;
    crate::io::export::write_coefficient_csv(
        &coeff_dir.join(format!("{}.csv", demo.coefficients.activity_id)),
        &demo.coefficients,
    )?;
    tracing::info!(out = %args.out.display(), "demo project written");

    let mut ws = pipeline::Workspace::from_graph(&demo.graph)?;
    let methods = ws.usable_methods(Vec::new())?;
    let first = demo.years[0];
    let last = demo.years[demo.years.len() - 1];
    let config = BatchConfig {
        databases: demo.databases.clone(),
        years: demo.years.clone(),
        methods,
        mode: ModifyMode::Temporary,
        interpolation: Some(Anchors::new(first, last)?),
    };

    let tables = load_tables(&coeff_dir)?;
    let runs = run_batch(&mut ws.store, &ws.scorer, &tables, &config)?;
    println!("{}", crate::report::format_scenario_runs(&runs));
    crate::io::export::write_results_csv(&args.out.join("results.csv"), &runs)?;

    let changes = crate::synthesis::compute_changes(&runs, &runs, &[demo.tracked.clone()], first, last);
    println!("{}", crate::report::format_changes(&changes, first, last));
    Ok(())
}
