//! Command-line parsing for the LCA scenario tool.
//!
//! Argument parsing stays separate from the scoring and scenario code; `app`
//! turns these structs into run configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{ActivityTarget, ImpactMethod, ModifyMode};
use crate::scenario::Anchors;
use crate::scoring::MethodPreset;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "lcs", version, about = "Scenario-based life cycle impact analysis")]
pub struct Cli {
    /// Raise log verbosity to debug (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Break activity scores down by direct exchange.
    Contrib(ContribArgs),
    /// Score activities under several methods and list inventory hotspots.
    Score(ScoreArgs),
    /// Apply coefficient tables across scenario databases and compare scores.
    Scenario(ScenarioArgs),
    /// Compare a baseline and a scenario results CSV between two years.
    Synthesize(SynthesizeArgs),
    /// Generate a synthetic scenario project and run it end to end.
    Demo(DemoArgs),
}

/// Where the project graph lives.
#[derive(Debug, Args, Clone)]
pub struct GraphArgs {
    /// Graph JSON file (databases + methods).
    #[arg(long, env = "LCS_GRAPH", value_name = "JSON")]
    pub graph: PathBuf,

    /// Project label written into exports.
    #[arg(long, env = "LCS_PROJECT", default_value = "default")]
    pub project: String,
}

/// Impact method selection: a preset, explicit methods, or both.
#[derive(Debug, Args, Clone)]
pub struct MethodArgs {
    /// Built-in method list.
    #[arg(long, value_enum)]
    pub preset: Option<MethodPreset>,

    /// Impact method as `family|category|indicator` (repeatable).
    #[arg(long = "method", value_name = "A|B|C")]
    pub methods: Vec<ImpactMethod>,
}

impl MethodArgs {
    pub fn resolve(&self) -> Vec<ImpactMethod> {
        let mut out: Vec<ImpactMethod> = self.preset.map(MethodPreset::methods).unwrap_or_default();
        for m in &self.methods {
            if !out.contains(m) {
                out.push(m.clone());
            }
        }
        out
    }
}

/// Activities to analyse.
#[derive(Debug, Args, Clone)]
pub struct TargetArgs {
    /// Activity as `name@LOCATION` (or just `name`); repeatable.
    #[arg(long = "target", value_name = "NAME@LOC", value_parser = parse_target, required = true)]
    pub targets: Vec<ActivityTarget>,

    /// Reference product applied to every target.
    #[arg(long)]
    pub product: Option<String>,
}

impl TargetArgs {
    pub fn resolve(&self) -> Vec<ActivityTarget> {
        self.targets
            .iter()
            .cloned()
            .map(|mut t| {
                if t.reference_product.is_none() {
                    t.reference_product = self.product.clone();
                }
                t
            })
            .collect()
    }
}

#[derive(Debug, Parser, Clone)]
pub struct ContribArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Database to search for the targets.
    #[arg(long)]
    pub database: String,

    #[command(flatten)]
    pub targets: TargetArgs,

    #[command(flatten)]
    pub methods: MethodArgs,

    /// Exchanges shown per activity and method.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Export the contribution table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    #[arg(long)]
    pub database: String,

    #[command(flatten)]
    pub targets: TargetArgs,

    #[command(flatten)]
    pub methods: MethodArgs,

    /// Show the N largest flow x process cells per target and method.
    #[arg(long, default_value_t = 0)]
    pub hotspots: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct ScenarioArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Directory of `<activity_id>.csv` coefficient tables.
    #[arg(long, value_name = "DIR")]
    pub coefficients: PathBuf,

    /// Scenario database (repeatable, paired with --year in order).
    #[arg(long = "database")]
    pub databases: Vec<String>,

    /// Scenario year (repeatable).
    #[arg(long = "year", required = true)]
    pub years: Vec<i32>,

    /// Derive database names from model/pathway/suffix instead of --database.
    #[arg(long, requires_all = ["pathway", "suffix"], conflicts_with = "databases")]
    pub model: Option<String>,

    #[arg(long)]
    pub pathway: Option<String>,

    #[arg(long)]
    pub suffix: Option<String>,

    #[command(flatten)]
    pub methods: MethodArgs,

    /// `permanent` keeps the scaled amounts; `temporary` restores them after scoring.
    #[arg(long, value_enum, default_value_t = ModifyMode::Temporary)]
    pub mode: ModifyMode,

    /// Fill missing coefficient years between LOW and HIGH.
    #[arg(long, value_name = "LOW:HIGH")]
    pub interpolate: Option<Anchors>,

    /// Export before/after rows to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Write the graph back after a permanent run (defaults to --graph).
    #[arg(long, value_name = "JSON")]
    pub save_graph: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SynthesizeArgs {
    /// Results CSV of the unmodified scenario run.
    #[arg(long, value_name = "CSV")]
    pub baseline: PathBuf,

    /// Results CSV of the modified scenario run.
    #[arg(long, value_name = "CSV")]
    pub scenario: PathBuf,

    #[command(flatten)]
    pub targets: TargetArgs,

    #[arg(long, default_value_t = 2025)]
    pub early: i32,

    #[arg(long, default_value_t = 2040)]
    pub late: i32,

    /// Export the synthesis table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct DemoArgs {
    /// Output directory for graph.json, coefficients/ and results.csv.
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Supplier processes per scenario database.
    #[arg(long, default_value_t = 12)]
    pub processes: usize,

    /// Scenario years (repeatable); first and last are the interpolation anchors.
    #[arg(long = "year", default_values_t = [2025, 2030, 2035, 2040])]
    pub years: Vec<i32>,
}

/// Parse `name@LOCATION`; the split is at the last `@` so names may contain one.
pub fn parse_target(s: &str) -> Result<ActivityTarget, String> {
    let (name, location) = match s.rsplit_once('@') {
        Some((name, loc)) if !loc.trim().is_empty() => (name.trim(), Some(loc.trim().to_string())),
        _ => (s.trim(), None),
    };
    if name.is_empty() {
        return Err(format!("Invalid target '{s}': activity name is empty."));
    }
    Ok(ActivityTarget::new(name, None, location))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parsing_splits_at_last_at_sign() {
        let t = parse_target("steel production@GLO").unwrap();
        assert_eq!(t.name, "steel production");
        assert_eq!(t.location.as_deref(), Some("GLO"));

        let t = parse_target("market for a@b@RER").unwrap();
        assert_eq!(t.name, "market for a@b");
        assert_eq!(t.location.as_deref(), Some("RER"));

        assert_eq!(parse_target("cement").unwrap().location, None);
        assert!(parse_target("@GLO").is_err());
    }

    #[test]
    fn scenario_args_parse() {
        let cli = Cli::try_parse_from([
            "lcs",
            "scenario",
            "--graph",
            "g.json",
            "--coefficients",
            "coeffs",
            "--model",
            "remind",
            "--pathway",
            "SSP2-Base",
            "--suffix",
            "v1",
            "--year",
            "2025",
            "--year",
            "2040",
            "--preset",
            "recipe-midpoint-h",
            "--method",
            "IPCC 2013|climate change|GWP 100a",
            "--interpolate",
            "2025:2040",
        ])
        .unwrap();

        let Command::Scenario(args) = cli.command else {
            panic!("expected scenario command");
        };
        assert_eq!(args.years, vec![2025, 2040]);
        assert_eq!(args.interpolate, Some(Anchors::new(2025, 2040).unwrap()));
        assert_eq!(args.methods.resolve().len(), 19);
        assert_eq!(args.mode, ModifyMode::Temporary);
    }

    #[test]
    fn scenario_mode_accepts_permanent() {
        let cli = Cli::try_parse_from([
            "lcs",
            "scenario",
            "--graph",
            "g.json",
            "--coefficients",
            "coeffs",
            "--database",
            "db2025",
            "--year",
            "2025",
            "--mode",
            "permanent",
        ])
        .unwrap();

        let Command::Scenario(args) = cli.command else {
            panic!("expected scenario command");
        };
        assert_eq!(args.mode, ModifyMode::Permanent);
        let bad = Cli::try_parse_from([
            "lcs",
            "scenario",
            "--graph",
            "g.json",
            "--coefficients",
            "coeffs",
            "--year",
            "2025",
            "--mode",
            "sometimes",
        ]);
        assert!(bad.is_err());
    }

    #[test]
    fn method_resolution_deduplicates() {
        let args = MethodArgs {
            preset: Some(MethodPreset::RecipeEndpointHa),
            methods: vec![MethodPreset::RecipeEndpointHa.methods()[0].clone()],
        };
        assert_eq!(args.resolve().len(), 3);
    }
}
