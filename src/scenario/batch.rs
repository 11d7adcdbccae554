//! Batch scenario runs: one tracked activity across many (database, year) pairs.
//!
//! Failures are skipped at the narrowest scope that keeps the batch moving:
//!
//! - unknown database, unresolved activity, failed baseline: skip the pair
//! - failed modification: skip the pair
//! - method missing from either side: skip that row
//! - tracked activity id not in the first database: skip the table
//!
//! Only a databases/years length mismatch aborts, before any store access.

use crate::domain::{ActivityTarget, ImpactMethod, ModifyMode, ScenarioRun, ScoreResult};
use crate::error::LcaError;
use crate::graph::GraphStore;
use crate::scenario::coefficients::{Anchors, CoefficientTable, Selection};
use crate::scenario::mutator::modify_activity;
use crate::scoring::{run_comprehensive, Scorer};

/// Run configuration for a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Scenario databases, paired positionally with `years`.
    pub databases: Vec<String>,
    pub years: Vec<i32>,
    pub methods: Vec<ImpactMethod>,
    pub mode: ModifyMode,
    /// Fill missing coefficient years between these anchors before running.
    pub interpolation: Option<Anchors>,
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), LcaError> {
        if self.databases.len() != self.years.len() {
            return Err(LcaError::Precondition(format!(
                "Databases and years must pair up: got {} databases and {} years.",
                self.databases.len(),
                self.years.len()
            )));
        }
        Ok(())
    }

    fn pairs(&self) -> impl Iterator<Item = (&str, i32)> {
        self.databases.iter().map(String::as_str).zip(self.years.iter().copied())
    }
}

/// `EI38_cutoff_{model}_{pathway}_{year}_{suffix}`
pub fn scenario_db_name(model: &str, pathway: &str, year: i32, suffix: &str) -> String {
    format!("EI38_cutoff_{model}_{pathway}_{year}_{suffix}")
}

/// Relative change in percent.
///
/// A zero baseline yields `+inf` when the modified score moved and `0` when it
/// did not. Negative baselines keep the plain formula, so the sign follows
/// `after - before` divided by a negative number.
pub fn percent_change(before: f64, after: f64) -> f64 {
    let difference = after - before;
    if before == 0.0 {
        if difference == 0.0 { 0.0 } else { f64::INFINITY }
    } else {
        difference / before * 100.0
    }
}

/// Modify and rescore `target` in every configured (database, year) pair.
///
/// Rows are tagged with `table.activity_id`.
pub fn modify_activity_across_databases<S, C>(
    store: &mut S,
    scorer: &C,
    target: &ActivityTarget,
    table: &CoefficientTable,
    config: &BatchConfig,
) -> Result<Vec<ScenarioRun>, LcaError>
where
    S: GraphStore + ?Sized,
    C: Scorer + ?Sized,
{
    config.validate()?;

    let interpolated;
    let table = match config.interpolation {
        Some(anchors) => {
            interpolated = table.interpolated(anchors, &config.years);
            &interpolated
        }
        None => table,
    };

    let mut runs = Vec::new();
    for (database, year) in config.pairs() {
        tracing::info!(database, year, activity = %target.label(), "processing scenario database");

        if !store.has_database(database) {
            tracing::warn!(database, "database not found; skipping");
            continue;
        }

        let Some(activity) = store
            .find_by_name_product_location(
                database,
                &target.name,
                target.reference_product.as_deref(),
                target.location.as_deref(),
            )
            .found()
        else {
            tracing::warn!(database, activity = %target.label(), "activity not found; skipping");
            continue;
        };

        let before = match run_comprehensive(&*store, scorer, &activity, &config.methods) {
            Ok(scores) => scores,
            Err(e) => {
                tracing::warn!(database, activity = %target.label(), error = %e, "baseline scoring failed; skipping");
                continue;
            }
        };

        let after = match table.selection_for(year, target) {
            Selection::Set(coefficients) => {
                match modify_activity(config.mode, store, scorer, &activity, &coefficients, &config.methods) {
                    Ok(scores) => scores,
                    Err(e) => {
                        tracing::warn!(database, activity = %target.label(), error = %e, "modification failed; skipping");
                        continue;
                    }
                }
            }
            Selection::NoApplicableRows => {
                tracing::info!(database, activity = %target.label(), "no exchanges flagged for modification");
                before.clone()
            }
            Selection::MissingColumn => {
                tracing::warn!(database, year, column = %format!("coeff_{year}"), "coefficient column not found");
                before.clone()
            }
            Selection::Empty => {
                tracing::info!(database, year, activity = %target.label(), "no valid coefficients for year");
                before.clone()
            }
        };

        runs.extend(compare(database, year, target, table, &config.methods, &before, &after));
    }

    Ok(runs)
}

fn compare(
    database: &str,
    year: i32,
    target: &ActivityTarget,
    table: &CoefficientTable,
    methods: &[ImpactMethod],
    before: &ScoreResult,
    after: &ScoreResult,
) -> Vec<ScenarioRun> {
    let mut rows = Vec::with_capacity(methods.len());
    for method in methods {
        let (Some(score_before), Some(score_after)) = (before.get(method), after.get(method)) else {
            tracing::warn!(database, %method, "results not available for method");
            continue;
        };
        rows.push(ScenarioRun {
            database: database.to_string(),
            year,
            activity: target.name.clone(),
            location: target.location.clone(),
            method: method.clone(),
            score_before,
            score_after,
            difference: score_after - score_before,
            percent_change: percent_change(score_before, score_after),
            activity_id: table.activity_id.clone(),
        });
    }
    rows
}

/// Run every coefficient table through the configured databases.
///
/// Each table's activity is resolved by id in the first database; tables
/// whose id is unknown there are skipped.
pub fn run_batch<S, C>(
    store: &mut S,
    scorer: &C,
    tables: &[CoefficientTable],
    config: &BatchConfig,
) -> Result<Vec<ScenarioRun>, LcaError>
where
    S: GraphStore + ?Sized,
    C: Scorer + ?Sized,
{
    config.validate()?;
    let Some(first) = config.databases.first() else {
        tracing::warn!("no scenario databases configured");
        return Ok(Vec::new());
    };

    let mut runs = Vec::new();
    for table in tables {
        tracing::info!(activity_id = %table.activity_id, "processing coefficient table");
        let Some(activity) = store.find_by_id(first, &table.activity_id).found() else {
            tracing::warn!(database = %first, activity_id = %table.activity_id, "tracked activity not found; skipping table");
            continue;
        };
        let target = ActivityTarget::from(&activity);
        runs.extend(modify_activity_across_databases(store, scorer, &target, table, config)?);
    }
    Ok(runs)
}
