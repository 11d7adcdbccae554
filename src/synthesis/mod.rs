//! Early-vs-late comparison of a baseline batch and a scenario batch.
//!
//! The baseline side reads `score_before` (the unmodified databases), the
//! scenario side reads `score_after`. Missing data nulls only the affected
//! side of a row.

use crate::domain::{ActivityTarget, ImpactMethod, ScenarioRun};
use crate::scenario::percent_change;

/// Change of one side between the early and the late year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideChange {
    pub early: Option<f64>,
    pub late: Option<f64>,
    pub change: Option<f64>,
    pub percent_change: Option<f64>,
}

impl SideChange {
    fn new(early: Option<f64>, late: Option<f64>) -> Self {
        let (change, percent_change) = match (early, late) {
            (Some(e), Some(l)) => (Some(l - e), Some(percent_change(e, l))),
            _ => (None, None),
        };
        Self {
            early,
            late,
            change,
            percent_change,
        }
    }
}

/// One (activity, method) row of the synthesis table.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactChange {
    pub activity: String,
    pub location: Option<String>,
    pub method: ImpactMethod,
    pub baseline: SideChange,
    pub scenario: SideChange,
    /// Scenario late score minus baseline late score.
    pub scenario_to_baseline_change: Option<f64>,
    /// Scenario percent change minus baseline percent change (percentage points).
    pub scenario_to_baseline_percent: Option<f64>,
}

/// Compare baseline and scenario runs between `early_year` and `late_year`
/// for each activity, over every method seen for it on either side.
///
/// A target matches runs with its name and, when given, its location. The
/// first matching `activity_id` then pins the activity, so same-named
/// activities tracked by different tables never share a row.
pub fn compute_changes(
    baseline: &[ScenarioRun],
    scenario: &[ScenarioRun],
    activities: &[ActivityTarget],
    early_year: i32,
    late_year: i32,
) -> Vec<ImpactChange> {
    let mut out = Vec::new();
    for target in activities {
        let Some(activity_id) = baseline
            .iter()
            .chain(scenario)
            .find(|r| matches_target(r, target))
            .map(|r| r.activity_id.as_str())
        else {
            tracing::warn!(activity = %target.label(), "no runs found for activity");
            continue;
        };
        let belongs = |r: &ScenarioRun| r.activity_id == activity_id && matches_target(r, target);

        for method in methods_for(baseline.iter().chain(scenario).filter(|r| belongs(*r))) {
            let base = SideChange::new(
                lookup(baseline, &belongs, &method, early_year, |r| r.score_before),
                lookup(baseline, &belongs, &method, late_year, |r| r.score_before),
            );
            let scen = SideChange::new(
                lookup(scenario, &belongs, &method, early_year, |r| r.score_after),
                lookup(scenario, &belongs, &method, late_year, |r| r.score_after),
            );

            let scenario_to_baseline_change = match (scen.late, base.late) {
                (Some(s), Some(b)) => Some(s - b),
                _ => None,
            };
            // two infinite sentinels have no meaningful difference
            let scenario_to_baseline_percent = match (scen.percent_change, base.percent_change) {
                (Some(s), Some(b)) => Some(s - b).filter(|d| d.is_finite()),
                _ => None,
            };

            out.push(ImpactChange {
                activity: target.name.clone(),
                location: target.location.clone(),
                method,
                baseline: base,
                scenario: scen,
                scenario_to_baseline_change,
                scenario_to_baseline_percent,
            });
        }
    }
    out
}

fn matches_target(run: &ScenarioRun, target: &ActivityTarget) -> bool {
    run.activity == target.name
        && target
            .location
            .as_deref()
            .is_none_or(|loc| run.location.as_deref() == Some(loc))
}

fn methods_for<'a>(runs: impl Iterator<Item = &'a ScenarioRun>) -> Vec<ImpactMethod> {
    let mut methods: Vec<ImpactMethod> = Vec::new();
    for run in runs {
        if !methods.contains(&run.method) {
            methods.push(run.method.clone());
        }
    }
    methods
}

fn lookup(
    runs: &[ScenarioRun],
    belongs: impl Fn(&ScenarioRun) -> bool,
    method: &ImpactMethod,
    year: i32,
    score: impl Fn(&ScenarioRun) -> f64,
) -> Option<f64> {
    runs.iter()
        .find(|r| r.year == year && &r.method == method && belongs(r))
        .map(score)
}
