//! Exchange contribution analysis.
//!
//! Attributes the score of `{activity: 1}` to the activity's direct exchanges:
//!
//! - **biosphere** exchanges are read off the reference evaluation (no extra solve)
//! - **technosphere** exchanges get their own evaluation of
//!   `{exchange.input: exchange.amount}`; that total is the contribution
//!
//! Technosphere inputs are scored as independent sub-systems. When siblings
//! share upstream suppliers each still carries its full upstream burden, so
//! the records partition the total only when the graph below the activity is
//! loop-free and the activity produces one unit per run.

use crate::domain::{
    Activity, ActivityTarget, ContributionRecord, ContributionReport, Exchange, ExchangeKind, FunctionalUnit,
    ImpactMethod, ProductionSummary,
};
use crate::error::LcaError;
use crate::graph::GraphStore;
use crate::scoring::{Evaluation, Scorer};

/// Contribution of every direct exchange of `activity` under `method`.
///
/// Fails only if the reference evaluation or the exchange listing fails; a
/// failing exchange is logged and left out of the records.
pub fn calculate_exchange_impacts<S, C>(
    store: &S,
    scorer: &C,
    activity: &Activity,
    method: &ImpactMethod,
) -> Result<ContributionReport, LcaError>
where
    S: GraphStore + ?Sized,
    C: Scorer + ?Sized,
{
    let reference = scorer.evaluate(store, &FunctionalUnit::single(activity.key.clone(), 1.0), method)?;
    let total_score = reference.score();
    let exchanges = store.exchanges_of(&activity.key)?;

    let production = exchanges
        .iter()
        .find(|e| e.kind == ExchangeKind::Production)
        .map(|e| ProductionSummary {
            amount: e.amount,
            unit: e.unit.clone(),
            location: e.location.clone(),
        });

    let mut records = Vec::with_capacity(exchanges.len());
    for exchange in &exchanges {
        let impact = match exchange.kind {
            ExchangeKind::Production => continue,
            ExchangeKind::Biosphere => biosphere_impact(&reference, exchange),
            ExchangeKind::Technosphere => technosphere_impact(store, scorer, exchange, method),
        };

        match impact {
            Ok(impact) => {
                tracing::debug!(exchange = %exchange.name, kind = exchange.kind.label(), impact, "exchange scored");
                records.push(ContributionRecord {
                    exchange_id: exchange.input.clone(),
                    exchange_name: exchange.name.clone(),
                    exchange_unit: exchange.unit.clone(),
                    exchange_location: exchange.location.clone(),
                    kind: exchange.kind,
                    compartment: match exchange.kind {
                        ExchangeKind::Biosphere => exchange.categories.clone(),
                        _ => Vec::new(),
                    },
                    impact,
                    percentage: 0.0,
                });
            }
            Err(e) => tracing::warn!(
                activity = %activity.name,
                exchange = %exchange.name,
                error = %e,
                "failed to score exchange; excluded from contributions"
            ),
        }
    }

    for record in &mut records {
        record.percentage = percentage_of(record.impact, total_score);
    }

    // Stable sort: equal impacts keep exchange order.
    records.sort_by(|a, b| b.impact.partial_cmp(&a.impact).unwrap_or(std::cmp::Ordering::Equal));

    Ok(ContributionReport {
        activity: activity.clone(),
        method: method.clone(),
        total_score,
        records,
        production,
    })
}

/// `impact / total * 100` for positive totals, otherwise 0.
pub fn percentage_of(impact: f64, total: f64) -> f64 {
    if total > 0.0 { impact / total * 100.0 } else { 0.0 }
}

fn biosphere_impact(reference: &Evaluation, exchange: &Exchange) -> Result<f64, LcaError> {
    reference.exchange_score(exchange).ok_or_else(|| {
        LcaError::Oracle(format!(
            "Flow {} is missing from the characterized inventory.",
            exchange.input
        ))
    })
}

fn technosphere_impact<S, C>(store: &S, scorer: &C, exchange: &Exchange, method: &ImpactMethod) -> Result<f64, LcaError>
where
    S: GraphStore + ?Sized,
    C: Scorer + ?Sized,
{
    let unit = FunctionalUnit::single(exchange.input.clone(), exchange.amount);
    Ok(scorer.evaluate(store, &unit, method)?.score())
}

/// Contribution reports for several activities of one database under every
/// method. Unresolved activities and failing (activity, method) pairs are
/// logged and skipped.
pub fn calculate_impacts_for_activities<S, C>(
    store: &S,
    scorer: &C,
    database: &str,
    targets: &[ActivityTarget],
    methods: &[ImpactMethod],
) -> Vec<ContributionReport>
where
    S: GraphStore + ?Sized,
    C: Scorer + ?Sized,
{
    let mut reports = Vec::new();
    for target in targets {
        let lookup = store.find_by_name_product_location(
            database,
            &target.name,
            target.reference_product.as_deref(),
            target.location.as_deref(),
        );
        let Some(activity) = lookup.found() else {
            tracing::warn!(database, activity = %target.label(), "activity not found; skipping");
            continue;
        };

        for method in methods {
            tracing::info!(activity = %target.label(), %method, "calculating exchange contributions");
            match calculate_exchange_impacts(store, scorer, &activity, method) {
                Ok(report) => reports.push(report),
                Err(e) => tracing::warn!(
                    activity = %target.label(),
                    %method,
                    error = %e,
                    "contribution analysis failed; skipping"
                ),
            }
        }
    }
    reports
}
