//! Reporting utilities: flat contribution tables and formatted terminal output.

use serde::Serialize;

use crate::domain::{ContributionReport, ExchangeKind};

pub mod format;

pub use format::*;

/// One row of the contribution table: a direct exchange of an activity under
/// one method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionRow {
    pub project: String,
    pub database: String,
    pub activity_id: String,
    pub activity_name: String,
    pub activity_unit: String,
    pub activity_location: Option<String>,
    pub method: String,
    pub category: String,
    pub indicator: String,
    pub exchange_id: String,
    pub exchange_name: String,
    pub exchange_unit: String,
    pub exchange_location: Option<String>,
    pub impact: f64,
    pub percentage: f64,
    /// Sum of the record impacts of the report, not the reference score.
    pub total_impact: f64,
    pub exchange_type: &'static str,
    pub compartment: Option<String>,
    pub sub_compartment: Option<String>,
    pub production_amount: Option<f64>,
    pub production_unit: Option<String>,
    pub production_location: Option<String>,
    pub activity_categories: String,
}

/// Flatten contribution reports into table rows.
pub fn contribution_rows(project: &str, database: &str, reports: &[ContributionReport]) -> Vec<ContributionRow> {
    let mut rows = Vec::new();
    for report in reports {
        let total_impact: f64 = report.records.iter().map(|r| r.impact).sum();
        let parts = report.method.parts();
        let part = |i: usize| parts.get(i).cloned().unwrap_or_default();
        let activity = &report.activity;

        for record in &report.records {
            let (compartment, sub_compartment) = match record.kind {
                ExchangeKind::Biosphere => split_compartment(&record.compartment),
                _ => (None, None),
            };
            rows.push(ContributionRow {
                project: project.to_string(),
                database: database.to_string(),
                activity_id: activity.key.code.clone(),
                activity_name: activity.name.clone(),
                activity_unit: activity.unit.clone(),
                activity_location: activity.location.clone(),
                method: part(0),
                category: part(1),
                indicator: part(2),
                exchange_id: record.exchange_id.code.clone(),
                exchange_name: record.exchange_name.clone(),
                exchange_unit: record.exchange_unit.clone(),
                exchange_location: record.exchange_location.clone(),
                impact: record.impact,
                percentage: record.percentage,
                total_impact,
                exchange_type: record.kind.label(),
                compartment,
                sub_compartment,
                production_amount: report.production.as_ref().map(|p| p.amount),
                production_unit: report.production.as_ref().map(|p| p.unit.clone()),
                production_location: report.production.as_ref().and_then(|p| p.location.clone()),
                activity_categories: activity.categories.join(" | "),
            });
        }
    }
    rows
}

fn split_compartment(categories: &[String]) -> (Option<String>, Option<String>) {
    match categories.split_first() {
        None => (None, None),
        Some((first, [])) => (Some(first.clone()), None),
        Some((first, rest)) => (Some(first.clone()), Some(rest.join(" | "))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contribution::calculate_exchange_impacts;
    use crate::graph::fixtures::{gwp, steel_scorer, steel_store, STEEL_GWP};
    use crate::graph::GraphStore;

    #[test]
    fn contribution_rows_flatten_reports() {
        let store = steel_store();
        let scorer = steel_scorer();
        let steel = store.find_by_id("ei", "steel").found().unwrap();
        let report = calculate_exchange_impacts(&store, &scorer, &steel, &gwp()).unwrap();

        let rows = contribution_rows("demo", "ei", &[report]);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| (r.total_impact - STEEL_GWP).abs() < 1e-9));

        let elec = &rows[0];
        assert_eq!(elec.exchange_type, "technosphere");
        assert_eq!(elec.compartment, None);
        assert_eq!(elec.method, "IPCC 2013");
        assert_eq!(elec.indicator, "GWP 100a");
        assert_eq!(elec.production_amount, Some(1.0));

        let ch4 = &rows[1];
        assert_eq!(ch4.exchange_id, "ch4");
        assert_eq!(ch4.compartment.as_deref(), Some("air"));
        assert_eq!(ch4.sub_compartment.as_deref(), Some("urban air"));

        let co2 = &rows[2];
        assert_eq!(co2.compartment.as_deref(), Some("air"));
        assert_eq!(co2.sub_compartment, None);
    }
}
