//! Export scenario results, contribution tables and synthesis tables to CSV.
//!
//! Methods are written as their `a | b | c` display form; infinite percent
//! changes are written as `inf`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{ImpactMethod, ScenarioRun};
use crate::error::AppError;
use crate::report::ContributionRow;
use crate::scenario::CoefficientTable;
use crate::synthesis::ImpactChange;

/// Flat CSV form of a `ScenarioRun`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRunRecord {
    pub database: String,
    pub year: i32,
    pub activity: String,
    #[serde(default)]
    pub location: Option<String>,
    pub method: String,
    pub score_before: f64,
    pub score_after: f64,
    pub difference: f64,
    pub percent_change: f64,
    pub activity_id: String,
}

impl From<&ScenarioRun> for ScenarioRunRecord {
    fn from(run: &ScenarioRun) -> Self {
        Self {
            database: run.database.clone(),
            year: run.year,
            activity: run.activity.clone(),
            location: run.location.clone(),
            method: run.method.to_string(),
            score_before: run.score_before,
            score_after: run.score_after,
            difference: run.difference,
            percent_change: run.percent_change,
            activity_id: run.activity_id.clone(),
        }
    }
}

impl TryFrom<ScenarioRunRecord> for ScenarioRun {
    type Error = String;

    fn try_from(record: ScenarioRunRecord) -> Result<Self, Self::Error> {
        Ok(ScenarioRun {
            method: record.method.parse::<ImpactMethod>()?,
            database: record.database,
            year: record.year,
            activity: record.activity,
            location: record.location,
            score_before: record.score_before,
            score_after: record.score_after,
            difference: record.difference,
            percent_change: record.percent_change,
            activity_id: record.activity_id,
        })
    }
}

/// Flat CSV form of an `ImpactChange`.
#[derive(Debug, Clone, Serialize)]
struct ImpactChangeRecord<'a> {
    activity: &'a str,
    location: Option<&'a str>,
    impact_category: String,
    baseline_early: Option<f64>,
    baseline_late: Option<f64>,
    baseline_change: Option<f64>,
    baseline_percent_change: Option<f64>,
    scenario_early: Option<f64>,
    scenario_late: Option<f64>,
    scenario_change: Option<f64>,
    scenario_percent_change: Option<f64>,
    scenario_to_baseline_change: Option<f64>,
    scenario_to_baseline_percent: Option<f64>,
}

impl<'a> From<&'a ImpactChange> for ImpactChangeRecord<'a> {
    fn from(c: &'a ImpactChange) -> Self {
        Self {
            activity: &c.activity,
            location: c.location.as_deref(),
            impact_category: c.method.to_string(),
            baseline_early: c.baseline.early,
            baseline_late: c.baseline.late,
            baseline_change: c.baseline.change,
            baseline_percent_change: c.baseline.percent_change,
            scenario_early: c.scenario.early,
            scenario_late: c.scenario.late,
            scenario_change: c.scenario.change,
            scenario_percent_change: c.scenario.percent_change,
            scenario_to_baseline_change: c.scenario_to_baseline_change,
            scenario_to_baseline_percent: c.scenario_to_baseline_percent,
        }
    }
}

/// Write before/after scenario rows.
pub fn write_results_csv(path: &Path, runs: &[ScenarioRun]) -> Result<(), AppError> {
    write_records(path, runs.iter().map(ScenarioRunRecord::from))
}

/// Write contribution table rows.
pub fn write_contributions_csv(path: &Path, rows: &[ContributionRow]) -> Result<(), AppError> {
    write_records(path, rows.iter())
}

/// Write synthesis rows.
pub fn write_changes_csv(path: &Path, changes: &[ImpactChange]) -> Result<(), AppError> {
    write_records(path, changes.iter().map(ImpactChangeRecord::from))
}

/// Write a coefficient table in the ingest format; undefined cells are blank.
pub fn write_coefficient_csv(path: &Path, table: &CoefficientTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create coefficient CSV '{}': {e}", path.display())))?;
    let row_err = |e: csv::Error| AppError::new(2, format!("Failed to write coefficient CSV row: {e}"));

    let mut header = vec![
        "sub_activity".to_string(),
        "vsi_modify".to_string(),
        "activity_name".to_string(),
        "activity_location".to_string(),
    ];
    header.extend(table.years.iter().map(|y| format!("coeff_{y}")));
    writer.write_record(&header).map_err(row_err)?;

    for row in &table.rows {
        let mut record = vec![
            row.sub_activity.clone(),
            row.modify.to_string(),
            row.activity_name.clone().unwrap_or_default(),
            row.activity_location.clone().unwrap_or_default(),
        ];
        record.extend(
            table
                .years
                .iter()
                .map(|y| row.coefficients.get(y).map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record).map_err(row_err)?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush coefficient CSV '{}': {e}", path.display())))
}

fn write_records<T: Serialize>(path: &Path, records: impl Iterator<Item = T>) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let mut written = 0usize;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
        written += 1;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV '{}': {e}", path.display())))?;

    tracing::info!(path = %path.display(), rows = written, "export written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::load_coefficient_table;
    use crate::scenario::CoefficientRow;
    use crate::synthesis::SideChange;

    #[test]
    fn coefficient_csv_reloads_with_blank_cells_undefined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steel.csv");
        let mut table = CoefficientTable::new("steel");
        table.push(CoefficientRow::new("Carbon dioxide, fossil", true).with(2025, 0.5).with(2040, 0.25));
        table.push(CoefficientRow::new("Methane, fossil", false).with(2025, 0.9));
        table.years.insert(2030);

        write_coefficient_csv(&path, &table).unwrap();
        let back = load_coefficient_table(&path, "steel").unwrap();
        assert!(back.row_errors.is_empty());
        assert_eq!(back.table, table);
    }

    #[test]
    fn change_export_leaves_missing_values_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changes.csv");
        let change = ImpactChange {
            activity: "steel production".into(),
            location: Some("GLO".into()),
            method: ImpactMethod::new(["IPCC 2013", "climate change", "GWP 100a"]),
            baseline: SideChange {
                early: Some(10.0),
                late: Some(8.0),
                change: Some(-2.0),
                percent_change: Some(-20.0),
            },
            scenario: SideChange {
                early: Some(9.0),
                late: None,
                change: None,
                percent_change: None,
            },
            scenario_to_baseline_change: None,
            scenario_to_baseline_percent: None,
        };

        write_changes_csv(&path, &[change]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("activity,location,impact_category,baseline_early"));
        assert_eq!(
            lines.next().unwrap(),
            "steel production,GLO,IPCC 2013 | climate change | GWP 100a,10.0,8.0,-2.0,-20.0,9.0,,,,,"
        );
    }
}
