//! CSV ingest for coefficient tables and saved scenario runs.
//!
//! Coefficient files are one CSV per tracked activity, named `<activity_id>.csv`:
//!
//! - `sub_activity` (required): exact biosphere exchange name
//! - `vsi_modify` or `modify`: whether the row is applied (missing -> false)
//! - `activity_name`, `activity_location` (optional): restrict the row
//! - `coeff_<year>`: multiplier for that scenario year
//!
//! Header names are matched case-insensitively. Empty and `nan` cells are
//! undefined; other non-numeric cells are undefined and reported as row errors.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::ScenarioRun;
use crate::error::AppError;
use crate::io::export::ScenarioRunRecord;
use crate::scenario::{CoefficientRow, CoefficientTable};

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// A parsed coefficient table plus what was skipped along the way.
#[derive(Debug, Clone)]
pub struct CoefficientIngest {
    pub table: CoefficientTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load one coefficient CSV for `activity_id`.
pub fn load_coefficient_table(path: &Path, activity_id: &str) -> Result<CoefficientIngest, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers in '{}': {e}", path.display())))?
        .clone();
    let header_map = build_header_map(&headers);

    if !header_map.contains_key("sub_activity") {
        return Err(AppError::new(
            2,
            format!("Missing required column `sub_activity` in '{}'.", path.display()),
        ));
    }
    let modify_column = ["vsi_modify", "modify"].into_iter().find(|c| header_map.contains_key(*c));
    if modify_column.is_none() {
        tracing::warn!(path = %path.display(), "no modify column; every row treated as not modified");
    }

    let year_columns = year_columns(&header_map);
    let mut table = CoefficientTable::new(activity_id);
    table.years.extend(year_columns.iter().map(|&(year, _)| year));

    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records start on line 2, after the header
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let Some(sub_activity) = get_optional(&record, &header_map, "sub_activity") else {
            row_errors.push(RowError {
                line,
                id: None,
                message: "Missing required value: `sub_activity`".to_string(),
            });
            continue;
        };

        let modify = match modify_column.and_then(|c| get_optional(&record, &header_map, c)) {
            None => false,
            Some(raw) => parse_flag(raw).unwrap_or_else(|| {
                row_errors.push(RowError {
                    line,
                    id: Some(sub_activity.to_string()),
                    message: format!("Invalid modify flag '{raw}'; treated as false."),
                });
                false
            }),
        };

        let mut row = CoefficientRow::new(sub_activity, modify);
        row.activity_name = get_optional(&record, &header_map, "activity_name").map(str::to_string);
        row.activity_location = get_optional(&record, &header_map, "activity_location").map(str::to_string);

        for &(year, col) in &year_columns {
            let Some(raw) = record.get(col).map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };
            match parse_coefficient(raw) {
                Ok(Some(v)) => {
                    row.coefficients.insert(year, v);
                }
                Ok(None) => {}
                Err(message) => {
                    tracing::warn!(path = %path.display(), line, sub_activity, year, raw, "non-numeric coefficient");
                    row_errors.push(RowError {
                        line,
                        id: Some(sub_activity.to_string()),
                        message,
                    });
                }
            }
        }

        table.rows.push(row);
    }

    tracing::debug!(
        activity_id,
        rows = table.rows.len(),
        years = table.years.len(),
        errors = row_errors.len(),
        "coefficient table loaded"
    );

    Ok(CoefficientIngest {
        table,
        row_errors,
        rows_read,
    })
}

/// Load every `*.csv` in `dir`, sorted by file name; each file stem is the
/// tracked activity id.
pub fn load_coefficient_dir(dir: &Path) -> Result<Vec<CoefficientIngest>, AppError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::new(2, format!("Failed to read coefficient directory '{}': {e}", dir.display())))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(AppError::new(
            3,
            format!("No coefficient CSV files found in '{}'.", dir.display()),
        ));
    }

    paths
        .iter()
        .map(|path| {
            let activity_id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| AppError::new(2, format!("Invalid coefficient file name '{}'.", path.display())))?;
            load_coefficient_table(path, activity_id)
        })
        .collect()
}

/// Read a results CSV written by `write_results_csv`.
///
/// Unparseable rows are logged and skipped.
pub fn load_scenario_runs(path: &Path) -> Result<Vec<ScenarioRun>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut runs = Vec::new();
    for (idx, result) in reader.deserialize::<ScenarioRunRecord>().enumerate() {
        let line = idx + 2;
        let parsed = result
            .map_err(|e| e.to_string())
            .and_then(ScenarioRun::try_from);
        match parsed {
            Ok(run) => runs.push(run),
            Err(message) => tracing::warn!(path = %path.display(), line, %message, "skipping results row"),
        }
    }

    if runs.is_empty() {
        return Err(AppError::new(3, format!("No scenario runs found in '{}'.", path.display())));
    }
    Ok(runs)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

/// `(year, column index)` for every `coeff_<year>` header, in year order.
fn year_columns(header_map: &HashMap<String, usize>) -> Vec<(i32, usize)> {
    let mut cols: Vec<(i32, usize)> = header_map
        .iter()
        .filter_map(|(name, &idx)| {
            let year = name.strip_prefix("coeff_")?.parse::<i32>().ok()?;
            Some((year, idx))
        })
        .collect();
    cols.sort();
    cols
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "1.0" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "0.0" | "no" | "n" | "nan" => Some(false),
        _ => None,
    }
}

/// `Ok(None)` for an explicit `nan`, `Err` for anything else that is not a
/// finite number.
fn parse_coefficient(s: &str) -> Result<Option<f64>, String> {
    if s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        Ok(_) => Err(format!("Non-finite coefficient '{s}'.")),
        Err(_) => Err(format!("Non-numeric coefficient '{s}'.")),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::domain::{ActivityTarget, ImpactMethod};
    use crate::scenario::Selection;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_coefficients_with_bom_and_mixed_case_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "steel.csv",
            "\u{feff}Sub_Activity,VSI_modify,activity_name,activity_location,coeff_2025,Coeff_2040\n\
             \"Carbon dioxide, fossil\",True,steel production,GLO,0.5,0.2\n\
             \"Methane, fossil\",False,steel production,GLO,0.9,\n\
             \"Water, river\",,steel production,GLO,nan,1.1\n",
        );

        let ingest = load_coefficient_table(&path, "steel").unwrap();
        assert_eq!(ingest.rows_read, 3);
        assert!(ingest.row_errors.is_empty());

        let table = &ingest.table;
        assert_eq!(table.activity_id, "steel");
        assert_eq!(table.years.iter().copied().collect::<Vec<_>>(), vec![2025, 2040]);
        assert!(table.rows[0].modify);
        assert!(!table.rows[1].modify);
        assert!(!table.rows[2].modify);
        assert_eq!(table.rows[1].coefficients.len(), 1);
        assert_eq!(table.rows[2].coefficients.get(&2025), None);
        assert_eq!(table.rows[0].activity_location.as_deref(), Some("GLO"));

        let target = ActivityTarget::new("steel production", None, Some("GLO".into()));
        let Selection::Set(set) = table.selection_for(2025, &target) else {
            panic!("expected coefficients for 2025");
        };
        assert_eq!(set.get("Carbon dioxide, fossil"), Some(0.5));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn accepts_plain_modify_column_and_reports_bad_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "steel.csv",
            "sub_activity,modify,coeff_2030\n\
             \"Carbon dioxide, fossil\",1,abc\n\
             ,1,0.5\n\
             \"Methane, fossil\",maybe,0.5\n",
        );

        let ingest = load_coefficient_table(&path, "steel").unwrap();
        assert_eq!(ingest.table.rows.len(), 2);
        assert!(ingest.table.rows[0].modify);
        assert!(ingest.table.rows[0].coefficients.is_empty());
        assert!(!ingest.table.rows[1].modify);
        assert_eq!(ingest.row_errors.len(), 3);
        assert_eq!(ingest.row_errors[1].line, 3);
    }

    #[test]
    fn missing_sub_activity_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "x.csv", "name,coeff_2025\nfoo,1\n");
        let err = load_coefficient_table(&path, "x").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn directory_load_is_sorted_and_keyed_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b_id.csv", "sub_activity,vsi_modify,coeff_2025\nx,true,1\n");
        write(dir.path(), "a_id.csv", "sub_activity,vsi_modify,coeff_2025\ny,true,2\n");
        write(dir.path(), "notes.txt", "ignored");

        let tables = load_coefficient_dir(dir.path()).unwrap();
        let ids: Vec<_> = tables.iter().map(|t| t.table.activity_id.as_str()).collect();
        assert_eq!(ids, vec!["a_id", "b_id"]);
    }

    #[test]
    fn empty_directory_is_nothing_to_process() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_coefficient_dir(dir.path()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn scenario_runs_survive_export_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let runs = vec![ScenarioRun {
            database: "db2025".into(),
            year: 2025,
            activity: "steel production".into(),
            location: Some("GLO".into()),
            method: ImpactMethod::new(["IPCC 2013", "climate change", "GWP 100a"]),
            score_before: 0.0,
            score_after: 1.25,
            difference: 1.25,
            percent_change: f64::INFINITY,
            activity_id: "steel".into(),
        }];

        crate::io::export::write_results_csv(&path, &runs).unwrap();
        let back = load_scenario_runs(&path).unwrap();
        assert_eq!(back, runs);
    }
}
