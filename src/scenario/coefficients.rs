//! Per-activity scaling coefficient tables.
//!
//! A table holds one row per biosphere exchange ("sub activity") of a tracked
//! activity, with an optional multiplier per scenario year. Undefined cells are
//! simply absent from a row's `coefficients` map.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{ActivityTarget, ScalingCoefficientSet};
use crate::error::LcaError;
use crate::math::logistic_interpolation;

/// One row of a coefficient table.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientRow {
    /// Exact name of the biosphere exchange to scale.
    pub sub_activity: String,
    pub modify: bool,
    pub activity_name: Option<String>,
    pub activity_location: Option<String>,
    /// Year -> multiplier; only defined cells are present.
    pub coefficients: BTreeMap<i32, f64>,
}

impl CoefficientRow {
    pub fn new(sub_activity: impl Into<String>, modify: bool) -> Self {
        Self {
            sub_activity: sub_activity.into(),
            modify,
            activity_name: None,
            activity_location: None,
            coefficients: BTreeMap::new(),
        }
    }

    pub fn with(mut self, year: i32, factor: f64) -> Self {
        self.coefficients.insert(year, factor);
        self
    }

    /// A row applies to `target` when flagged for modification and its
    /// activity name/location columns (if filled) equal the target's.
    fn applies_to(&self, target: &ActivityTarget) -> bool {
        self.modify
            && self.activity_name.as_deref().is_none_or(|n| n == target.name)
            && self
                .activity_location
                .as_deref()
                .is_none_or(|l| Some(l) == target.location.as_deref())
    }
}

/// Coefficient table for one tracked activity.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable {
    /// Activity code shared by every scenario database.
    pub activity_id: String,
    /// Years with a `coeff_<year>` column, defined or not.
    pub years: BTreeSet<i32>,
    pub rows: Vec<CoefficientRow>,
}

/// The two years whose coefficients drive interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchors {
    pub low: i32,
    pub high: i32,
}

impl Anchors {
    pub fn new(low: i32, high: i32) -> Result<Self, LcaError> {
        if low >= high {
            return Err(LcaError::Precondition(format!(
                "Interpolation anchors must be increasing, got {low}:{high}."
            )));
        }
        Ok(Self { low, high })
    }
}

impl std::str::FromStr for Anchors {
    type Err = String;

    /// Parse `"2025:2040"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (low, high) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid anchors '{s}': expected LOW:HIGH."))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<i32>()
                .map_err(|e| format!("Invalid anchor year '{v}': {e}"))
        };
        Anchors::new(parse(low)?, parse(high)?).map_err(|e| e.to_string())
    }
}

/// What a table offers an activity for one scenario year.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// No row is flagged for the activity.
    NoApplicableRows,
    /// The table has no `coeff_<year>` column.
    MissingColumn,
    /// Rows apply, but every cell for the year is undefined.
    Empty,
    Set(ScalingCoefficientSet),
}

impl CoefficientTable {
    pub fn new(activity_id: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            years: BTreeSet::new(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: CoefficientRow) {
        self.years.extend(row.coefficients.keys().copied());
        self.rows.push(row);
    }

    /// Scaling coefficients for `target` in `year`.
    pub fn selection_for(&self, year: i32, target: &ActivityTarget) -> Selection {
        let applicable: Vec<&CoefficientRow> = self.rows.iter().filter(|r| r.applies_to(target)).collect();
        if applicable.is_empty() {
            return Selection::NoApplicableRows;
        }
        if !self.years.contains(&year) {
            return Selection::MissingColumn;
        }

        let mut set = ScalingCoefficientSet::new();
        for row in applicable {
            match row.coefficients.get(&year) {
                Some(&factor) => set.insert(row.sub_activity.clone(), factor),
                None => tracing::debug!(
                    activity_id = %self.activity_id,
                    sub_activity = %row.sub_activity,
                    year,
                    "coefficient undefined; skipping row"
                ),
            }
        }

        if set.is_empty() { Selection::Empty } else { Selection::Set(set) }
    }

    /// A copy with undefined cells of `target_years` strictly between the
    /// anchors filled by logistic interpolation.
    ///
    /// Rows missing either anchor value are copied unchanged, explicit values
    /// are never overwritten, and years outside the anchors are left alone.
    pub fn interpolated(&self, anchors: Anchors, target_years: &[i32]) -> CoefficientTable {
        let inside: Vec<i32> = target_years
            .iter()
            .copied()
            .filter(|&y| y > anchors.low && y < anchors.high)
            .collect();

        let mut out = self.clone();
        out.years.extend(inside.iter().copied());

        for row in &mut out.rows {
            let (Some(&low), Some(&high)) = (row.coefficients.get(&anchors.low), row.coefficients.get(&anchors.high))
            else {
                continue;
            };
            for &year in &inside {
                row.coefficients.entry(year).or_insert_with(|| {
                    logistic_interpolation(year as f64, anchors.low as f64, low, anchors.high as f64, high)
                });
            }
        }
        out
    }
}
