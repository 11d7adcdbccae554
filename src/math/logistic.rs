//! Bounded logistic curve for filling scenario years between two anchor years.
//!
//! The curve is:
//!
//! - `v(x) = L / (1 + exp(-k (x - x0)))`
//! - `L  = value_high` (upper asymptote)
//! - `x0 = (year_low + year_high) / 2` (midpoint)
//! - `k  = 1 / (year_high - year_low)` (growth rate)
//!
//! The lower anchor value does not shape the curve: it starts from zero and
//! saturates at `value_high`, so `v(x0) = value_high / 2` exactly.

/// Anchor years closer than this are treated as identical.
const YEAR_EPS: f64 = 1e-9;

/// Logistic interpolation of a coefficient for `year`.
///
/// Degenerate anchors (`year_high == year_low`) return `value_high`.
pub fn logistic_interpolation(year: f64, year_low: f64, _value_low: f64, year_high: f64, value_high: f64) -> f64 {
    let span = year_high - year_low;
    if span.abs() < YEAR_EPS {
        return value_high;
    }

    let k = 1.0 / span;
    let x0 = (year_low + year_high) / 2.0;
    value_high / (1.0 + (-k * (year - x0)).exp())
}
