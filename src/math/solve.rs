//! Dense linear solver for technosphere systems.
//!
//! Scoring a functional unit means solving `A s = f` where `A` is the square
//! technosphere matrix (production on the diagonal, consumed inputs negative)
//! and `f` the demand vector. `s` is the supply (scaling) vector.
//!
//! Implementation choices:
//! - LU with partial pivoting first; it is exact enough for well-posed graphs.
//! - SVD fallback with progressively looser tolerances for near-singular
//!   systems (e.g. tightly coupled loops).

use nalgebra::{DMatrix, DVector};

/// Solve the square system `a x = b`.
///
/// Returns `None` if the system is singular or the solution is not finite.
pub fn solve_square(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    if !a.is_square() || a.nrows() != b.len() {
        return None;
    }

    if let Some(x) = a.clone().lu().solve(b) {
        if x.iter().all(|v| v.is_finite()) {
            return Some(x);
        }
    }

    let svd = a.clone().svd(true, true);
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) && (a * &x - b).norm() <= 1e-6 * (1.0 + b.norm()) {
                return Some(x);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_simple_supply_chain() {
        // steel consumes 2 electricity; demand 1 steel -> supply [1, 2]
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, -2.0, 1.0]);
        let f = DVector::from_row_slice(&[1.0, 0.0]);

        let s = solve_square(&a, &f).unwrap();
        assert!((s[0] - 1.0).abs() < 1e-12);
        assert!((s[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn singular_system_has_no_solution() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, -1.0, 1.0]);
        let f = DVector::from_row_slice(&[1.0, 0.0]);
        assert!(solve_square(&a, &f).is_none());
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let a = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        let f = DVector::from_row_slice(&[1.0]);
        assert!(solve_square(&a, &f).is_none());
    }
}
