//! Numerical stability utilities.
//!
//! Small dense-matrix and box-constraint helpers shared by the best-fit
//! drivers and the curvature-based error estimates.
//!
//! # Provided items
//! - [`EIGEN_EPS`]: eigenvalue floor for pseudo-inverses.
//! - [`BOUND_EPS`]: slack used when deciding whether a coordinate sits on a bound.
//! - [`symmetrize`]: in-place `(H + Hᵀ)/2`.
//! - [`invert_hessian`]: exact inverse through `nalgebra`, or `SingularHessian`.
//! - [`pseudo_inverse`]: eigen-decomposition inverse that drops flat directions.
//! - [`parameter_bounds`], [`clamp_to_bounds`], [`project_gradient`]: simple
//!   box constraints for the bounded driver.
//!
//! # Rationale
//! Finite-difference Hessians are never exactly symmetric, and quasi-Newton
//! solvers need a symmetric positive-(semi)definite seed. Box constraints are
//! handled by projection, so any unconstrained L-BFGS can run on them.
use nalgebra::DMatrix;
use ndarray::Array2;

use crate::optimization::{
    errors::{OptError, OptResult},
    objective::types::{Grad, Hessian, Theta},
};

/// Relative eigenvalue floor used by [`pseudo_inverse`].
///
/// Eigenvalues at or below `EIGEN_EPS · max|λ|` are treated as zero.
pub const EIGEN_EPS: f64 = 1e-10;

/// Distance from a bound under which a coordinate counts as active.
pub const BOUND_EPS: f64 = 1e-12;

/// Name suffix marking parameters that must stay non-negative.
pub const RATE_MULTIPLIER_SUFFIX: &str = "rate_multiplier";

/// Closed interval `(lower, upper)`; either end may be infinite.
pub type Bound = (f64, f64);

/// Replace `h` with `(h + hᵀ) / 2` in place.
pub fn symmetrize(h: &mut Hessian) {
    let n = h.nrows().min(h.ncols());
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = 0.5 * (h[[i, j]] + h[[j, i]]);
            h[[i, j]] = avg;
            h[[j, i]] = avg;
        }
    }
}

/// Copy a square `ndarray` matrix into an `nalgebra` one.
pub fn fill_dmatrix(h: &Hessian) -> DMatrix<f64> {
    DMatrix::from_fn(h.nrows(), h.ncols(), |i, j| h[[i, j]])
}

fn to_ndarray(m: &DMatrix<f64>) -> Hessian {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Invert a square matrix, returning a symmetrized inverse.
///
/// # Errors
/// - [`OptError::SingularHessian`] when the matrix cannot be inverted or the
///   inverse contains non-finite entries.
pub fn invert_hessian(h: &Hessian) -> OptResult<Hessian> {
    let inv = fill_dmatrix(h).try_inverse().ok_or(OptError::SingularHessian)?;
    if inv.iter().any(|v| !v.is_finite()) {
        return Err(OptError::SingularHessian);
    }
    let mut out = to_ndarray(&inv);
    symmetrize(&mut out);
    Ok(out)
}

/// Moore–Penrose inverse of a symmetric matrix via its eigen-decomposition.
///
/// Directions with eigenvalue at or below `EIGEN_EPS · max|λ|` are dropped,
/// so flat or negative-curvature directions contribute nothing instead of
/// blowing up.
pub fn pseudo_inverse(h: &Hessian) -> Hessian {
    let eig = fill_dmatrix(h).symmetric_eigen();
    let scale = eig.eigenvalues.iter().fold(0.0_f64, |acc, l| acc.max(l.abs()));
    let cutoff = EIGEN_EPS * scale.max(1.0);
    let n = h.nrows();
    let mut out = Array2::<f64>::zeros((n, n));
    for (k, &lambda) in eig.eigenvalues.iter().enumerate() {
        if lambda <= cutoff {
            continue;
        }
        let v = eig.eigenvectors.column(k);
        for i in 0..n {
            for j in 0..n {
                out[[i, j]] += v[i] * v[j] / lambda;
            }
        }
    }
    out
}

/// Default bounds for the varied parameters.
///
/// Names ending in [`RATE_MULTIPLIER_SUFFIX`] get `(floor, +∞)`; all other
/// names are unbounded.
pub fn parameter_bounds(arg_names: &[String], floor: f64) -> Vec<Bound> {
    arg_names
        .iter()
        .map(|name| {
            if name.ends_with(RATE_MULTIPLIER_SUFFIX) {
                (floor, f64::INFINITY)
            } else {
                (f64::NEG_INFINITY, f64::INFINITY)
            }
        })
        .collect()
}

/// Clamp each coordinate of `theta` into its bound.
pub fn clamp_to_bounds(theta: &Theta, bounds: &[Bound]) -> Theta {
    let mut out = theta.clone();
    for (x, &(lo, hi)) in out.iter_mut().zip(bounds) {
        *x = x.max(lo).min(hi);
    }
    out
}

/// Zero the gradient components that would push an active coordinate out of its box.
///
/// A coordinate at its lower bound with a positive gradient (descent goes
/// down) or at its upper bound with a negative gradient is frozen.
pub fn project_gradient(theta: &Theta, grad: &Grad, bounds: &[Bound]) -> Grad {
    let mut out = grad.clone();
    for ((g, &x), &(lo, hi)) in out.iter_mut().zip(theta.iter()).zip(bounds) {
        let at_lower = lo.is_finite() && x <= lo + BOUND_EPS;
        let at_upper = hi.is_finite() && x >= hi - BOUND_EPS;
        if (at_lower && *g > 0.0) || (at_upper && *g < 0.0) {
            *g = 0.0;
        }
    }
    out
}
