//! inference::hessian — curvature-based covariance and standard errors.
//!
//! Purpose
//! -------
//! Turn a finite-difference Hessian of the loss at the minimum into a
//! parameter covariance and per-parameter standard errors, the way a
//! second-order error analysis (HESSE) does after a variable-metric fit.
//!
//! Key behaviors
//! -------------
//! - [`hesse_covariance`]: central-difference Hessian `H` of the loss
//!   gradient at `θ̂`, then `C = 2·up·H⁺` with `H⁺` the eigen-truncated
//!   pseudo-inverse.
//! - [`covariance_from_inv_hessian`]: the same scaling applied to an
//!   existing inverse-Hessian estimate (used when the curvature pass is
//!   skipped).
//! - [`standard_errors`]: `sqrt(diag(C))`, with negative round-off clamped
//!   to zero.
//!
//! Invariants & assumptions
//! ------------------------
//! - `up` (the error definition) is the loss increase that defines a
//!   one-sigma interval; for a loss `L`, `σ_i² = 2·up·(H⁻¹)_ii`.
//! - Eigenvalues at or below `EIGEN_EPS` relative to the largest one are
//!   dropped, so flat directions produce a zero rather than an infinite
//!   variance; callers that care must check identifiability themselves.
//!
//! Conventions
//! -----------
//! - Matrices follow the varied-parameter order of the objective.
//! - Errors are reported via `OptResult<T>`.
//!
//! Testing notes
//! -------------
//! - Unit tests compare against analytic covariances of quadratic losses,
//!   including a singular direction.
use ndarray::{Array1, Array2};

use crate::optimization::{
    errors::{OptError, OptResult},
    numerical_stability::transformations::{pseudo_inverse, symmetrize},
    objective::{
        finite_diff::compute_hessian_fallible,
        types::{Grad, Hessian, Theta},
        validation::validate_hessian,
    },
};

/// hesse_covariance — covariance from the observed curvature of the loss.
///
/// Parameters
/// ----------
/// - `grad_fn`: gradient map of the loss, `θ ↦ ∇L(θ)`; may fail.
/// - `theta_hat`: minimum at which the curvature is evaluated.
/// - `errordef`: loss increase defining one sigma (`up`).
///
/// Returns
/// -------
/// `OptResult<Hessian>`
///   The `n × n` covariance `2·up·H⁺`.
///
/// Errors
/// ------
/// - `OptError::InvalidErrordef` for a non-positive or non-finite `errordef`.
/// - Errors raised by `grad_fn` or by Hessian validation.
pub fn hesse_covariance<F>(grad_fn: F, theta_hat: &Theta, errordef: f64) -> OptResult<Hessian>
where
    F: Fn(&Theta) -> OptResult<Grad>,
{
    verify_errordef(errordef)?;
    let hess = compute_hessian_fallible(grad_fn, theta_hat)?;
    Ok(pseudo_inverse(&hess) * (2.0 * errordef))
}

/// covariance_from_inv_hessian — covariance from an inverse-Hessian estimate.
///
/// # Errors
/// - `OptError::InvalidErrordef` for a bad `errordef`.
/// - `OptError::HessianDimMismatch` / `OptError::InvalidHessian` when the
///   estimate is malformed.
pub fn covariance_from_inv_hessian(inv_hessian: &Hessian, errordef: f64) -> OptResult<Hessian> {
    verify_errordef(errordef)?;
    validate_hessian(inv_hessian, inv_hessian.nrows())?;
    let mut cov: Array2<f64> = inv_hessian * (2.0 * errordef);
    symmetrize(&mut cov);
    Ok(cov)
}

/// standard_errors — square roots of the covariance diagonal.
pub fn standard_errors(covariance: &Hessian) -> Array1<f64> {
    covariance.diag().mapv(|v| v.max(0.0).sqrt())
}

fn verify_errordef(errordef: f64) -> OptResult<()> {
    if !(errordef.is_finite() && errordef > 0.0) {
        return Err(OptError::InvalidErrordef { value: errordef });
    }
    Ok(())
}
