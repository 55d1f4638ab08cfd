//! Validation helpers for the objective layer and the best-fit drivers.
//!
//! - **Tolerance checks**: [`verify_tol_grad`], [`verify_tol_cost`],
//!   [`verify_llr_tolerance`] ensure tolerances are finite and strictly
//!   positive when provided.
//! - **Parameter sets**: [`validate_param_sets`] enforces that varied and
//!   fixed names are disjoint and together cover the likelihood's names.
//! - **Gradients / Hessians**: [`validate_grad`], [`validate_hessian`]
//!   enforce dimension and finiteness.
//! - **Outcomes**: [`validate_theta_hat`], [`validate_value`].
//! - **Intervals**: [`verify_quantile`], [`verify_bound`].
use std::collections::BTreeSet;

use crate::optimization::{
    errors::{OptError, OptResult},
    objective::types::{FixedParams, Grad, Hessian, Theta},
};

/// Validate the optional gradient‐norm tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidTolGrad`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate the optional cost‐change tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidTolCost`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate the optional log-likelihood-ratio tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidLlrTolerance`] if the value is non-finite or ≤ 0.0.
pub fn verify_llr_tolerance(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidLlrTolerance { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidLlrTolerance {
                tol,
                reason: "Tolerance must be positive.",
            });
        }
    }
    Ok(())
}

/// Validate a varied/fixed split against the likelihood's parameter names.
///
/// Checks, in order:
/// 1. `arg_names` has no repeats.
/// 2. No name is both varied and fixed.
/// 3. Every varied or fixed name is known to the likelihood.
/// 4. Every likelihood name is either varied or fixed.
///
/// # Errors
/// - [`OptError::DuplicateParameter`] for 1 and 2.
/// - [`OptError::UnknownParameter`] for 3.
/// - [`OptError::MissingParameter`] for 4.
pub fn validate_param_sets(
    param_names: &[String], arg_names: &[String], fix: &FixedParams,
) -> OptResult<()> {
    let mut varied = BTreeSet::new();
    for name in arg_names {
        if !varied.insert(name.as_str()) {
            return Err(OptError::DuplicateParameter { name: name.clone() });
        }
    }
    if let Some(name) = fix.keys().find(|k| varied.contains(k.as_str())) {
        return Err(OptError::DuplicateParameter { name: name.clone() });
    }
    let known: BTreeSet<&str> = param_names.iter().map(String::as_str).collect();
    if let Some(name) = arg_names.iter().chain(fix.keys()).find(|n| !known.contains(n.as_str())) {
        return Err(OptError::UnknownParameter { name: name.clone() });
    }
    if let Some(name) =
        param_names.iter().find(|n| !varied.contains(n.as_str()) && !fix.contains_key(*n))
    {
        return Err(OptError::MissingParameter { name: name.clone() });
    }
    Ok(())
}

/// Validate a gradient vector against dimension and finiteness.
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if length does not match `dim`.
/// - [`OptError::InvalidGradient`] for the first non-finite element.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate and unwrap an estimated parameter vector (`theta_hat`).
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if no vector was provided.
/// - [`OptError::InvalidThetaHat`] if any element is non-finite.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    match theta_hat {
        Some(t) => {
            for (index, &value) in t.iter().enumerate() {
                if !value.is_finite() {
                    return Err(OptError::InvalidThetaHat {
                        index,
                        value,
                        reason: "Parameter estimates must be finite.",
                    });
                }
            }
            Ok(t)
        }
        None => Err(OptError::MissingThetaHat),
    }
}

/// Validate that a scalar loss is finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteCost`] if the value is `NaN` or infinite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

/// Validate the shape and entries of a Hessian-like matrix.
///
/// # Errors
/// - [`OptError::HessianDimMismatch`] if dimensions do not match `dim × dim`.
/// - [`OptError::InvalidHessian`] for the first non-finite entry.
pub fn validate_hessian(hessian: &Hessian, dim: usize) -> OptResult<()> {
    if hessian.nrows() != dim || hessian.ncols() != dim {
        return Err(OptError::HessianDimMismatch {
            expected: dim,
            found: (hessian.nrows(), hessian.ncols()),
        });
    }
    for ((i, j), &value) in hessian.indexed_iter() {
        if !value.is_finite() {
            return Err(OptError::InvalidHessian { row: i, col: j, value });
        }
    }
    Ok(())
}

/// Validate a confidence quantile; it must lie strictly inside (0, 1).
pub fn verify_quantile(q: f64) -> OptResult<()> {
    if !(q > 0.0 && q < 1.0) {
        return Err(OptError::InvalidQuantile { value: q });
    }
    Ok(())
}

/// Validate a search bound `(lower, upper)`; infinite ends are allowed.
pub fn verify_bound(name: &str, bound: (f64, f64)) -> OptResult<()> {
    let (lower, upper) = bound;
    if lower.is_nan() || upper.is_nan() || lower >= upper {
        return Err(OptError::InvalidBound { name: name.to_string(), lower, upper });
    }
    Ok(())
}
