//! objective::finite_diff — finite-difference Hessians of a gradient map.
//!
//! Purpose
//! -------
//! Approximate second derivatives of the loss from its (analytic) gradient,
//! with validation and symmetry cleanup, so that inverse-Hessian seeds and
//! curvature-based error estimates do not depend directly on the
//! `finitediff` API.
//!
//! Key behaviors
//! -------------
//! - [`compute_hessian`]: central-difference Hessian, falling back to
//!   forward differences when validation fails, then symmetrized.
//! - [`compute_hessian_fallible`]: the same for gradient maps that can fail;
//!   the first error raised inside the finite-difference sweep is captured
//!   and returned instead of a Hessian.
//!
//! Invariants & assumptions
//! ------------------------
//! - Returned matrices are `dim × dim` with `dim = theta.len()`, all finite,
//!   and exactly symmetric.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the linear-gradient case, non-finite input, and
//!   error capture.
use std::cell::RefCell;

use finitediff::FiniteDiff;
use ndarray::Array1;

use crate::optimization::{
    errors::{OptError, OptResult},
    numerical_stability::transformations::symmetrize,
    objective::{
        types::{Grad, Hessian, Theta},
        validation::validate_hessian,
    },
};

/// compute_hessian — finite-difference Hessian with validation and symmetry.
///
/// Parameters
/// ----------
/// - `f`: `&F`
///   Gradient map `θ ↦ ∇c(θ)`.
/// - `theta`: `&Theta`
///   Evaluation point; its length fixes the Hessian dimension.
///
/// Returns
/// -------
/// `OptResult<Hessian>`
///   The symmetrized Hessian from central differences, or from forward
///   differences when the central one fails validation.
///
/// Errors
/// ------
/// - `OptError::HessianDimMismatch` / `OptError::InvalidHessian`
///   Returned when the forward-difference fallback also fails validation.
pub fn compute_hessian<F: Fn(&Theta) -> Grad>(f: &F, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let mut cent_hess = theta.central_hessian(f);
    match validate_hessian(&cent_hess, dim) {
        Ok(_) => {
            symmetrize(&mut cent_hess);
            Ok(cent_hess)
        }
        Err(_) => {
            let mut forward_hess = theta.forward_hessian(f);
            validate_hessian(&forward_hess, dim)?;
            symmetrize(&mut forward_hess);
            Ok(forward_hess)
        }
    }
}

/// compute_hessian_fallible — [`compute_hessian`] for gradient maps that can fail.
///
/// The finite-difference routines need an infallible closure, so failures
/// are stored in a `RefCell` and the closure returns a NaN vector. The
/// first captured error wins and is returned in place of the Hessian.
pub fn compute_hessian_fallible<F>(f: F, theta: &Theta) -> OptResult<Hessian>
where
    F: Fn(&Theta) -> OptResult<Grad>,
{
    let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
    let grad_fn = |x: &Theta| -> Grad {
        match f(x) {
            Ok(g) => g,
            Err(e) => {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                Array1::from_elem(x.len(), f64::NAN)
            }
        }
    };
    let hess = compute_hessian(&grad_fn, theta);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    hess
}
