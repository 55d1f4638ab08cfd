//! numerical_stability — shared tolerances, matrix repair, and box constraints.
//!
//! Purpose
//! -------
//! Collect the small numerical helpers that more than one layer relies on:
//! symmetrizing and inverting curvature matrices, pseudo-inverting
//! near-singular ones, and projecting iterates and gradients onto simple
//! bound constraints.
//!
//! Key behaviors
//! -------------
//! - `symmetrize` / `invert_hessian` turn a finite-difference Hessian into a
//!   usable quasi-Newton seed.
//! - `pseudo_inverse` drops directions with eigenvalue below `EIGEN_EPS`
//!   relative to the largest one, for curvature-based error estimates.
//! - `parameter_bounds`, `clamp_to_bounds`, `project_gradient` implement the
//!   rate-multiplier non-negativity constraint used by the bounded driver.
//!
//! Invariants & assumptions
//! ------------------------
//! - Matrix inputs are square; shape validation is done upstream.
//! - Bounds are `(lower, upper)` with `lower < upper`; infinite ends mean
//!   unconstrained.
//!
//! Conventions
//! -----------
//! - Pure functions on `ndarray` types; `nalgebra` appears only internally.
//! - No logging and no I/O.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] cover symmetrization, exact and
//!   pseudo inversion, and the bound helpers.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    BOUND_EPS, Bound, EIGEN_EPS, RATE_MULTIPLIER_SUFFIX, clamp_to_bounds, invert_hessian,
    parameter_bounds, project_gradient, pseudo_inverse, symmetrize,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use lxe_fit::optimization::numerical_stability::prelude::*;
//
// to import the main numerical-stability surface in a single line.

pub mod prelude {
    pub use super::transformations::{
        Bound, EIGEN_EPS, RATE_MULTIPLIER_SUFFIX, clamp_to_bounds, parameter_bounds,
        project_gradient, pseudo_inverse,
    };
}
