//! optimization — objectives, best-fit drivers, and a unified error surface.
//!
//! Purpose
//! -------
//! Provide the fitting layer of the crate: wrap a likelihood collaborator
//! that returns `-2 log L` and its gradient into a flat-vector objective,
//! minimize it with one of several Argmin-backed drivers, and search for
//! profile-likelihood limits on single parameters.
//!
//! Key behaviors
//! -------------
//! - `objective`: the collaborator contract, the [`Objective`](objective::Objective)
//!   adapter (fixed-parameter merge, NaN guard, memoization, numeric/native
//!   boundary) and the profile-likelihood interval objective.
//! - `bestfit`: BFGS, variable-metric (DFP) and bounded (L-BFGS) drivers
//!   plus the one-parameter interval driver.
//! - `numerical_stability`: Hessian symmetrization and (pseudo-)inversion,
//!   and the box-constraint helpers used by the bounded driver.
//! - `errors`: a single [`OptError`](errors::OptError) enum for configuration
//!   mistakes, collaborator failures, numerical problems, and Argmin errors.
//!
//! Invariants & assumptions
//! ------------------------
//! - The loss is minimized directly; it is `-2 log L` by convention, so a
//!   log-likelihood-ratio tolerance and `ll_best` live on the same scale.
//! - Invalid states are reported as `OptError`, never as panics.
//!
//! Conventions
//! -----------
//! - Parameters, gradients and Hessians use the `ndarray` aliases in
//!   `objective::types`; varied vectors are positional against `arg_names`.
//! - Diagnostics go through the `log` facade; the optional `obs_slog`
//!   feature adds Argmin's slog observer to driver runs with `verbose` set.
//!
//! Downstream usage
//! ----------------
//! - Likelihood engines implement `objective::LogLikelihood` and call one of
//!   the `bestfit` drivers.
//! - Front-ends usually import `optimization::prelude::*`.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each submodule; `tests/integration_bestfit.rs`
//!   covers the end-to-end driver scenarios.

pub mod bestfit;
pub mod errors;
pub mod numerical_stability;
pub mod objective;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use lxe_fit::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::bestfit::prelude::*;
    pub use super::errors::{OptError, OptResult};
    pub use super::numerical_stability::prelude::*;
    pub use super::objective::{
        CriticalValue, DiffRequest, FixedParams, LikelihoodEval, LogLikelihood, Objective,
        ObjectiveOptions, ParamAssignment, ParamMap, Theta,
    };
}
