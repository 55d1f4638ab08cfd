//! inference — post-fit uncertainty from the curvature of the loss.
//!
//! Purpose
//! -------
//! Provide the second-order error analysis used by the variable-metric
//! driver: covariance matrices and standard errors from either a
//! finite-difference Hessian at the minimum or the optimizer's own
//! inverse-Hessian estimate.
//!
//! Conventions
//! -----------
//! - Parameters are the varied parameters of the objective, in order.
//! - Flat directions are handled by eigen-truncated pseudo-inverses, so
//!   results are always finite.
//! - Errors are reported through the optimization layer's `OptError`.
//!
//! Downstream usage
//! ----------------
//! - `optimization::bestfit::variable_metric` calls [`hessian::hesse_covariance`]
//!   after convergence when `use_hessian` is set, and
//!   [`hessian::covariance_from_inv_hessian`] otherwise.

pub mod hessian;

pub use self::hessian::{covariance_from_inv_hessian, hesse_covariance, standard_errors};
