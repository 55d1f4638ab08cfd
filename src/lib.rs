//! lxe_fit — maximum-likelihood fitting and quanta-splitting probabilities.
//!
//! Purpose
//! -------
//! Serve as the crate root for the two halves of a liquid-xenon likelihood
//! engine: the fitting layer that minimizes `-2 log L` and searches
//! profile-likelihood limits, and the quanta-splitting block that turns an
//! energy spectrum into per-event electron/photon probabilities.
//!
//! Key behaviors
//! -------------
//! - `optimization`: objective adapter, BFGS / variable-metric / bounded
//!   best-fit drivers and the one-parameter interval driver.
//! - `inference`: covariance and standard errors from curvature at the
//!   minimum.
//! - `quanta`: exact and approximate marginalization over ions, bounds
//!   annotation and forward simulation.
//!
//! Invariants & assumptions
//! ------------------------
//! - Tensor evaluation and automatic differentiation belong to the caller's
//!   likelihood collaborator; this crate only sees `f64` vectors and
//!   `ndarray` arrays.
//! - Everything is synchronous; caches are per instance and written once
//!   per key.
//!
//! Downstream usage
//! ----------------
//! - Likelihood engines implement `optimization::objective::LogLikelihood`
//!   and, for each source, build a `quanta::block::QuantaSplittingBlock`
//!   from a yield model.
//! - `optimization::prelude` and `quanta::prelude` import the common
//!   surface in one line each.
//!
//! Testing notes
//! -------------
//! - Unit tests sit next to each module; `tests/` holds the end-to-end
//!   driver and block scenarios.

pub mod inference;
pub mod optimization;
pub mod quanta;
