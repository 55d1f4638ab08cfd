//! objective — flat-vector objectives over a likelihood collaborator.
//!
//! Purpose
//! -------
//! Everything an optimizer needs to minimize `-2 log L`: the collaborator
//! contract ([`traits`]), shared numeric aliases ([`types`]), the
//! [`adapter::Objective`] wrapper, the profile-likelihood
//! [`interval::IntervalObjective`], finite-difference Hessians, and the
//! validation helpers used across the optimization layer.
//!
//! Conventions
//! -----------
//! - Parameters are named; the varied subset is positional against
//!   `arg_names`, the rest is held fixed by name.
//! - All fallible operations return `OptResult<T>`.

pub mod adapter;
pub mod finite_diff;
pub mod interval;
pub mod traits;
pub mod types;
pub mod validation;

pub use self::adapter::{Identity, LossTransform, Objective, ObjectiveOptions, ObjectiveResult};
pub use self::interval::{CriticalFn, CriticalValue, IntervalObjective, ProfileLikelihoodRatio};
pub use self::traits::{DiffRequest, LikelihoodEval, LogLikelihood, NativeVector, ParamAssignment};
pub use self::types::{Cost, FixedParams, FnEvalMap, Grad, Hessian, ParamMap, Theta};
