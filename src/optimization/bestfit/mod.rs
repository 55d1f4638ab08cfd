//! bestfit — best-fit and interval drivers over the objective adapter.
//!
//! Purpose
//! -------
//! Offer interchangeable minimization strategies for `-2 log L`, all taking
//! the same inputs (likelihood, varied names, guess, fixed map, options) and
//! returning the same [`BestFit`] result, plus the one-parameter interval
//! search built on the bounded strategy.
//!
//! Key behaviors
//! -------------
//! - [`bestfit_bfgs`]: BFGS seeded with the collaborator's inverse Hessian;
//!   non-convergence is an error carrying the low-level outcome.
//! - [`bestfit_variable_metric`]: DFP seeded from per-parameter step sizes,
//!   with curvature-based errors after convergence.
//! - [`bestfit_bounded`]: L-BFGS restricted to a box that keeps rate
//!   multipliers non-negative; always memoized.
//! - [`one_parameter_interval`]: crossing of the profile likelihood ratio
//!   with its critical value for one target parameter.
//!
//! Conventions
//! -----------
//! - `get_lowlevel_result` returns [`BestFit::LowLevel`] with the raw
//!   [`OptimOutcome`] and skips post-processing.
//! - Fixed parameters are echoed unchanged in every value map.
//!
//! Testing notes
//! -------------
//! - Each driver module tests convergence on quadratic stubs, fixed-value
//!   echo, and its own option handling; `tests/integration_bestfit.rs` runs
//!   the shared end-to-end scenarios.

pub mod bfgs;
pub mod bounded;
pub mod builders;
pub mod interval;
pub mod options;
pub mod outcome;
pub mod run;
pub mod variable_metric;

pub use self::bfgs::bestfit_bfgs;
pub use self::bounded::{BoundedProblem, bestfit_bounded, minimize_in_box};
pub use self::interval::one_parameter_interval;
pub use self::options::{
    BfgsOptions, BoundedOptions, IntervalOptions, LineSearcher, Tolerances, VariableMetricOptions,
};
pub use self::outcome::{BestFit, ERROR_SUFFIX, OptimOutcome};
pub use self::variable_metric::bestfit_variable_metric;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use lxe_fit::optimization::bestfit::prelude::*;
//
// to import every driver and its options in a single line.

pub mod prelude {
    pub use super::{
        BestFit, BfgsOptions, BoundedOptions, IntervalOptions, LineSearcher, OptimOutcome,
        Tolerances, VariableMetricOptions, bestfit_bfgs, bestfit_bounded, bestfit_variable_metric,
        one_parameter_interval,
    };
}
