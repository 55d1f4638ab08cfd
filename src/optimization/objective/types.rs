//! objective::types — shared numeric aliases and solver wiring.
//!
//! Purpose
//! -------
//! Centralize the numeric types and solver aliases used by the objective
//! adapter and the best-fit drivers, so the rest of the optimization code
//! stays agnostic to `ndarray` and Argmin generics.
//!
//! Key behaviors
//! -------------
//! - Define canonical aliases for parameter vectors, gradients, Hessians,
//!   and scalar losses (`Theta`, `Grad`, `Hessian`, `Cost`).
//! - Define the name-keyed maps used for fixed parameters and fit results
//!   (`FixedParams`, `ParamMap`).
//! - Expose pre-wired quasi-Newton solver aliases for both line searches.
//!
//! Conventions
//! -----------
//! - `Theta` and `Grad` have one entry per *varied* parameter, in the order
//!   of the objective's `arg_names`.
//! - `Cost` is the loss handed back by the likelihood collaborator
//!   (`-2 log L` by convention); the drivers minimize it directly.
//! - Name-keyed maps are `BTreeMap`s so iteration order is deterministic.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::{BFGS, DFP, LBFGS},
};
use ndarray::{Array1, Array2};
use std::collections::{BTreeMap, HashMap};

/// Varied-parameter vector `x`, positional against `arg_names`.
pub type Theta = Array1<f64>;

/// Gradient of the loss with respect to the varied parameters.
pub type Grad = Array1<f64>;

/// Dense `n × n` matrix over the varied parameters.
pub type Hessian = Array2<f64>;

/// Scalar loss minimized by the drivers.
pub type Cost = f64;

/// Parameters held fixed during a fit, keyed by name.
pub type FixedParams = BTreeMap<String, f64>;

/// Fitted values (or errors) keyed by parameter name.
pub type ParamMap = BTreeMap<String, f64>;

/// Function-evaluation counters as reported by the solver.
pub type FnEvalMap = HashMap<String, u64>;

/// Default history size (`m`) for L-BFGS runs.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Hager–Zhang line search specialized to this crate’s numeric types.
pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

/// More–Thuente line search specialized to this crate’s numeric types.
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// BFGS wired to the More–Thuente line search.
pub type BfgsMoreThuente = BFGS<MoreThuenteLS, Cost>;

/// BFGS wired to the Hager–Zhang line search.
pub type BfgsHagerZhang = BFGS<HagerZhangLS, Cost>;

/// DFP (variable-metric) wired to the More–Thuente line search.
pub type DfpMoreThuente = DFP<MoreThuenteLS, Cost>;

/// DFP (variable-metric) wired to the Hager–Zhang line search.
pub type DfpHagerZhang = DFP<HagerZhangLS, Cost>;

/// L-BFGS wired to the More–Thuente line search.
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
