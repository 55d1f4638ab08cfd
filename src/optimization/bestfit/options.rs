//! Configuration for the best-fit and interval drivers.
//!
//! - [`Tolerances`]: stopping rules shared by the quasi-Newton drivers.
//! - [`LineSearcher`]: line search used inside BFGS / DFP.
//! - [`BfgsOptions`], [`VariableMetricOptions`], [`BoundedOptions`],
//!   [`IntervalOptions`]: one option struct per driver.
//!
//! Every struct has a validating `new` and a `Default` carrying the
//! documented defaults.
use std::{collections::BTreeMap, str::FromStr};

use crate::optimization::{
    errors::{OptError, OptResult},
    objective::{
        types::DEFAULT_LBFGS_MEM,
        validation::{verify_llr_tolerance, verify_tol_cost, verify_tol_grad},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    /// Parse a line-search choice from a string (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Rules
    /// - At least one of `tol_grad`, `tol_cost`, or `max_iter` must be `Some`.
    /// - If provided, tolerances must be **finite and strictly positive**.
    /// - If provided, `max_iter` must be `> 0`.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all three are `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for bad tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        verify_max_iter(max_iter)?;
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { tol_grad: Some(1e-6), tol_cost: None, max_iter: Some(300) }
    }
}

fn verify_max_iter(max_iter: Option<usize>) -> OptResult<()> {
    if max_iter == Some(0) {
        return Err(OptError::InvalidMaxIter {
            max_iter: 0,
            reason: "Maximum iterations must be greater than zero.",
        });
    }
    Ok(())
}

fn verify_lbfgs_mem(mem: usize) -> OptResult<()> {
    if mem == 0 {
        return Err(OptError::InvalidLBFGSMem {
            mem,
            reason: "L-BFGS memory must be greater than zero.",
        });
    }
    Ok(())
}

fn verify_positive_tol(tol: f64) -> OptResult<()> {
    verify_tol_grad(Some(tol))
}

/// Options for [`bestfit_bfgs`](super::bfgs::bestfit_bfgs).
#[derive(Debug, Clone, PartialEq)]
pub struct BfgsOptions {
    /// Seed BFGS with the collaborator's inverse Hessian at the guess.
    pub use_hessian: bool,
    /// Absolute `-2 log L` change below which the fit is considered done.
    /// Ignored when `tols.tol_cost` is set explicitly.
    pub llr_tolerance: Option<f64>,
    pub get_lowlevel_result: bool,
    pub line_searcher: LineSearcher,
    pub tols: Tolerances,
    pub verbose: bool,
}

impl BfgsOptions {
    pub fn new(
        use_hessian: bool, llr_tolerance: Option<f64>, get_lowlevel_result: bool,
        line_searcher: LineSearcher, tols: Tolerances, verbose: bool,
    ) -> OptResult<Self> {
        verify_llr_tolerance(llr_tolerance)?;
        Ok(Self { use_hessian, llr_tolerance, get_lowlevel_result, line_searcher, tols, verbose })
    }
}

impl Default for BfgsOptions {
    fn default() -> Self {
        Self {
            use_hessian: true,
            llr_tolerance: Some(0.1),
            get_lowlevel_result: false,
            line_searcher: LineSearcher::MoreThuente,
            tols: Tolerances::default(),
            verbose: false,
        }
    }
}

/// Options for [`bestfit_variable_metric`](super::variable_metric::bestfit_variable_metric).
#[derive(Debug, Clone, PartialEq)]
pub struct VariableMetricOptions {
    /// Recompute errors from the curvature at the minimum after convergence.
    pub use_hessian: bool,
    pub return_errors: bool,
    pub get_lowlevel_result: bool,
    /// Loss increase that defines a one-sigma error (the `up` of the error analysis).
    pub errordef: f64,
    /// Default initial step as a fraction of `|guess|`.
    pub step_fraction: f64,
    /// Per-parameter initial step overrides.
    pub step_sizes: BTreeMap<String, f64>,
    pub line_searcher: LineSearcher,
    pub tols: Tolerances,
    pub verbose: bool,
}

impl VariableMetricOptions {
    /// # Errors
    /// - [`OptError::InvalidErrordef`] unless `errordef` is finite and positive.
    /// - [`OptError::InvalidStepSize`] for a non-positive `step_fraction`.
    pub fn new(
        use_hessian: bool, return_errors: bool, errordef: f64, step_fraction: f64,
        tols: Tolerances,
    ) -> OptResult<Self> {
        if !(errordef.is_finite() && errordef > 0.0) {
            return Err(OptError::InvalidErrordef { value: errordef });
        }
        if !(step_fraction.is_finite() && step_fraction > 0.0) {
            return Err(OptError::InvalidStepSize {
                name: "step_fraction".to_string(),
                value: step_fraction,
            });
        }
        Ok(Self { use_hessian, return_errors, errordef, step_fraction, tols, ..Self::default() })
    }

    /// Override the initial step for one parameter.
    ///
    /// # Errors
    /// [`OptError::InvalidStepSize`] unless `step` is finite and positive.
    pub fn with_step(mut self, name: &str, step: f64) -> OptResult<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(OptError::InvalidStepSize { name: name.to_string(), value: step });
        }
        self.step_sizes.insert(name.to_string(), step);
        Ok(self)
    }
}

impl Default for VariableMetricOptions {
    fn default() -> Self {
        Self {
            use_hessian: true,
            return_errors: false,
            get_lowlevel_result: false,
            errordef: 0.5,
            step_fraction: 0.1,
            step_sizes: BTreeMap::new(),
            line_searcher: LineSearcher::MoreThuente,
            tols: Tolerances::default(),
            verbose: false,
        }
    }
}

/// Options for [`bestfit_bounded`](super::bounded::bestfit_bounded).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedOptions {
    /// Gradient tolerance; the cost tolerance is derived from it.
    pub tol: f64,
    pub lbfgs_mem: usize,
    pub max_iter: Option<usize>,
    /// Lower bound applied to rate multipliers.
    pub rate_multiplier_floor: f64,
    pub get_lowlevel_result: bool,
    pub verbose: bool,
}

impl BoundedOptions {
    pub fn new(
        tol: f64, lbfgs_mem: usize, max_iter: Option<usize>, rate_multiplier_floor: f64,
    ) -> OptResult<Self> {
        verify_positive_tol(tol)?;
        verify_lbfgs_mem(lbfgs_mem)?;
        verify_max_iter(max_iter)?;
        if !(rate_multiplier_floor.is_finite() && rate_multiplier_floor >= 0.0) {
            return Err(OptError::InvalidBound {
                name: "rate_multiplier_floor".to_string(),
                lower: rate_multiplier_floor,
                upper: f64::INFINITY,
            });
        }
        Ok(Self { tol, lbfgs_mem, max_iter, rate_multiplier_floor, ..Self::default() })
    }
}

impl Default for BoundedOptions {
    fn default() -> Self {
        Self {
            tol: 5e-3,
            lbfgs_mem: DEFAULT_LBFGS_MEM,
            max_iter: Some(300),
            rate_multiplier_floor: 1e-9,
            get_lowlevel_result: false,
            verbose: false,
        }
    }
}

/// Options for [`one_parameter_interval`](super::interval::one_parameter_interval).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalOptions {
    pub tol: f64,
    pub lbfgs_mem: usize,
    pub max_iter: Option<usize>,
    pub rate_multiplier_floor: f64,
    /// Largest `|Δ|` (in loss units) accepted as reaching the critical value.
    pub max_residual: f64,
    pub verbose: bool,
}

impl IntervalOptions {
    pub fn new(tol: f64, lbfgs_mem: usize, max_iter: Option<usize>) -> OptResult<Self> {
        verify_positive_tol(tol)?;
        verify_lbfgs_mem(lbfgs_mem)?;
        verify_max_iter(max_iter)?;
        Ok(Self { tol, lbfgs_mem, max_iter, ..Self::default() })
    }

    /// The bounded-driver configuration this interval search runs with.
    pub fn as_bounded(&self) -> BoundedOptions {
        BoundedOptions {
            tol: self.tol,
            lbfgs_mem: self.lbfgs_mem,
            max_iter: self.max_iter,
            rate_multiplier_floor: self.rate_multiplier_floor,
            get_lowlevel_result: false,
            verbose: self.verbose,
        }
    }
}

impl Default for IntervalOptions {
    fn default() -> Self {
        Self {
            tol: 1e-5,
            lbfgs_mem: DEFAULT_LBFGS_MEM,
            max_iter: Some(500),
            rate_multiplier_floor: 1e-9,
            max_residual: 1e-2,
            verbose: false,
        }
    }
}
