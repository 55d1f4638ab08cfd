//! objective::adapter — the `(loss, gradient)` function minimized by every driver.
//!
//! Purpose
//! -------
//! Wrap a [`LogLikelihood`] collaborator into a function of a flat vector of
//! varied parameters, so that any optimizer can minimize it without knowing
//! about parameter names, fixed parameters, or the collaborator's own vector
//! type.
//!
//! Key behaviors
//! -------------
//! - Merge the varied vector `x` (positional against `arg_names`) with the
//!   fixed map into one [`ParamAssignment`], and ask the collaborator to omit
//!   gradients for every fixed name.
//! - Pass the raw loss and gradient through a [`LossTransform`] (identity for
//!   plain fits, a profile-likelihood residual for interval searches).
//! - Replace a NaN loss with `nan_value` (default `+∞`) and log the
//!   offending point.
//! - Optionally memoize results keyed by the exact bit pattern of `x`.
//! - Expose `fun` / `grad` / `fun_and_grad` projections that all route
//!   through the same evaluation, and implement Argmin's `CostFunction` and
//!   `Gradient` on top of them.
//!
//! Invariants & assumptions
//! ------------------------
//! - `arg_names` and the fixed names are disjoint and together cover
//!   `lf.param_names()`; this is checked at construction.
//! - The gradient has one entry per varied name, in `arg_names` order.
//! - Memoization applies to the numeric entry point only. Calling the native
//!   entry point on a memoizing objective is rejected with
//!   `OptError::MemoizedNativeInput`.
//!
//! Conventions
//! -----------
//! - The numeric entry point ([`Objective::evaluate`]) takes and returns
//!   `ndarray` types; the native one ([`Objective::evaluate_native`]) takes
//!   and returns `L::Native`.
//! - The objective is built once per fit and dropped afterwards; its cache
//!   uses a `RefCell` and is not meant to be shared across threads.
//!
//! Downstream usage
//! ----------------
//! - The best-fit drivers build an [`Objective`] and hand it (or a bounded
//!   wrapper around it) to an Argmin `Executor`.
//! - The interval driver builds an [`IntervalObjective`](super::interval::IntervalObjective),
//!   which is this type with a profile-likelihood transform.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the fixed-parameter round trip, memoization call
//!   counts, NaN substitution, native-boundary conversion, and rejection of
//!   native input under memoization.
use std::{cell::RefCell, collections::HashMap};

use argmin::core::{CostFunction, Error, Gradient};
use ndarray::Array1;

use crate::optimization::{
    errors::{OptError, OptResult},
    objective::{
        traits::{DiffRequest, LogLikelihood, NativeVector, ParamAssignment},
        types::{Cost, FixedParams, Grad, Theta},
        validation::validate_param_sets,
    },
};

/// Construction options for an [`Objective`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveOptions {
    /// Cache results keyed by the exact input vector.
    pub memoize: bool,
    /// Loss reported in place of NaN.
    pub nan_value: f64,
}

impl ObjectiveOptions {
    /// # Errors
    /// Returns [`OptError::InvalidNanValue`] if `nan_value` is itself NaN.
    pub fn new(memoize: bool, nan_value: f64) -> OptResult<Self> {
        if nan_value.is_nan() {
            return Err(OptError::InvalidNanValue { value: nan_value });
        }
        Ok(Self { memoize, nan_value })
    }
}

impl Default for ObjectiveOptions {
    fn default() -> Self {
        Self { memoize: false, nan_value: f64::INFINITY }
    }
}

/// Post-processing applied to the collaborator's loss and gradient.
pub trait LossTransform {
    /// Map the raw `(loss, grad)` at `params` to the objective's own pair.
    ///
    /// `grad` is aligned with `arg_names` and may be rewritten in place.
    fn apply(
        &self, params: &ParamAssignment, arg_names: &[String], loss: f64, grad: &mut Grad,
    ) -> OptResult<f64>;

    /// Check that the transform makes sense for the given parameter split.
    fn validate(&self, _arg_names: &[String], _fix: &FixedParams) -> OptResult<()> {
        Ok(())
    }
}

/// The plain best-fit objective: loss and gradient pass through unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

impl LossTransform for Identity {
    fn apply(
        &self, _params: &ParamAssignment, _arg_names: &[String], loss: f64, _grad: &mut Grad,
    ) -> OptResult<f64> {
        Ok(loss)
    }
}

/// One evaluation of the objective.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveResult {
    pub fun: f64,
    pub grad: Grad,
}

/// Flat-vector view of a likelihood collaborator.
pub struct Objective<'a, L: LogLikelihood, T: LossTransform = Identity> {
    lf: &'a L,
    arg_names: Vec<String>,
    fix: FixedParams,
    request: DiffRequest,
    transform: T,
    opts: ObjectiveOptions,
    cache: RefCell<HashMap<Vec<u64>, ObjectiveResult>>,
}

impl<'a, L: LogLikelihood> Objective<'a, L, Identity> {
    /// Build a plain best-fit objective.
    ///
    /// # Errors
    /// Parameter-set errors from
    /// [`validate_param_sets`](crate::optimization::objective::validation::validate_param_sets).
    pub fn new(
        lf: &'a L, arg_names: Vec<String>, fix: FixedParams, opts: ObjectiveOptions,
    ) -> OptResult<Self> {
        Self::with_transform(lf, arg_names, fix, Identity, opts)
    }
}

impl<'a, L: LogLikelihood, T: LossTransform> Objective<'a, L, T> {
    /// Build an objective whose output goes through `transform`.
    ///
    /// # Errors
    /// - Parameter-set errors (unknown, duplicate, or missing names).
    /// - Whatever `transform.validate` rejects.
    pub fn with_transform(
        lf: &'a L, arg_names: Vec<String>, fix: FixedParams, transform: T,
        opts: ObjectiveOptions,
    ) -> OptResult<Self> {
        validate_param_sets(&lf.param_names(), &arg_names, &fix)?;
        transform.validate(&arg_names, &fix)?;
        let opts = ObjectiveOptions::new(opts.memoize, opts.nan_value)?;
        let request = DiffRequest::omitting(fix.keys().cloned());
        Ok(Self { lf, arg_names, fix, request, transform, opts, cache: RefCell::new(HashMap::new()) })
    }

    pub fn arg_names(&self) -> &[String] {
        &self.arg_names
    }

    pub fn fixed(&self) -> &FixedParams {
        &self.fix
    }

    pub fn options(&self) -> &ObjectiveOptions {
        &self.opts
    }

    pub fn request(&self) -> &DiffRequest {
        &self.request
    }

    pub fn likelihood(&self) -> &'a L {
        self.lf
    }

    /// Number of distinct points currently cached.
    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Full assignment for a varied vector: `arg_names` first, then fixed names.
    ///
    /// # Errors
    /// Returns [`OptError::ParamLengthMismatch`] if `values` does not match
    /// `arg_names` in length.
    pub fn assignment(&self, values: &[f64]) -> OptResult<ParamAssignment> {
        if values.len() != self.arg_names.len() {
            return Err(OptError::ParamLengthMismatch {
                expected: self.arg_names.len(),
                found: values.len(),
            });
        }
        let names = self.arg_names.iter().chain(self.fix.keys()).cloned().collect();
        let all_values = values.iter().copied().chain(self.fix.values().copied()).collect();
        ParamAssignment::new(names, all_values)
    }

    /// Evaluate on the numeric boundary, going through the cache when enabled.
    pub fn evaluate(&self, x: &Theta) -> OptResult<ObjectiveResult> {
        if !self.opts.memoize {
            return self.compute(x.to_vec());
        }
        let key: Vec<u64> = x.iter().map(|v| v.to_bits()).collect();
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(hit.clone());
        }
        let result = self.compute(x.to_vec())?;
        self.cache.borrow_mut().insert(key, result.clone());
        Ok(result)
    }

    /// Evaluate on the collaborator's native vector type.
    ///
    /// # Errors
    /// Returns [`OptError::MemoizedNativeInput`] when memoization is enabled.
    pub fn evaluate_native(&self, x: &L::Native) -> OptResult<(f64, L::Native)> {
        if self.opts.memoize {
            return Err(OptError::MemoizedNativeInput);
        }
        let result = self.compute(x.to_values())?;
        Ok((result.fun, L::Native::from_values(&result.grad.to_vec())))
    }

    pub fn fun_and_grad(&self, x: &Theta) -> OptResult<(f64, Grad)> {
        let r = self.evaluate(x)?;
        Ok((r.fun, r.grad))
    }

    pub fn fun(&self, x: &Theta) -> OptResult<f64> {
        Ok(self.evaluate(x)?.fun)
    }

    pub fn grad(&self, x: &Theta) -> OptResult<Grad> {
        Ok(self.evaluate(x)?.grad)
    }

    fn compute(&self, values: Vec<f64>) -> OptResult<ObjectiveResult> {
        let params = self.assignment(&values)?;
        let eval = self.lf.minus_ll(&params, &self.request)?;
        let mut grad = Array1::from(eval.grad.to_values());
        if grad.len() != self.arg_names.len() {
            return Err(OptError::GradientDimMismatch {
                expected: self.arg_names.len(),
                found: grad.len(),
            });
        }
        let mut fun = self.transform.apply(&params, &self.arg_names, eval.loss, &mut grad)?;
        if fun.is_nan() {
            log::warn!("Objective at {values:?} is NaN, reporting {}", self.opts.nan_value);
            fun = self.opts.nan_value;
        }
        Ok(ObjectiveResult { fun, grad })
    }
}

impl<'a, L: LogLikelihood, T: LossTransform> CostFunction for Objective<'a, L, T> {
    type Param = Theta;
    type Output = Cost;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.fun(theta)?)
    }
}

impl<'a, L: LogLikelihood, T: LossTransform> Gradient for Objective<'a, L, T> {
    type Param = Theta;
    type Gradient = Grad;

    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        Ok(self.grad(theta)?)
    }
}

// Borrowed objectives can be handed to an executor and inspected afterwards.
impl<'a, L: LogLikelihood, T: LossTransform> CostFunction for &Objective<'a, L, T> {
    type Param = Theta;
    type Output = Cost;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        Ok((**self).fun(theta)?)
    }
}

impl<'a, L: LogLikelihood, T: LossTransform> Gradient for &Objective<'a, L, T> {
    type Param = Theta;
    type Gradient = Grad;

    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        Ok((**self).grad(theta)?)
    }
}
