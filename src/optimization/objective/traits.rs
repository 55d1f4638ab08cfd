//! Public contract between the objective layer and a likelihood collaborator.
//!
//! - [`LogLikelihood`]: trait the likelihood engine implements.
//! - [`ParamAssignment`]: ordered, complete `name → value` assignment.
//! - [`DiffRequest`]: explicit set of names whose gradients must be omitted.
//! - [`NativeVector`]: the collaborator's own vector type, kept behind a
//!   conversion boundary so optimizers only ever see [`Theta`]/[`Grad`].
//!
//! Convention: the collaborator returns a *loss* (`-2 log L`) and its gradient.
//! The gradient has one entry per non-omitted name, in assignment order.
use std::collections::BTreeSet;

use ndarray::Array1;

use crate::optimization::{
    errors::{OptError, OptResult},
    numerical_stability::transformations::invert_hessian,
    objective::{
        finite_diff::compute_hessian_fallible,
        types::{Grad, Hessian, Theta},
    },
};

/// Vector type native to the likelihood collaborator.
///
/// The objective converts between this type and plain `f64` slices only at
/// its boundary; nothing downstream of the adapter depends on it.
pub trait NativeVector: Clone {
    fn from_values(values: &[f64]) -> Self;
    fn to_values(&self) -> Vec<f64>;
}

impl NativeVector for Array1<f64> {
    fn from_values(values: &[f64]) -> Self {
        Array1::from(values.to_vec())
    }

    fn to_values(&self) -> Vec<f64> {
        self.to_vec()
    }
}

impl NativeVector for Vec<f64> {
    fn from_values(values: &[f64]) -> Self {
        values.to_vec()
    }

    fn to_values(&self) -> Vec<f64> {
        self.clone()
    }
}

/// Ordered `name → value` assignment covering every likelihood parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamAssignment {
    names: Vec<String>,
    values: Vec<f64>,
}

impl ParamAssignment {
    /// Pair `names` with `values` positionally.
    ///
    /// # Errors
    /// - [`OptError::ParamLengthMismatch`] when the lengths differ.
    /// - [`OptError::DuplicateParameter`] when a name repeats.
    pub fn new(names: Vec<String>, values: Vec<f64>) -> OptResult<Self> {
        if names.len() != values.len() {
            return Err(OptError::ParamLengthMismatch {
                expected: names.len(),
                found: values.len(),
            });
        }
        let mut seen = BTreeSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(OptError::DuplicateParameter { name: name.clone() });
            }
        }
        Ok(Self { names, values })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.position(name).map(|i| self.values[i])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    /// Overwrite the value at `index`; out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, value: f64) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }
}

/// Differentiation request passed alongside a [`ParamAssignment`].
///
/// Names in the omit-set receive no gradient entry. The remaining names are
/// differentiated, and the gradient follows their order in the assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffRequest {
    omit: BTreeSet<String>,
}

impl DiffRequest {
    /// Differentiate with respect to every parameter.
    pub fn all() -> Self {
        Self::default()
    }

    /// Skip gradients for the given names.
    pub fn omitting<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { omit: names.into_iter().map(Into::into).collect() }
    }

    pub fn is_omitted(&self, name: &str) -> bool {
        self.omit.contains(name)
    }

    pub fn omitted(&self) -> impl Iterator<Item = &str> + '_ {
        self.omit.iter().map(String::as_str)
    }

    /// Positions in `params` whose gradient the collaborator must return.
    pub fn differentiated(&self, params: &ParamAssignment) -> Vec<usize> {
        params
            .names()
            .iter()
            .enumerate()
            .filter(|(_, name)| !self.is_omitted(name))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Loss and gradient as returned by the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct LikelihoodEval<N> {
    pub loss: f64,
    pub grad: N,
}

/// Likelihood collaborator interface.
///
/// Required:
/// - `param_names()`: every parameter the likelihood expects, in a stable order.
/// - `minus_ll(params, request)`: loss and gradient, the gradient restricted to
///   the names `request` does not omit, in assignment order.
///
/// Optional:
/// - `inverse_hessian(params, request)`: inverse Hessian of the loss over the
///   differentiated names. Defaults to a finite-difference Hessian of the
///   collaborator's own gradient, inverted with `nalgebra`.
/// - `check(params)`: validation hook called once before a fit.
pub trait LogLikelihood {
    type Native: NativeVector;

    // Required methods
    fn param_names(&self) -> Vec<String>;
    fn minus_ll(
        &self, params: &ParamAssignment, request: &DiffRequest,
    ) -> OptResult<LikelihoodEval<Self::Native>>;

    // Optional methods
    fn inverse_hessian(&self, params: &ParamAssignment, request: &DiffRequest) -> OptResult<Hessian> {
        let free = request.differentiated(params);
        let theta0: Theta = free.iter().map(|&i| params.values()[i]).collect();
        let grad_fn = |theta: &Theta| -> OptResult<Grad> {
            let mut trial = params.clone();
            for (k, &i) in free.iter().enumerate() {
                trial.set(i, theta[k]);
            }
            let eval = self.minus_ll(&trial, request)?;
            Ok(Array1::from(eval.grad.to_values()))
        };
        let hess = compute_hessian_fallible(grad_fn, &theta0)?;
        invert_hessian(&hess)
    }

    fn check(&self, _params: &ParamAssignment) -> OptResult<()> {
        Ok(())
    }
}
