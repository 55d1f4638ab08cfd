//! bestfit::outcome — driver results.
//!
//! Purpose
//! -------
//! Normalize what an Argmin run leaves behind into [`OptimOutcome`] (the
//! "low-level result") and wrap the user-facing answer of every driver in
//! [`BestFit`].
//!
//! Key behaviors
//! -------------
//! - [`OptimOutcome::new`] validates the best parameter vector and loss,
//!   maps the termination status into `(converged, status)`, and keeps the
//!   last gradient norm and inverse-Hessian estimate when available.
//! - `converged` is strict: only `SolverConverged` and `TargetCostReached`
//!   count. Hitting the iteration limit is a failure.
//! - [`BestFit`] is either a name → value map (varied ∪ fixed), the same
//!   with a `"<name>_error"` map, or the low-level outcome itself.
//!
//! Conventions
//! -----------
//! - `value` is the minimized loss (`-2 log L` for plain fits).
//! - `theta_hat`, `inv_hessian`, and `covariance` follow `arg_names` order.
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;

use crate::optimization::{
    errors::OptResult,
    objective::{
        types::{FixedParams, FnEvalMap, Grad, Hessian, ParamMap, Theta},
        validation::{validate_theta_hat, validate_value},
    },
};

/// Suffix appended to a parameter name in the error map.
pub const ERROR_SUFFIX: &str = "_error";

#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
    /// Final quasi-Newton inverse-Hessian estimate, when the solver keeps one.
    pub inv_hessian: Option<Hessian>,
    /// Parameter covariance, when the driver computed one.
    pub covariance: Option<Hessian>,
}

impl OptimOutcome {
    /// Build a validated [`OptimOutcome`] from raw solver state.
    ///
    /// # Errors
    /// - Propagates validation errors for `theta_hat` (missing or non-finite)
    ///   and `value` (non-finite).
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad: Option<Grad>, inv_hessian: Option<Hessian>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let converged = matches!(
            termination,
            TerminationStatus::Terminated(
                TerminationReason::SolverConverged | TerminationReason::TargetCostReached
            )
        );
        let status = match &termination {
            TerminationStatus::NotTerminated => "Not terminated".to_string(),
            TerminationStatus::Terminated(reason) => format!("{reason:?}"),
        };
        let iterations = iterations as usize;
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            iterations,
            fn_evals,
            grad_norm,
            inv_hessian,
            covariance: None,
        })
    }

    /// Standard errors from the covariance diagonal, if one is attached.
    pub fn errors(&self) -> Option<Theta> {
        self.covariance.as_ref().map(|c| c.diag().mapv(|v| v.max(0.0).sqrt()))
    }
}

/// Result of a best-fit driver.
#[derive(Debug, Clone, PartialEq)]
pub enum BestFit {
    /// Every parameter (varied ∪ fixed) mapped to its value.
    Values(ParamMap),
    /// Values plus `"<name>_error"` entries for the varied parameters.
    WithErrors { values: ParamMap, errors: ParamMap },
    /// Raw optimizer outcome; no post-processing applied.
    LowLevel(Box<OptimOutcome>),
}

impl BestFit {
    pub fn values(&self) -> Option<&ParamMap> {
        match self {
            BestFit::Values(values) | BestFit::WithErrors { values, .. } => Some(values),
            BestFit::LowLevel(_) => None,
        }
    }

    pub fn errors(&self) -> Option<&ParamMap> {
        match self {
            BestFit::WithErrors { errors, .. } => Some(errors),
            _ => None,
        }
    }

    pub fn lowlevel(&self) -> Option<&OptimOutcome> {
        match self {
            BestFit::LowLevel(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Fitted (or fixed) value of `name`.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values().and_then(|v| v.get(name).copied())
    }
}

/// `arg_names ↦ theta`, then the fixed map echoed unchanged.
pub fn merge_values(arg_names: &[String], theta: &Theta, fix: &FixedParams) -> ParamMap {
    let mut out: ParamMap = arg_names.iter().cloned().zip(theta.iter().copied()).collect();
    out.extend(fix.iter().map(|(k, v)| (k.clone(), *v)));
    out
}

/// `"<name>_error" ↦ error` for the varied parameters.
pub fn error_map(arg_names: &[String], errors: &Theta) -> ParamMap {
    arg_names.iter().map(|n| format!("{n}{ERROR_SUFFIX}")).zip(errors.iter().copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Strict convergence mapping from Argmin termination reasons.
    // - Value / error map construction.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Only solver convergence counts as converged.
    //
    // Given
    // -----
    // - `SolverConverged` and `MaxItersReached`.
    //
    // Expect
    // ------
    // - `true` and `false` respectively, with a status string.
    fn outcome_convergence_is_strict() {
        // Arrange
        let ok = TerminationStatus::Terminated(TerminationReason::SolverConverged);
        let maxed = TerminationStatus::Terminated(TerminationReason::MaxItersReached);

        // Act
        let a = OptimOutcome::new(Some(array![1.0]), 0.0, ok, 3, FnEvalMap::new(), None, None)
            .unwrap();
        let b = OptimOutcome::new(Some(array![1.0]), 0.0, maxed, 300, FnEvalMap::new(), None, None)
            .unwrap();

        // Assert
        assert!(a.converged);
        assert!(!b.converged);
        assert!(b.status.contains("MaxIters"));
    }

    #[test]
    // Purpose
    // -------
    // Non-finite losses and missing parameters are rejected.
    //
    // Given
    // -----
    // - value = +∞; theta = None.
    //
    // Expect
    // ------
    // - Both constructions fail.
    fn outcome_rejects_invalid_state() {
        let status = TerminationStatus::NotTerminated;
        assert!(
            OptimOutcome::new(Some(array![1.0]), f64::INFINITY, status.clone(), 0, FnEvalMap::new(), None, None)
                .is_err()
        );
        assert!(OptimOutcome::new(None, 0.0, status, 0, FnEvalMap::new(), None, None).is_err());
    }

    #[test]
    // Purpose
    // -------
    // Fixed values are echoed and errors get the name suffix.
    //
    // Given
    // -----
    // - arg_names `[mu]`, θ = [2], fixed `{s: 1}`, errors [0.5].
    //
    // Expect
    // ------
    // - `{mu: 2, s: 1}` and `{mu_error: 0.5}`.
    fn merge_values_echoes_fixed_and_suffixes_errors() {
        // Arrange
        let names = vec!["mu".to_string()];
        let fix = FixedParams::from([("s".to_string(), 1.0)]);

        // Act
        let values = merge_values(&names, &array![2.0], &fix);
        let errors = error_map(&names, &array![0.5]);

        // Assert
        assert_eq!(values.get("mu"), Some(&2.0));
        assert_eq!(values.get("s"), Some(&1.0));
        assert_eq!(errors.get("mu_error"), Some(&0.5));
    }
}
