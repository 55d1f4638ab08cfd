//! objective::interval — profile-likelihood residual for interval searches.
//!
//! Purpose
//! -------
//! Turn "find where the profile likelihood ratio crosses the critical value"
//! into a minimization: the objective is `Δ²` with
//! `Δ = (loss − ll_best) − t(x_target)`, so its minima are the crossings.
//!
//! Key behaviors
//! -------------
//! - [`CriticalValue::Wilks`] (default): `t = Φ⁻¹(q)²`, independent of the
//!   target value, derivative zero.
//! - [`CriticalValue::Custom`]: caller-supplied `t(x)` and `t'(x)` for
//!   finite-sample corrections. Both must be supplied together.
//! - Gradient `2Δ·(∂loss/∂x − t'(x_target)·e_target)`; the critical-value
//!   derivative enters only the target's component.
//!
//! Invariants & assumptions
//! ------------------------
//! - The quantile lies strictly in `(0, 1)`.
//! - The target parameter is one of the varied or fixed names.
use std::fmt;

use statrs::distribution::{ContinuousCDF, Normal};

use crate::optimization::{
    errors::{OptError, OptResult},
    objective::{
        adapter::{LossTransform, Objective},
        traits::ParamAssignment,
        types::{FixedParams, Grad},
        validation::verify_quantile,
    },
};

/// Scalar function of the target parameter value.
pub type CriticalFn = Box<dyn Fn(f64) -> f64>;

/// Critical value of the test statistic as a function of the target value.
pub enum CriticalValue {
    /// Asymptotic threshold from Wilks' theorem.
    Wilks { quantile: f64 },
    /// Caller-supplied threshold and its derivative.
    Custom { ppf: CriticalFn, ppf_grad: CriticalFn },
}

impl CriticalValue {
    /// Wilks threshold at `quantile`.
    ///
    /// # Errors
    /// [`OptError::InvalidQuantile`] unless `0 < quantile < 1`.
    pub fn wilks(quantile: f64) -> OptResult<Self> {
        verify_quantile(quantile)?;
        Ok(CriticalValue::Wilks { quantile })
    }

    /// Pick Wilks or a custom pair from optional parts.
    ///
    /// # Errors
    /// - [`OptError::InvalidQuantile`] for a quantile outside `(0, 1)`.
    /// - [`OptError::InvalidCriticalValue`] if only one of `ppf` and
    ///   `ppf_grad` is given.
    pub fn from_parts(
        quantile: f64, ppf: Option<CriticalFn>, ppf_grad: Option<CriticalFn>,
    ) -> OptResult<Self> {
        verify_quantile(quantile)?;
        match (ppf, ppf_grad) {
            (None, None) => Ok(CriticalValue::Wilks { quantile }),
            (Some(ppf), Some(ppf_grad)) => Ok(CriticalValue::Custom { ppf, ppf_grad }),
            (Some(_), None) => Err(OptError::InvalidCriticalValue {
                reason: "a custom critical value needs its derivative",
            }),
            (None, Some(_)) => Err(OptError::InvalidCriticalValue {
                reason: "a critical-value derivative was given without the function",
            }),
        }
    }

    pub fn value(&self, x: f64) -> f64 {
        match self {
            CriticalValue::Wilks { quantile } => wilks_threshold(*quantile),
            CriticalValue::Custom { ppf, .. } => ppf(x),
        }
    }

    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            CriticalValue::Wilks { .. } => 0.0,
            CriticalValue::Custom { ppf_grad, .. } => ppf_grad(x),
        }
    }
}

impl fmt::Debug for CriticalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriticalValue::Wilks { quantile } => {
                f.debug_struct("Wilks").field("quantile", quantile).finish()
            }
            CriticalValue::Custom { .. } => f.write_str("Custom { .. }"),
        }
    }
}

/// `Φ⁻¹(q)²`.
pub fn wilks_threshold(quantile: f64) -> f64 {
    match Normal::new(0.0, 1.0) {
        Ok(std_normal) => std_normal.inverse_cdf(quantile).powi(2),
        Err(_) => f64::NAN,
    }
}

/// Squared distance of the likelihood ratio to the critical value.
#[derive(Debug)]
pub struct ProfileLikelihoodRatio {
    pub ll_best: f64,
    pub target_parameter: String,
    pub critical: CriticalValue,
}

impl LossTransform for ProfileLikelihoodRatio {
    fn apply(
        &self, params: &ParamAssignment, arg_names: &[String], loss: f64, grad: &mut Grad,
    ) -> OptResult<f64> {
        let x = params
            .get(&self.target_parameter)
            .ok_or_else(|| OptError::UnknownParameter { name: self.target_parameter.clone() })?;
        let diff = (loss - self.ll_best) - self.critical.value(x);
        if let Some(k) = arg_names.iter().position(|n| *n == self.target_parameter) {
            grad[k] -= self.critical.derivative(x);
        }
        grad.mapv_inplace(|g| 2.0 * diff * g);
        Ok(diff * diff)
    }

    fn validate(&self, arg_names: &[String], fix: &FixedParams) -> OptResult<()> {
        if arg_names.contains(&self.target_parameter) || fix.contains_key(&self.target_parameter) {
            Ok(())
        } else {
            Err(OptError::UnknownParameter { name: self.target_parameter.clone() })
        }
    }
}

/// Objective used by the interval driver.
pub type IntervalObjective<'a, L> = Objective<'a, L, ProfileLikelihoodRatio>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::objective::{
        adapter::ObjectiveOptions,
        traits::{DiffRequest, LikelihoodEval, LogLikelihood},
    };
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The Wilks threshold and its construction guards.
    // - Value and gradient of the interval objective.
    // -------------------------------------------------------------------------

    /// loss = (mu - 3)^2 + s^2
    struct Parabola;

    impl LogLikelihood for Parabola {
        type Native = Vec<f64>;

        fn param_names(&self) -> Vec<String> {
            vec!["mu".to_string(), "s".to_string()]
        }

        fn minus_ll(
            &self, params: &ParamAssignment, request: &DiffRequest,
        ) -> OptResult<LikelihoodEval<Vec<f64>>> {
            let mu = params.get("mu").unwrap_or(0.0);
            let s = params.get("s").unwrap_or(0.0);
            let grad = params
                .names()
                .iter()
                .filter(|n| !request.is_omitted(n))
                .map(|n| if n == "mu" { 2.0 * (mu - 3.0) } else { 2.0 * s })
                .collect();
            Ok(LikelihoodEval { loss: (mu - 3.0).powi(2) + s * s, grad })
        }
    }

    fn interval_objective(critical: CriticalValue) -> ProfileLikelihoodRatio {
        ProfileLikelihoodRatio { ll_best: 0.0, target_parameter: "mu".to_string(), critical }
    }

    #[test]
    // Purpose
    // -------
    // The Wilks threshold at 90% is the squared normal quantile.
    //
    // Given
    // -----
    // - q = 0.9, Φ⁻¹(0.9) ≈ 1.2815516.
    //
    // Expect
    // ------
    // - t ≈ 1.6423744, derivative 0.
    fn wilks_threshold_matches_normal_quantile() {
        // Arrange
        let crit = CriticalValue::wilks(0.9).unwrap();

        // Act
        let t = crit.value(42.0);

        // Assert
        assert_abs_diff_eq!(t, 1.2815515655446004_f64.powi(2), epsilon = 1e-8);
        assert_eq!(crit.derivative(42.0), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Orphaned custom parts and bad quantiles are rejected eagerly.
    //
    // Given
    // -----
    // - A ppf without derivative, a derivative without ppf, and q = 1.5.
    //
    // Expect
    // ------
    // - `InvalidCriticalValue` twice, then `InvalidQuantile`.
    fn from_parts_rejects_incomplete_configuration() {
        // Arrange
        let ppf: CriticalFn = Box::new(|x| x);
        let grad: CriticalFn = Box::new(|_| 1.0);

        // Act
        let no_grad = CriticalValue::from_parts(0.9, Some(ppf), None);
        let no_ppf = CriticalValue::from_parts(0.9, None, Some(grad));
        let bad_q = CriticalValue::from_parts(1.5, None, None);

        // Assert
        assert!(matches!(no_grad, Err(OptError::InvalidCriticalValue { .. })));
        assert!(matches!(no_ppf, Err(OptError::InvalidCriticalValue { .. })));
        assert!(matches!(bad_q, Err(OptError::InvalidQuantile { .. })));
    }

    #[test]
    // Purpose
    // -------
    // At the best fit the objective equals the squared threshold.
    //
    // Given
    // -----
    // - ll_best = 0 at mu = 3, s = 0, Wilks at 0.9.
    //
    // Expect
    // ------
    // - Value ≈ t² and a zero gradient.
    fn interval_objective_at_best_fit_is_squared_threshold() {
        // Arrange
        let crit = CriticalValue::wilks(0.9).unwrap();
        let t = crit.value(3.0);
        let obj = IntervalObjective::with_transform(
            &Parabola,
            vec!["mu".to_string(), "s".to_string()],
            FixedParams::new(),
            interval_objective(crit),
            ObjectiveOptions::default(),
        )
        .unwrap();

        // Act
        let (fun, grad) = obj.fun_and_grad(&array![3.0, 0.0]).unwrap();

        // Assert
        assert_abs_diff_eq!(fun, t * t, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // A custom critical-value derivative enters only the target component.
    //
    // Given
    // -----
    // - t(x) = 0.5 x, t'(x) = 0.5; mu = 4, s = 1, ll_best = −1.
    // - Δ = (2 + 1) − 2 = 1.
    //
    // Expect
    // ------
    // - Value 1, grad = 2·1·[2 − 0.5, 2] = [3, 4].
    fn custom_critical_value_gradient_hits_target_only() {
        // Arrange
        let crit = CriticalValue::from_parts(
            0.9,
            Some(Box::new(|x| 0.5 * x)),
            Some(Box::new(|_| 0.5)),
        )
        .unwrap();
        let transform =
            ProfileLikelihoodRatio { ll_best: -1.0, target_parameter: "mu".to_string(), critical: crit };
        let obj = IntervalObjective::with_transform(
            &Parabola,
            vec!["mu".to_string(), "s".to_string()],
            FixedParams::new(),
            transform,
            ObjectiveOptions::default(),
        )
        .unwrap();

        // Act
        let (fun, grad) = obj.fun_and_grad(&array![4.0, 1.0]).unwrap();

        // Assert
        assert_abs_diff_eq!(fun, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[1], 4.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // An unknown target parameter is rejected at construction.
    //
    // Given
    // -----
    // - Target "nope".
    //
    // Expect
    // ------
    // - `UnknownParameter { name: "nope" }`.
    fn unknown_target_is_rejected() {
        // Arrange
        let transform = ProfileLikelihoodRatio {
            ll_best: 0.0,
            target_parameter: "nope".to_string(),
            critical: CriticalValue::Wilks { quantile: 0.9 },
        };

        // Act
        let res = IntervalObjective::with_transform(
            &Parabola,
            vec!["mu".to_string(), "s".to_string()],
            FixedParams::new(),
            transform,
            ObjectiveOptions::default(),
        );

        // Assert
        assert!(matches!(res, Err(OptError::UnknownParameter { .. })));
    }
}
