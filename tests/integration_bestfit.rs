//! Integration tests for the best-fit and interval drivers.
//!
//! Purpose
//! -------
//! - Run every driver end to end on a one-parameter rate-multiplier
//!   likelihood whose minimum and curvature are known in closed form.
//! - Check that the interval driver lands on the crossing of the profile
//!   likelihood ratio with the Wilks critical value.
//!
//! Coverage
//! --------
//! - `optimization::bestfit`:
//!   - `bestfit_bfgs`, `bestfit_variable_metric` and `bestfit_bounded`
//!     converging to the analytic minimum from a zero guess.
//!   - Curvature-based errors from the variable-metric driver.
//!   - Non-negativity of rate multipliers in the bounded driver.
//!   - `one_parameter_interval` on both sides of the best fit, including
//!     searches that start at the best fit itself.
//! - `optimization::objective`:
//!   - The collaborator contract through a stub with call counting.
//!
//! Exclusions
//! ----------
//! - Guards, option validation and cache behavior of the objective are
//!   covered by unit tests.
//! - Real detector likelihoods; the stub stands in for the tensor engine.
use std::cell::Cell;

use approx::assert_abs_diff_eq;
use lxe_fit::optimization::{
    bestfit::{
        BfgsOptions, BoundedOptions, IntervalOptions, VariableMetricOptions, bestfit_bfgs,
        bestfit_bounded, bestfit_variable_metric, one_parameter_interval,
    },
    errors::{OptError, OptResult},
    objective::{
        CriticalValue, DiffRequest, FixedParams, LikelihoodEval, LogLikelihood, ParamAssignment,
        ParamMap, interval::wilks_threshold,
    },
};
use ndarray::array;

/// `(x − 3)²` in a single `rate_multiplier` parameter.
#[derive(Default)]
struct RateParabola {
    calls: Cell<usize>,
}

impl LogLikelihood for RateParabola {
    type Native = Vec<f64>;

    fn param_names(&self) -> Vec<String> {
        vec!["rate_multiplier".to_string()]
    }

    fn minus_ll(
        &self, params: &ParamAssignment, request: &DiffRequest,
    ) -> OptResult<LikelihoodEval<Vec<f64>>> {
        self.calls.set(self.calls.get() + 1);
        let x = params
            .get("rate_multiplier")
            .ok_or_else(|| OptError::MissingParameter { name: "rate_multiplier".to_string() })?;
        let grad = if request.is_omitted("rate_multiplier") { vec![] } else { vec![2.0 * (x - 3.0)] };
        Ok(LikelihoodEval { loss: (x - 3.0).powi(2), grad })
    }
}

/// `(x − 3)² + (x − 3)·(y + 1)/2 + (y + 1)²` with `x` a rate multiplier.
struct CoupledRate;

impl LogLikelihood for CoupledRate {
    type Native = Vec<f64>;

    fn param_names(&self) -> Vec<String> {
        vec!["er_rate_multiplier".to_string(), "shift".to_string()]
    }

    fn minus_ll(
        &self, params: &ParamAssignment, request: &DiffRequest,
    ) -> OptResult<LikelihoodEval<Vec<f64>>> {
        let x = params.get("er_rate_multiplier").unwrap_or(0.0) - 3.0;
        let y = params.get("shift").unwrap_or(0.0) + 1.0;
        let grad = params
            .names()
            .iter()
            .filter(|n| !request.is_omitted(n))
            .map(|n| if n == "shift" { 0.5 * x + 2.0 * y } else { 2.0 * x + 0.5 * y })
            .collect();
        Ok(LikelihoodEval { loss: x * x + 0.5 * x * y + y * y, grad })
    }
}

fn rate_args() -> Vec<String> {
    vec!["rate_multiplier".to_string()]
}

#[test]
// Purpose
// -------
// All three best-fit drivers find the minimum of the rate parabola.
//
// Given
// -----
// - Guess 0, no fixed parameters, default options.
//
// Expect
// ------
// - rate_multiplier ≈ 3 for each driver (bounded within its looser tolerance).
fn every_driver_reaches_the_minimum() {
    // Arrange
    let lf = RateParabola::default();
    let guess = array![0.0];
    let fix = FixedParams::new();

    // Act
    let bfgs = bestfit_bfgs(&lf, &rate_args(), &guess, &fix, &BfgsOptions::default()).unwrap();
    let vm =
        bestfit_variable_metric(&lf, &rate_args(), &guess, &fix, &VariableMetricOptions::default())
            .unwrap();
    let bounded =
        bestfit_bounded(&lf, &rate_args(), &guess, &fix, &BoundedOptions::default()).unwrap();

    // Assert
    assert_abs_diff_eq!(bfgs.get("rate_multiplier").unwrap(), 3.0, epsilon = 1e-3);
    assert_abs_diff_eq!(vm.get("rate_multiplier").unwrap(), 3.0, epsilon = 1e-3);
    assert_abs_diff_eq!(bounded.get("rate_multiplier").unwrap(), 3.0, epsilon = 1e-2);
    assert!(lf.calls.get() > 0);
}

#[test]
// Purpose
// -------
// The variable-metric driver reports curvature-based errors.
//
// Given
// -----
// - Loss (x − 3)², errordef 0.5, HESSE on and off.
//
// Expect
// ------
// - rate_multiplier_error ≈ sqrt(2 · 0.5 / 2) ≈ 0.707 with HESSE; the
//   optimizer's own inverse-Hessian estimate lands within 5%.
fn variable_metric_errors_match_curvature() {
    // Arrange
    let lf = RateParabola::default();
    let hesse = VariableMetricOptions { return_errors: true, ..Default::default() };
    let no_hesse = VariableMetricOptions { use_hessian: false, ..hesse.clone() };
    let expected = (0.5_f64).sqrt();

    // Act
    let with =
        bestfit_variable_metric(&lf, &rate_args(), &array![0.0], &FixedParams::new(), &hesse)
            .unwrap();
    let without =
        bestfit_variable_metric(&lf, &rate_args(), &array![0.0], &FixedParams::new(), &no_hesse)
            .unwrap();

    // Assert
    let err = with.errors().unwrap()["rate_multiplier_error"];
    assert_abs_diff_eq!(err, expected, epsilon = 1e-3);
    let approx_err = without.errors().unwrap()["rate_multiplier_error"];
    assert!((approx_err - expected).abs() < 0.05 * expected, "{approx_err}");
}

#[test]
// Purpose
// -------
// Rate multipliers stay non-negative under the bounded driver.
//
// Given
// -----
// - A coupled two-parameter loss whose unconstrained minimum has
//   er_rate_multiplier = 3; guesses on both sides of zero; and a fixed
//   shift pushing the constrained optimum to the boundary.
//
// Expect
// ------
// - er_rate_multiplier ≥ 0 in every fit; the fixed value is echoed.
fn bounded_driver_keeps_rate_multipliers_non_negative() {
    // Arrange
    let args = vec!["er_rate_multiplier".to_string(), "shift".to_string()];
    let opts = BoundedOptions::default();
    let pinned = FixedParams::from([("shift".to_string(), 40.0)]);

    // Act / Assert
    for guess in [array![-5.0, 0.0], array![0.0, 0.0], array![10.0, -3.0]] {
        let fit = bestfit_bounded(&CoupledRate, &args, &guess, &FixedParams::new(), &opts).unwrap();
        let x = fit.get("er_rate_multiplier").unwrap();
        assert!(x >= 0.0, "{x}");
        assert_abs_diff_eq!(x, 3.0, epsilon = 5e-2);
    }
    let edge = bestfit_bounded(
        &CoupledRate,
        &args[..1],
        &array![1.0],
        &pinned,
        &opts,
    )
    .unwrap();
    assert!(edge.get("er_rate_multiplier").unwrap() >= 0.0);
    assert!(edge.get("er_rate_multiplier").unwrap() < 1e-2);
    assert_eq!(edge.get("shift"), Some(40.0));
}

#[test]
// Purpose
// -------
// The interval driver finds the Wilks crossing on either side.
//
// Given
// -----
// - ll_best = 0 at x = 3; quantile 0.9; bounds (3, 10) and (−5, 3);
//   guesses 3.5 and 2.5.
//
// Expect
// ------
// - (x − 3)² = crit within 1e-3 on both sides; upper > 3 > lower.
fn interval_hits_the_critical_value() {
    // Arrange
    let lf = RateParabola::default();
    let crit = wilks_threshold(0.9);
    let opts = IntervalOptions::default();
    let upper_guess = ParamMap::from([("rate_multiplier".to_string(), 3.5)]);
    let lower_guess = ParamMap::from([("rate_multiplier".to_string(), 2.5)]);

    // Act
    let upper = one_parameter_interval(
        &lf,
        "rate_multiplier",
        (3.0, 10.0),
        &upper_guess,
        0.0,
        CriticalValue::wilks(0.9).unwrap(),
        &opts,
    )
    .unwrap();
    let lower = one_parameter_interval(
        &lf,
        "rate_multiplier",
        (-5.0, 3.0),
        &lower_guess,
        0.0,
        CriticalValue::wilks(0.9).unwrap(),
        &opts,
    )
    .unwrap();

    // Assert
    assert!(upper > 3.0 && lower < 3.0);
    assert_abs_diff_eq!((upper - 3.0).powi(2), crit, epsilon = 1e-3);
    assert_abs_diff_eq!((lower - 3.0).powi(2), crit, epsilon = 1e-3);
}

#[test]
// Purpose
// -------
// Interval searches started from the fitted best point reach the crossing.
//
// Given
// -----
// - Best fit from `bestfit_bfgs` (x ≈ 3) used as ll_best and as the guess;
//   bounds (x̂, 10) and (−5, x̂); quantile 0.9.
//
// Expect
// ------
// - (x − x̂)² ≈ crit within 1e-2 on both sides, never the best fit itself.
fn interval_from_best_fit_guess() {
    // Arrange
    let lf = RateParabola::default();
    let fit =
        bestfit_bfgs(&lf, &rate_args(), &array![0.0], &FixedParams::new(), &BfgsOptions::default())
            .unwrap();
    let best = fit.values().unwrap().clone();
    let x_hat = best["rate_multiplier"];
    let ll_best = (x_hat - 3.0).powi(2);
    let crit = wilks_threshold(0.9);
    let opts = IntervalOptions::default();

    // Act
    let upper = one_parameter_interval(
        &lf,
        "rate_multiplier",
        (x_hat, 10.0),
        &best,
        ll_best,
        CriticalValue::wilks(0.9).unwrap(),
        &opts,
    )
    .unwrap();
    let lower = one_parameter_interval(
        &lf,
        "rate_multiplier",
        (-5.0, x_hat),
        &best,
        ll_best,
        CriticalValue::wilks(0.9).unwrap(),
        &opts,
    )
    .unwrap();

    // Assert
    assert!(upper - x_hat > 1.0 && x_hat - lower > 1.0);
    assert_abs_diff_eq!((upper - 3.0).powi(2), crit, epsilon = 1e-2);
    assert_abs_diff_eq!((lower - 3.0).powi(2), crit, epsilon = 1e-2);
}

#[test]
// Purpose
// -------
// The interval driver rejects a target the likelihood does not know.
//
// Given
// -----
// - parameter "mu" on the rate parabola.
//
// Expect
// ------
// - OptError::UnknownParameter.
fn interval_rejects_unknown_target() {
    // Arrange
    let guess = ParamMap::from([("rate_multiplier".to_string(), 3.5)]);

    // Act
    let err = one_parameter_interval(
        &RateParabola::default(),
        "mu",
        (3.0, 10.0),
        &guess,
        0.0,
        CriticalValue::wilks(0.9).unwrap(),
        &IntervalOptions::default(),
    )
    .unwrap_err();

    // Assert
    assert_eq!(err, OptError::UnknownParameter { name: "mu".to_string() });
}
