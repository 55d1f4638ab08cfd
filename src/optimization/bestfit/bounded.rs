//! bestfit::bounded — box-constrained quasi-Newton driver.
//!
//! Purpose
//! -------
//! Minimize the loss under simple bounds: every parameter whose name ends in
//! `rate_multiplier` is kept at or above a small positive floor, all others
//! are free. The interval driver reuses the same machinery with one bound
//! overridden.
//!
//! Key behaviors
//! -------------
//! - [`BoundedProblem`] presents the objective to L-BFGS as a function on
//!   the whole space: every query point is clamped into the box before
//!   evaluation, and gradient components that push an active coordinate out
//!   of its box are zeroed. A minimum on the boundary therefore shows up as
//!   a zero projected gradient.
//! - The initial guess is clamped into the box; the reported optimum is
//!   clamped as well, so returned values always satisfy the bounds.
//! - The objective always memoizes (line searches re-query points) and
//!   always runs on the numeric boundary.
//! - Non-convergence is logged; the last best point is still returned.
//!
//! Invariants & assumptions
//! ------------------------
//! - `bounds.len() == arg_names.len()` and every bound has `lower < upper`.
use argmin::core::{CostFunction, Error, Gradient};

use crate::optimization::{
    bestfit::{
        builders::build_lbfgs_more_thuente,
        options::{BoundedOptions, Tolerances},
        outcome::{BestFit, OptimOutcome, merge_values},
        run::{RunSettings, run_lbfgs},
    },
    errors::{OptError, OptResult},
    numerical_stability::transformations::{
        Bound, clamp_to_bounds, parameter_bounds, project_gradient,
    },
    objective::{
        adapter::{LossTransform, Objective, ObjectiveOptions},
        traits::LogLikelihood,
        types::{Cost, FixedParams, Grad, Theta},
        validation::verify_bound,
    },
};

/// Objective restricted to a box by clamping and gradient projection.
pub struct BoundedProblem<'o, 'a, L: LogLikelihood, T: LossTransform> {
    objective: &'o Objective<'a, L, T>,
    bounds: Vec<Bound>,
}

impl<'o, 'a, L: LogLikelihood, T: LossTransform> BoundedProblem<'o, 'a, L, T> {
    /// # Errors
    /// - `OptError::ParamLengthMismatch` if `bounds` does not match the
    ///   objective's varied parameters.
    /// - `OptError::InvalidBound` for an empty or NaN bound.
    pub fn new(objective: &'o Objective<'a, L, T>, bounds: Vec<Bound>) -> OptResult<Self> {
        let names = objective.arg_names();
        if bounds.len() != names.len() {
            return Err(OptError::ParamLengthMismatch { expected: names.len(), found: bounds.len() });
        }
        for (name, &bound) in names.iter().zip(&bounds) {
            verify_bound(name, bound)?;
        }
        Ok(Self { objective, bounds })
    }

    pub fn bounds(&self) -> &[Bound] {
        &self.bounds
    }

    pub fn clamp(&self, theta: &Theta) -> Theta {
        clamp_to_bounds(theta, &self.bounds)
    }
}

impl<L: LogLikelihood, T: LossTransform> CostFunction for BoundedProblem<'_, '_, L, T> {
    type Param = Theta;
    type Output = Cost;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.objective.fun(&self.clamp(theta))?)
    }
}

impl<L: LogLikelihood, T: LossTransform> Gradient for BoundedProblem<'_, '_, L, T> {
    type Param = Theta;
    type Gradient = Grad;

    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let inside = self.clamp(theta);
        let grad = self.objective.grad(&inside)?;
        Ok(project_gradient(&inside, &grad, &self.bounds))
    }
}

/// bestfit_bounded — L-BFGS fit with rate multipliers kept non-negative.
///
/// Parameters
/// ----------
/// - `lf`: likelihood collaborator.
/// - `arg_names`: varied parameter names; `x_guess` is positional against it.
/// - `fix`: parameters held fixed; echoed unchanged in the result.
/// - `opts`: see [`BoundedOptions`].
///
/// Errors
/// ------
/// - Parameter-set errors from the objective.
/// - Errors raised by `lf.check` or `lf.minus_ll`, and Argmin runtime errors.
pub fn bestfit_bounded<L: LogLikelihood>(
    lf: &L, arg_names: &[String], x_guess: &Theta, fix: &FixedParams, opts: &BoundedOptions,
) -> OptResult<BestFit> {
    let objective = Objective::new(lf, arg_names.to_vec(), fix.clone(), memoized())?;
    let guess = objective.assignment(&x_guess.to_vec())?;
    lf.check(&guess)?;

    let bounds = parameter_bounds(arg_names, opts.rate_multiplier_floor);
    let outcome = minimize_in_box(&objective, x_guess, bounds, opts)?;

    if opts.get_lowlevel_result {
        return Ok(BestFit::LowLevel(Box::new(outcome)));
    }
    Ok(BestFit::Values(merge_values(arg_names, &outcome.theta_hat, fix)))
}

/// minimize_in_box — run L-BFGS on `objective` restricted to `bounds`.
///
/// The returned outcome's `theta_hat` lies inside the box.
///
/// # Errors
/// - Bound validation errors from [`BoundedProblem::new`].
/// - Solver construction errors and Argmin runtime errors.
pub fn minimize_in_box<L: LogLikelihood, T: LossTransform>(
    objective: &Objective<'_, L, T>, x_guess: &Theta, bounds: Vec<Bound>, opts: &BoundedOptions,
) -> OptResult<OptimOutcome> {
    let problem = BoundedProblem::new(objective, bounds)?;
    let theta0 = problem.clamp(x_guess);
    let bounds = problem.bounds().to_vec();

    let tols = Tolerances { tol_grad: Some(opts.tol), tol_cost: None, max_iter: opts.max_iter };
    let solver = build_lbfgs_more_thuente(opts.lbfgs_mem, &tols)?;
    let settings = RunSettings { max_iter: opts.max_iter, verbose: opts.verbose };
    let mut outcome = run_lbfgs(problem, solver, theta0, settings)?;
    outcome.theta_hat = clamp_to_bounds(&outcome.theta_hat, &bounds);

    if !outcome.converged {
        log::warn!(
            "Bounded fit stopped after {} iterations without converging: {}",
            outcome.iterations,
            outcome.status
        );
    }
    Ok(outcome)
}

/// Objective options used by the bounded and interval drivers.
pub(crate) fn memoized() -> ObjectiveOptions {
    ObjectiveOptions { memoize: true, ..ObjectiveOptions::default() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::objective::traits::{DiffRequest, LikelihoodEval, ParamAssignment};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Clamping and projection inside `BoundedProblem`.
    // - Interior and boundary optima of the bounded driver.
    // - Rejection of malformed bounds.
    // -------------------------------------------------------------------------

    /// loss = (signal_rate_multiplier - target)^2 + (shift - 1)^2
    struct Shifted {
        target: f64,
    }

    impl LogLikelihood for Shifted {
        type Native = Vec<f64>;

        fn param_names(&self) -> Vec<String> {
            vec!["signal_rate_multiplier".to_string(), "shift".to_string()]
        }

        fn minus_ll(
            &self, params: &ParamAssignment, request: &DiffRequest,
        ) -> OptResult<LikelihoodEval<Vec<f64>>> {
            let r = params.get("signal_rate_multiplier").unwrap_or(0.0);
            let s = params.get("shift").unwrap_or(0.0);
            let grad = params
                .names()
                .iter()
                .filter(|n| !request.is_omitted(n))
                .map(|n| if n == "shift" { 2.0 * (s - 1.0) } else { 2.0 * (r - self.target) })
                .collect();
            Ok(LikelihoodEval { loss: (r - self.target).powi(2) + (s - 1.0).powi(2), grad })
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    // Purpose
    // -------
    // Query points outside the box are evaluated at their clamped image.
    //
    // Given
    // -----
    // - Target 2, rate multiplier bounded below by 1e-9, query (-4, 1).
    //
    // Expect
    // ------
    // - Cost equals the loss at (1e-9, 1), about 4.
    // - The rate-multiplier gradient (negative, pointing inward) survives.
    fn bounded_problem_clamps_queries() {
        // Arrange
        let lf = Shifted { target: 2.0 };
        let args = names(&["signal_rate_multiplier", "shift"]);
        let objective = Objective::new(&lf, args.clone(), FixedParams::new(), memoized()).unwrap();
        let problem = BoundedProblem::new(&objective, parameter_bounds(&args, 1e-9)).unwrap();

        // Act
        let cost = problem.cost(&array![-4.0, 1.0]).unwrap();
        let grad = problem.gradient(&array![-4.0, 1.0]).unwrap();

        // Assert
        assert_abs_diff_eq!(cost, 4.0, epsilon = 1e-6);
        assert!(grad[0] < 0.0);
    }

    #[test]
    // Purpose
    // -------
    // An outward-pointing gradient at the bound is frozen.
    //
    // Given
    // -----
    // - Target -2, so the loss keeps decreasing below zero.
    //
    // Expect
    // ------
    // - Projected gradient component 0 at the floor.
    fn bounded_problem_freezes_active_coordinate() {
        // Arrange
        let lf = Shifted { target: -2.0 };
        let args = names(&["signal_rate_multiplier", "shift"]);
        let objective = Objective::new(&lf, args.clone(), FixedParams::new(), memoized()).unwrap();
        let problem = BoundedProblem::new(&objective, parameter_bounds(&args, 1e-9)).unwrap();

        // Act
        let grad = problem.gradient(&array![-1.0, 0.0]).unwrap();

        // Assert
        assert_eq!(grad[0], 0.0);
        assert_abs_diff_eq!(grad[1], -2.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Interior optimum from a negative guess; boundary optimum stays feasible.
    //
    // Given
    // -----
    // - Target 2 and target -2, guess (-3, 0) in both cases.
    //
    // Expect
    // ------
    // - Target 2: rate ≈ 2, shift ≈ 1.
    // - Target -2: rate pinned at the floor, never negative.
    fn bestfit_bounded_handles_interior_and_boundary_optima() {
        // Arrange
        let args = names(&["signal_rate_multiplier", "shift"]);
        let opts = BoundedOptions::default();
        let guess = array![-3.0, 0.0];

        // Act
        let inner =
            bestfit_bounded(&Shifted { target: 2.0 }, &args, &guess, &FixedParams::new(), &opts)
                .unwrap();
        let edge =
            bestfit_bounded(&Shifted { target: -2.0 }, &args, &guess, &FixedParams::new(), &opts)
                .unwrap();

        // Assert
        assert_abs_diff_eq!(inner.get("signal_rate_multiplier").unwrap(), 2.0, epsilon = 1e-2);
        assert_abs_diff_eq!(inner.get("shift").unwrap(), 1.0, epsilon = 1e-2);
        let pinned = edge.get("signal_rate_multiplier").unwrap();
        assert!(pinned >= 0.0);
        assert!(pinned < 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // Malformed bounds are rejected before any evaluation.
    //
    // Given
    // -----
    // - One bound for two parameters, then an inverted bound.
    //
    // Expect
    // ------
    // - `ParamLengthMismatch`, then `InvalidBound`.
    fn bounded_problem_rejects_bad_bounds() {
        // Arrange
        let lf = Shifted { target: 0.0 };
        let args = names(&["signal_rate_multiplier", "shift"]);
        let objective = Objective::new(&lf, args, FixedParams::new(), memoized()).unwrap();

        // Act
        let short = BoundedProblem::new(&objective, vec![(0.0, 1.0)]);
        let inverted = BoundedProblem::new(&objective, vec![(0.0, 1.0), (2.0, 1.0)]);

        // Assert
        assert!(matches!(short, Err(OptError::ParamLengthMismatch { .. })));
        assert!(matches!(inverted, Err(OptError::InvalidBound { .. })));
    }
}
