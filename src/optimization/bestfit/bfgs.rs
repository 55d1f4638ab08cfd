//! bestfit::bfgs — Hessian-aware quasi-Newton driver.
//!
//! Purpose
//! -------
//! Minimize the loss with BFGS, optionally seeding the inverse-Hessian
//! estimate with the collaborator's own curvature at the guess.
//!
//! Key behaviors
//! -------------
//! - With `use_hessian`, the collaborator's inverse Hessian at the guess
//!   (fixed names omitted) is symmetrized and used as the BFGS seed;
//!   otherwise the identity is used.
//! - `llr_tolerance` is an absolute bound on the change of `-2 log L` and is
//!   handed to the solver as its cost tolerance. An explicit
//!   `tols.tol_cost` takes precedence.
//! - Non-convergence is an error carrying the low-level outcome, unless
//!   `get_lowlevel_result` asks for that outcome directly.
//!
//! Downstream usage
//! ----------------
//! - Returns [`BestFit::Values`] (varied ∪ fixed) or [`BestFit::LowLevel`].
use ndarray::Array2;

use crate::optimization::{
    bestfit::{
        builders::{build_bfgs_hager_zhang, build_bfgs_more_thuente},
        options::{BfgsOptions, LineSearcher},
        outcome::{BestFit, merge_values},
        run::{RunSettings, run_variable_metric},
    },
    errors::{OptError, OptResult},
    numerical_stability::transformations::symmetrize,
    objective::{
        adapter::{Objective, ObjectiveOptions},
        traits::LogLikelihood,
        types::{FixedParams, Hessian, Theta},
        validation::validate_hessian,
    },
};

/// bestfit_bfgs — BFGS fit of `lf` over `arg_names`, starting at `x_guess`.
///
/// Parameters
/// ----------
/// - `lf`: likelihood collaborator.
/// - `arg_names`: varied parameter names; `x_guess` is positional against it.
/// - `fix`: parameters held fixed; echoed unchanged in the result.
/// - `opts`: see [`BfgsOptions`].
///
/// Errors
/// ------
/// - Parameter-set errors from the objective.
/// - Errors raised by `lf.check`, `lf.inverse_hessian`, or `lf.minus_ll`.
/// - `OptError::OptimizerFailure { outcome }` when the solver did not converge
///   and `get_lowlevel_result` is false.
pub fn bestfit_bfgs<L: LogLikelihood>(
    lf: &L, arg_names: &[String], x_guess: &Theta, fix: &FixedParams, opts: &BfgsOptions,
) -> OptResult<BestFit> {
    let objective = Objective::new(lf, arg_names.to_vec(), fix.clone(), ObjectiveOptions::default())?;
    let guess = objective.assignment(&x_guess.to_vec())?;
    lf.check(&guess)?;

    let n = arg_names.len();
    let inv_hessian0: Hessian = if opts.use_hessian {
        let mut h = lf.inverse_hessian(&guess, objective.request())?;
        symmetrize(&mut h);
        validate_hessian(&h, n)?;
        h
    } else {
        Array2::eye(n)
    };

    let mut tols = opts.tols;
    if tols.tol_cost.is_none() {
        if let Some(llr) = opts.llr_tolerance {
            let f0 = objective.fun(x_guess)?;
            log::debug!(
                "llr_tolerance {llr} is a relative tolerance of {:e} at the guess",
                llr / f0.abs()
            );
            tols.tol_cost = Some(llr);
        }
    }

    let settings = RunSettings { max_iter: tols.max_iter, verbose: opts.verbose };
    let theta0 = x_guess.clone();
    let outcome = match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_bfgs_more_thuente(&tols)?;
            run_variable_metric(&objective, solver, theta0, inv_hessian0, settings)?
        }
        LineSearcher::HagerZhang => {
            let solver = build_bfgs_hager_zhang(&tols)?;
            run_variable_metric(&objective, solver, theta0, inv_hessian0, settings)?
        }
    };

    if opts.get_lowlevel_result {
        return Ok(BestFit::LowLevel(Box::new(outcome)));
    }
    if !outcome.converged {
        return Err(OptError::OptimizerFailure { outcome: Box::new(outcome) });
    }
    Ok(BestFit::Values(merge_values(arg_names, &outcome.theta_hat, fix)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        bestfit::options::Tolerances,
        objective::traits::{DiffRequest, LikelihoodEval, ParamAssignment},
    };
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Convergence on a quadratic with and without Hessian seeding.
    // - Fixed parameters echoed in the result.
    // - Failure reporting vs. the low-level escape hatch.
    // -------------------------------------------------------------------------

    /// loss = (mu - 3)^2 + 2 (s - 1)^2
    struct Quadratic;

    impl LogLikelihood for Quadratic {
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
                .map(|n| if n == "mu" { 2.0 * (mu - 3.0) } else { 4.0 * (s - 1.0) })
                .collect();
            Ok(LikelihoodEval { loss: (mu - 3.0).powi(2) + 2.0 * (s - 1.0).powi(2), grad })
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    // Purpose
    // -------
    // The driver converges with the default (Hessian-seeded) options.
    //
    // Given
    // -----
    // - Both parameters varied, guess (0, 0).
    //
    // Expect
    // ------
    // - mu ≈ 3, s ≈ 1.
    fn bestfit_bfgs_converges_with_hessian_seed() {
        // Arrange
        let opts = BfgsOptions::default();
        let args = names(&["mu", "s"]);

        // Act
        let fit = bestfit_bfgs(&Quadratic, &args, &array![0.0, 0.0], &FixedParams::new(), &opts)
            .unwrap();

        // Assert
        assert_abs_diff_eq!(fit.get("mu").unwrap(), 3.0, epsilon = 1e-3);
        assert_abs_diff_eq!(fit.get("s").unwrap(), 1.0, epsilon = 1e-3);
    }

    #[test]
    // Purpose
    // -------
    // Fixed parameters are echoed and the identity seed still converges.
    //
    // Given
    // -----
    // - `s` fixed at 2.5, `use_hessian = false`, guess mu = 0.
    //
    // Expect
    // ------
    // - mu ≈ 3 and s = 2.5 exactly.
    fn bestfit_bfgs_echoes_fixed_parameters() {
        // Arrange
        let opts = BfgsOptions { use_hessian: false, ..BfgsOptions::default() };
        let fix = FixedParams::from([("s".to_string(), 2.5)]);

        // Act
        let fit = bestfit_bfgs(&Quadratic, &names(&["mu"]), &array![0.0], &fix, &opts).unwrap();

        // Assert
        assert_abs_diff_eq!(fit.get("mu").unwrap(), 3.0, epsilon = 1e-3);
        assert_eq!(fit.get("s"), Some(2.5));
    }

    #[test]
    // Purpose
    // -------
    // Hitting the iteration limit is a failure unless the raw result is requested.
    //
    // Given
    // -----
    // - `max_iter = 1`, no explicit tolerances, identity seed.
    // - Both parameters varied from (0, 0); the curvatures differ, so one
    //   line search along the steepest-descent direction cannot reach (3, 1).
    //
    // Expect
    // ------
    // - `OptimizerFailure` by default.
    // - `BestFit::LowLevel` with `converged == false` when requested.
    fn bestfit_bfgs_reports_failure_or_lowlevel() {
        // Arrange
        let tols = Tolerances { tol_grad: None, tol_cost: None, max_iter: Some(1) };
        let strict =
            BfgsOptions { use_hessian: false, llr_tolerance: None, tols, ..BfgsOptions::default() };
        let raw = BfgsOptions { get_lowlevel_result: true, ..strict.clone() };
        let args = names(&["mu", "s"]);
        let guess = array![0.0, 0.0];

        // Act
        let err = bestfit_bfgs(&Quadratic, &args, &guess, &FixedParams::new(), &strict);
        let low = bestfit_bfgs(&Quadratic, &args, &guess, &FixedParams::new(), &raw).unwrap();

        // Assert
        assert!(matches!(err, Err(OptError::OptimizerFailure { .. })));
        assert!(!low.lowlevel().unwrap().converged);
    }
}
