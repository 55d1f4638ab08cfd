//! bestfit::variable_metric — step-seeded variable-metric driver with errors.
//!
//! Purpose
//! -------
//! Minimize the loss with a DFP variable-metric method whose initial metric
//! is built from per-parameter step sizes, then report parameter errors from
//! the curvature at the minimum.
//!
//! Key behaviors
//! -------------
//! - Each parameter's initial step is its override in `step_sizes`, or
//!   `step_fraction · |guess|`, or `step_fraction` itself when the guess is
//!   exactly zero. The initial inverse metric is `diag(step² / (2·up))`, so
//!   one step along a coordinate changes the loss by about `up`.
//! - After the descent, `use_hessian` triggers a curvature (HESSE) pass:
//!   a finite-difference Hessian of the objective gradient at the minimum,
//!   pseudo-inverted and scaled by `2·up`. Without it, the final DFP
//!   inverse metric is used; if the solver kept none, the curvature pass
//!   runs anyway.
//! - `tols.tol_cost` stops the descent once the loss changes by less than
//!   the tolerance between iterations, as it does for BFGS.
//! - Non-convergence is logged, not raised: the covariance and values of the
//!   last best point are still returned.
//!
//! Downstream usage
//! ----------------
//! - Returns [`BestFit::Values`], [`BestFit::WithErrors`] (`"<name>_error"`
//!   keys, varied parameters only) or [`BestFit::LowLevel`] with the
//!   covariance attached to the outcome.
use ndarray::{Array1, Array2};

use crate::{
    inference::hessian::{covariance_from_inv_hessian, hesse_covariance, standard_errors},
    optimization::{
        bestfit::{
            builders::{build_dfp_hager_zhang, build_dfp_more_thuente},
            options::{LineSearcher, VariableMetricOptions},
            outcome::{BestFit, error_map, merge_values},
            run::{RunSettings, run_variable_metric},
        },
        errors::{OptError, OptResult},
        objective::{
            adapter::{Objective, ObjectiveOptions},
            traits::LogLikelihood,
            types::{FixedParams, Hessian, Theta},
        },
    },
};

/// bestfit_variable_metric — DFP fit of `lf` with step-seeded metric and errors.
///
/// Parameters
/// ----------
/// - `lf`: likelihood collaborator.
/// - `arg_names`: varied parameter names; `x_guess` is positional against it.
/// - `fix`: parameters held fixed; echoed unchanged in the result.
/// - `opts`: see [`VariableMetricOptions`].
///
/// Errors
/// ------
/// - Parameter-set errors from the objective; `OptError::UnknownParameter`
///   for a step override naming a parameter that is not varied.
/// - `OptError::InvalidStepSize` when a derived step is not positive and finite.
/// - Errors raised by `lf.check` or `lf.minus_ll`, and Argmin runtime errors.
pub fn bestfit_variable_metric<L: LogLikelihood>(
    lf: &L, arg_names: &[String], x_guess: &Theta, fix: &FixedParams,
    opts: &VariableMetricOptions,
) -> OptResult<BestFit> {
    let objective = Objective::new(lf, arg_names.to_vec(), fix.clone(), ObjectiveOptions::default())?;
    let guess = objective.assignment(&x_guess.to_vec())?;
    lf.check(&guess)?;

    let steps = initial_steps(arg_names, x_guess, opts)?;
    let inv_hessian0 = Array2::from_diag(&steps.mapv(|s| s * s / (2.0 * opts.errordef)));

    let settings = RunSettings { max_iter: opts.tols.max_iter, verbose: opts.verbose };
    let theta0 = x_guess.clone();
    let mut outcome = match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_dfp_more_thuente(&opts.tols)?;
            run_variable_metric(&objective, solver, theta0, inv_hessian0, settings)?
        }
        LineSearcher::HagerZhang => {
            let solver = build_dfp_hager_zhang(&opts.tols)?;
            run_variable_metric(&objective, solver, theta0, inv_hessian0, settings)?
        }
    };
    if !outcome.converged {
        log::warn!(
            "Variable-metric fit stopped after {} iterations without converging: {}",
            outcome.iterations,
            outcome.status
        );
    }

    let covariance: Hessian = match (&outcome.inv_hessian, opts.use_hessian) {
        (Some(inv), false) => covariance_from_inv_hessian(inv, opts.errordef)?,
        (None, false) => {
            log::warn!("No inverse-metric estimate kept by the solver, running the curvature pass");
            hesse_covariance(|t| objective.grad(t), &outcome.theta_hat, opts.errordef)?
        }
        (_, true) => hesse_covariance(|t| objective.grad(t), &outcome.theta_hat, opts.errordef)?,
    };
    let errors = standard_errors(&covariance);
    outcome.covariance = Some(covariance);

    if opts.get_lowlevel_result {
        return Ok(BestFit::LowLevel(Box::new(outcome)));
    }
    let values = merge_values(arg_names, &outcome.theta_hat, fix);
    if opts.return_errors {
        return Ok(BestFit::WithErrors { values, errors: error_map(arg_names, &errors) });
    }
    Ok(BestFit::Values(values))
}

/// Initial step per varied parameter, in `arg_names` order.
///
/// # Errors
/// - `OptError::UnknownParameter` for an override that is not a varied name.
/// - `OptError::InvalidStepSize` for a non-finite or non-positive step.
pub fn initial_steps(
    arg_names: &[String], x_guess: &Theta, opts: &VariableMetricOptions,
) -> OptResult<Array1<f64>> {
    if let Some(name) = opts.step_sizes.keys().find(|k| !arg_names.contains(k)) {
        return Err(OptError::UnknownParameter { name: name.clone() });
    }
    arg_names
        .iter()
        .zip(x_guess.iter())
        .map(|(name, &x)| {
            let step = match opts.step_sizes.get(name) {
                Some(&s) => s,
                None if x == 0.0 => opts.step_fraction,
                None => opts.step_fraction * x.abs(),
            };
            if !(step.is_finite() && step > 0.0) {
                return Err(OptError::InvalidStepSize { name: name.clone(), value: step });
            }
            Ok(step)
        })
        .collect::<OptResult<Vec<f64>>>()
        .map(Array1::from)
}
