//! bestfit::interval — one-sided profile-likelihood limits.
//!
//! Purpose
//! -------
//! Find the value of one target parameter at which the profile likelihood
//! ratio reaches its critical value, by minimizing the squared residual of
//! an [`IntervalObjective`] inside a search interval.
//!
//! Key behaviors
//! -------------
//! - Every parameter of the likelihood is varied; none is fixed.
//! - The target parameter is boxed into the caller's interval; all other
//!   parameters keep their default bounds (rate multipliers non-negative).
//! - Only the target's value at the optimum is returned. Call once with a
//!   lower and once with an upper interval for a two-sided result.
//! - The residual gradient `2Δ·∂loss/∂x` vanishes at the best fit, so a
//!   start whose projected gradient is already below the solver tolerance
//!   (while `|Δ|` is not) is moved a short way into the interval.
//! - After the search, `|Δ|` must be within `opts.max_residual`. Otherwise
//!   the search failed with `OptimizerFailure`, unless the target ended on
//!   an edge of the interval with the residual still pulling outward: then
//!   the crossing lies outside it and the edge is returned with a warning.
//!   A stationary point on an edge (the best fit) is a failure.
//!
//! Invariants & assumptions
//! ------------------------
//! - `ll_best` is the loss at the global best fit, on the same scale as
//!   `lf.minus_ll` (`-2 log L`).
//! - The guess must name every likelihood parameter.
use crate::optimization::{
    bestfit::{
        bounded::{memoized, minimize_in_box},
        options::IntervalOptions,
    },
    errors::{OptError, OptResult},
    numerical_stability::transformations::{
        BOUND_EPS, clamp_to_bounds, parameter_bounds, project_gradient,
    },
    objective::{
        adapter::Objective,
        interval::{CriticalValue, IntervalObjective, ProfileLikelihoodRatio},
        traits::LogLikelihood,
        types::{FixedParams, ParamMap, Theta},
        validation::verify_bound,
    },
};

/// one_parameter_interval — value of `parameter` where the likelihood ratio
/// crosses `critical`, searched within `bound`.
///
/// Parameters
/// ----------
/// - `lf`: likelihood collaborator.
/// - `parameter`: target parameter name.
/// - `bound`: `(lower, upper)` search interval for the target.
/// - `guess`: starting value for every likelihood parameter.
/// - `ll_best`: loss at the best fit.
/// - `critical`: critical value of the test statistic; see
///   [`CriticalValue::from_parts`] for building it from optional parts.
/// - `opts`: see [`IntervalOptions`].
///
/// Errors
/// ------
/// - `OptError::InvalidBound` for an empty or NaN `bound`.
/// - `OptError::UnknownParameter` if `parameter` is not a likelihood parameter.
/// - `OptError::MissingParameter` if `guess` lacks a likelihood parameter.
/// - `OptError::OptimizerFailure` if the search stopped inside the interval
///   without reaching the critical value.
/// - Errors raised by `lf.check` or `lf.minus_ll`, and Argmin runtime errors.
pub fn one_parameter_interval<L: LogLikelihood>(
    lf: &L, parameter: &str, bound: (f64, f64), guess: &ParamMap, ll_best: f64,
    critical: CriticalValue, opts: &IntervalOptions,
) -> OptResult<f64> {
    verify_bound(parameter, bound)?;
    let arg_names = lf.param_names();
    let target = arg_names
        .iter()
        .position(|n| n == parameter)
        .ok_or_else(|| OptError::UnknownParameter { name: parameter.to_string() })?;
    let x_guess = arg_names
        .iter()
        .map(|n| guess.get(n).copied().ok_or_else(|| OptError::MissingParameter { name: n.clone() }))
        .collect::<OptResult<Vec<f64>>>()
        .map(Theta::from)?;

    let transform =
        ProfileLikelihoodRatio { ll_best, target_parameter: parameter.to_string(), critical };
    let objective: IntervalObjective<'_, L> =
        Objective::with_transform(lf, arg_names.clone(), FixedParams::new(), transform, memoized())?;
    lf.check(&objective.assignment(&x_guess.to_vec())?)?;

    let bounded = opts.as_bounded();
    let mut bounds = parameter_bounds(&arg_names, bounded.rate_multiplier_floor);
    bounds[target] = bound;
    let mut start = clamp_to_bounds(&x_guess, &bounds);
    let (residual, grad) = objective.fun_and_grad(&start)?;
    let projected = project_gradient(&start, &grad, &bounds);
    let stalled = projected.iter().map(|g| g * g).sum::<f64>().sqrt() < bounded.tol;
    if stalled && residual.sqrt() > opts.max_residual {
        start[target] = interior_start(bound, start[target]);
        log::debug!(
            "Interval search for '{parameter}' starts at a stationary point; restarting from {}",
            start[target]
        );
    }

    let outcome = minimize_in_box(&objective, &start, bounds, &bounded)?;
    let limit = outcome.theta_hat[target];
    let distance = outcome.value.sqrt();
    log::debug!("Interval search for '{parameter}' ended at {limit} with |Δ| = {distance:e}");
    if distance <= opts.max_residual {
        return Ok(limit);
    }
    let pull = objective.grad(&outcome.theta_hat)?[target];
    let held_low = limit <= bound.0 + BOUND_EPS && pull >= bounded.tol;
    let held_high = limit >= bound.1 - BOUND_EPS && pull <= -bounded.tol;
    if held_low || held_high {
        log::warn!(
            "Critical value for '{parameter}' not reached inside [{}, {}]; returning the edge {limit}",
            bound.0,
            bound.1
        );
        return Ok(limit);
    }
    Err(OptError::OptimizerFailure { outcome: Box::new(outcome) })
}

/// Fraction of the way toward the farther end of the interval a stalled
/// start is moved.
const RESTART_FRACTION: f64 = 0.1;

/// Restart point for a target stalled at `current` inside `bound`.
///
/// Moves a tenth of the way toward the farther end; an infinite end counts
/// as `max(1, |current|)` away. A small move keeps the start on the same
/// side of the crossing as the stalled point.
fn interior_start(bound: (f64, f64), current: f64) -> f64 {
    let reach = |edge: f64| {
        if edge.is_finite() { edge - current } else { edge.signum() * current.abs().max(1.0) }
    };
    let (down, up) = (reach(bound.0), reach(bound.1));
    let toward = if up.abs() >= down.abs() { up } else { down };
    current + RESTART_FRACTION * toward
}
