//! Execution helpers that run an `argmin` quasi-Newton solver and return a
//! crate-friendly [`OptimOutcome`].
//!
//! - [`run_variable_metric`]: BFGS / DFP, which carry an inverse Hessian in
//!   their state and need an initial estimate.
//! - [`run_lbfgs`]: L-BFGS, which keeps only a history of updates.
use argmin::core::{CostFunction, Executor, Gradient, IterState, Solver, State};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

use crate::optimization::{
    bestfit::outcome::OptimOutcome,
    errors::OptResult,
    objective::types::{Cost, Grad, Hessian, Theta},
};

/// Runtime settings shared by every executor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub max_iter: Option<usize>,
    pub verbose: bool,
}

/// Run BFGS or DFP from `theta0` with initial inverse Hessian `inv_hessian0`.
///
/// # Feature flags
/// With `obs_slog` enabled and `settings.verbose == true`, a terminal slog
/// observer is attached with `ObserverMode::Always` and the initial loss and
/// gradient norm are printed before the first iteration.
///
/// # Errors
/// - Argmin runtime errors (line-search failures, errors raised by the
///   objective) via `From<argmin::core::Error>`.
/// - Validation errors when building the [`OptimOutcome`].
pub fn run_variable_metric<O, S>(
    problem: O, solver: S, theta0: Theta, inv_hessian0: Hessian, settings: RunSettings,
) -> OptResult<OptimOutcome>
where
    O: CostFunction<Param = Theta, Output = Cost> + Gradient<Param = Theta, Gradient = Grad>,
    S: Solver<O, IterState<Theta, Grad, (), Hessian, (), f64>> + Send + 'static,
{
    #[cfg(feature = "obs_slog")]
    if settings.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let mut optimizer = Executor::new(problem, solver)
        .configure(|state| state.param(theta0).inv_hessian(inv_hessian0));
    #[cfg(feature = "obs_slog")]
    if settings.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = settings.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    let inv_hessian = result.take_inv_hessian();
    OptimOutcome::new(
        result.take_best_param(),
        result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
        inv_hessian,
    )
}

/// Run L-BFGS from `theta0`.
///
/// Same observer and error behavior as [`run_variable_metric`].
pub fn run_lbfgs<O, S>(
    problem: O, solver: S, theta0: Theta, settings: RunSettings,
) -> OptResult<OptimOutcome>
where
    O: CostFunction<Param = Theta, Output = Cost> + Gradient<Param = Theta, Gradient = Grad>,
    S: Solver<O, IterState<Theta, Grad, (), (), (), f64>> + Send + 'static,
{
    #[cfg(feature = "obs_slog")]
    if settings.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let mut optimizer = Executor::new(problem, solver).configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if settings.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = settings.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    OptimOutcome::new(
        result.take_best_param(),
        result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
        None,
    )
}

// ---- Helper Methods ----

#[cfg(feature = "obs_slog")]
fn log_initial_state<O>(theta0: &Theta, problem: &O) -> OptResult<()>
where
    O: CostFunction<Param = Theta, Output = Cost> + Gradient<Param = Theta, Gradient = Grad>,
{
    let f0 = problem.cost(theta0)?;
    let g0n = problem.gradient(theta0).ok().map(|g| g.l2_norm());

    eprintln!(
        "init: f(theta0) = {:.6}{}",
        f0,
        g0n.map(|n| format!(", ||grad|| = {:.6}", n)).unwrap_or_default()
    );
    Ok(())
}
