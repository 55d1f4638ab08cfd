//! bestfit::builders — quasi-Newton solver construction helpers.
//!
//! Purpose
//! -------
//! Hide Argmin's generic wiring behind small builders that apply the
//! crate's tolerance options, so the drivers can request a configured
//! BFGS, DFP, or L-BFGS solver without touching Argmin types.
//!
//! Key behaviors
//! -------------
//! - One builder per (solver, line search) pair the drivers use.
//! - Shared `configure_*` helpers apply optional gradient and cost-change
//!   tolerances; a `None` tolerance leaves Argmin's default in place.
//! - Argmin's DFP only checks the gradient norm, so the DFP builders wrap
//!   the solver in [`CostChangeStop`], which adds the cost-change rule BFGS
//!   and L-BFGS apply natively: stop once `|f_prev − f| < tol_cost`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Builders never set the initial parameter, the initial inverse Hessian,
//!   or `max_iters`; those are runtime concerns applied by [`super::run`].
//! - Invalid tolerances surface as `OptError` via `From<argmin::core::Error>`.
//!
//! Testing notes
//! -------------
//! - Unit tests check that every builder accepts valid tolerances, that
//!   Argmin's own rejection of a negative tolerance is mapped to `OptError`,
//!   and that a DFP run stops on the cost tolerance.
use argmin::{
    core::{
        Error, IterState, KV, Problem, Solver, TerminationReason, TerminationStatus,
    },
    solver::quasinewton::{BFGS, DFP, LBFGS},
};

use crate::optimization::{
    errors::OptResult,
    bestfit::options::Tolerances,
    objective::types::{
        BfgsHagerZhang, BfgsMoreThuente, Cost, DfpHagerZhang, DfpMoreThuente, Grad,
        HagerZhangLS, Hessian, LbfgsMoreThuente, MoreThuenteLS, Theta,
    },
    objective::validation::verify_tol_cost,
};

type QuasiNewtonState = IterState<Theta, Grad, (), Hessian, (), Cost>;

/// Solver wrapper adding a stop on the change in cost between iterations.
///
/// Delegates initialization and iterations to `inner`. The inner solver's
/// own termination rules run first; the cost rule only applies when
/// `tol_cost` is `Some`.
#[derive(Clone)]
pub struct CostChangeStop<S> {
    inner: S,
    tol_cost: Option<Cost>,
}

impl<S> CostChangeStop<S> {
    /// # Errors
    /// `OptError::InvalidTolCost` for a non-positive or non-finite tolerance.
    pub fn new(inner: S, tol_cost: Option<Cost>) -> OptResult<Self> {
        verify_tol_cost(tol_cost)?;
        Ok(Self { inner, tol_cost })
    }

    pub fn tol_cost(&self) -> Option<Cost> {
        self.tol_cost
    }
}

impl<O, S> Solver<O, QuasiNewtonState> for CostChangeStop<S>
where
    S: Solver<O, QuasiNewtonState>,
{
    const NAME: &'static str = <S as Solver<O, QuasiNewtonState>>::NAME;

    fn init(
        &mut self, problem: &mut Problem<O>, state: QuasiNewtonState,
    ) -> Result<(QuasiNewtonState, Option<KV>), Error> {
        self.inner.init(problem, state)
    }

    fn next_iter(
        &mut self, problem: &mut Problem<O>, state: QuasiNewtonState,
    ) -> Result<(QuasiNewtonState, Option<KV>), Error> {
        self.inner.next_iter(problem, state)
    }

    fn terminate(&mut self, state: &QuasiNewtonState) -> TerminationStatus {
        let status = self.inner.terminate(state);
        if status.terminated() {
            return status;
        }
        match self.tol_cost {
            Some(tol) if (state.get_prev_cost() - state.get_cost()).abs() < tol => {
                TerminationStatus::Terminated(TerminationReason::SolverConverged)
            }
            _ => TerminationStatus::NotTerminated,
        }
    }
}

/// BFGS with More–Thuente line search.
pub fn build_bfgs_more_thuente(tols: &Tolerances) -> OptResult<BfgsMoreThuente> {
    configure_bfgs(BFGS::new(MoreThuenteLS::new()), tols)
}

/// BFGS with Hager–Zhang line search.
pub fn build_bfgs_hager_zhang(tols: &Tolerances) -> OptResult<BfgsHagerZhang> {
    configure_bfgs(BFGS::new(HagerZhangLS::new()), tols)
}

/// DFP with More–Thuente line search.
pub fn build_dfp_more_thuente(tols: &Tolerances) -> OptResult<CostChangeStop<DfpMoreThuente>> {
    configure_dfp(DFP::new(MoreThuenteLS::new()), tols)
}

/// DFP with Hager–Zhang line search.
pub fn build_dfp_hager_zhang(tols: &Tolerances) -> OptResult<CostChangeStop<DfpHagerZhang>> {
    configure_dfp(DFP::new(HagerZhangLS::new()), tols)
}

/// L-BFGS with More–Thuente line search and history size `mem`.
pub fn build_lbfgs_more_thuente(mem: usize, tols: &Tolerances) -> OptResult<LbfgsMoreThuente> {
    configure_lbfgs(LBFGS::new(MoreThuenteLS::new(), mem), tols)
}

/// configure_bfgs — apply optional tolerances to a BFGS solver.
pub fn configure_bfgs<L>(mut solver: BFGS<L, Cost>, tols: &Tolerances) -> OptResult<BFGS<L, Cost>> {
    if let Some(g) = tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

/// configure_dfp — apply the gradient tolerance to a DFP solver and wrap it
/// with the cost-change stop.
pub fn configure_dfp<L>(
    mut solver: DFP<L, Cost>, tols: &Tolerances,
) -> OptResult<CostChangeStop<DFP<L, Cost>>> {
    if let Some(g) = tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    CostChangeStop::new(solver, tols.tol_cost)
}

/// configure_lbfgs — apply optional tolerances to an L-BFGS solver.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, tols: &Tolerances,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{errors::OptError, objective::types::DEFAULT_LBFGS_MEM};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction of every solver the drivers use.
    // - Mapping of Argmin's tolerance rejection into `OptError`.
    //
    // They intentionally DO NOT cover:
    // - Executor runs, which are exercised through the drivers.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // All builders succeed for valid tolerances.
    //
    // Given
    // -----
    // - `Tolerances { tol_grad: 1e-6, tol_cost: 1e-8, max_iter: 50 }`.
    //
    // Expect
    // ------
    // - Every builder returns `Ok(_)`.
    fn builders_accept_valid_tolerances() {
        // Arrange
        let tols = Tolerances::new(Some(1e-6), Some(1e-8), Some(50)).unwrap();

        // Act / Assert
        assert!(build_bfgs_more_thuente(&tols).is_ok());
        assert!(build_bfgs_hager_zhang(&tols).is_ok());
        assert!(build_dfp_more_thuente(&tols).is_ok());
        assert!(build_dfp_hager_zhang(&tols).is_ok());
        assert!(build_lbfgs_more_thuente(DEFAULT_LBFGS_MEM, &tols).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // A tolerance Argmin rejects comes back as an `OptError`.
    //
    // Given
    // -----
    // - A hand-built `Tolerances` with a negative gradient tolerance,
    //   bypassing `Tolerances::new`.
    //
    // Expect
    // ------
    // - `OptError::InvalidParameter`.
    fn argmin_rejection_maps_to_opt_error() {
        // Arrange
        let tols = Tolerances { tol_grad: Some(-1.0), tol_cost: None, max_iter: None };

        // Act
        let Err(err) = build_bfgs_more_thuente(&tols) else {
            panic!("negative gradient tolerance accepted");
        };

        // Assert
        assert!(matches!(err, OptError::InvalidParameter { .. }));
    }

    #[test]
    // Purpose
    // -------
    // DFP builders carry the cost tolerance into the wrapper.
    //
    // Given
    // -----
    // - `tol_cost` 0.5, then `None`.
    //
    // Expect
    // ------
    // - `tol_cost()` echoes the configured value for both line searches.
    fn dfp_builders_carry_cost_tolerance() {
        // Arrange
        let with_cost = Tolerances::new(None, Some(0.5), Some(10)).unwrap();
        let without = Tolerances::new(Some(1e-6), None, None).unwrap();

        // Act
        let mt = build_dfp_more_thuente(&with_cost).unwrap();
        let hz = build_dfp_hager_zhang(&without).unwrap();

        // Assert
        assert_eq!(mt.tol_cost(), Some(0.5));
        assert_eq!(hz.tol_cost(), None);
    }
}
