//! quanta::model — yield-model collaborator contracts.
//!
//! Purpose
//! -------
//! Describe the physics functions the splitting block evaluates per energy:
//! mean yields, Fano-like widths, recombination probability and its
//! fluctuation, and the skew corrections of the electron/ion split. The
//! block never implements physics itself; detector models implement these
//! traits.
//!
//! Key behaviors
//! -------------
//! - [`RecombinationModel`] is shared by both interaction classes and
//!   provides defaults for the variance and the skew corrections.
//! - [`ErYieldModel`] (electronic recoils) yields quanta first and splits
//!   them into ions with a Binomial; [`NrYieldModel`] (nuclear recoils)
//!   yields ions and excitons independently.
//! - [`SkewGaussianFluctuation`] and [`GaussianFluctuation`] are ready-made
//!   recombination-fluctuation curves in the electron fraction.
//!
//! Invariants & assumptions
//! ------------------------
//! - The default variance is `r(1 − r)·ni + ω²·ni²` and forces `ω = 0`
//!   whenever the mean quanta is exactly zero, so no `0/0` reaches it.
//! - All functions are evaluated on plain `f64` scalars; energies are in
//!   the units of the source spectrum (keV by convention).
use std::f64::consts::PI;

use statrs::function::erf::erf;

/// Recombination physics shared by electronic and nuclear recoils.
pub trait RecombinationModel {
    /// Probability that an ion recombines.
    fn recomb_prob(&self, electrons_mean: f64, quanta_mean: f64, exciton_ratio: f64) -> f64;

    /// Shape parameter of the skew-Gaussian electron/ion split.
    fn skewness(&self, quanta_mean: f64) -> f64;

    /// Recombination fluctuation `ω` at electron fraction `nel / nq`.
    fn recombination_fluctuation(&self, electron_fraction: f64) -> f64;

    /// Variance of the electron count given `ions` ions.
    fn variance(&self, electrons_mean: f64, quanta_mean: f64, recomb_prob: f64, ions: f64) -> f64 {
        let omega = if quanta_mean == 0.0 {
            0.0
        } else {
            self.recombination_fluctuation(electrons_mean / quanta_mean)
        };
        recomb_prob * (1.0 - recomb_prob) * ions + omega * omega * ions * ions
    }

    /// Ratio of the skew-Gaussian's standard deviation to its scale.
    fn width_correction(&self, skewness: f64) -> f64 {
        (1.0 - (2.0 / PI) * skewness * skewness / (1.0 + skewness * skewness)).sqrt()
    }

    /// Shift of the skew-Gaussian's mean away from its location.
    fn mu_correction(&self, skewness: f64, variance: f64, width_correction: f64) -> f64 {
        (variance.sqrt() / width_correction)
            * (skewness / (1.0 + skewness * skewness).sqrt())
            * (2.0 / PI).sqrt()
    }
}

/// Electronic-recoil yields: quanta first, then a Binomial ion split.
pub trait ErYieldModel: RecombinationModel {
    fn mean_yield_electron(&self, energy: f64) -> f64;
    fn mean_yield_quanta(&self, energy: f64, electrons_mean: f64) -> f64;
    fn fano_factor(&self, quanta_mean: f64) -> f64;
    fn exciton_ratio(&self, energy: f64) -> f64;
}

/// Mean yields of a nuclear recoil at one energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NrYields {
    pub electrons: f64,
    pub quanta: f64,
    pub exciton_ratio: f64,
}

/// Fano-like widths of the ion and exciton counts of a nuclear recoil.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NrFano {
    pub ions: f64,
    pub excitons: f64,
}

/// Nuclear-recoil yields: ions and excitons drawn independently.
pub trait NrYieldModel: RecombinationModel {
    fn mean_yields(&self, energy: f64) -> NrYields;
    fn yield_fano(&self, quanta_mean: f64) -> NrFano;
}

/// Skew-Gaussian fluctuation curve, normalised so its mode equals `ampl`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewGaussianFluctuation {
    pub ampl: f64,
    pub wide: f64,
    pub cntr: f64,
    pub skew: f64,
}

impl SkewGaussianFluctuation {
    /// Electronic-recoil curve at `drift_field` (V/cm), amplitude saturating
    /// with field.
    pub fn electronic(drift_field: f64) -> Self {
        let ampl = 0.086036
            + (0.05 - 0.086036) / (1.0 + (drift_field / 295.2).powf(251.6)).powf(0.0069114);
        Self { ampl, wide: 0.205, cntr: 0.45, skew: -0.2 }
    }

    pub fn at(&self, electron_fraction: f64) -> f64 {
        let Self { ampl, wide, cntr, skew } = *self;
        let shape = |x: f64| {
            (-0.5 * (x - cntr).powi(2) / (wide * wide)).exp()
                * (1.0 + erf(skew * (x - cntr) / (wide * 2.0_f64.sqrt())))
        };
        let mode = cntr + 2.0 / (2.0 * PI).sqrt() * skew * wide / (1.0 + skew * skew).sqrt();
        ampl * shape(electron_fraction) / shape(mode)
    }
}

/// Gaussian fluctuation curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianFluctuation {
    pub ampl: f64,
    pub cntr: f64,
    pub wide: f64,
}

impl GaussianFluctuation {
    /// Nuclear-recoil curve.
    pub fn nuclear() -> Self {
        Self { ampl: 0.04, cntr: 0.5, wide: 0.19 }
    }

    pub fn at(&self, electron_fraction: f64) -> f64 {
        self.ampl * (-0.5 * (electron_fraction - self.cntr).powi(2) / (self.wide * self.wide)).exp()
    }
}
