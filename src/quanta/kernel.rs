//! quanta::kernel — per-interaction marginalization kernels.
//!
//! Purpose
//! -------
//! Encapsulate everything that differs between electronic and nuclear
//! recoils behind one strategy trait, [`SplittingKernel`]: mean yields at an
//! energy, the ion-count envelope, the joint (quanta, ions) factor, and the
//! forward draw of ions and excitons. The electron/ion factor is shared.
//!
//! Key behaviors
//! -------------
//! - [`Interaction`] fixes the cutoff energy (5 for electronic, 20 for
//!   nuclear recoils); below it the [`Regime::Exact`] kernels are used,
//!   at or above it the [`Regime::Approximate`] ones.
//! - Exact kernels are discrete: continuity-corrected Normals, the Binomial
//!   ion split, and the truncated continuity-corrected skew-Gaussian for
//!   electrons given ions. Approximate kernels evaluate the corresponding
//!   densities at the integer points.
//! - [`ErSplitting`]: `P(nq) · Binom(ni | nq, α)`.
//!   [`NrSplitting`]: `P(ni) · P(nex = nq − ni)`.
//!
//! Shape contract
//! --------------
//! - `quanta_ion_table(.., quanta: [Q], ions: [I]) -> [Q, I]`
//! - `electron_table(.., electrons: [N], ions: [I]) -> [N, I]`
//! - Row `q` / `n` refers to the q-th / n-th entry of the *deduplicated*
//!   values handed in; the block scatters rows back to grid positions.
use ndarray::Array2;
use rand::Rng;
use rand_distr::{Binomial, Distribution, Normal};

use crate::quanta::{
    distributions::{
        SCALE_FLOOR, SkewGaussian, TruncatedSkewGaussianCC, binomial_pmf, normal_cc, normal_pdf,
    },
    errors::{QuantaError, QuantaResult},
    model::{ErYieldModel, NrYieldModel, RecombinationModel},
};

/// Particle-interaction class of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Electronic,
    Nuclear,
}

impl Interaction {
    /// Energy at and above which the approximate kernels are used.
    pub fn cutoff_energy(self) -> f64 {
        match self {
            Interaction::Electronic => 5.0,
            Interaction::Nuclear => 20.0,
        }
    }

    pub fn regime(self, energy: f64) -> Regime {
        if energy < self.cutoff_energy() { Regime::Exact } else { Regime::Approximate }
    }
}

/// Discrete (exact) or continuous (approximate) kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Exact,
    Approximate,
}

/// Mean yields and split parameters at one energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyYields {
    pub energy: f64,
    pub electrons_mean: f64,
    pub quanta_mean: f64,
    pub exciton_ratio: f64,
    pub recomb_prob: f64,
    pub skewness: f64,
}

impl EnergyYields {
    /// Fraction of quanta that are ions, `1 / (1 + nex/ni)`.
    pub fn ion_fraction(&self) -> f64 {
        1.0 / (1.0 + self.exciton_ratio)
    }
}

/// Ions and excitons of one simulated event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IonsExcitons {
    pub ions: u64,
    pub excitons: u64,
}

/// Strategy for one interaction class.
pub trait SplittingKernel {
    type Model: RecombinationModel;

    fn model(&self) -> &Self::Model;

    fn interaction(&self) -> Interaction;

    fn yields(&self, energy: f64) -> EnergyYields;

    /// Real-valued `(lower, upper)` ion envelope at `max_sigma` standard deviations.
    fn ion_envelope(&self, yields: &EnergyYields, max_sigma: f64) -> (f64, f64);

    /// Joint factor of quanta and ions, shape `[quanta.len(), ions.len()]`.
    fn quanta_ion_table(
        &self, yields: &EnergyYields, quanta: &[f64], ions: &[f64], regime: Regime,
    ) -> Array2<f64>;

    /// Forward draw of ions and excitons.
    ///
    /// # Errors
    /// `QuantaError::InvalidDistribution` when the model yields parameters a
    /// sampling distribution rejects.
    fn draw_ions_excitons<R: Rng + ?Sized>(
        &self, yields: &EnergyYields, rng: &mut R,
    ) -> QuantaResult<IonsExcitons>;

    /// Electrons given ions, shape `[electrons.len(), ions.len()]`.
    fn electron_table(
        &self, yields: &EnergyYields, electrons: &[f64], ions: &[f64], regime: Regime,
        owens_t_terms: usize,
    ) -> Array2<f64> {
        let model = self.model();
        let mut table = Array2::zeros((electrons.len(), ions.len()));
        for (m, &ni) in ions.iter().enumerate() {
            let split = electron_split(model, yields, ni, owens_t_terms);
            for (n, &nel) in electrons.iter().enumerate() {
                // A zero-width split (no ions) has no density; use its point mass.
                table[[n, m]] = match regime {
                    Regime::Approximate if split.scale > 0.0 => split.pdf(nel),
                    _ => TruncatedSkewGaussianCC { inner: split, limit: ni }.prob(nel),
                };
            }
        }
        table
    }
}

/// Skew-Gaussian of the electron count given `ions` ions.
pub fn electron_split<M: RecombinationModel + ?Sized>(
    model: &M, yields: &EnergyYields, ions: f64, owens_t_terms: usize,
) -> SkewGaussian {
    let skew = yields.skewness;
    let var = model.variance(yields.electrons_mean, yields.quanta_mean, yields.recomb_prob, ions);
    let width_corr = model.width_correction(skew);
    let mu_corr = model.mu_correction(skew, var, width_corr);
    SkewGaussian {
        loc: (1.0 - yields.recomb_prob) * ions - mu_corr,
        scale: var.sqrt() / width_corr,
        skewness: skew,
        owens_t_terms,
    }
}

fn discrete_normal(x: f64, loc: f64, scale: f64, regime: Regime) -> f64 {
    match regime {
        Regime::Exact => normal_cc(x, loc, scale),
        Regime::Approximate => normal_pdf(x, loc, scale),
    }
}

fn rounded_normal<R: Rng + ?Sized>(
    what: &'static str, mean: f64, std_dev: f64, rng: &mut R,
) -> QuantaResult<f64> {
    let dist = Normal::new(mean, std_dev)
        .map_err(|_| QuantaError::InvalidDistribution { what, value: std_dev })?;
    Ok(dist.sample(rng).round())
}

/// Electronic-recoil kernel.
#[derive(Debug, Clone)]
pub struct ErSplitting<M> {
    pub model: M,
}

impl<M: ErYieldModel> ErSplitting<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    fn quanta_width(&self, yields: &EnergyYields) -> f64 {
        (yields.quanta_mean * self.model.fano_factor(yields.quanta_mean)).sqrt()
    }
}

impl<M: ErYieldModel> SplittingKernel for ErSplitting<M> {
    type Model = M;

    fn model(&self) -> &M {
        &self.model
    }

    fn interaction(&self) -> Interaction {
        Interaction::Electronic
    }

    fn yields(&self, energy: f64) -> EnergyYields {
        let electrons_mean = self.model.mean_yield_electron(energy);
        let quanta_mean = self.model.mean_yield_quanta(energy, electrons_mean);
        let exciton_ratio = self.model.exciton_ratio(energy);
        EnergyYields {
            energy,
            electrons_mean,
            quanta_mean,
            exciton_ratio,
            recomb_prob: self.model.recomb_prob(electrons_mean, quanta_mean, exciton_ratio),
            skewness: self.model.skewness(quanta_mean),
        }
    }

    fn ion_envelope(&self, yields: &EnergyYields, max_sigma: f64) -> (f64, f64) {
        let alpha = yields.ion_fraction();
        let spread = self.quanta_width(yields) * max_sigma;
        let nq_upper = yields.quanta_mean + spread;
        let nq_lower = (yields.quanta_mean - spread).max(0.0);
        let ion_std = |nq: f64| (nq * alpha * (1.0 - alpha)).sqrt();
        (
            nq_lower * alpha - max_sigma * ion_std(nq_lower),
            nq_upper * alpha + max_sigma * ion_std(nq_upper),
        )
    }

    fn quanta_ion_table(
        &self, yields: &EnergyYields, quanta: &[f64], ions: &[f64], regime: Regime,
    ) -> Array2<f64> {
        let alpha = yields.ion_fraction();
        let scale = self.quanta_width(yields) + SCALE_FLOOR;
        let mut table = Array2::zeros((quanta.len(), ions.len()));
        for (q, &nq) in quanta.iter().enumerate() {
            let p_nq = discrete_normal(nq, yields.quanta_mean, scale, regime);
            for (m, &ni) in ions.iter().enumerate() {
                table[[q, m]] = p_nq * binomial_pmf(nq, alpha, ni);
            }
        }
        table
    }

    fn draw_ions_excitons<R: Rng + ?Sized>(
        &self, yields: &EnergyYields, rng: &mut R,
    ) -> QuantaResult<IonsExcitons> {
        let quanta =
            rounded_normal("quanta width", yields.quanta_mean, self.quanta_width(yields), rng)?
                .max(0.0) as u64;
        let alpha = yields.ion_fraction();
        let ions = Binomial::new(quanta, alpha)
            .map_err(|_| QuantaError::InvalidDistribution { what: "ion fraction", value: alpha })?
            .sample(rng);
        Ok(IonsExcitons { ions, excitons: quanta - ions })
    }
}

/// Nuclear-recoil kernel.
#[derive(Debug, Clone)]
pub struct NrSplitting<M> {
    pub model: M,
}

impl<M: NrYieldModel> NrSplitting<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// `(ion mean, ion std, exciton mean, exciton std)`.
    fn moments(&self, yields: &EnergyYields) -> (f64, f64, f64, f64) {
        let fano = self.model.yield_fano(yields.quanta_mean);
        let ion_mean = yields.quanta_mean * yields.ion_fraction();
        let exciton_mean = ion_mean * yields.exciton_ratio;
        (
            ion_mean,
            (ion_mean * fano.ions).sqrt(),
            exciton_mean,
            (exciton_mean * fano.excitons).sqrt(),
        )
    }
}

impl<M: NrYieldModel> SplittingKernel for NrSplitting<M> {
    type Model = M;

    fn model(&self) -> &M {
        &self.model
    }

    fn interaction(&self) -> Interaction {
        Interaction::Nuclear
    }

    fn yields(&self, energy: f64) -> EnergyYields {
        let y = self.model.mean_yields(energy);
        EnergyYields {
            energy,
            electrons_mean: y.electrons,
            quanta_mean: y.quanta,
            exciton_ratio: y.exciton_ratio,
            recomb_prob: self.model.recomb_prob(y.electrons, y.quanta, y.exciton_ratio),
            skewness: self.model.skewness(y.quanta),
        }
    }

    fn ion_envelope(&self, yields: &EnergyYields, max_sigma: f64) -> (f64, f64) {
        let (ion_mean, ion_std, _, _) = self.moments(yields);
        (ion_mean - max_sigma * ion_std, ion_mean + max_sigma * ion_std)
    }

    fn quanta_ion_table(
        &self, yields: &EnergyYields, quanta: &[f64], ions: &[f64], regime: Regime,
    ) -> Array2<f64> {
        let (ion_mean, ion_std, exciton_mean, exciton_std) = self.moments(yields);
        let p_ions: Vec<f64> = ions
            .iter()
            .map(|&ni| discrete_normal(ni, ion_mean, ion_std + SCALE_FLOOR, regime))
            .collect();
        let mut table = Array2::zeros((quanta.len(), ions.len()));
        for (q, &nq) in quanta.iter().enumerate() {
            for (m, &ni) in ions.iter().enumerate() {
                let p_nex =
                    discrete_normal(nq - ni, exciton_mean, exciton_std + SCALE_FLOOR, regime);
                table[[q, m]] = p_ions[m] * p_nex;
            }
        }
        table
    }

    fn draw_ions_excitons<R: Rng + ?Sized>(
        &self, yields: &EnergyYields, rng: &mut R,
    ) -> QuantaResult<IonsExcitons> {
        let (ion_mean, ion_std, exciton_mean, exciton_std) = self.moments(yields);
        let ions = rounded_normal("ion width", ion_mean, ion_std, rng)?.max(0.0) as u64;
        let excitons =
            rounded_normal("exciton width", exciton_mean, exciton_std, rng)?.max(0.0) as u64;
        Ok(IonsExcitons { ions, excitons })
    }
}
