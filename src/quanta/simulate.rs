//! quanta::simulate — forward draws of ions, excitons, electrons and photons.
//!
//! Purpose
//! -------
//! Produce one [`SimulatedQuanta`] per input energy using the same kernel
//! as the marginalization: the kernel draws ions and excitons, and the
//! electron count follows the skew-Gaussian split of those ions.
//!
//! Invariants & assumptions
//! ------------------------
//! - Counts are never negative; continuous draws are rounded then clipped.
//! - `electrons <= ions`; zero ions always give zero electrons.
//! - `photons = ions − electrons + excitons`, hence `photons >= excitons`.
use rand::Rng;
use rand_distr::{Distribution, SkewNormal};

use crate::quanta::{
    distributions::DEFAULT_OWENS_T_TERMS,
    errors::{QuantaError, QuantaResult},
    kernel::{SplittingKernel, electron_split},
};

/// Counts of one simulated event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedQuanta {
    pub energy: f64,
    pub ions: u64,
    pub excitons: u64,
    pub electrons: u64,
    pub photons: u64,
}

impl SimulatedQuanta {
    pub fn quanta(&self) -> u64 {
        self.ions + self.excitons
    }
}

/// Simulate one event per energy.
///
/// # Errors
/// `InvalidDistribution` when the model produces a non-finite or negative
/// width or location for one of the sampling distributions.
pub fn simulate_quanta<K, R>(
    kernel: &K, energies: &[f64], rng: &mut R,
) -> QuantaResult<Vec<SimulatedQuanta>>
where
    K: SplittingKernel + ?Sized,
    R: Rng + ?Sized,
{
    energies
        .iter()
        .map(|&energy| {
            let yields = kernel.yields(energy);
            let drawn = kernel.draw_ions_excitons(&yields, rng)?;
            let electrons = if drawn.ions == 0 {
                0
            } else {
                let split =
                    electron_split(kernel.model(), &yields, drawn.ions as f64, DEFAULT_OWENS_T_TERMS);
                let raw = if split.scale > 0.0 {
                    SkewNormal::new(split.loc, split.scale, split.skewness)
                        .map_err(|_| QuantaError::InvalidDistribution {
                            what: "electron split",
                            value: split.scale,
                        })?
                        .sample(rng)
                } else {
                    split.loc
                };
                if !raw.is_finite() {
                    return Err(QuantaError::InvalidDistribution {
                        what: "electron location",
                        value: raw,
                    });
                }
                (raw.round().max(0.0) as u64).min(drawn.ions)
            };
            Ok(SimulatedQuanta {
                energy,
                ions: drawn.ions,
                excitons: drawn.excitons,
                electrons,
                photons: drawn.ions - electrons + drawn.excitons,
            })
        })
        .collect()
}
