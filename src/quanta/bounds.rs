//! quanta::bounds — ion-count envelopes, built once and sliced per batch.
//!
//! Purpose
//! -------
//! Two-phase lifecycle for the `[ions_min, ions_max]` envelope:
//!
//! 1. [`BoundsTable::build`] evaluates the kernel's envelope once per energy
//!    of the full spectrum and stores integer bounds. The table is an
//!    immutable value; the block owns it and hands it to later calls.
//! 2. [`BoundsTable::annotate_batch`] trims the cached envelope to a batch's
//!    energy window, optionally subsamples the energy axis, and pads the
//!    per-energy columns to a fixed length.
//!
//! Key behaviors
//! -------------
//! - Bounds are `floor(lower)` and `ceil(upper)`, both clamped at zero ions.
//! - Energy stepping keeps indices `round(linspace(0, n − 1, min(n, cap)))`
//!   of the trimmed spectrum.
//! - Padding length is `max(min(n_full, cap), 2)` when stepped and
//!   `max(n_full, 2)` otherwise; padded slots hold zero ions.
//! - [`BatchAnnotation::dimsize_and_step`] sizes the ion axis:
//!   `dimsize = max_k(max_k − min_k + 1)`; above the cap the axis keeps
//!   `cap` points spaced `ceil((dimsize − 1)/(cap − 1))` apart.
use crate::quanta::{
    domain::IonDomain,
    errors::{QuantaError, QuantaResult},
    kernel::SplittingKernel,
};

/// Integer ion envelope per energy of the full spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsTable {
    energies: Vec<f64>,
    ions_min: Vec<f64>,
    ions_max: Vec<f64>,
}

impl BoundsTable {
    /// # Errors
    /// - `EmptySpectrum` for no energies.
    /// - `NonFiniteSpectrum` for a NaN/∞ energy.
    /// - `InvalidEnvelope` when the kernel's envelope is non-finite or inverted.
    pub fn build<K: SplittingKernel + ?Sized>(
        kernel: &K, energies: &[f64], max_sigma: f64,
    ) -> QuantaResult<Self> {
        if energies.is_empty() {
            return Err(QuantaError::EmptySpectrum);
        }
        if !(max_sigma.is_finite() && max_sigma > 0.0) {
            return Err(QuantaError::InvalidConfig { name: "max_sigma", reason: "must be > 0" });
        }
        let mut ions_min = Vec::with_capacity(energies.len());
        let mut ions_max = Vec::with_capacity(energies.len());
        for (index, &energy) in energies.iter().enumerate() {
            if !energy.is_finite() {
                return Err(QuantaError::NonFiniteSpectrum { index, value: energy });
            }
            let (lower, upper) = kernel.ion_envelope(&kernel.yields(energy), max_sigma);
            if !(lower.is_finite() && upper.is_finite()) || lower > upper {
                return Err(QuantaError::InvalidEnvelope { energy, lower, upper });
            }
            ions_min.push(lower.floor().max(0.0));
            ions_max.push(upper.ceil().max(0.0));
        }
        Ok(Self { energies: energies.to_vec(), ions_min, ions_max })
    }

    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    pub fn ions_min(&self) -> &[f64] {
        &self.ions_min
    }

    pub fn ions_max(&self) -> &[f64] {
        &self.ions_max
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// Slice the table to the energies in `[energy_min, energy_max]`.
    ///
    /// # Errors
    /// - `InvalidConfig` for `max_energy_dim == Some(0)`.
    /// - `EmptyBatch` when the window keeps no energy.
    pub fn annotate_batch(
        &self, batch: usize, energy_min: f64, energy_max: f64, max_energy_dim: Option<usize>,
    ) -> QuantaResult<BatchAnnotation> {
        if max_energy_dim == Some(0) {
            return Err(QuantaError::InvalidConfig {
                name: "max_energy_dim",
                reason: "must be >= 1",
            });
        }
        let mut kept: Vec<usize> = (0..self.len())
            .filter(|&i| self.energies[i] >= energy_min && self.energies[i] <= energy_max)
            .collect();
        if kept.is_empty() {
            return Err(QuantaError::EmptyBatch { batch, energy_min, energy_max });
        }

        let pad_len = match max_energy_dim {
            Some(cap) => {
                let picked = stepped_indices(kept.len(), cap).into_iter().map(|j| kept[j]).collect();
                kept = picked;
                self.len().min(cap).max(2)
            }
            None => self.len().max(2),
        };

        let energies: Vec<f64> = kept.iter().map(|&i| self.energies[i]).collect();
        let mut ions_min: Vec<f64> = kept.iter().map(|&i| self.ions_min[i]).collect();
        let mut ions_max: Vec<f64> = kept.iter().map(|&i| self.ions_max[i]).collect();
        let n_energies = energies.len();
        if pad_len > n_energies {
            ions_min.resize(pad_len, 0.0);
            ions_max.resize(pad_len, 0.0);
        }
        Ok(BatchAnnotation { batch, energies, ions_min, ions_max, n_energies })
    }
}

/// `round(linspace(0, n − 1, min(n, cap)))`.
fn stepped_indices(n: usize, cap: usize) -> Vec<usize> {
    let m = n.min(cap);
    if m <= 1 {
        return vec![0; m];
    }
    let last = (n - 1) as f64;
    (0..m).map(|j| (j as f64 * last / (m - 1) as f64).round() as usize).collect()
}

/// Envelope columns of one batch.
///
/// `ions_min` / `ions_max` are padded; the first `n_energies` entries line
/// up with `energies`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchAnnotation {
    pub batch: usize,
    pub energies: Vec<f64>,
    pub ions_min: Vec<f64>,
    pub ions_max: Vec<f64>,
    pub n_energies: usize,
}

impl BatchAnnotation {
    /// `(dimsize, step)` of the ion axis under `max_ions_dim`.
    ///
    /// # Errors
    /// `InvalidConfig` when the cap is below 2.
    pub fn dimsize_and_step(&self, max_ions_dim: usize) -> QuantaResult<(usize, usize)> {
        if max_ions_dim < 2 {
            return Err(QuantaError::InvalidConfig {
                name: "max_ions_dim",
                reason: "must be >= 2",
            });
        }
        let raw = self.ions_min[..self.n_energies]
            .iter()
            .zip(&self.ions_max[..self.n_energies])
            .map(|(lo, hi)| (hi - lo) as usize + 1)
            .max()
            .unwrap_or(1);
        if raw > max_ions_dim {
            Ok((max_ions_dim, (raw - 1).div_ceil(max_ions_dim - 1)))
        } else {
            Ok((raw, 1))
        }
    }

    /// Per-energy ion grid of this batch.
    ///
    /// # Errors
    /// Propagates [`dimsize_and_step`](Self::dimsize_and_step).
    pub fn ion_domain(&self, max_ions_dim: usize) -> QuantaResult<IonDomain> {
        let (dimsize, step) = self.dimsize_and_step(max_ions_dim)?;
        IonDomain::new(self.ions_min[..self.n_energies].to_vec(), step, dimsize)
    }
}
