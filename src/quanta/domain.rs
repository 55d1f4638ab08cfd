//! quanta::domain — named shape contracts for the block's inputs.
//!
//! Purpose
//! -------
//! Replace implicit broadcasting with small value types whose constructors
//! check the shapes the block relies on:
//!
//! - [`BatchDomain`]: electrons `[n_events, n_el]`, photons `[n_events, n_ph]`.
//! - [`IonDomain`]: per-energy ion grid `mins[k] + j·step`, `j ∈ [0, dimsize)`.
//! - [`EnergySpectrum`]: energies `[n_energies]` with rate weights `[n_energies]`.
//!
//! [`Dedup`] is the unique/inverse pair used to evaluate expensive kernels
//! once per distinct value and gather results back to grid positions. A
//! [`BatchDomain`] builds its electron and quanta indices once, at
//! construction, so every energy and parameter point reuses them.
use std::collections::HashMap;

use ndarray::{Array1, Array2};

use crate::quanta::errors::{QuantaError, QuantaResult};

/// Electrons and photons produced, per event.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDomain {
    electrons: Array2<f64>,
    photons: Array2<f64>,
    electron_index: Dedup,
    quanta_index: Dedup,
}

impl BatchDomain {
    /// # Errors
    /// `ShapeMismatch` when the two grids disagree on the number of events.
    pub fn new(electrons: Array2<f64>, photons: Array2<f64>) -> QuantaResult<Self> {
        if electrons.nrows() != photons.nrows() {
            return Err(QuantaError::ShapeMismatch {
                what: "photon events",
                expected: electrons.nrows(),
                found: photons.nrows(),
            });
        }
        let electron_index = Dedup::new(electrons.iter());
        let quanta: Vec<f64> = electrons
            .rows()
            .into_iter()
            .zip(photons.rows())
            .flat_map(|(el, ph)| {
                el.into_iter().flat_map(move |&nel| ph.into_iter().map(move |&nph| nel + nph))
            })
            .collect();
        let quanta_index = Dedup::new(quanta.iter());
        Ok(Self { electrons, photons, electron_index, quanta_index })
    }

    pub fn electrons(&self) -> &Array2<f64> {
        &self.electrons
    }

    pub fn photons(&self) -> &Array2<f64> {
        &self.photons
    }

    /// Distinct electron counts; `inverse` is indexed by `e·n_el + i`.
    pub fn electron_index(&self) -> &Dedup {
        &self.electron_index
    }

    /// Distinct quanta `nel + nph`; `inverse` is indexed by
    /// `(e·n_el + i)·n_ph + j`.
    pub fn quanta_index(&self) -> &Dedup {
        &self.quanta_index
    }

    pub fn n_events(&self) -> usize {
        self.electrons.nrows()
    }

    /// `(n_events, n_el, n_ph)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.electrons.nrows(), self.electrons.ncols(), self.photons.ncols())
    }
}

/// Ion-count grid, one row per energy.
#[derive(Debug, Clone, PartialEq)]
pub struct IonDomain {
    mins: Vec<f64>,
    step: usize,
    dimsize: usize,
}

impl IonDomain {
    /// # Errors
    /// `InvalidConfig` when `step` or `dimsize` is zero.
    pub fn new(mins: Vec<f64>, step: usize, dimsize: usize) -> QuantaResult<Self> {
        if step == 0 {
            return Err(QuantaError::InvalidConfig { name: "ion step", reason: "must be >= 1" });
        }
        if dimsize == 0 {
            return Err(QuantaError::InvalidConfig {
                name: "ion dimsize",
                reason: "must be >= 1",
            });
        }
        Ok(Self { mins, step, dimsize })
    }

    pub fn n_energies(&self) -> usize {
        self.mins.len()
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn dimsize(&self) -> usize {
        self.dimsize
    }

    /// Ion values for energy `k`; empty when `k` is out of range.
    pub fn values_for(&self, k: usize) -> Vec<f64> {
        let Some(&min) = self.mins.get(k) else {
            return Vec::new();
        };
        (0..self.dimsize).map(|j| min + (j * self.step) as f64).collect()
    }
}

/// Energies with their rate weights.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergySpectrum {
    energies: Array1<f64>,
    rates: Array1<f64>,
}

impl EnergySpectrum {
    /// # Errors
    /// - `EmptySpectrum` when no energies are given.
    /// - `ShapeMismatch` when rates and energies differ in length.
    /// - `NonFiniteSpectrum` for a NaN/∞ energy or rate.
    pub fn new(energies: Array1<f64>, rates: Array1<f64>) -> QuantaResult<Self> {
        if energies.is_empty() {
            return Err(QuantaError::EmptySpectrum);
        }
        if energies.len() != rates.len() {
            return Err(QuantaError::ShapeMismatch {
                what: "spectrum rates",
                expected: energies.len(),
                found: rates.len(),
            });
        }
        for (index, &value) in energies.iter().chain(rates.iter()).enumerate() {
            if !value.is_finite() {
                return Err(QuantaError::NonFiniteSpectrum {
                    index: index % energies.len(),
                    value,
                });
            }
        }
        Ok(Self { energies, rates })
    }

    pub fn energies(&self) -> &Array1<f64> {
        &self.energies
    }

    pub fn rates(&self) -> &Array1<f64> {
        &self.rates
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }
}

/// Distinct values in first-occurrence order and, per input position, the
/// index of its value in `unique`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dedup {
    pub unique: Vec<f64>,
    pub inverse: Vec<usize>,
}

impl Dedup {
    pub fn new<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> Self {
        let mut seen: HashMap<u64, usize> = HashMap::new();
        let mut unique = Vec::new();
        let inverse = values
            .into_iter()
            .map(|&v| {
                // -0.0 and 0.0 share a slot.
                let key = if v == 0.0 { 0.0_f64.to_bits() } else { v.to_bits() };
                *seen.entry(key).or_insert_with(|| {
                    unique.push(v);
                    unique.len() - 1
                })
            })
            .collect();
        Self { unique, inverse }
    }
}
