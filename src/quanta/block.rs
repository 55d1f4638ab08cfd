//! quanta::block — the quanta-splitting probability block.
//!
//! Purpose
//! -------
//! Marginalize the ion count out of the joint (electrons, photons, ions)
//! probability at each energy of a batch, weight by the spectrum's rates,
//! and accumulate over energies. The result is `P(electrons, photons)` per
//! event, shape `[n_events, n_el, n_ph]`.
//!
//! Key behaviors
//! -------------
//! - Per energy, the kernel's regime decides exact or approximate kernels.
//!   Exact and approximate energies accumulate into separate partial sums
//!   which are added at the end.
//! - Electron values and quanta values (`nq = nel + nph`) are deduplicated
//!   once per [`BatchDomain`]; kernel tables are built over the unique
//!   values and gathered back per grid point. This only saves work; the
//!   numbers do not change.
//! - NaN contributions (domain points outside physical support) are zeroed
//!   after the rate multiply and counted in a `debug` log line.
//! - The block owns an immutable [`BoundsTable`] built at construction;
//!   [`annotate`](QuantaSplittingBlock::annotate) and
//!   [`domain`](QuantaSplittingBlock::domain) derive per-batch inputs from it.
//!
//! Invariants & assumptions
//! ------------------------
//! - `IonDomain::n_energies() == spectrum.len()`; checked in `compute`.
//! - Kernel tables are `[unique values, ions]`; the ion axis is shared by
//!   both tables of one energy.
//!
//! Conventions
//! -----------
//! - Counts are carried as `f64` so grids can come straight from tensors.
//! - Configuration is validated once in [`BlockConfig::new`].
//!
//! Downstream usage
//! ----------------
//! - A likelihood engine builds one block per source, calls `annotate` once
//!   per data set, then `domain` + `compute` per batch and parameter point.
//! - `simulate` reuses the kernel for forward Monte Carlo.
//!
//! Testing notes
//! -------------
//! - Unit tests compare the deduplicated path with a per-point evaluation
//!   and check configuration and shape validation.
//! - `tests/integration_quanta.rs` covers probability conservation and the
//!   exact/approximate agreement.
use ndarray::Array3;
use rand::Rng;

use crate::quanta::{
    bounds::{BatchAnnotation, BoundsTable},
    distributions::DEFAULT_OWENS_T_TERMS,
    domain::{BatchDomain, EnergySpectrum, IonDomain},
    errors::{QuantaError, QuantaResult},
    kernel::{Regime, SplittingKernel},
    simulate::{SimulatedQuanta, simulate_quanta},
    source::{BatchSource, Dimension},
};

/// Numerical settings of the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockConfig {
    /// Cap on the ion axis; wider envelopes are stepped.
    pub max_ions_dim: usize,
    /// Gauss–Legendre panels in Owen's T for the skew-Gaussian CDF.
    pub owens_t_terms: usize,
}

impl BlockConfig {
    /// # Errors
    /// `InvalidConfig` when `max_ions_dim < 2` or `owens_t_terms == 0`.
    pub fn new(max_ions_dim: usize, owens_t_terms: usize) -> QuantaResult<Self> {
        if max_ions_dim < 2 {
            return Err(QuantaError::InvalidConfig {
                name: "max_ions_dim",
                reason: "must be >= 2",
            });
        }
        if owens_t_terms == 0 {
            return Err(QuantaError::InvalidConfig {
                name: "owens_t_terms",
                reason: "must be >= 1",
            });
        }
        Ok(Self { max_ions_dim, owens_t_terms })
    }
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self { max_ions_dim: 30, owens_t_terms: DEFAULT_OWENS_T_TERMS }
    }
}

#[derive(Debug, Clone)]
pub struct QuantaSplittingBlock<K> {
    kernel: K,
    config: BlockConfig,
    bounds: BoundsTable,
}

impl<K: SplittingKernel> QuantaSplittingBlock<K> {
    /// Build the block and its bounds table for `energies`.
    ///
    /// # Errors
    /// Propagates [`BoundsTable::build`].
    pub fn new(
        kernel: K, config: BlockConfig, energies: &[f64], max_sigma: f64,
    ) -> QuantaResult<Self> {
        let bounds = BoundsTable::build(&kernel, energies, max_sigma)?;
        Ok(Self { kernel, config, bounds })
    }

    /// Build from a source's spectrum and `max_sigma`.
    ///
    /// # Errors
    /// Propagates [`BoundsTable::build`].
    pub fn from_source<S: BatchSource + ?Sized>(
        kernel: K, config: BlockConfig, source: &S,
    ) -> QuantaResult<Self> {
        Self::new(kernel, config, source.energies(), source.max_sigma())
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn config(&self) -> &BlockConfig {
        &self.config
    }

    pub fn bounds(&self) -> &BoundsTable {
        &self.bounds
    }

    /// Annotate every batch of `source`.
    ///
    /// # Errors
    /// Propagates the source's window lookup and [`BoundsTable::annotate_batch`].
    pub fn annotate<S: BatchSource + ?Sized>(
        &self, source: &S,
    ) -> QuantaResult<Vec<BatchAnnotation>> {
        let max_energy_dim = source.max_dim_size(Dimension::Energy);
        (0..source.n_batches())
            .map(|batch| {
                let (energy_min, energy_max) = source.energy_window(batch)?;
                self.bounds.annotate_batch(batch, energy_min, energy_max, max_energy_dim)
            })
            .collect()
    }

    /// Observable and ion domains of one annotated batch.
    ///
    /// # Errors
    /// - `BatchOutOfRange` for a batch beyond the source.
    /// - `ShapeMismatch` when the source's grids disagree with each other
    ///   or with `batch_size`.
    pub fn domain<S: BatchSource + ?Sized>(
        &self, source: &S, annotation: &BatchAnnotation,
    ) -> QuantaResult<(BatchDomain, IonDomain)> {
        let batch = annotation.batch;
        if batch >= source.n_batches() {
            return Err(QuantaError::BatchOutOfRange { batch, n_batches: source.n_batches() });
        }
        let electrons = source.domain(Dimension::Electrons, batch)?;
        let photons = source.domain(Dimension::Photons, batch)?;
        if electrons.nrows() != source.batch_size() {
            return Err(QuantaError::ShapeMismatch {
                what: "electron events",
                expected: source.batch_size(),
                found: electrons.nrows(),
            });
        }
        let domain = BatchDomain::new(electrons, photons)?;
        let ions = annotation.ion_domain(self.config.max_ions_dim)?;
        Ok((domain, ions))
    }

    /// `P(electrons, photons)` summed over the spectrum, `[n_events, n_el, n_ph]`.
    ///
    /// # Errors
    /// `ShapeMismatch` when the ion domain and the spectrum cover a different
    /// number of energies.
    pub fn compute(
        &self, domain: &BatchDomain, ions: &IonDomain, spectrum: &EnergySpectrum,
    ) -> QuantaResult<Array3<f64>> {
        if ions.n_energies() != spectrum.len() {
            return Err(QuantaError::ShapeMismatch {
                what: "ion domain energies",
                expected: spectrum.len(),
                found: ions.n_energies(),
            });
        }
        let interaction = self.kernel.interaction();
        let mut exact = Array3::zeros(domain.shape());
        let mut approx = Array3::zeros(domain.shape());
        for (k, (&energy, &rate)) in
            spectrum.energies().iter().zip(spectrum.rates().iter()).enumerate()
        {
            let regime = interaction.regime(energy);
            let mut p = self.compute_single_energy(energy, &ions.values_for(k), domain, regime);
            p.mapv_inplace(|v| v * rate);
            let mut n_nan = 0usize;
            p.mapv_inplace(|v| {
                if v.is_nan() {
                    n_nan += 1;
                    0.0
                } else {
                    v
                }
            });
            if n_nan > 0 {
                log::debug!("zeroed {n_nan} NaN contributions at energy {energy} ({regime:?})");
            }
            match regime {
                Regime::Exact => exact += &p,
                Regime::Approximate => approx += &p,
            }
        }
        Ok(exact + approx)
    }

    /// Joint probability at one energy, marginalized over `ions`, without
    /// rate weighting. Shape `[n_events, n_el, n_ph]`.
    pub fn compute_single_energy(
        &self, energy: f64, ions: &[f64], domain: &BatchDomain, regime: Regime,
    ) -> Array3<f64> {
        let (n_events, n_el, n_ph) = domain.shape();
        let yields = self.kernel.yields(energy);

        let el_dedup = domain.electron_index();
        let q_dedup = domain.quanta_index();

        let quanta_table = self.kernel.quanta_ion_table(&yields, &q_dedup.unique, ions, regime);
        let electron_table = self.kernel.electron_table(
            &yields,
            &el_dedup.unique,
            ions,
            regime,
            self.config.owens_t_terms,
        );

        let mut out = Array3::zeros((n_events, n_el, n_ph));
        for e in 0..n_events {
            for i in 0..n_el {
                let el_row = electron_table.row(el_dedup.inverse[e * n_el + i]);
                for j in 0..n_ph {
                    let q_row = quanta_table.row(q_dedup.inverse[(e * n_el + i) * n_ph + j]);
                    out[[e, i, j]] = q_row.dot(&el_row);
                }
            }
        }
        out
    }

    /// Per-point evaluation without deduplication; reference for tests.
    #[cfg(test)]
    fn compute_single_energy_per_point(
        &self, energy: f64, ions: &[f64], domain: &BatchDomain, regime: Regime,
    ) -> Array3<f64> {
        let yields = self.kernel.yields(energy);
        let (electrons, photons) = (domain.electrons(), domain.photons());
        Array3::from_shape_fn(domain.shape(), |(e, i, j)| {
            let nel = electrons[[e, i]];
            let nq = nel + photons[[e, j]];
            let q = self.kernel.quanta_ion_table(&yields, &[nq], ions, regime);
            let el = self.kernel.electron_table(
                &yields,
                &[nel],
                ions,
                regime,
                self.config.owens_t_terms,
            );
            q.row(0).dot(&el.row(0))
        })
    }

    /// Forward-simulate one event per energy.
    ///
    /// # Errors
    /// Propagates [`simulate_quanta`].
    pub fn simulate<R: Rng + ?Sized>(
        &self, energies: &[f64], rng: &mut R,
    ) -> QuantaResult<Vec<SimulatedQuanta>> {
        simulate_quanta(&self.kernel, energies, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quanta::{
        kernel::{ErSplitting, NrSplitting},
        model::{ErYieldModel, NrFano, NrYieldModel, NrYields, RecombinationModel},
    };
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - BlockConfig validation and defaults.
    // - Deduplication transparency for both interaction classes.
    // - Rate weighting and the energy-count shape check in `compute`.
    // - Batch wiring through a BatchSource.
    // -------------------------------------------------------------------------

    struct ToyEr;

    impl RecombinationModel for ToyEr {
        fn recomb_prob(&self, nel: f64, nq: f64, ex: f64) -> f64 {
            1.0 - nel / (nq / (1.0 + ex))
        }
        fn skewness(&self, _: f64) -> f64 {
            0.5
        }
        fn recombination_fluctuation(&self, _: f64) -> f64 {
            0.05
        }
    }

    impl ErYieldModel for ToyEr {
        fn mean_yield_electron(&self, energy: f64) -> f64 {
            11.0 * energy
        }
        fn mean_yield_quanta(&self, energy: f64, _: f64) -> f64 {
            20.0 * energy
        }
        fn fano_factor(&self, _: f64) -> f64 {
            0.6
        }
        fn exciton_ratio(&self, _: f64) -> f64 {
            0.2
        }
    }

    struct ToyNr;

    impl RecombinationModel for ToyNr {
        fn recomb_prob(&self, _: f64, _: f64, _: f64) -> f64 {
            0.4
        }
        fn skewness(&self, _: f64) -> f64 {
            1.0
        }
        fn recombination_fluctuation(&self, _: f64) -> f64 {
            0.04
        }
    }

    impl NrYieldModel for ToyNr {
        fn mean_yields(&self, energy: f64) -> NrYields {
            NrYields { electrons: 2.0 * energy, quanta: 5.0 * energy, exciton_ratio: 1.0 }
        }
        fn yield_fano(&self, _: f64) -> NrFano {
            NrFano { ions: 1.0, excitons: 1.0 }
        }
    }

    /// Two events sharing electron values and overlapping quanta values.
    fn repeated_domain() -> BatchDomain {
        BatchDomain::new(
            array![[8.0, 9.0, 10.0, 11.0], [9.0, 10.0, 11.0, 12.0]],
            array![[10.0, 11.0, 12.0], [9.0, 10.0, 11.0]],
        )
        .unwrap()
    }

    fn ion_range(lo: usize, hi: usize) -> Vec<f64> {
        (lo..=hi).map(|v| v as f64).collect()
    }

    struct GridSource {
        energies: Vec<f64>,
    }

    impl BatchSource for GridSource {
        fn energies(&self) -> &[f64] {
            &self.energies
        }
        fn max_sigma(&self) -> f64 {
            5.0
        }
        fn batch_size(&self) -> usize {
            2
        }
        fn n_batches(&self) -> usize {
            1
        }
        fn max_dim_size(&self, _: Dimension) -> Option<usize> {
            None
        }
        fn energy_window(&self, batch: usize) -> QuantaResult<(f64, f64)> {
            if batch == 0 {
                Ok((0.9, 1.1))
            } else {
                Err(QuantaError::BatchOutOfRange { batch, n_batches: 1 })
            }
        }
        fn domain(&self, dimension: Dimension, _: usize) -> QuantaResult<Array2<f64>> {
            let row: Array1<f64> = Array1::range(0.0, 30.0, 1.0);
            let grid = ndarray::stack![ndarray::Axis(0), row, row];
            match dimension {
                Dimension::Electrons | Dimension::Photons => Ok(grid),
                Dimension::Energy => Ok(Array2::zeros((2, 0))),
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // BlockConfig rejects degenerate caps and zero Owen's T panels.
    //
    // Given
    // -----
    // - max_ions_dim 1; owens_t_terms 0; the default.
    //
    // Expect
    // ------
    // - InvalidConfig twice; default (30, 5).
    fn block_config_validation() {
        // Act / Assert
        assert!(matches!(BlockConfig::new(1, 5), Err(QuantaError::InvalidConfig { .. })));
        assert!(matches!(BlockConfig::new(30, 0), Err(QuantaError::InvalidConfig { .. })));
        assert_eq!(BlockConfig::default(), BlockConfig::new(30, 5).unwrap());
    }

    #[test]
    // Purpose
    // -------
    // The deduplicated path matches per-point evaluation for ER.
    //
    // Given
    // -----
    // - Repeated electron/quanta values, E = 1 (exact) and E = 6 (approximate).
    //
    // Expect
    // ------
    // - Identical arrays within 1e-15.
    fn dedup_matches_per_point_er() {
        // Arrange
        let block =
            QuantaSplittingBlock::new(ErSplitting::new(ToyEr), BlockConfig::default(), &[1.0], 5.0)
                .unwrap();
        let domain = repeated_domain();

        for (energy, ions, regime) in
            [(1.0, ion_range(5, 30), Regime::Exact), (6.0, ion_range(60, 120), Regime::Approximate)]
        {
            // Act
            let fast = block.compute_single_energy(energy, &ions, &domain, regime);
            let slow = block.compute_single_energy_per_point(energy, &ions, &domain, regime);

            // Assert
            for (a, b) in fast.iter().zip(slow.iter()) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-15);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // The deduplicated path matches per-point evaluation for NR.
    //
    // Given
    // -----
    // - Repeated values, E = 8 (exact regime for NR).
    //
    // Expect
    // ------
    // - Identical arrays within 1e-15.
    fn dedup_matches_per_point_nr() {
        // Arrange
        let block =
            QuantaSplittingBlock::new(NrSplitting::new(ToyNr), BlockConfig::default(), &[8.0], 5.0)
                .unwrap();
        let domain = repeated_domain();
        let ions = ion_range(5, 40);

        // Act
        let fast = block.compute_single_energy(8.0, &ions, &domain, Regime::Exact);
        let slow = block.compute_single_energy_per_point(8.0, &ions, &domain, Regime::Exact);

        // Assert
        for (a, b) in fast.iter().zip(slow.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-15);
        }
    }

    #[test]
    // Purpose
    // -------
    // `compute` weights by rate and sums over energies.
    //
    // Given
    // -----
    // - The same energy twice with rates 0.25 and 0.75.
    //
    // Expect
    // ------
    // - Result equals the unweighted single-energy result.
    fn compute_weights_and_sums() {
        // Arrange
        let block =
            QuantaSplittingBlock::new(ErSplitting::new(ToyEr), BlockConfig::default(), &[1.0], 5.0)
                .unwrap();
        let domain = repeated_domain();
        let ions = IonDomain::new(vec![5.0, 5.0], 1, 26).unwrap();
        let spectrum = EnergySpectrum::new(array![1.0, 1.0], array![0.25, 0.75]).unwrap();

        // Act
        let total = block.compute(&domain, &ions, &spectrum).unwrap();
        let single = block.compute_single_energy(1.0, &ions.values_for(0), &domain, Regime::Exact);

        // Assert
        for (a, b) in total.iter().zip(single.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-14);
        }
    }

    #[test]
    // Purpose
    // -------
    // `compute` rejects an ion domain built for another spectrum.
    //
    // Given
    // -----
    // - Ion domain for one energy, spectrum with two.
    //
    // Expect
    // ------
    // - ShapeMismatch.
    fn compute_rejects_energy_mismatch() {
        // Arrange
        let block =
            QuantaSplittingBlock::new(ErSplitting::new(ToyEr), BlockConfig::default(), &[1.0], 5.0)
                .unwrap();
        let ions = IonDomain::new(vec![0.0], 1, 10).unwrap();
        let spectrum = EnergySpectrum::new(array![1.0, 2.0], array![1.0, 1.0]).unwrap();

        // Act
        let err = block.compute(&repeated_domain(), &ions, &spectrum).unwrap_err();

        // Assert
        assert!(matches!(err, QuantaError::ShapeMismatch { what: "ion domain energies", .. }));
    }

    #[test]
    // Purpose
    // -------
    // A source drives annotation, domain construction and evaluation.
    //
    // Given
    // -----
    // - Energies {0.5, 1.0, 2.0}, batch window [0.9, 1.1], 0..30 grids.
    //
    // Expect
    // ------
    // - One annotation holding E = 1; a [2, 30, 30] result whose rows are
    //   identical for both events and whose mass is close to 1.
    fn source_drives_the_pipeline() {
        // Arrange
        let source = GridSource { energies: vec![0.5, 1.0, 2.0] };
        let config = BlockConfig::new(64, 5).unwrap();
        let block = QuantaSplittingBlock::from_source(ErSplitting::new(ToyEr), config, &source)
            .unwrap();

        // Act
        let annotations = block.annotate(&source).unwrap();
        let (domain, ions) = block.domain(&source, &annotations[0]).unwrap();
        let spectrum = EnergySpectrum::new(array![1.0], array![1.0]).unwrap();
        let p = block.compute(&domain, &ions, &spectrum).unwrap();

        // Assert
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].energies, vec![1.0]);
        assert_eq!(p.dim(), (2, 30, 30));
        assert_eq!(p.index_axis(ndarray::Axis(0), 0), p.index_axis(ndarray::Axis(0), 1));
        assert_abs_diff_eq!(p.index_axis(ndarray::Axis(0), 0).sum(), 1.0, epsilon = 1e-2);
    }
}
