//! quanta::source — the batch collaborator the block reads from.
//!
//! A source owns the energy spectrum and the per-batch observable domains.
//! The block only reads from it: energies and `max_sigma` to build the
//! bounds table, the per-batch energy window for annotation, and the
//! electron/photon grids for evaluation.
use ndarray::Array2;

use crate::quanta::errors::QuantaResult;

/// Named axes of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Electrons,
    Photons,
    Energy,
}

pub trait BatchSource {
    /// Full energy spectrum, in order.
    fn energies(&self) -> &[f64];

    /// Envelope width in standard deviations.
    fn max_sigma(&self) -> f64;

    fn batch_size(&self) -> usize;

    fn n_batches(&self) -> usize;

    /// Capacity of a dimension; `None` leaves it unstepped.
    fn max_dim_size(&self, dimension: Dimension) -> Option<usize>;

    /// `(energy_min, energy_max)` of the events in `batch`.
    ///
    /// # Errors
    /// Source-specific; typically `BatchOutOfRange`.
    fn energy_window(&self, batch: usize) -> QuantaResult<(f64, f64)>;

    /// Domain of `dimension` in `batch`, shape `[batch_size, n]`.
    ///
    /// # Errors
    /// Source-specific; typically `BatchOutOfRange`.
    fn domain(&self, dimension: Dimension, batch: usize) -> QuantaResult<Array2<f64>>;
}
