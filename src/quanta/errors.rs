//! quanta::errors — error surface of the quanta-splitting block.
//!
//! Covers malformed inputs to the block (shape mismatches, empty spectra,
//! bad configuration), invalid envelopes from the yield model, and invalid
//! distribution parameters hit by the simulator. Numerical trouble inside
//! the marginalization itself (NaN kernels) is not an error; it is zeroed
//! and logged by the block.

/// Result alias for quanta-block operations.
pub type QuantaResult<T> = Result<T, QuantaError>;

#[derive(Debug, Clone, PartialEq)]
pub enum QuantaError {
    // ---- Spectrum ----
    /// No energies to work with.
    EmptySpectrum,
    /// A batch window keeps none of the spectrum's energies.
    EmptyBatch {
        batch: usize,
        energy_min: f64,
        energy_max: f64,
    },
    /// Batch index beyond the source's batch count.
    BatchOutOfRange {
        batch: usize,
        n_batches: usize,
    },
    /// Energies and rates must be finite.
    NonFiniteSpectrum {
        index: usize,
        value: f64,
    },

    // ---- Shapes ----
    /// Array length along some axis does not match its partner.
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    // ---- Configuration ----
    /// Block or annotator configuration rejected.
    InvalidConfig {
        name: &'static str,
        reason: &'static str,
    },

    // ---- Model output ----
    /// The ion-count envelope at an energy is not finite or is inverted.
    InvalidEnvelope {
        energy: f64,
        lower: f64,
        upper: f64,
    },
    /// A sampling distribution got parameters outside its support.
    InvalidDistribution {
        what: &'static str,
        value: f64,
    },
}

impl std::error::Error for QuantaError {}

impl std::fmt::Display for QuantaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Spectrum ----
            QuantaError::EmptySpectrum => write!(f, "Energy spectrum is empty"),
            QuantaError::EmptyBatch { batch, energy_min, energy_max } => write!(
                f,
                "Batch {batch} keeps no energies in [{energy_min}, {energy_max}]"
            ),
            QuantaError::BatchOutOfRange { batch, n_batches } => {
                write!(f, "Batch {batch} out of range: source has {n_batches} batches")
            }
            QuantaError::NonFiniteSpectrum { index, value } => {
                write!(f, "Non-finite spectrum entry at index {index}: {value}")
            }

            // ---- Shapes ----
            QuantaError::ShapeMismatch { what, expected, found } => {
                write!(f, "Shape mismatch for {what}: expected {expected}, found {found}")
            }

            // ---- Configuration ----
            QuantaError::InvalidConfig { name, reason } => {
                write!(f, "Invalid block configuration '{name}': {reason}")
            }

            // ---- Model output ----
            QuantaError::InvalidEnvelope { energy, lower, upper } => write!(
                f,
                "Invalid ion envelope at energy {energy}: [{lower}, {upper}]"
            ),
            QuantaError::InvalidDistribution { what, value } => {
                write!(f, "Invalid {what} for sampling: {value}")
            }
        }
    }
}
