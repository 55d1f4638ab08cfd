//! quanta — splitting of deposited energy into electrons and photons.
//!
//! Purpose
//! -------
//! Compute `P(electrons, photons | spectrum)` for events in a liquid-xenon
//! detector by marginalizing over the unobserved ion count, and provide the
//! matching forward simulator and ion-envelope annotator.
//!
//! Key behaviors
//! -------------
//! - `model`: traits a detector model implements (mean yields, widths,
//!   recombination) plus ready-made fluctuation curves.
//! - `kernel`: the per-interaction strategy ([`ErSplitting`](kernel::ErSplitting),
//!   [`NrSplitting`](kernel::NrSplitting)) with exact and approximate regimes.
//! - `bounds`: the immutable bounds table and the per-batch annotator.
//! - `block`: [`QuantaSplittingBlock`](block::QuantaSplittingBlock), which
//!   ties kernel, bounds and domains together.
//! - `simulate`: forward draws with non-negativity and
//!   electrons-not-above-ions clamps.
//!
//! Conventions
//! -----------
//! - Shapes are carried by the types in `domain`; see each type for its
//!   axes.
//! - Errors are [`QuantaError`](errors::QuantaError); they convert into
//!   `OptError` for likelihood code that mixes both layers.
//!
//! Testing notes
//! -------------
//! - Each submodule has unit tests with toy yield models;
//!   `tests/integration_quanta.rs` checks conservation of probability and
//!   exact/approximate agreement end to end.

pub mod block;
pub mod bounds;
pub mod distributions;
pub mod domain;
pub mod errors;
pub mod kernel;
pub mod model;
pub mod simulate;
pub mod source;

pub mod prelude {
    pub use super::block::{BlockConfig, QuantaSplittingBlock};
    pub use super::bounds::{BatchAnnotation, BoundsTable};
    pub use super::domain::{BatchDomain, EnergySpectrum, IonDomain};
    pub use super::errors::{QuantaError, QuantaResult};
    pub use super::kernel::{ErSplitting, Interaction, NrSplitting, Regime, SplittingKernel};
    pub use super::model::{
        ErYieldModel, GaussianFluctuation, NrFano, NrYieldModel, NrYields, RecombinationModel,
        SkewGaussianFluctuation,
    };
    pub use super::simulate::{SimulatedQuanta, simulate_quanta};
    pub use super::source::{BatchSource, Dimension};
}
