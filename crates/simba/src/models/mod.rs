//! Learned dynamics.
//!
//! Provides:
//! - `Approximator` - capability trait for swappable function approximators
//! - `Mlp` / `MlpEnsemble` - `ndarray` implementations
//! - `ModelConfig` / `ModelKind` - configuration and the static registry
//! - `TransitionModel` - normalized delta model with batched rollouts

mod config;
mod ensemble;
mod mlp;
mod normalizer;
mod transition;

pub use config::{build_approximator, Activation, ModelConfig, ModelKind};
pub use ensemble::MlpEnsemble;
pub use mlp::Mlp;
pub use normalizer::{InputNormalizer, NORMALIZATION_EPSILON};
pub use transition::TransitionModel;

use crate::Result;
use ndarray::{Array2, ArrayView2};

/// Function approximator consumed by [`TransitionModel`].
///
/// Parameter representation is private to each implementation; callers only
/// build, fit and evaluate it.
pub trait Approximator: Send {
    /// Width of each input row
    fn inputs_dim(&self) -> usize;

    /// Width of each output row
    fn outputs_dim(&self) -> usize;

    /// Whether parameters have been allocated
    fn is_built(&self) -> bool;

    /// Allocate and initialise parameters. Calling again re-initialises.
    fn build(&mut self) -> Result<()>;

    /// Train on `(N, inputs_dim)` inputs against `(N, outputs_dim)` targets.
    ///
    /// Returns one loss value per epoch.
    fn fit(&mut self, inputs: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<Vec<f32>>;

    /// Evaluate on a batch of rows.
    fn predict(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>>;
}
