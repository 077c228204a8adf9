//! # Simba
//!
//! Model-based reinforcement learning in Rust.
//!
//! ## Overview
//!
//! Simba provides:
//! - A learned delta `TransitionModel` with batched multi-step rollouts
//! - Swappable function approximators (`Mlp`, `MlpEnsemble`) behind a static registry
//! - Sampling-based model-predictive control (`CemMpc`) over the learned model
//! - A model-based agent and an outer `RlTrainer` loop with pluggable metric loggers
//!
//! ## Features
//!
//! - `default` - Core functionality on the `ndarray` backend
//! - `tensorboard` - Enable the TensorBoard metric logger
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use simba::prelude::*;
//!
//! let model = TransitionModel::new(&ModelConfig::default(), 3, 1)?;
//! let base = MpcPolicy::new(model, action_space, Box::new(objective), &config)?;
//! let mut planner = CemMpc::new(base, &config)?;
//!
//! let action = planner.generate_action(observation.view())?;
//! ```

pub mod agents;
pub mod env;
pub mod log;
pub mod models;
pub mod policy;
pub mod spaces;
pub mod training;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agents::{Agent, AgentConfig, AgentReport, MbrlAgent, TransitionBuffer};
    pub use crate::env::{
        ClipAction, EnvInfo, Environment, EpisodeStats, RewardFunction, StepResult,
    };
    pub use crate::models::{
        Activation, Approximator, InputNormalizer, Mlp, MlpEnsemble, ModelConfig, ModelKind,
        TransitionModel,
    };
    pub use crate::policy::{
        CemConfig, CemMpc, FinalStateObjective, MpcPolicy, Objective, ParamSpec, Plan, Policy,
        RandomPolicy, RewardObjective, SamplingDistribution, SamplingParams,
    };
    pub use crate::spaces::{Box as BoxSpace, Space};
    pub use crate::training::{ExperimentConfig, RlTrainer, TrainerConfig};

    #[cfg(feature = "tensorboard")]
    pub use crate::log::TensorBoardLogger;
    pub use crate::log::{CompositeLogger, ConsoleLogger, MetricLogger, NoOpLogger};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum SimbaError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown model type: {0:?}")]
    UnknownModel(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Cannot fit on an empty batch")]
    EmptyBatch,

    #[error("Model used before build()")]
    NotBuilt,

    #[error("Degenerate plan: {0}")]
    DegeneratePlan(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, SimbaError>;

/// Shorthand for shape checks at API boundaries.
pub(crate) fn ensure_shape(expected: &[usize], actual: &[usize]) -> Result<()> {
    if expected != actual {
        return Err(SimbaError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}
