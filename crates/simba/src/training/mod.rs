//! Outer training loop.
//!
//! Provides:
//! - `TrainerConfig` - Iteration and logging settings
//! - `ExperimentConfig` - Everything needed to set up one run, loadable from JSON
//! - `RlTrainer` - Alternates agent interaction and model updates

mod config;
mod trainer;

pub use config::{ExperimentConfig, TrainerConfig};
pub use trainer::RlTrainer;
