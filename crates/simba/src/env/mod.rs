//! Environment traits and wrappers.
//!
//! Provides the `Environment` trait the agent interacts with, the
//! `RewardFunction` trait for environments whose reward is known in closed
//! form, plus wrappers for episode statistics and action clipping.

mod traits;
mod wrappers;

pub use traits::{EnvInfo, Environment, RewardFunction, StepResult};
pub use wrappers::{ClipAction, EpisodeStats};
