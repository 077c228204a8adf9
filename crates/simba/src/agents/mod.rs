//! Agents that interact with an environment and learn from the data.

mod buffer;
mod mbrl;

pub use buffer::TransitionBuffer;
pub use mbrl::MbrlAgent;

#[cfg(test)]
pub(crate) use mbrl::tests as tests_support;

use crate::env::Environment;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What an agent learned during its latest update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AgentReport {
    /// Per-epoch training losses of the latest update
    pub losses: Vec<f32>,
    /// Named scalar diagnostics
    pub metrics: BTreeMap<String, f64>,
}

/// Interaction and learning cycle driven by [`crate::training::RlTrainer`].
pub trait Agent {
    /// Prepare learnable state before the first interaction.
    fn build(&mut self) -> Result<()>;

    /// Collect experience from `env`.
    fn interact<E: Environment + ?Sized>(&mut self, env: &mut E) -> Result<()>;

    /// Learn from the experience collected so far.
    fn update(&mut self) -> Result<()>;

    fn report(&self) -> AgentReport;
}

/// Data collection settings for [`MbrlAgent`]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Random-policy episodes collected before planning starts
    pub warmup_episodes: usize,
    /// Planner episodes collected per interaction
    pub episodes_per_iteration: usize,
    /// Steps after which an episode is cut short
    pub max_episode_length: usize,
    /// Transitions kept in the buffer; the oldest are evicted first
    pub buffer_capacity: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            warmup_episodes: 5,
            episodes_per_iteration: 1,
            max_episode_length: 200,
            buffer_capacity: 100_000,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.episodes_per_iteration == 0 {
            return Err(crate::SimbaError::InvalidConfig(
                "episodes_per_iteration must be positive".into(),
            ));
        }
        if self.max_episode_length == 0 {
            return Err(crate::SimbaError::InvalidConfig(
                "max_episode_length must be positive".into(),
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(crate::SimbaError::InvalidConfig(
                "buffer_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}
