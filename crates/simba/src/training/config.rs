//! Trainer and experiment configuration.

use crate::agents::AgentConfig;
use crate::models::ModelConfig;
use crate::policy::CemConfig;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the outer training loop
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Iterations to run; `0` runs until interrupted
    pub max_iterations: u64,
    /// Log the agent report every N iterations; `0` disables logging
    pub log_frequency: u64,
    /// Show a progress bar
    pub show_progress: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            log_frequency: 1,
            show_progress: false,
        }
    }
}

impl TrainerConfig {
    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_log_frequency(mut self, log_frequency: u64) -> Self {
        self.log_frequency = log_frequency;
        self
    }
}

/// One complete run: environment, seed and every component's settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Registered environment name
    pub environment: String,
    pub seed: Option<u64>,
    pub model: ModelConfig,
    pub policy: CemConfig,
    pub agent: AgentConfig,
    pub trainer: TrainerConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            environment: "pendulum".to_string(),
            seed: None,
            model: ModelConfig::default(),
            policy: CemConfig::default(),
            agent: AgentConfig::default(),
            trainer: TrainerConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the settings that do not depend on the environment.
    pub fn validate(&self) -> Result<()> {
        self.model.model_kind()?;
        self.model.validate()?;
        self.policy.validate()?;
        self.agent.validate()
    }
}
