//! Approximator configuration and the static model registry.

use super::{Approximator, Mlp, MlpEnsemble};
use crate::{Result, SimbaError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hidden-layer activation function
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Tanh,
    Swish,
}

/// Known approximator implementations.
///
/// Names resolve through [`ModelKind::from_str`]; anything outside this
/// table is rejected when the transition model is constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    Mlp,
    MlpEnsemble,
}

impl ModelKind {
    /// Canonical identifiers, for listings and error messages.
    pub const NAMES: [&'static str; 2] = ["mlp", "mlp_ensemble"];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Mlp => "mlp",
            ModelKind::MlpEnsemble => "mlp_ensemble",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = SimbaError;

    /// Accepts snake_case identifiers and their CamelCase spellings.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "mlp" | "Mlp" => Ok(ModelKind::Mlp),
            "mlp_ensemble" | "MlpEnsemble" => Ok(ModelKind::MlpEnsemble),
            other => Err(SimbaError::UnknownModel(other.to_string())),
        }
    }
}

/// Configuration for the function approximator behind a transition model
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Registry identifier (`mlp`, `mlp_ensemble`)
    pub kind: String,
    /// Number of hidden layers
    pub n_layers: usize,
    /// Units per hidden layer
    pub units: usize,
    /// Hidden activation
    pub activation: Activation,
    /// Adam learning rate
    pub learning_rate: f32,
    /// Passes over the data per `fit` call
    pub n_epochs: usize,
    /// Mini-batch size
    pub batch_size: usize,
    /// Members in an ensemble (ignored by `mlp`)
    pub ensemble_size: usize,
    /// Seed for weight init and shuffling
    pub seed: Option<u64>,
}

const DEFAULT_LEARNING_RATE: f32 = 1e-3;

/// Learning rate from the `SIMBA_MODEL_LR` value, if it parses.
fn learning_rate_override(raw: Option<&str>) -> f32 {
    match raw.map(str::parse::<f32>) {
        None => DEFAULT_LEARNING_RATE,
        Some(Ok(lr)) => lr,
        Some(Err(err)) => {
            tracing::warn!(
                value = raw.unwrap_or_default(),
                %err,
                default = DEFAULT_LEARNING_RATE,
                "Ignoring unparsable SIMBA_MODEL_LR"
            );
            DEFAULT_LEARNING_RATE
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: "mlp".to_string(),
            n_layers: 2,
            units: 64,
            activation: Activation::Relu,
            learning_rate: learning_rate_override(
                std::env::var("SIMBA_MODEL_LR").ok().as_deref(),
            ),
            n_epochs: 20,
            batch_size: 64,
            ensemble_size: 5,
            seed: None,
        }
    }
}

impl ModelConfig {
    /// Resolve `kind` through the registry.
    pub fn model_kind(&self) -> Result<ModelKind> {
        self.kind.parse()
    }

    /// Check numeric fields; the kind is checked by [`ModelConfig::model_kind`].
    pub fn validate(&self) -> Result<()> {
        if self.units == 0 {
            return Err(SimbaError::InvalidConfig("units must be positive".into()));
        }
        if self.n_epochs == 0 || self.batch_size == 0 {
            return Err(SimbaError::InvalidConfig(
                "n_epochs and batch_size must be positive".into(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(SimbaError::InvalidConfig(format!(
                "learning_rate must be a positive finite number, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }

    /// Set the registry identifier
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Construct the approximator named by `config.kind`.
///
/// Fails with [`SimbaError::UnknownModel`] before allocating anything when
/// the name is not registered.
pub fn build_approximator(
    config: &ModelConfig,
    inputs_dim: usize,
    outputs_dim: usize,
) -> Result<Box<dyn Approximator>> {
    let kind = config.model_kind()?;
    config.validate()?;
    let model: Box<dyn Approximator> = match kind {
        ModelKind::Mlp => Box::new(Mlp::new(config.clone(), inputs_dim, outputs_dim)),
        ModelKind::MlpEnsemble => Box::new(MlpEnsemble::new(config.clone(), inputs_dim, outputs_dim)?),
    };
    tracing::debug!(kind = %kind, inputs_dim, outputs_dim, "Constructed approximator");
    Ok(model)
}
