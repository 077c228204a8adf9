//! Shared base for model-predictive planners.

use super::{Objective, SamplingDistribution};
use crate::models::TransitionModel;
use crate::spaces::Box as BoxSpace;
use crate::{ensure_shape, Result, SimbaError};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

/// A sampling parameter given either once for all action dimensions or
/// per dimension.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    Scalar(f32),
    PerDim(Vec<f32>),
}

impl ParamSpec {
    /// Expand to a `(horizon, action_dim)` array.
    pub fn broadcast(&self, horizon: usize, action_dim: usize) -> Result<Array2<f32>> {
        match self {
            ParamSpec::Scalar(v) => Ok(Array2::from_elem((horizon, action_dim), *v)),
            ParamSpec::PerDim(values) => {
                ensure_shape(&[action_dim], &[values.len()])?;
                Ok(row_to_plan(&Array1::from(values.clone()), horizon))
            }
        }
    }
}

impl From<f32> for ParamSpec {
    fn from(value: f32) -> Self {
        ParamSpec::Scalar(value)
    }
}

impl From<Vec<f32>> for ParamSpec {
    fn from(values: Vec<f32>) -> Self {
        ParamSpec::PerDim(values)
    }
}

/// Repeat a per-dimension row over every timestep.
fn row_to_plan(row: &Array1<f32>, horizon: usize) -> Array2<f32> {
    let mut plan = Array2::zeros((horizon, row.len()));
    for mut step in plan.axis_iter_mut(Axis(0)) {
        step.assign(row);
    }
    plan
}

/// Bounds and priors, each fully shaped `(horizon, action_dim)`.
///
/// Broadcasting happens once here; planners never rely on implicit
/// broadcasting while iterating.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplingParams {
    pub lower: Array2<f32>,
    pub upper: Array2<f32>,
    pub mean: Array2<f32>,
    pub stddev: Array2<f32>,
}

impl SamplingParams {
    /// Bounds come from `action_space`. Missing priors default to the box
    /// midpoint and a quarter of its width.
    pub fn new(
        action_space: &BoxSpace,
        horizon: usize,
        initial_mean: Option<&ParamSpec>,
        initial_stddev: Option<&ParamSpec>,
    ) -> Result<Self> {
        let action_dim = action_space.dim();
        let lower = row_to_plan(&action_space.low, horizon);
        let upper = row_to_plan(&action_space.high, horizon);

        let mean = match initial_mean {
            Some(spec) => spec.broadcast(horizon, action_dim)?,
            None => (&lower + &upper) / 2.0,
        };
        let stddev = match initial_stddev {
            Some(spec) => spec.broadcast(horizon, action_dim)?,
            None => (&upper - &lower) / 4.0,
        };

        if mean.iter().chain(stddev.iter()).any(|v| !v.is_finite()) {
            return Err(SimbaError::InvalidConfig(
                "sampling priors must be finite; set initial_mean and initial_stddev for unbounded action spaces".into(),
            ));
        }
        if stddev.iter().any(|&s| s < 0.0) {
            return Err(SimbaError::InvalidConfig(
                "initial_stddev must be non-negative".into(),
            ));
        }

        Ok(Self {
            lower,
            upper,
            mean,
            stddev,
        })
    }

    /// Fresh distribution at the configured priors
    pub fn initial_distribution(&self) -> Result<SamplingDistribution> {
        SamplingDistribution::new(self.mean.clone(), self.stddev.clone())
    }
}

/// Planning dimensions shared by every MPC variant
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MpcConfig {
    /// Future timesteps planned per call
    pub horizon: usize,
    /// Candidate action sequences per iteration
    pub n_samples: usize,
    /// Rollouts per candidate
    pub particles: usize,
    /// Prior mean (defaults to the action box midpoint)
    pub initial_mean: Option<ParamSpec>,
    /// Prior stddev (defaults to a quarter of the action box width)
    pub initial_stddev: Option<ParamSpec>,
}

impl Default for MpcConfig {
    fn default() -> Self {
        Self {
            horizon: 15,
            n_samples: 200,
            particles: 1,
            initial_mean: None,
            initial_stddev: None,
        }
    }
}

/// Owns the transition model, the scoring objective and the sampling
/// bookkeeping that concrete planners build on.
///
/// Planning only reads the model. [`MpcPolicy::model_mut`] exists for the
/// fitting loop.
pub struct MpcPolicy {
    model: TransitionModel,
    action_space: BoxSpace,
    objective: Box<dyn Objective>,
    horizon: usize,
    n_samples: usize,
    particles: usize,
    sampling: SamplingParams,
}

impl MpcPolicy {
    pub fn new(
        model: TransitionModel,
        action_space: BoxSpace,
        objective: Box<dyn Objective>,
        config: &MpcConfig,
    ) -> Result<Self> {
        for (name, value) in [
            ("horizon", config.horizon),
            ("n_samples", config.n_samples),
            ("particles", config.particles),
        ] {
            if value == 0 {
                return Err(SimbaError::InvalidConfig(format!(
                    "{name} must be a positive integer"
                )));
            }
        }
        ensure_shape(&[model.action_dim()], &[action_space.dim()])?;
        objective.validate(model.observation_dim(), model.action_dim())?;

        let sampling = SamplingParams::new(
            &action_space,
            config.horizon,
            config.initial_mean.as_ref(),
            config.initial_stddev.as_ref(),
        )?;

        Ok(Self {
            model,
            action_space,
            objective,
            horizon: config.horizon,
            n_samples: config.n_samples,
            particles: config.particles,
            sampling,
        })
    }

    pub fn model(&self) -> &TransitionModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut TransitionModel {
        &mut self.model
    }

    pub fn action_space(&self) -> &BoxSpace {
        &self.action_space
    }

    pub fn action_dim(&self) -> usize {
        self.action_space.dim()
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn particles(&self) -> usize {
        self.particles
    }

    /// Rows in one rollout batch, `n_samples * particles`
    pub fn batch_size(&self) -> usize {
        self.n_samples * self.particles
    }

    pub fn sampling_params(&self) -> &SamplingParams {
        &self.sampling
    }

    /// Simulate every sequence from the same starting `state`.
    pub fn rollout(
        &self,
        state: ArrayView1<f32>,
        action_sequences: ArrayView3<f32>,
    ) -> Result<Array3<f32>> {
        let batch = action_sequences.len_of(Axis(0));
        let obs_dim = self.model.observation_dim();
        ensure_shape(&[obs_dim], state.shape())?;
        let initial_states = state
            .broadcast((batch, obs_dim))
            .ok_or_else(|| SimbaError::ShapeMismatch {
                expected: vec![batch, obs_dim],
                actual: state.shape().to_vec(),
            })?;
        self.model
            .simulate_trajectories(initial_states, action_sequences)
    }

    /// Score each trajectory with the configured objective.
    pub fn compute_objective(
        &self,
        trajectories: ArrayView3<f32>,
        action_sequences: ArrayView3<f32>,
    ) -> Result<Array1<f32>> {
        let scores = self.objective.score(trajectories, action_sequences);
        ensure_shape(&[trajectories.len_of(Axis(0))], scores.shape())?;
        Ok(scores)
    }
}
