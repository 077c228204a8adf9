//! Trajectory scoring strategies.

use crate::env::RewardFunction;
use crate::{Result, SimbaError};
use ndarray::{Array1, ArrayView3, Axis};

/// Scores simulated trajectories; higher is better.
///
/// `trajectories` is `(B, H, obs)` and `action_sequences` is `(B, H, act)`,
/// where `trajectories[b, t]` is the state reached by `action_sequences[b, t]`.
/// Must return one score per batch row.
pub trait Objective {
    fn score(
        &self,
        trajectories: ArrayView3<f32>,
        action_sequences: ArrayView3<f32>,
    ) -> Array1<f32>;

    /// Reject dimensions this objective cannot score. Called once when the
    /// owning policy is constructed.
    fn validate(&self, _observation_dim: usize, _action_dim: usize) -> Result<()> {
        Ok(())
    }
}

impl<F> Objective for F
where
    F: Fn(ArrayView3<f32>, ArrayView3<f32>) -> Array1<f32>,
{
    fn score(
        &self,
        trajectories: ArrayView3<f32>,
        action_sequences: ArrayView3<f32>,
    ) -> Array1<f32> {
        self(trajectories, action_sequences)
    }
}

/// Cumulative known reward over the planning horizon.
pub struct RewardObjective<R: RewardFunction> {
    reward: R,
}

impl<R: RewardFunction> RewardObjective<R> {
    pub fn new(reward: R) -> Self {
        Self { reward }
    }
}

impl<R: RewardFunction> Objective for RewardObjective<R> {
    fn score(
        &self,
        trajectories: ArrayView3<f32>,
        action_sequences: ArrayView3<f32>,
    ) -> Array1<f32> {
        trajectories
            .outer_iter()
            .zip(action_sequences.outer_iter())
            .map(|(states, actions)| {
                states
                    .outer_iter()
                    .zip(actions.outer_iter())
                    .map(|(state, action)| self.reward.reward(state, action))
                    .sum::<f32>()
            })
            .collect()
    }
}

/// Value of one observation dimension at the final simulated step.
pub struct FinalStateObjective {
    dimension: usize,
}

impl FinalStateObjective {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Objective for FinalStateObjective {
    fn validate(&self, observation_dim: usize, _action_dim: usize) -> Result<()> {
        if self.dimension >= observation_dim {
            return Err(SimbaError::InvalidConfig(format!(
                "final-state dimension {} out of range for {observation_dim} observation dims",
                self.dimension
            )));
        }
        Ok(())
    }

    fn score(
        &self,
        trajectories: ArrayView3<f32>,
        _action_sequences: ArrayView3<f32>,
    ) -> Array1<f32> {
        let horizon = trajectories.len_of(Axis(1));
        if horizon == 0 {
            return Array1::zeros(trajectories.len_of(Axis(0)));
        }
        trajectories
            .index_axis(Axis(1), horizon - 1)
            .index_axis(Axis(1), self.dimension)
            .to_owned()
    }
}
