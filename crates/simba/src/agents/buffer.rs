//! Bounded storage of observed transitions.

use crate::{ensure_shape, Result, SimbaError};
use ndarray::{s, Array1, Array2, ArrayView1};
use std::collections::VecDeque;

/// FIFO of `(observation, action, next_observation)` rows.
///
/// Once `capacity` is reached each push evicts the oldest transition.
#[derive(Clone, Debug)]
pub struct TransitionBuffer {
    capacity: usize,
    observation_dim: usize,
    action_dim: usize,
    rows: VecDeque<(Array1<f32>, Array1<f32>, Array1<f32>)>,
}

impl TransitionBuffer {
    pub fn new(capacity: usize, observation_dim: usize, action_dim: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SimbaError::InvalidConfig(
                "buffer capacity must be positive".into(),
            ));
        }
        Ok(Self {
            capacity,
            observation_dim,
            action_dim,
            rows: VecDeque::with_capacity(capacity.min(4096)),
        })
    }

    pub fn push(
        &mut self,
        observation: ArrayView1<f32>,
        action: ArrayView1<f32>,
        next_observation: ArrayView1<f32>,
    ) -> Result<()> {
        ensure_shape(&[self.observation_dim], observation.shape())?;
        ensure_shape(&[self.action_dim], action.shape())?;
        ensure_shape(&[self.observation_dim], next_observation.shape())?;

        if self.rows.len() == self.capacity {
            self.rows.pop_front();
        }
        self.rows.push_back((
            observation.to_owned(),
            action.to_owned(),
            next_observation.to_owned(),
        ));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Model inputs, `(len, observation_dim + action_dim)`: observation then action.
    pub fn inputs(&self) -> Array2<f32> {
        let obs = self.observation_dim;
        let mut inputs = Array2::zeros((self.len(), obs + self.action_dim));
        for (mut row, (observation, action, _)) in inputs.outer_iter_mut().zip(&self.rows) {
            row.slice_mut(s![..obs]).assign(observation);
            row.slice_mut(s![obs..]).assign(action);
        }
        inputs
    }

    /// Model targets, `(len, observation_dim)`: the next observation.
    pub fn targets(&self) -> Array2<f32> {
        let mut targets = Array2::zeros((self.len(), self.observation_dim));
        for (mut row, (_, _, next)) in targets.outer_iter_mut().zip(&self.rows) {
            row.assign(next);
        }
        targets
    }
}
