//! Environment wrappers for common functionality.

use super::{EnvInfo, Environment, StepResult};
use crate::spaces::Box as BoxSpace;
use ndarray::{Array1, ArrayView1};

/// Wrapper that tracks episode statistics (return and length).
///
/// Adds `episode_return` and `episode_length` to info on episode completion.
pub struct EpisodeStats<E: Environment> {
    env: E,
    episode_return: f32,
    episode_length: u32,
}

impl<E: Environment> EpisodeStats<E> {
    /// Wrap an environment with episode statistics tracking
    pub fn new(env: E) -> Self {
        Self {
            env,
            episode_return: 0.0,
            episode_length: 0,
        }
    }

    /// Get a reference to the inner environment
    pub fn inner(&self) -> &E {
        &self.env
    }

    /// Get a mutable reference to the inner environment
    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }
}

impl<E: Environment> Environment for EpisodeStats<E> {
    fn observation_space(&self) -> BoxSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> BoxSpace {
        self.env.action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> (Array1<f32>, EnvInfo) {
        self.episode_return = 0.0;
        self.episode_length = 0;
        self.env.reset(seed)
    }

    fn step(&mut self, action: ArrayView1<f32>) -> StepResult {
        let mut result = self.env.step(action);

        self.episode_return += result.reward;
        self.episode_length += 1;

        if result.done() {
            result.info = result
                .info
                .with_episode_stats(self.episode_return, self.episode_length);

            // Counters restart; the caller resets the inner env
            self.episode_return = 0.0;
            self.episode_length = 0;
        }

        result
    }

    fn render(&self) -> Option<String> {
        self.env.render()
    }

    fn close(&mut self) {
        self.env.close()
    }
}

/// Wrapper that clips continuous actions to the action space bounds.
pub struct ClipAction<E: Environment> {
    env: E,
    space: BoxSpace,
}

impl<E: Environment> ClipAction<E> {
    /// Wrap an environment with action clipping
    pub fn new(env: E) -> Self {
        let space = env.action_space();
        Self { env, space }
    }

    /// Get a reference to the inner environment
    pub fn inner(&self) -> &E {
        &self.env
    }
}

impl<E: Environment> Environment for ClipAction<E> {
    fn observation_space(&self) -> BoxSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> BoxSpace {
        self.space.clone()
    }

    fn reset(&mut self, seed: Option<u64>) -> (Array1<f32>, EnvInfo) {
        self.env.reset(seed)
    }

    fn step(&mut self, action: ArrayView1<f32>) -> StepResult {
        let clipped = self.space.clip(action);
        self.env.step(clipped.view())
    }

    fn render(&self) -> Option<String> {
        self.env.render()
    }

    fn close(&mut self) {
        self.env.close()
    }
}
