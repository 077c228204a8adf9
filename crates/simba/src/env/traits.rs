//! Core environment trait definitions.

use crate::spaces::Box as BoxSpace;
use ndarray::{Array1, ArrayView1};

/// Information returned from environment steps
#[derive(Clone, Debug, Default)]
pub struct EnvInfo {
    /// Episode return (if done)
    pub episode_return: Option<f32>,
    /// Episode length (if done)
    pub episode_length: Option<f32>,
    /// Custom metrics (kept minimal for performance)
    pub extra: smallvec::SmallVec<[(&'static str, f32); 4]>,
}

impl EnvInfo {
    /// Create empty info
    pub fn new() -> Self {
        Self::default()
    }

    /// Add episode stats
    pub fn with_episode_stats(mut self, ret: f32, len: u32) -> Self {
        self.episode_return = Some(ret);
        self.episode_length = Some(len as f32);
        self
    }

    /// Add a custom metric (use rarely)
    pub fn with_extra(mut self, key: &'static str, value: f32) -> Self {
        self.extra.push((key, value));
        self
    }

    /// Get a value by key (including defaults)
    pub fn get(&self, key: &str) -> Option<f32> {
        match key {
            "episode_return" => self.episode_return,
            "episode_length" => self.episode_length,
            _ => self.extra.iter().find(|(k, _)| k == &key).map(|(_, v)| *v),
        }
    }
}

/// Result from a single environment step
#[derive(Clone, Debug)]
pub struct StepResult {
    /// Observation after the step
    pub observation: Array1<f32>,
    /// Reward received
    pub reward: f32,
    /// Whether episode terminated (goal reached, failure, etc.)
    pub terminated: bool,
    /// Whether episode truncated (time limit, etc.)
    pub truncated: bool,
    /// Additional info
    pub info: EnvInfo,
}

impl StepResult {
    /// Check if episode is done (terminated or truncated)
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Continuous-control environment driven by the agent.
///
/// Observations and actions are flat `f32` vectors whose lengths match the
/// observation and action boxes.
///
/// # Example
///
/// ```rust,ignore
/// use simba::env::{Environment, EnvInfo, StepResult};
/// use simba::spaces::Box as BoxSpace;
///
/// struct Drift {
///     x: f32,
/// }
///
/// impl Environment for Drift {
///     fn observation_space(&self) -> BoxSpace {
///         BoxSpace::unbounded(1)
///     }
///
///     fn action_space(&self) -> BoxSpace {
///         BoxSpace::symmetric(1)
///     }
///
///     fn reset(&mut self, _seed: Option<u64>) -> (Array1<f32>, EnvInfo) {
///         self.x = 0.0;
///         (array![self.x], EnvInfo::new())
///     }
///
///     fn step(&mut self, action: ArrayView1<f32>) -> StepResult {
///         // ... implement step logic
///     }
/// }
/// ```
pub trait Environment {
    /// Get the observation space
    fn observation_space(&self) -> BoxSpace;

    /// Get the action space
    fn action_space(&self) -> BoxSpace;

    /// Reset the environment to initial state
    ///
    /// # Arguments
    /// * `seed` - Optional random seed for reproducibility
    ///
    /// # Returns
    /// Tuple of (initial observation, info)
    fn reset(&mut self, seed: Option<u64>) -> (Array1<f32>, EnvInfo);

    /// Take a single step in the environment
    ///
    /// # Arguments
    /// * `action` - Action to execute, already inside the action space
    ///
    /// # Returns
    /// StepResult containing observation, reward, done flags, and info
    fn step(&mut self, action: ArrayView1<f32>) -> StepResult;

    /// Optional: Render the environment as text
    fn render(&self) -> Option<String> {
        None
    }

    /// Optional: Close the environment and free resources
    fn close(&mut self) {}
}

/// Reward known in closed form, usable as a planning objective.
pub trait RewardFunction {
    /// Reward for reaching `next_observation` by executing `action`.
    fn reward(&self, next_observation: ArrayView1<f32>, action: ArrayView1<f32>) -> f32;
}

impl<E: Environment + ?Sized> Environment for std::boxed::Box<E> {
    fn observation_space(&self) -> BoxSpace {
        (**self).observation_space()
    }

    fn action_space(&self) -> BoxSpace {
        (**self).action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> (Array1<f32>, EnvInfo) {
        (**self).reset(seed)
    }

    fn step(&mut self, action: ArrayView1<f32>) -> StepResult {
        (**self).step(action)
    }

    fn render(&self) -> Option<String> {
        (**self).render()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
