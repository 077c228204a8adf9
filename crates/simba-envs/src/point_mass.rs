//! One-dimensional double integrator.

use ndarray::{array, Array1, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use simba::env::{EnvInfo, Environment, RewardFunction, StepResult};
use simba::spaces::Box as BoxSpace;

/// A unit mass on a frictionless line, pushed by a bounded force.
///
/// Observation: [position, velocity]
/// Action: force in [-1, 1]
/// Reward: -(x^2) - 0.1 a^2, evaluated after the step
pub struct PointMass {
    dt: f32,
    max_steps: u32,
    position: f32,
    velocity: f32,
    steps: u32,
    rng: ChaCha8Rng,
}

impl PointMass {
    pub fn new() -> Self {
        Self {
            dt: 0.1,
            max_steps: 100,
            position: 0.0,
            velocity: 0.0,
            steps: 0,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Cut episodes after `max_steps` steps
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    fn observation(&self) -> Array1<f32> {
        array![self.position, self.velocity]
    }
}

impl Default for PointMass {
    fn default() -> Self {
        Self::new()
    }
}

impl RewardFunction for PointMass {
    fn reward(&self, next_observation: ArrayView1<f32>, action: ArrayView1<f32>) -> f32 {
        -next_observation[0].powi(2) - 0.1 * action[0].powi(2)
    }
}

impl Environment for PointMass {
    fn observation_space(&self) -> BoxSpace {
        BoxSpace::unbounded(2)
    }

    fn action_space(&self) -> BoxSpace {
        BoxSpace::symmetric(1)
    }

    fn reset(&mut self, seed: Option<u64>) -> (Array1<f32>, EnvInfo) {
        if let Some(s) = seed {
            self.rng = ChaCha8Rng::seed_from_u64(s);
        }
        self.position = self.rng.gen_range(-1.0..=1.0);
        self.velocity = 0.0;
        self.steps = 0;
        (self.observation(), EnvInfo::new())
    }

    fn step(&mut self, action: ArrayView1<f32>) -> StepResult {
        let force = action[0].clamp(-1.0, 1.0);

        // Semi-implicit Euler
        self.velocity += force * self.dt;
        self.position += self.velocity * self.dt;
        self.steps += 1;

        let observation = self.observation();
        let reward = self.reward(observation.view(), array![force].view());

        StepResult {
            observation,
            reward,
            terminated: false,
            truncated: self.steps >= self.max_steps,
            info: EnvInfo::new(),
        }
    }

    fn render(&self) -> Option<String> {
        Some(format!("x={:+.3} v={:+.3}", self.position, self.velocity))
    }
}
