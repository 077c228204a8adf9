//! Torque-limited pendulum swing-up.

use ndarray::{array, Array1, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use simba::env::{EnvInfo, Environment, RewardFunction, StepResult};
use simba::spaces::Box as BoxSpace;
use std::f32::consts::PI;

/// Classic inverted pendulum. The goal is to swing up and balance.
///
/// Observation: [cos(theta), sin(theta), theta_dot]
/// Action: torque in [-2, 2]
/// Reward: -(theta^2 + 0.1 theta_dot^2 + 0.001 u^2) with theta wrapped to [-pi, pi)
pub struct Pendulum {
    gravity: f32,
    mass: f32,
    length: f32,
    dt: f32,
    max_speed: f32,
    max_torque: f32,
    max_steps: u32,

    // State
    theta: f32,
    theta_dot: f32,
    steps: u32,
    rng: ChaCha8Rng,
}

impl Pendulum {
    pub fn new() -> Self {
        Self {
            gravity: 10.0,
            mass: 1.0,
            length: 1.0,
            dt: 0.05,
            max_speed: 8.0,
            max_torque: 2.0,
            max_steps: 200,
            theta: 0.0,
            theta_dot: 0.0,
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
        array![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }
}

impl Default for Pendulum {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap an angle into [-pi, pi)
fn angle_normalize(x: f32) -> f32 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}

impl RewardFunction for Pendulum {
    fn reward(&self, next_observation: ArrayView1<f32>, action: ArrayView1<f32>) -> f32 {
        let theta = next_observation[1].atan2(next_observation[0]);
        let theta_dot = next_observation[2];
        let torque = action[0];
        -(theta.powi(2) + 0.1 * theta_dot.powi(2) + 0.001 * torque.powi(2))
    }
}

impl Environment for Pendulum {
    fn observation_space(&self) -> BoxSpace {
        BoxSpace::new(
            array![-1.0, -1.0, -self.max_speed],
            array![1.0, 1.0, self.max_speed],
        )
        .unwrap_or_else(|_| BoxSpace::unbounded(3))
    }

    fn action_space(&self) -> BoxSpace {
        BoxSpace::uniform(1, -self.max_torque, self.max_torque)
    }

    fn reset(&mut self, seed: Option<u64>) -> (Array1<f32>, EnvInfo) {
        if let Some(s) = seed {
            self.rng = ChaCha8Rng::seed_from_u64(s);
        }
        self.theta = self.rng.gen_range(-PI..PI);
        self.theta_dot = self.rng.gen_range(-1.0..=1.0);
        self.steps = 0;
        (self.observation(), EnvInfo::new())
    }

    fn step(&mut self, action: ArrayView1<f32>) -> StepResult {
        let torque = action[0].clamp(-self.max_torque, self.max_torque);

        let (g, m, l) = (self.gravity, self.mass, self.length);
        let acceleration = 3.0 * g / (2.0 * l) * self.theta.sin() + 3.0 / (m * l * l) * torque;
        self.theta_dot = (self.theta_dot + acceleration * self.dt)
            .clamp(-self.max_speed, self.max_speed);
        self.theta = angle_normalize(self.theta + self.theta_dot * self.dt);
        self.steps += 1;

        let observation = self.observation();
        let reward = self.reward(observation.view(), array![torque].view());

        StepResult {
            observation,
            reward,
            terminated: false,
            truncated: self.steps >= self.max_steps,
            info: EnvInfo::new(),
        }
    }

    fn render(&self) -> Option<String> {
        Some(format!(
            "theta={:+.3} theta_dot={:+.3}",
            self.theta, self.theta_dot
        ))
    }
}
