//! Uniform random actions, used to seed the transition buffer.

use super::Policy;
use crate::spaces::{Box as BoxSpace, Space};
use crate::utils::seeded_rng;
use crate::Result;
use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;

pub struct RandomPolicy {
    space: BoxSpace,
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(space: BoxSpace, seed: Option<u64>) -> Self {
        Self {
            space,
            rng: seeded_rng(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn generate_action(&mut self, _state: ArrayView1<f32>) -> Result<Array1<f32>> {
        Ok(self.space.sample(&mut self.rng))
    }
}
