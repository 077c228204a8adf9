//! Action-selection policies.
//!
//! Provides:
//! - `Policy` - the action-selection trait used by agents
//! - `RandomPolicy` - uniform samples from the action box
//! - `MpcPolicy` - shared base for planners over a learned transition model
//! - `CemMpc` - Cross-Entropy Method model-predictive control
//! - `Objective` - pluggable trajectory scoring

mod cem;
mod distribution;
mod mpc;
mod objective;
mod random;

pub use cem::{CemConfig, CemMpc, Plan};
pub use distribution::SamplingDistribution;
pub use mpc::{MpcConfig, MpcPolicy, ParamSpec, SamplingParams};
pub use objective::{FinalStateObjective, Objective, RewardObjective};
pub use random::RandomPolicy;

use crate::Result;
use ndarray::{Array1, ArrayView1};

/// Maps the current observation to one action.
pub trait Policy {
    /// Action for the current timestep.
    fn generate_action(&mut self, state: ArrayView1<f32>) -> Result<Array1<f32>>;
}
