//! Bootstrap ensemble of MLPs.

use super::{Approximator, Mlp, ModelConfig};
use crate::utils::{child_seed, seeded_rng};
use crate::{ensure_shape, Result, SimbaError};
use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::Rng;

/// `ensemble_size` independently initialised MLPs.
///
/// Each member is fit on its own bootstrap resample of the batch. At
/// prediction time row `r` is answered by member `r % ensemble_size`, so a
/// rollout row keeps the same member for its whole horizon and replicated
/// particles of one action sequence are propagated by different members.
pub struct MlpEnsemble {
    members: Vec<Mlp>,
    inputs_dim: usize,
    outputs_dim: usize,
    rng: StdRng,
}

impl MlpEnsemble {
    pub fn new(config: ModelConfig, inputs_dim: usize, outputs_dim: usize) -> Result<Self> {
        if config.ensemble_size == 0 {
            return Err(SimbaError::InvalidConfig(
                "ensemble_size must be positive".into(),
            ));
        }
        let members = (0..config.ensemble_size)
            .map(|i| {
                let member_config = ModelConfig {
                    seed: child_seed(config.seed, i as u64),
                    ..config.clone()
                };
                Mlp::new(member_config, inputs_dim, outputs_dim)
            })
            .collect();
        let rng = seeded_rng(child_seed(config.seed, config.ensemble_size as u64));

        Ok(Self {
            members,
            inputs_dim,
            outputs_dim,
            rng,
        })
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Access one member, e.g. to inspect its individual predictions
    pub fn member(&self, index: usize) -> Option<&Mlp> {
        self.members.get(index)
    }
}

impl Approximator for MlpEnsemble {
    fn inputs_dim(&self) -> usize {
        self.inputs_dim
    }

    fn outputs_dim(&self) -> usize {
        self.outputs_dim
    }

    fn is_built(&self) -> bool {
        self.members.iter().all(Mlp::is_built)
    }

    fn build(&mut self) -> Result<()> {
        for member in &mut self.members {
            member.build()?;
        }
        Ok(())
    }

    /// Returns the per-epoch loss averaged over members.
    fn fit(&mut self, inputs: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<Vec<f32>> {
        if !self.is_built() {
            return Err(SimbaError::NotBuilt);
        }
        let n = inputs.nrows();
        if n == 0 {
            return Err(SimbaError::EmptyBatch);
        }
        ensure_shape(&[n, self.inputs_dim], inputs.shape())?;
        ensure_shape(&[n, self.outputs_dim], targets.shape())?;

        let mut mean_losses: Vec<f32> = Vec::new();
        for member in &mut self.members {
            let sample: Vec<usize> = (0..n).map(|_| self.rng.gen_range(0..n)).collect();
            let losses = member.fit(
                inputs.select(Axis(0), &sample).view(),
                targets.select(Axis(0), &sample).view(),
            )?;
            if mean_losses.is_empty() {
                mean_losses = vec![0.0; losses.len()];
            }
            for (mean, loss) in mean_losses.iter_mut().zip(&losses) {
                *mean += loss;
            }
        }

        let k = self.members.len() as f32;
        Ok(mean_losses.into_iter().map(|l| l / k).collect())
    }

    fn predict(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        if !self.is_built() {
            return Err(SimbaError::NotBuilt);
        }
        let n = inputs.nrows();
        ensure_shape(&[n, self.inputs_dim], inputs.shape())?;

        let k = self.members.len();
        let mut outputs = Array2::zeros((n, self.outputs_dim));
        for (m, member) in self.members.iter().enumerate() {
            let rows: Vec<usize> = (m..n).step_by(k).collect();
            if rows.is_empty() {
                continue;
            }
            let predictions = member.predict(inputs.select(Axis(0), &rows).view())?;
            for (j, &row) in rows.iter().enumerate() {
                outputs.row_mut(row).assign(&predictions.row(j));
            }
        }
        Ok(outputs)
    }
}
