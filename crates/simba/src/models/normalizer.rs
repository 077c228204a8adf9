//! Input standardization for transition models.
//!
//! Unlike a running estimate, statistics here are recomputed from the full
//! batch on every fit and stay frozen for inference until the next fit.

use crate::{ensure_shape, Result, SimbaError};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Added to the standard deviation so zero-variance features stay finite.
pub const NORMALIZATION_EPSILON: f32 = 1e-8;

/// Per-feature mean and population standard deviation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputNormalizer {
    mean: Array1<f32>,
    stddev: Array1<f32>,
}

impl InputNormalizer {
    /// Identity transform (zero mean, unit stddev)
    pub fn identity(dim: usize) -> Self {
        Self {
            mean: Array1::zeros(dim),
            stddev: Array1::ones(dim),
        }
    }

    /// Statistics over the rows of `batch` (ddof = 0).
    pub fn from_batch(batch: ArrayView2<f32>) -> Result<Self> {
        let mean = batch.mean_axis(Axis(0)).ok_or(SimbaError::EmptyBatch)?;
        let stddev = batch.std_axis(Axis(0), 0.0);
        Ok(Self { mean, stddev })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &Array1<f32> {
        &self.mean
    }

    pub fn stddev(&self) -> &Array1<f32> {
        &self.stddev
    }

    /// `(x - mean) / (stddev + eps)` row-wise
    pub fn normalize(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        ensure_shape(&[inputs.nrows(), self.dim()], inputs.shape())?;
        let scale = &self.stddev + NORMALIZATION_EPSILON;
        Ok((&inputs - &self.mean) / &scale)
    }

    /// Inverse of [`InputNormalizer::normalize`]
    pub fn denormalize(&self, normalized: ArrayView2<f32>) -> Result<Array2<f32>> {
        ensure_shape(&[normalized.nrows(), self.dim()], normalized.shape())?;
        let scale = &self.stddev + NORMALIZATION_EPSILON;
        Ok(&normalized * &scale + &self.mean)
    }
}
