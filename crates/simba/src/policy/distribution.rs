//! Diagonal Gaussian over action sequences.

use crate::{ensure_shape, Result, SimbaError};
use ndarray::{Array2, Array3, ArrayView3, Axis, Zip};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Independent per-element Gaussian with `(horizon, action_dim)` mean and
/// standard deviation.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplingDistribution {
    mean: Array2<f32>,
    stddev: Array2<f32>,
}

impl SamplingDistribution {
    pub fn new(mean: Array2<f32>, stddev: Array2<f32>) -> Result<Self> {
        ensure_shape(mean.shape(), stddev.shape())?;
        if stddev.iter().any(|s| !(*s >= 0.0)) {
            return Err(SimbaError::InvalidConfig(
                "sampling stddev must be non-negative".into(),
            ));
        }
        Ok(Self { mean, stddev })
    }

    pub fn horizon(&self) -> usize {
        self.mean.nrows()
    }

    pub fn action_dim(&self) -> usize {
        self.mean.ncols()
    }

    pub fn mean(&self) -> &Array2<f32> {
        &self.mean
    }

    pub fn stddev(&self) -> &Array2<f32> {
        &self.stddev
    }

    /// Average standard deviation over every (timestep, dimension) entry
    pub fn mean_stddev(&self) -> f32 {
        self.stddev.mean().unwrap_or(0.0)
    }

    /// Draw `n` sequences `mean + stddev * z`, each element then clipped
    /// into `[lower, upper]`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        n: usize,
        lower: &Array2<f32>,
        upper: &Array2<f32>,
        rng: &mut R,
    ) -> Array3<f32> {
        let mut sequences = Array3::zeros((n, self.horizon(), self.action_dim()));
        for sequence in sequences.outer_iter_mut() {
            Zip::from(sequence)
                .and(&self.mean)
                .and(&self.stddev)
                .and(lower)
                .and(upper)
                .for_each(|x, &mu, &sigma, &lo, &hi| {
                    let z: f32 = StandardNormal.sample(&mut *rng);
                    *x = (mu + sigma * z).max(lo).min(hi);
                });
        }
        sequences
    }

    /// Blend in the statistics of `elite` `(k, horizon, action_dim)`:
    /// `param <- smoothing * param + (1 - smoothing) * elite_stat`.
    ///
    /// Returns the elite mean and population stddev.
    pub fn refit(
        &mut self,
        elite: ArrayView3<f32>,
        smoothing: f32,
    ) -> Result<(Array2<f32>, Array2<f32>)> {
        let k = elite.len_of(Axis(0));
        ensure_shape(&[k, self.horizon(), self.action_dim()], elite.shape())?;

        let elite_mean = elite.mean_axis(Axis(0)).ok_or(SimbaError::EmptyBatch)?;
        let elite_stddev = elite.std_axis(Axis(0), 0.0);

        self.mean = &self.mean * smoothing + &elite_mean * (1.0 - smoothing);
        self.stddev = &self.stddev * smoothing + &elite_stddev * (1.0 - smoothing);
        Ok((elite_mean, elite_stddev))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn distribution(mean: f32, stddev: f32) -> SamplingDistribution {
        SamplingDistribution::new(
            Array2::from_elem((4, 2), mean),
            Array2::from_elem((4, 2), stddev),
        )
        .unwrap()
    }

    #[test]
    fn test_samples_respect_bounds_far_outside() {
        let mut rng = StdRng::seed_from_u64(5);
        let lower = Array2::from_elem((4, 2), -1.0);
        let upper = Array2::from_elem((4, 2), 1.0);

        for (mean, stddev) in [(50.0, 0.1), (-50.0, 0.1), (0.0, 1e4), (0.0, f32::INFINITY)] {
            let samples = distribution(mean, stddev).sample(256, &lower, &upper, &mut rng);
            assert_eq!(samples.dim(), (256, 4, 2));
            assert!(samples.iter().all(|&x| (-1.0..=1.0).contains(&x)));
        }
    }

    #[test]
    fn test_zero_stddev_samples_the_mean() {
        let mut rng = StdRng::seed_from_u64(1);
        let lower = Array2::from_elem((4, 2), -1.0);
        let upper = Array2::from_elem((4, 2), 1.0);
        let samples = distribution(0.25, 0.0).sample(8, &lower, &upper, &mut rng);
        assert!(samples.iter().all(|&x| x == 0.25));
    }

    #[test]
    fn test_refit_with_zero_smoothing_takes_elite_statistics() {
        let mut dist = SamplingDistribution::new(array![[0.0], [0.0]], array![[1.0], [1.0]]).unwrap();
        let elite = array![[[1.0], [2.0]], [[3.0], [2.0]]];

        let (elite_mean, elite_stddev) = dist.refit(elite.view(), 0.0).unwrap();
        assert_eq!(elite_mean, array![[2.0], [2.0]]);
        assert_eq!(dist.mean(), &elite_mean);
        assert_eq!(dist.stddev(), &elite_stddev);
        assert_eq!(elite_stddev[[1, 0]], 0.0);
    }

    #[test]
    fn test_refit_with_full_smoothing_is_identity() {
        let mut dist = distribution(0.3, 0.7);
        let before = dist.clone();
        let elite = Array3::from_shape_fn((3, 4, 2), |(i, t, j)| (i + t + j) as f32);
        for _ in 0..5 {
            dist.refit(elite.view(), 1.0).unwrap();
        }
        assert_eq!(dist, before);
    }

    #[test]
    fn test_refit_blends() {
        let mut dist = SamplingDistribution::new(array![[0.0]], array![[1.0]]).unwrap();
        dist.refit(array![[[1.0]], [[3.0]]].view(), 0.5).unwrap();
        assert_eq!(dist.mean(), &array![[1.0]]);
        assert!((dist.stddev()[[0, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_stddev_rejected() {
        assert!(SamplingDistribution::new(array![[0.0]], array![[-0.1]]).is_err());
    }
}
