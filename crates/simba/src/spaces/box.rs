//! Box (continuous) observation/action space

use super::Space;
use crate::{Result, SimbaError};
use ndarray::{Array1, ArrayView1, Zip};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal, Uniform};

/// Box space for flat continuous vectors with per-dimension bounds
#[derive(Clone, Debug, PartialEq)]
pub struct Box {
    /// Lower bound for each element
    pub low: Array1<f32>,
    /// Upper bound for each element
    pub high: Array1<f32>,
    /// Shape of the space
    shape: Vec<usize>,
}

impl Box {
    /// Create a new box space with given bounds.
    ///
    /// Fails when the bounds differ in length or any `low > high`.
    pub fn new(low: Array1<f32>, high: Array1<f32>) -> Result<Self> {
        if low.len() != high.len() {
            return Err(SimbaError::ShapeMismatch {
                expected: vec![low.len()],
                actual: vec![high.len()],
            });
        }
        if low.iter().zip(high.iter()).any(|(l, h)| !(l <= h)) {
            return Err(SimbaError::InvalidConfig(format!(
                "box bounds must satisfy low <= high, got low={low} high={high}"
            )));
        }
        let shape = vec![low.len()];
        Ok(Self { low, high, shape })
    }

    /// Create a box space with the same bounds in every dimension
    pub fn uniform(dim: usize, low: f32, high: f32) -> Self {
        assert!(low <= high, "Low must not exceed high");
        Self {
            low: Array1::from_elem(dim, low),
            high: Array1::from_elem(dim, high),
            shape: vec![dim],
        }
    }

    /// Create a box space from -inf to +inf (unbounded)
    pub fn unbounded(dim: usize) -> Self {
        Self::uniform(dim, f32::NEG_INFINITY, f32::INFINITY)
    }

    /// Create a symmetric box [-1, 1] for all elements
    pub fn symmetric(dim: usize) -> Self {
        Self::uniform(dim, -1.0, 1.0)
    }

    /// Number of dimensions
    pub fn dim(&self) -> usize {
        self.low.len()
    }

    /// Project a vector into the box element-wise.
    pub fn clip(&self, value: ArrayView1<f32>) -> Array1<f32> {
        Zip::from(&value)
            .and(&self.low)
            .and(&self.high)
            .map_collect(|&v, &l, &h| v.max(l).min(h))
    }
}

impl Space for Box {
    type Sample = Array1<f32>;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Sample {
        Zip::from(&self.low)
            .and(&self.high)
            .map_collect(|&l, &h| {
                if l == h {
                    l
                } else if l.is_finite() && h.is_finite() {
                    Uniform::new_inclusive(l, h).sample(rng)
                } else {
                    let z: f32 = StandardNormal.sample(rng);
                    z.max(l).min(h)
                }
            })
    }

    fn contains(&self, value: &Self::Sample) -> bool {
        if value.len() != self.low.len() {
            return false;
        }
        value
            .iter()
            .zip(self.low.iter())
            .zip(self.high.iter())
            .all(|((&v, &l), &h)| v >= l && v <= h)
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_box_sample() {
        let space = Box::uniform(4, -1.0, 1.0);
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let sample = space.sample(&mut rng);
            assert!(space.contains(&sample));
            assert_eq!(sample.len(), 4);
        }
    }

    #[test]
    fn test_box_contains() {
        let space = Box::uniform(2, 0.0, 1.0);

        assert!(space.contains(&array![0.5, 0.5]));
        assert!(!space.contains(&array![1.5, 0.5]));
        assert!(!space.contains(&array![0.5]));
    }

    #[test]
    fn test_box_clip() {
        let space = Box::new(array![-1.0, 0.0], array![1.0, 2.0]).unwrap();
        let clipped = space.clip(array![-3.0, 5.0].view());
        assert_eq!(clipped, array![-1.0, 2.0]);
    }

    #[test]
    fn test_box_rejects_inverted_bounds() {
        assert!(Box::new(array![1.0], array![-1.0]).is_err());
        assert!(Box::new(array![0.0, 0.0], array![1.0]).is_err());
    }
}
