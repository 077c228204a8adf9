//! Fully connected network on `ndarray`, trained with mini-batch Adam.

use super::{Activation, Approximator, ModelConfig};
use crate::utils::seeded_rng;
use crate::{ensure_shape, Result, SimbaError};
use ndarray::{Array, Array1, Array2, ArrayView2, Axis, Dimension, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Uniform};

const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-8;

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

impl Activation {
    fn apply(&self, z: &Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => z.mapv(|v| v.max(0.0)),
            Activation::Tanh => z.mapv(f32::tanh),
            Activation::Swish => z.mapv(|v| v * sigmoid(v)),
        }
    }

    /// d activation / dz, evaluated at the pre-activation `z`.
    fn derivative(&self, z: &Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Tanh => z.mapv(|v| {
                let t = v.tanh();
                1.0 - t * t
            }),
            Activation::Swish => z.mapv(|v| {
                let s = sigmoid(v);
                s + v * s * (1.0 - s)
            }),
        }
    }
}

/// One affine layer `y = x W + b`
#[derive(Clone, Debug)]
struct Dense {
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl Dense {
    /// Glorot-uniform weights, zero bias
    fn glorot(inputs: usize, outputs: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (inputs + outputs) as f32).sqrt();
        let dist = Uniform::new_inclusive(-limit, limit);
        Self {
            weights: Array2::from_shape_fn((inputs, outputs), |_| dist.sample(&mut *rng)),
            bias: Array1::zeros(outputs),
        }
    }

    fn forward(&self, x: ArrayView2<f32>) -> Array2<f32> {
        x.dot(&self.weights) + &self.bias
    }

    fn num_parameters(&self) -> usize {
        self.weights.len() + self.bias.len()
    }
}

/// First and second moment estimates for one layer
struct Moments {
    m_weights: Array2<f32>,
    v_weights: Array2<f32>,
    m_bias: Array1<f32>,
    v_bias: Array1<f32>,
}

/// Adam optimizer state over a stack of dense layers
struct Adam {
    learning_rate: f32,
    step: i32,
    moments: Vec<Moments>,
}

impl Adam {
    fn new(learning_rate: f32, layers: &[Dense]) -> Self {
        let moments = layers
            .iter()
            .map(|layer| Moments {
                m_weights: Array2::zeros(layer.weights.raw_dim()),
                v_weights: Array2::zeros(layer.weights.raw_dim()),
                m_bias: Array1::zeros(layer.bias.raw_dim()),
                v_bias: Array1::zeros(layer.bias.raw_dim()),
            })
            .collect();
        Self {
            learning_rate,
            step: 0,
            moments,
        }
    }

    fn update(&mut self, layers: &mut [Dense], grads: &[(Array2<f32>, Array1<f32>)]) {
        self.step += 1;
        let correction1 = 1.0 - ADAM_BETA1.powi(self.step);
        let correction2 = 1.0 - ADAM_BETA2.powi(self.step);
        let lr = self.learning_rate;

        for ((layer, moments), (grad_w, grad_b)) in
            layers.iter_mut().zip(self.moments.iter_mut()).zip(grads)
        {
            adam_step(
                &mut layer.weights,
                &mut moments.m_weights,
                &mut moments.v_weights,
                grad_w,
                lr,
                correction1,
                correction2,
            );
            adam_step(
                &mut layer.bias,
                &mut moments.m_bias,
                &mut moments.v_bias,
                grad_b,
                lr,
                correction1,
                correction2,
            );
        }
    }
}

fn adam_step<D: Dimension>(
    param: &mut Array<f32, D>,
    first: &mut Array<f32, D>,
    second: &mut Array<f32, D>,
    grad: &Array<f32, D>,
    lr: f32,
    correction1: f32,
    correction2: f32,
) {
    Zip::from(param)
        .and(first)
        .and(second)
        .and(grad)
        .for_each(|p, m, v, &g| {
            *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
            *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
            let m_hat = *m / correction1;
            let v_hat = *v / correction2;
            *p -= lr * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
        });
}

/// Multi-layer perceptron regressor.
///
/// `n_layers` hidden layers of `units` each with the configured activation,
/// followed by a linear output layer. Trained on mean-squared error.
pub struct Mlp {
    config: ModelConfig,
    inputs_dim: usize,
    outputs_dim: usize,
    layers: Vec<Dense>,
    optimizer: Option<Adam>,
    rng: StdRng,
}

impl Mlp {
    /// Create an unbuilt network; call [`Approximator::build`] before use.
    pub fn new(config: ModelConfig, inputs_dim: usize, outputs_dim: usize) -> Self {
        let rng = seeded_rng(config.seed);
        Self {
            config,
            inputs_dim,
            outputs_dim,
            layers: Vec::new(),
            optimizer: None,
            rng,
        }
    }

    /// Total number of trainable parameters (0 before build)
    pub fn num_parameters(&self) -> usize {
        self.layers.iter().map(Dense::num_parameters).sum()
    }

    /// Forward pass keeping pre-activations and activations for backprop.
    ///
    /// `activations[0]` is the input and `activations[i + 1]` the output of
    /// layer `i`.
    fn forward_cached(&self, x: ArrayView2<f32>) -> (Vec<Array2<f32>>, Vec<Array2<f32>>) {
        let last = self.layers.len() - 1;
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(x.to_owned());

        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(activations[i].view());
            let a = if i == last {
                z.clone()
            } else {
                self.config.activation.apply(&z)
            };
            pre_activations.push(z);
            activations.push(a);
        }
        (pre_activations, activations)
    }

    fn backward(
        &self,
        pre_activations: &[Array2<f32>],
        activations: &[Array2<f32>],
        grad_output: Array2<f32>,
    ) -> Vec<(Array2<f32>, Array1<f32>)> {
        let mut grad = grad_output;
        let mut grads = Vec::with_capacity(self.layers.len());

        for i in (0..self.layers.len()).rev() {
            let grad_w = activations[i].t().dot(&grad);
            let grad_b = grad.sum_axis(Axis(0));
            if i > 0 {
                grad = grad.dot(&self.layers[i].weights.t())
                    * &self.config.activation.derivative(&pre_activations[i - 1]);
            }
            grads.push((grad_w, grad_b));
        }
        grads.reverse();
        grads
    }

    /// One Adam step on a mini-batch; returns the batch MSE.
    fn train_batch(&mut self, x: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let (pre_activations, activations) = self.forward_cached(x);
        let error = &activations[activations.len() - 1] - &y;
        let count = error.len() as f32;
        let loss = error.mapv(|e| e * e).sum() / count;

        let grad_output = error * (2.0 / count);
        let grads = self.backward(&pre_activations, &activations, grad_output);
        if let Some(optimizer) = self.optimizer.as_mut() {
            optimizer.update(&mut self.layers, &grads);
        }
        loss
    }
}

impl Approximator for Mlp {
    fn inputs_dim(&self) -> usize {
        self.inputs_dim
    }

    fn outputs_dim(&self) -> usize {
        self.outputs_dim
    }

    fn is_built(&self) -> bool {
        !self.layers.is_empty()
    }

    fn build(&mut self) -> Result<()> {
        let mut sizes = vec![self.inputs_dim];
        sizes.extend(std::iter::repeat(self.config.units).take(self.config.n_layers));
        sizes.push(self.outputs_dim);

        let rng = &mut self.rng;
        let layers: Vec<Dense> = sizes
            .windows(2)
            .map(|w| Dense::glorot(w[0], w[1], &mut *rng))
            .collect();
        self.optimizer = Some(Adam::new(self.config.learning_rate, &layers));
        self.layers = layers;
        Ok(())
    }

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

        let mut indices: Vec<usize> = (0..n).collect();
        let mut losses = Vec::with_capacity(self.config.n_epochs);

        for _ in 0..self.config.n_epochs {
            indices.shuffle(&mut self.rng);
            let mut total = 0.0;
            for chunk in indices.chunks(self.config.batch_size) {
                let x = inputs.select(Axis(0), chunk);
                let y = targets.select(Axis(0), chunk);
                total += self.train_batch(x.view(), y.view()) * chunk.len() as f32;
            }
            losses.push(total / n as f32);
        }
        Ok(losses)
    }

    fn predict(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        if !self.is_built() {
            return Err(SimbaError::NotBuilt);
        }
        ensure_shape(&[inputs.nrows(), self.inputs_dim], inputs.shape())?;

        let mut x = self.layers[0].forward(inputs);
        for layer in &self.layers[1..] {
            x = self.config.activation.apply(&x);
            x = layer.forward(x.view());
        }
        Ok(x)
    }
}
