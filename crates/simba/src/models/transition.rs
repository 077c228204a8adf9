//! Delta transition model with batched multi-step rollouts.

use super::{build_approximator, Approximator, InputNormalizer, ModelConfig};
use crate::{ensure_shape, Result, SimbaError};
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Axis};

/// Learned dynamics `s_{t+1} = s_t + f(normalize([s_t, a_t]))`.
///
/// The approximator predicts the change in observation. Normalization
/// statistics over the concatenated `[observation, action]` input are
/// replaced only by [`TransitionModel::fit`]; every prediction uses the
/// statistics of the most recent fit.
///
/// Callers sharing one model between a planner and a fitting loop must
/// serialize `fit` against rollouts; nothing here locks.
pub struct TransitionModel {
    approximator: Box<dyn Approximator>,
    observation_dim: usize,
    action_dim: usize,
    normalizer: InputNormalizer,
}

impl TransitionModel {
    /// Construct the approximator named by `config.kind` from the registry.
    pub fn new(config: &ModelConfig, observation_dim: usize, action_dim: usize) -> Result<Self> {
        let approximator =
            build_approximator(config, observation_dim + action_dim, observation_dim)?;
        Self::with_approximator(approximator, observation_dim, action_dim)
    }

    /// Wrap an already constructed approximator.
    pub fn with_approximator(
        approximator: Box<dyn Approximator>,
        observation_dim: usize,
        action_dim: usize,
    ) -> Result<Self> {
        if observation_dim == 0 || action_dim == 0 {
            return Err(SimbaError::InvalidConfig(format!(
                "observation_dim and action_dim must be positive, got {observation_dim} and {action_dim}"
            )));
        }
        ensure_shape(
            &[observation_dim + action_dim, observation_dim],
            &[approximator.inputs_dim(), approximator.outputs_dim()],
        )?;
        Ok(Self {
            approximator,
            observation_dim,
            action_dim,
            normalizer: InputNormalizer::identity(observation_dim + action_dim),
        })
    }

    pub fn observation_dim(&self) -> usize {
        self.observation_dim
    }

    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    /// Width of a model input row, `observation_dim + action_dim`
    pub fn inputs_dim(&self) -> usize {
        self.observation_dim + self.action_dim
    }

    /// Normalization statistics from the most recent fit
    pub fn normalizer(&self) -> &InputNormalizer {
        &self.normalizer
    }

    pub fn is_built(&self) -> bool {
        self.approximator.is_built()
    }

    pub fn build(&mut self) -> Result<()> {
        self.approximator.build()
    }

    /// Fit on `(N, obs + act)` inputs against `(N, obs)` next observations.
    ///
    /// The approximator is trained on the observation delta. Statistics are
    /// swapped in only once the approximator reports success.
    pub fn fit(&mut self, inputs: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<Vec<f32>> {
        let n = inputs.nrows();
        if n == 0 {
            return Err(SimbaError::EmptyBatch);
        }
        ensure_shape(&[n, self.inputs_dim()], inputs.shape())?;
        ensure_shape(&[n, self.observation_dim], targets.shape())?;

        let normalizer = InputNormalizer::from_batch(inputs)?;
        let normalized = normalizer.normalize(inputs)?;
        let deltas = &targets - &inputs.slice(s![.., ..self.observation_dim]);

        let losses = self.approximator.fit(normalized.view(), deltas.view())?;
        self.normalizer = normalizer;

        tracing::debug!(
            samples = n,
            epochs = losses.len(),
            final_loss = losses.last().copied().unwrap_or(f32::NAN),
            "Fitted transition model"
        );
        Ok(losses)
    }

    /// One-step prediction for `(N, obs + act)` rows, shaped `(N, 1, obs)`.
    pub fn predict(&self, inputs: ArrayView2<f32>) -> Result<Array3<f32>> {
        ensure_shape(&[inputs.nrows(), self.inputs_dim()], inputs.shape())?;
        let states = inputs.slice(s![.., ..self.observation_dim]);
        let actions = inputs
            .slice(s![.., self.observation_dim..])
            .insert_axis(Axis(1));
        self.simulate_trajectories(states, actions)
    }

    /// Roll a batch of action sequences forward from a batch of states.
    ///
    /// `initial_states` is `(B, obs)` and `action_sequences` is
    /// `(B, H, act)`. Returns `(B, H, obs)` where `[b, t]` is the state
    /// reached after applying `action_sequences[b, t]`.
    pub fn simulate_trajectories(
        &self,
        initial_states: ArrayView2<f32>,
        action_sequences: ArrayView3<f32>,
    ) -> Result<Array3<f32>> {
        let (batch, horizon, action_dim) = action_sequences.dim();
        ensure_shape(&[batch, self.observation_dim], initial_states.shape())?;
        ensure_shape(&[batch, horizon, self.action_dim], &[batch, horizon, action_dim])?;

        let obs_dim = self.observation_dim;
        let mut trajectories = Array3::zeros((batch, horizon, obs_dim));
        let mut state = initial_states.to_owned();
        let mut inputs = Array2::zeros((batch, self.inputs_dim()));

        for t in 0..horizon {
            inputs.slice_mut(s![.., ..obs_dim]).assign(&state);
            inputs
                .slice_mut(s![.., obs_dim..])
                .assign(&action_sequences.index_axis(Axis(1), t));

            let normalized = self.normalizer.normalize(inputs.view())?;
            let delta = self.approximator.predict(normalized.view())?;
            ensure_shape(&[batch, obs_dim], delta.shape())?;

            state += &delta;
            trajectories.index_axis_mut(Axis(1), t).assign(&state);
        }
        Ok(trajectories)
    }

    /// Persistence is not supported.
    pub fn save(&self) -> Result<()> {
        Err(SimbaError::InvalidConfig(
            "transition model persistence is not implemented".into(),
        ))
    }

    /// Persistence is not supported.
    pub fn load(&mut self) -> Result<()> {
        Err(SimbaError::InvalidConfig(
            "transition model persistence is not implemented".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};
    use std::sync::{Arc, Mutex};

    /// Predicts a fixed delta for every row and records what it was fit on.
    struct ConstantDelta {
        delta: Array1<f32>,
        inputs_dim: usize,
        fitted_targets: Arc<Mutex<Option<Array2<f32>>>>,
        fail_fit: bool,
    }

    impl ConstantDelta {
        fn new(delta: Array1<f32>, inputs_dim: usize) -> Self {
            Self {
                delta,
                inputs_dim,
                fitted_targets: Arc::new(Mutex::new(None)),
                fail_fit: false,
            }
        }
    }

    impl Approximator for ConstantDelta {
        fn inputs_dim(&self) -> usize {
            self.inputs_dim
        }

        fn outputs_dim(&self) -> usize {
            self.delta.len()
        }

        fn is_built(&self) -> bool {
            true
        }

        fn build(&mut self) -> Result<()> {
            Ok(())
        }

        fn fit(&mut self, _inputs: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<Vec<f32>> {
            if self.fail_fit {
                return Err(SimbaError::InvalidConfig("fit failed".into()));
            }
            *self.fitted_targets.lock().unwrap() = Some(targets.to_owned());
            Ok(vec![0.0])
        }

        fn predict(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
            Ok(self
                .delta
                .broadcast((inputs.nrows(), self.delta.len()))
                .unwrap()
                .to_owned())
        }
    }

    /// Delta equals the (normalized) action columns.
    struct ActionAsDelta;

    impl Approximator for ActionAsDelta {
        fn inputs_dim(&self) -> usize {
            2
        }
        fn outputs_dim(&self) -> usize {
            1
        }
        fn is_built(&self) -> bool {
            true
        }
        fn build(&mut self) -> Result<()> {
            Ok(())
        }
        fn fit(&mut self, _: ArrayView2<f32>, _: ArrayView2<f32>) -> Result<Vec<f32>> {
            Ok(Vec::new())
        }
        fn predict(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
            Ok(inputs.slice(s![.., 1..2]).to_owned())
        }
    }

    fn constant_model(delta: Array1<f32>, action_dim: usize) -> TransitionModel {
        let obs_dim = delta.len();
        TransitionModel::with_approximator(
            Box::new(ConstantDelta::new(delta, obs_dim + action_dim)),
            obs_dim,
            action_dim,
        )
        .unwrap()
    }

    #[test]
    fn test_zero_delta_repeats_initial_state() {
        let model = constant_model(Array1::zeros(2), 1);
        let s0 = array![[1.5, -2.0], [0.25, 4.0], [3.0, 3.0]];
        let actions = Array3::from_shape_fn((3, 6, 1), |(b, t, _)| (b * t) as f32);

        let trajectories = model
            .simulate_trajectories(s0.view(), actions.view())
            .unwrap();
        assert_eq!(trajectories.dim(), (3, 6, 2));
        for t in 0..6 {
            assert_eq!(trajectories.index_axis(Axis(1), t), s0);
        }
    }

    #[test]
    fn test_deltas_accumulate_per_step() {
        let model = constant_model(array![1.0], 1);
        let s0 = array![[0.0], [10.0]];
        let actions = Array3::zeros((2, 3, 1));

        let trajectories = model
            .simulate_trajectories(s0.view(), actions.view())
            .unwrap();
        assert_eq!(
            trajectories,
            array![[[1.0], [2.0], [3.0]], [[11.0], [12.0], [13.0]]]
        );
    }

    #[test]
    fn test_timestep_uses_matching_action() {
        let model =
            TransitionModel::with_approximator(Box::new(ActionAsDelta), 1, 1).unwrap();
        let s0 = array![[0.0]];
        let actions = array![[[1.0], [10.0], [100.0]]];

        let trajectories = model
            .simulate_trajectories(s0.view(), actions.view())
            .unwrap();
        assert_eq!(trajectories, array![[[1.0], [11.0], [111.0]]]);
    }

    #[test]
    fn test_predict_is_one_step_rollout() {
        let model = constant_model(array![0.5, -0.5], 1);
        let inputs = array![[1.0, 1.0, 0.3], [2.0, 2.0, -0.3]];
        let prediction = model.predict(inputs.view()).unwrap();
        assert_eq!(prediction, array![[[1.5, 0.5]], [[2.5, 1.5]]]);
    }

    #[test]
    fn test_fit_trains_on_deltas_and_updates_statistics() {
        let approximator = ConstantDelta::new(Array1::zeros(2), 3);
        let fitted = Arc::clone(&approximator.fitted_targets);
        let mut model = TransitionModel::with_approximator(Box::new(approximator), 2, 1).unwrap();
        let inputs = array![[1.0, 2.0, 0.5], [3.0, 6.0, -0.5]];
        let targets = array![[1.5, 1.0], [4.0, 6.0]];

        model.fit(inputs.view(), targets.view()).unwrap();

        let deltas = fitted.lock().unwrap().clone().unwrap();
        assert_eq!(deltas, array![[0.5, -1.0], [1.0, 0.0]]);

        assert_eq!(model.normalizer().mean(), &array![2.0, 4.0, 0.0]);
        assert!((model.normalizer().stddev()[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_failed_fit_keeps_statistics() {
        let mut approximator = ConstantDelta::new(Array1::zeros(1), 2);
        approximator.fail_fit = true;
        let mut model = TransitionModel::with_approximator(Box::new(approximator), 1, 1).unwrap();

        let before = model.normalizer().clone();
        assert!(model
            .fit(array![[5.0, 1.0], [7.0, 3.0]].view(), array![[6.0], [8.0]].view())
            .is_err());
        assert_eq!(model.normalizer(), &before);
    }

    #[test]
    fn test_rollout_shape_errors() {
        let model = constant_model(Array1::zeros(2), 1);
        let s0 = Array2::zeros((3, 2));
        let wrong_batch = Array3::zeros((4, 2, 1));
        let wrong_action = Array3::zeros((3, 2, 2));

        assert!(model
            .simulate_trajectories(s0.view(), wrong_batch.view())
            .is_err());
        assert!(model
            .simulate_trajectories(s0.view(), wrong_action.view())
            .is_err());
    }

    #[test]
    fn test_unknown_model_fails_fast() {
        let config = ModelConfig::default().with_kind("transformer");
        assert!(matches!(
            TransitionModel::new(&config, 3, 1),
            Err(SimbaError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_registry_model_rolls_out_after_build() {
        let config = ModelConfig {
            units: 8,
            seed: Some(0),
            ..Default::default()
        };
        let mut model = TransitionModel::new(&config, 3, 2).unwrap();
        assert!(!model.is_built());
        assert!(matches!(
            model.simulate_trajectories(Array2::zeros((1, 3)).view(), Array3::zeros((1, 4, 2)).view()),
            Err(SimbaError::NotBuilt)
        ));

        model.build().unwrap();
        let trajectories = model
            .simulate_trajectories(Array2::zeros((5, 3)).view(), Array3::zeros((5, 4, 2)).view())
            .unwrap();
        assert_eq!(trajectories.dim(), (5, 4, 3));
    }
}
