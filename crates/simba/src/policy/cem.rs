//! Cross-Entropy Method planner over the learned transition model.

use super::{MpcConfig, MpcPolicy, Policy, SamplingDistribution};
use crate::utils::seeded_rng;
use crate::{Result, SimbaError};
use ndarray::{Array1, Array3, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// CEM planner configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CemConfig {
    #[serde(flatten)]
    pub mpc: MpcConfig,
    /// Maximum refinement iterations per planning call
    pub iterations: usize,
    /// Weight kept from the previous distribution, in `[0, 1]`
    pub smoothing: f32,
    /// Top-scoring rollouts used to refit the distribution
    pub n_elite: usize,
    /// Stop once the mean sampling stddev falls to this value
    pub stddev_threshold: f32,
    /// Gaussian exploration noise added to the returned action
    pub noise_stddev: f32,
    pub seed: Option<u64>,
}

impl Default for CemConfig {
    fn default() -> Self {
        Self {
            mpc: MpcConfig::default(),
            iterations: 5,
            smoothing: 0.1,
            n_elite: 20,
            stddev_threshold: 0.01,
            noise_stddev: 0.0,
            seed: None,
        }
    }
}

impl CemConfig {
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.mpc.horizon = horizon;
        self
    }

    pub fn with_samples(mut self, n_samples: usize, n_elite: usize) -> Self {
        self.mpc.n_samples = n_samples;
        self.n_elite = n_elite;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject configurations that could only produce a meaningless plan.
    pub fn validate(&self) -> Result<()> {
        let batch = self.mpc.n_samples * self.mpc.particles;
        if self.iterations == 0 {
            return Err(SimbaError::InvalidConfig(
                "iterations must be a positive integer".into(),
            ));
        }
        if self.n_elite == 0 || self.n_elite > batch {
            return Err(SimbaError::InvalidConfig(format!(
                "n_elite must be in 1..={batch}, got {}",
                self.n_elite
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(SimbaError::InvalidConfig(format!(
                "smoothing must be in [0, 1], got {}",
                self.smoothing
            )));
        }
        if !(self.noise_stddev >= 0.0) {
            return Err(SimbaError::InvalidConfig(
                "noise_stddev must be non-negative".into(),
            ));
        }
        if self.stddev_threshold.is_nan() {
            return Err(SimbaError::InvalidConfig(
                "stddev_threshold must be a number".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one planning call.
#[derive(Clone, Debug)]
pub struct Plan {
    /// First-timestep action of the best elite, plus exploration noise
    pub action: Array1<f32>,
    /// Score of the best elite seen across iterations
    pub score: f32,
    /// Iterations actually run before convergence or the limit
    pub iterations: usize,
    /// Best-so-far score after each iteration
    pub score_history: Vec<f32>,
    /// Sampling distribution when the loop ended
    pub distribution: SamplingDistribution,
}

/// Receding-horizon planner refining a Gaussian over action sequences.
pub struct CemMpc {
    base: MpcPolicy,
    iterations: usize,
    smoothing: f32,
    n_elite: usize,
    stddev_threshold: f32,
    noise_stddev: f32,
    rng: StdRng,
}

impl CemMpc {
    /// Wrap an existing base. `config.mpc` is ignored; the base already
    /// carries the planning dimensions.
    pub fn new(base: MpcPolicy, config: &CemConfig) -> Result<Self> {
        let mut config = config.clone();
        config.mpc.horizon = base.horizon();
        config.mpc.n_samples = base.n_samples();
        config.mpc.particles = base.particles();
        config.validate()?;

        Ok(Self {
            base,
            iterations: config.iterations,
            smoothing: config.smoothing,
            n_elite: config.n_elite,
            stddev_threshold: config.stddev_threshold,
            noise_stddev: config.noise_stddev,
            rng: seeded_rng(config.seed),
        })
    }

    pub fn base(&self) -> &MpcPolicy {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut MpcPolicy {
        &mut self.base
    }

    pub fn into_base(self) -> MpcPolicy {
        self.base
    }

    /// Plan from `state` and return the action with its diagnostics.
    ///
    /// Fails with [`SimbaError::DegeneratePlan`] when no iteration produced
    /// a finite score.
    pub fn plan(&mut self, state: ArrayView1<f32>) -> Result<Plan> {
        let params = self.base.sampling_params();
        let action_dim = self.base.action_dim();
        let n_samples = self.base.n_samples();
        let particles = self.base.particles();

        let mut distribution = params.initial_distribution()?;
        let mut best_action = Array1::<f32>::zeros(action_dim);
        let mut best_score = f32::NEG_INFINITY;
        let mut score_history = Vec::with_capacity(self.iterations);

        for iteration in 0..self.iterations {
            let samples = distribution.sample(n_samples, &params.lower, &params.upper, &mut self.rng);
            let replicated = replicate_particles(&samples, particles);

            let trajectories = self.base.rollout(state, replicated.view())?;
            let scores = self
                .base
                .compute_objective(trajectories.view(), replicated.view())?;

            let elite_rows = top_k(&scores, self.n_elite);
            // Rows are sorted best-first.
            let leader = elite_rows[0];
            if rank(scores[leader]) > best_score {
                best_score = rank(scores[leader]);
                best_action.assign(&replicated.index_axis(Axis(0), leader).row(0));
            }
            score_history.push(best_score);

            let elite = replicated.select(Axis(0), &elite_rows);
            distribution.refit(elite.view(), self.smoothing)?;

            tracing::debug!(
                iteration,
                best_score,
                mean_stddev = distribution.mean_stddev(),
                "cem iteration"
            );

            if distribution.mean_stddev() <= self.stddev_threshold {
                break;
            }
        }

        if best_score == f32::NEG_INFINITY {
            return Err(SimbaError::DegeneratePlan(format!(
                "no finite score after {} iterations",
                score_history.len()
            )));
        }

        for value in best_action.iter_mut() {
            let z: f32 = StandardNormal.sample(&mut self.rng);
            *value += z * self.noise_stddev;
        }

        Ok(Plan {
            action: best_action,
            score: best_score,
            iterations: score_history.len(),
            score_history,
            distribution,
        })
    }
}

impl Policy for CemMpc {
    fn generate_action(&mut self, state: ArrayView1<f32>) -> Result<Array1<f32>> {
        Ok(self.plan(state)?.action)
    }
}

/// Repeat each sequence `particles` times on consecutive rows, so row `r`
/// holds sequence `r / particles`. Ensemble members are assigned by row,
/// which gives the particles of one sequence different members.
fn replicate_particles(samples: &Array3<f32>, particles: usize) -> Array3<f32> {
    let (n, horizon, action_dim) = samples.dim();
    Array3::from_shape_fn((n * particles, horizon, action_dim), |(r, t, d)| {
        samples[[r / particles, t, d]]
    })
}

/// NaN scores never win.
fn rank(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

/// Indices of the `k` highest scores, best first.
fn top_k(scores: &Array1<f32>, k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    let by_score_desc = |a: &usize, b: &usize| rank(scores[*b]).total_cmp(&rank(scores[*a]));
    if k < indices.len() {
        indices.select_nth_unstable_by(k, by_score_desc);
        indices.truncate(k);
    }
    indices.sort_unstable_by(by_score_desc);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Approximator, ModelConfig, TransitionModel};
    use crate::policy::{FinalStateObjective, Objective};
    use crate::spaces::Box as BoxSpace;
    use ndarray::{array, Array2, ArrayView2, ArrayView3};

    /// Predicts the action as the state delta.
    struct ActionAsDelta {
        obs: usize,
        act: usize,
    }

    impl Approximator for ActionAsDelta {
        fn inputs_dim(&self) -> usize {
            self.obs + self.act
        }

        fn outputs_dim(&self) -> usize {
            self.obs
        }

        fn is_built(&self) -> bool {
            true
        }

        fn build(&mut self) -> Result<()> {
            Ok(())
        }

        fn fit(&mut self, _: ArrayView2<f32>, _: ArrayView2<f32>) -> Result<Vec<f32>> {
            Ok(vec![])
        }

        fn predict(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
            let mut out = Array2::zeros((inputs.nrows(), self.obs));
            for (mut row, input) in out.outer_iter_mut().zip(inputs.outer_iter()) {
                for d in 0..self.obs {
                    row[d] = input[self.obs + d % self.act];
                }
            }
            Ok(out)
        }
    }

    /// Predicts a constant `+1` delta.
    struct ConstantDelta {
        obs: usize,
        act: usize,
    }

    impl Approximator for ConstantDelta {
        fn inputs_dim(&self) -> usize {
            self.obs + self.act
        }

        fn outputs_dim(&self) -> usize {
            self.obs
        }

        fn is_built(&self) -> bool {
            true
        }

        fn build(&mut self) -> Result<()> {
            Ok(())
        }

        fn fit(&mut self, _: ArrayView2<f32>, _: ArrayView2<f32>) -> Result<Vec<f32>> {
            Ok(vec![])
        }

        fn predict(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
            Ok(Array2::ones((inputs.nrows(), self.obs)))
        }
    }

    fn config(horizon: usize, n_samples: usize, n_elite: usize) -> CemConfig {
        let mut config = CemConfig::default()
            .with_horizon(horizon)
            .with_samples(n_samples, n_elite)
            .with_seed(42);
        config.stddev_threshold = 0.0;
        config
    }

    fn planner(
        approximator: Box<dyn Approximator>,
        objective: Box<dyn Objective>,
        config: &CemConfig,
    ) -> Result<CemMpc> {
        let model = TransitionModel::with_approximator(approximator, 1, 1)?;
        let base = MpcPolicy::new(model, BoxSpace::symmetric(1), objective, &config.mpc)?;
        CemMpc::new(base, config)
    }

    fn steering_planner(config: &CemConfig) -> CemMpc {
        planner(
            Box::new(ActionAsDelta { obs: 1, act: 1 }),
            Box::new(FinalStateObjective::new(0)),
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_top_k_orders_best_first() {
        let scores = array![0.5, f32::NAN, 3.0, -1.0, 2.0];
        assert_eq!(top_k(&scores, 2), vec![2, 4]);
        assert_eq!(top_k(&scores, 5)[4], 1);
    }

    #[test]
    fn test_rejects_degenerate_configs() {
        let mut zero_iterations = config(3, 10, 2);
        zero_iterations.iterations = 0;
        let zero_elite = config(3, 10, 0);
        let too_many_elite = config(3, 10, 11);
        let mut bad_smoothing = config(3, 10, 2);
        bad_smoothing.smoothing = 1.5;

        for config in [zero_iterations, zero_elite, too_many_elite, bad_smoothing] {
            let result = planner(
                Box::new(ActionAsDelta { obs: 1, act: 1 }),
                Box::new(FinalStateObjective::new(0)),
                &config,
            );
            assert!(matches!(result, Err(SimbaError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_action_within_bounds_without_noise() {
        let mut planner = steering_planner(&config(4, 50, 5));
        for _ in 0..5 {
            let action = planner.generate_action(array![0.3].view()).unwrap();
            assert_eq!(action.len(), 1);
            assert!((-1.0..=1.0).contains(&action[0]));
        }
    }

    #[test]
    fn test_scenario_steers_toward_upper_bound() {
        let mut config = config(3, 100, 10);
        config.iterations = 6;
        let mut planner = steering_planner(&config);

        let plan = planner.plan(array![0.0].view()).unwrap();
        assert!(plan.distribution.mean()[[0, 0]] > 0.8);
        assert!(plan.action[0] > 0.5);
        assert!(plan.score > 2.0);
    }

    #[test]
    fn test_constant_delta_scores_every_sequence_equally() {
        let mut planner = planner(
            Box::new(ConstantDelta { obs: 1, act: 1 }),
            Box::new(FinalStateObjective::new(0)),
            &config(3, 20, 4),
        )
        .unwrap();
        let plan = planner.plan(array![0.5].view()).unwrap();
        assert!(plan.score_history.iter().all(|&s| (s - 3.5).abs() < 1e-6));
    }

    #[test]
    fn test_score_history_is_monotone() {
        let mut config = config(3, 30, 3);
        config.iterations = 8;
        let mut planner = steering_planner(&config);
        let plan = planner.plan(array![0.0].view()).unwrap();

        assert_eq!(plan.score_history.len(), plan.iterations);
        assert!(plan.score_history.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(*plan.score_history.last().unwrap(), plan.score);
    }

    #[test]
    fn test_full_smoothing_keeps_priors() {
        let mut config = config(3, 30, 5);
        config.smoothing = 1.0;
        config.iterations = 4;
        let mut planner = steering_planner(&config);
        let plan = planner.plan(array![0.0].view()).unwrap();

        let params = planner.base().sampling_params();
        assert_eq!(plan.iterations, 4);
        assert_eq!(plan.distribution.mean(), &params.mean);
        assert_eq!(plan.distribution.stddev(), &params.stddev);
    }

    #[test]
    fn test_early_stop_after_one_iteration() {
        let mut config = config(3, 30, 5);
        config.iterations = 10;
        // Initial stddev is 0.5 for bounds [-1, 1].
        config.stddev_threshold = 5.0;
        let mut planner = steering_planner(&config);
        let plan = planner.plan(array![0.0].view()).unwrap();
        assert_eq!(plan.iterations, 1);
        assert_eq!(plan.score_history.len(), 1);
    }

    #[test]
    fn test_non_finite_scores_are_degenerate() {
        let objective = |t: ArrayView3<f32>, _: ArrayView3<f32>| {
            Array1::from_elem(t.len_of(Axis(0)), f32::NAN)
        };
        let mut planner = planner(
            Box::new(ActionAsDelta { obs: 1, act: 1 }),
            Box::new(objective),
            &config(2, 10, 2),
        )
        .unwrap();
        let result = planner.plan(array![0.0].view());
        assert!(matches!(result, Err(SimbaError::DegeneratePlan(_))));
    }

    #[test]
    fn test_particles_replicate_samples() {
        let mut config = config(2, 8, 4);
        config.mpc.particles = 3;
        config.iterations = 3;
        let mut planner = steering_planner(&config);
        assert_eq!(planner.base().batch_size(), 24);

        let plan = planner.plan(array![0.0].view()).unwrap();
        assert!((-1.0..=1.0).contains(&plan.action[0]));
    }

    #[test]
    fn test_replicated_particles_are_consecutive() {
        let samples = Array3::from_shape_fn((3, 2, 1), |(s, t, _)| (10 * s + t) as f32);
        let replicated = replicate_particles(&samples, 2);

        assert_eq!(replicated.dim(), (6, 2, 1));
        for r in 0..6 {
            assert_eq!(replicated.index_axis(Axis(0), r), samples.index_axis(Axis(0), r / 2));
        }
    }

    #[test]
    fn test_ensemble_particles_diverge() {
        let model_config = ModelConfig {
            units: 8,
            ensemble_size: 2,
            ..ModelConfig::default()
        }
        .with_kind("mlp_ensemble")
        .with_seed(4);
        let mut model = TransitionModel::new(&model_config, 1, 1).unwrap();
        model.build().unwrap();

        let mut config = config(3, 4, 2);
        config.mpc.particles = 2;
        let base = MpcPolicy::new(
            model,
            BoxSpace::symmetric(1),
            Box::new(FinalStateObjective::new(0)),
            &config.mpc,
        )
        .unwrap();

        let samples = Array3::from_shape_fn((4, 3, 1), |(s, t, _)| 0.2 * s as f32 - 0.1 * t as f32);
        let replicated = replicate_particles(&samples, base.particles());
        let trajectories = base.rollout(array![0.3].view(), replicated.view()).unwrap();

        for sequence in 0..4 {
            let first = trajectories.index_axis(Axis(0), 2 * sequence);
            let second = trajectories.index_axis(Axis(0), 2 * sequence + 1);
            assert_ne!(first, second, "sequence {sequence}");
        }
    }

    #[test]
    fn test_noise_applied_to_action() {
        let mut config = config(2, 20, 4);
        config.noise_stddev = 10.0;
        config.iterations = 2;
        let mut planner = steering_planner(&config);
        let actions: Vec<f32> = (0..10)
            .map(|_| planner.generate_action(array![0.0].view()).unwrap()[0])
            .collect();
        assert!(actions.iter().any(|a| a.abs() > 1.0));
    }

    #[test]
    fn test_seeded_planners_agree() {
        let mut a = steering_planner(&config(3, 20, 4));
        let mut b = steering_planner(&config(3, 20, 4));
        let state = array![0.1];
        assert_eq!(
            a.generate_action(state.view()).unwrap(),
            b.generate_action(state.view()).unwrap()
        );
    }
}
