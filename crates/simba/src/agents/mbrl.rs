//! Model-based agent: fit a transition model, plan through it with CEM.

use super::{Agent, AgentConfig, AgentReport, TransitionBuffer};
use crate::env::Environment;
use crate::models::TransitionModel;
use crate::policy::{CemMpc, MpcPolicy, Objective, Policy, RandomPolicy};
use crate::spaces::Box as BoxSpace;
use crate::training::ExperimentConfig;
use crate::utils::child_seed;
use crate::{ensure_shape, Result};
use std::collections::BTreeMap;

/// Statistics of the episodes collected by the latest `interact`.
#[derive(Clone, Debug, Default)]
struct EpisodeSummary {
    returns: Vec<f32>,
    lengths: Vec<usize>,
    plan_scores: Vec<f32>,
}

fn mean<T: Copy + Into<f64>>(values: &[T]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|&v| v.into()).sum::<f64>() / values.len() as f64)
}

/// Collects random warm-up episodes, then plans every action with
/// [`CemMpc`] over a transition model refit on all stored data.
pub struct MbrlAgent {
    config: AgentConfig,
    planner: CemMpc,
    explorer: RandomPolicy,
    action_space: BoxSpace,
    buffer: TransitionBuffer,
    seed: Option<u64>,
    warmed_up: bool,
    episodes: u64,
    total_steps: u64,
    losses: Vec<f32>,
    summary: EpisodeSummary,
}

impl MbrlAgent {
    pub fn new(planner: CemMpc, config: AgentConfig, seed: Option<u64>) -> Result<Self> {
        config.validate()?;
        let base = planner.base();
        let action_space = base.action_space().clone();
        let buffer = TransitionBuffer::new(
            config.buffer_capacity,
            base.model().observation_dim(),
            base.action_dim(),
        )?;

        Ok(Self {
            explorer: RandomPolicy::new(action_space.clone(), child_seed(seed, 2)),
            warmed_up: config.warmup_episodes == 0,
            config,
            planner,
            action_space,
            buffer,
            seed,
            episodes: 0,
            total_steps: 0,
            losses: Vec::new(),
            summary: EpisodeSummary::default(),
        })
    }

    /// Assemble model, planner and agent from one experiment description.
    pub fn from_experiment(
        experiment: &ExperimentConfig,
        observation_space: &BoxSpace,
        action_space: BoxSpace,
        objective: Box<dyn Objective>,
    ) -> Result<Self> {
        let seed = experiment.seed;

        let mut model_config = experiment.model.clone();
        model_config.seed = model_config.seed.or(child_seed(seed, 0));
        let model =
            TransitionModel::new(&model_config, observation_space.dim(), action_space.dim())?;

        let mut policy_config = experiment.policy.clone();
        policy_config.seed = policy_config.seed.or(child_seed(seed, 1));
        let base = MpcPolicy::new(model, action_space, objective, &policy_config.mpc)?;
        let planner = CemMpc::new(base, &policy_config)?;

        Self::new(planner, experiment.agent.clone(), seed)
    }

    pub fn planner(&self) -> &CemMpc {
        &self.planner
    }

    pub fn planner_mut(&mut self) -> &mut CemMpc {
        &mut self.planner
    }

    pub fn buffer(&self) -> &TransitionBuffer {
        &self.buffer
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    fn run_episode<E: Environment + ?Sized>(&mut self, env: &mut E, plan: bool) -> Result<()> {
        let reset_seed = child_seed(self.seed, 3).map(|s| s.wrapping_add(self.episodes));
        let (mut observation, _) = env.reset(reset_seed);
        ensure_shape(
            &[self.planner.base().model().observation_dim()],
            observation.shape(),
        )?;

        let mut episode_return = 0.0;
        let mut length = 0;
        while length < self.config.max_episode_length {
            let action = if plan {
                let outcome = self.planner.plan(observation.view())?;
                self.summary.plan_scores.push(outcome.score);
                outcome.action
            } else {
                self.explorer.generate_action(observation.view())?
            };
            let action = self.action_space.clip(action.view());

            let step = env.step(action.view());
            self.buffer
                .push(observation.view(), action.view(), step.observation.view())?;

            episode_return += step.reward;
            length += 1;
            if step.done() {
                break;
            }
            observation = step.observation;
        }

        self.episodes += 1;
        self.total_steps += length as u64;
        self.summary.returns.push(episode_return);
        self.summary.lengths.push(length);
        tracing::debug!(
            episode = self.episodes,
            episode_return,
            length,
            planned = plan,
            "episode finished"
        );
        Ok(())
    }
}

impl Agent for MbrlAgent {
    fn build(&mut self) -> Result<()> {
        self.planner.base_mut().model_mut().build()
    }

    fn interact<E: Environment + ?Sized>(&mut self, env: &mut E) -> Result<()> {
        self.summary = EpisodeSummary::default();
        if !self.warmed_up {
            for _ in 0..self.config.warmup_episodes {
                self.run_episode(env, false)?;
            }
            self.warmed_up = true;
            return Ok(());
        }
        for _ in 0..self.config.episodes_per_iteration {
            self.run_episode(env, true)?;
        }
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        let inputs = self.buffer.inputs();
        let targets = self.buffer.targets();
        self.losses = self
            .planner
            .base_mut()
            .model_mut()
            .fit(inputs.view(), targets.view())?;
        Ok(())
    }

    fn report(&self) -> AgentReport {
        let mut metrics = BTreeMap::new();
        let lengths: Vec<f64> = self.summary.lengths.iter().map(|&l| l as f64).collect();
        if let Some(value) = mean(&self.summary.returns) {
            metrics.insert("mean_return".to_string(), value);
        }
        if let Some(value) = mean(&lengths) {
            metrics.insert("mean_episode_length".to_string(), value);
        }
        if let Some(value) = mean(&self.summary.plan_scores) {
            metrics.insert("mean_plan_score".to_string(), value);
        }
        metrics.insert("buffer_size".to_string(), self.buffer.len() as f64);
        metrics.insert("total_steps".to_string(), self.total_steps as f64);

        AgentReport {
            losses: self.losses.clone(),
            metrics,
        }
    }
}
