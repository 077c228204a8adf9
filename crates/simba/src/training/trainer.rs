//! Main model-based RL trainer.

use super::config::TrainerConfig;
use crate::agents::{Agent, AgentReport};
use crate::env::Environment;
use crate::log::{MetricLogger, NoOpLogger};
use crate::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

/// Group under which per-epoch model losses are logged
pub const MODEL_LOSS_GROUP: &str = "model_training_losses";

/// Alternates `interact` and `update` on an agent and logs its reports.
pub struct RlTrainer<A: Agent, E: Environment> {
    /// Configuration
    config: TrainerConfig,
    agent: A,
    environment: E,
    logger: Box<dyn MetricLogger>,
    /// Completed iterations
    iteration: u64,
    /// Progress bar
    progress: Option<ProgressBar>,
}

impl<A: Agent, E: Environment> RlTrainer<A, E> {
    /// Create a trainer that discards metrics until a logger is attached
    pub fn new(agent: A, environment: E, config: TrainerConfig) -> Self {
        let progress = config.show_progress.then(|| progress_bar(config.max_iterations));

        Self {
            config,
            agent,
            environment,
            logger: Box::new(NoOpLogger),
            iteration: 0,
            progress,
        }
    }

    /// Attach a metric logger
    pub fn with_logger(mut self, logger: Box<dyn MetricLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn into_agent(self) -> A {
        self.agent
    }

    /// Run the training loop.
    ///
    /// Runs `max_iterations` iterations, or forever when it is `0`. The
    /// first error from the agent stops training.
    pub fn train(&mut self) -> Result<()> {
        let start = Instant::now();
        self.agent.build()?;

        while self.config.max_iterations == 0 || self.iteration < self.config.max_iterations {
            tracing::info!(iteration = self.iteration, "Training iteration");
            self.agent.interact(&mut self.environment)?;
            self.agent.update()?;

            let log_frequency = self.config.log_frequency;
            if log_frequency > 0 && self.iteration % log_frequency == 0 {
                self.log(&self.agent.report(), self.iteration);
            }

            self.iteration += 1;
            if let Some(ref pb) = self.progress {
                pb.set_position(self.iteration);
                let report = self.agent.report();
                if let Some(ret) = report.metrics.get("mean_return") {
                    pb.set_message(format!("Return: {ret:.2}"));
                }
            }
        }

        if let Some(ref pb) = self.progress {
            pb.finish_with_message("Training complete");
        }
        self.logger.close();
        tracing::info!(
            iterations = self.iteration,
            elapsed = %crate::utils::format_duration(start.elapsed().as_secs_f64()),
            "Training finished"
        );
        Ok(())
    }

    /// Losses go to one group indexed by epoch; everything else is a scalar
    /// at `iteration`.
    fn log(&self, report: &AgentReport, iteration: u64) {
        let losses: Vec<f64> = report.losses.iter().map(|&l| l as f64).collect();
        if !losses.is_empty() {
            self.logger.log_group(MODEL_LOSS_GROUP, &losses, iteration);
        }
        self.logger.log_metrics(&report.metrics, iteration);
    }
}

fn progress_bar(max_iterations: u64) -> ProgressBar {
    if max_iterations == 0 {
        return ProgressBar::new_spinner();
    }
    let pb = ProgressBar::new(max_iterations);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
