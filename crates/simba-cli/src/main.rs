//! Simba CLI
//!
//! Command-line interface for model-based RL experiments.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use simba::prelude::*;
use simba_envs::{Pendulum, PointMass, ENVIRONMENTS};

#[derive(Parser)]
#[command(name = "simba")]
#[command(version, about = "Simba - Model-based RL with learned dynamics and CEM planning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model-based agent
    Train {
        /// Environment name (overrides the config file)
        env: Option<String>,

        /// JSON experiment configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Training iterations (0 runs until interrupted)
        #[arg(long)]
        iterations: Option<u64>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Log the agent report every N iterations (0 disables)
        #[arg(long)]
        log_frequency: Option<u64>,

        /// Directory for TensorBoard event files
        #[cfg(feature = "tensorboard")]
        #[arg(long)]
        logdir: Option<PathBuf>,
    },

    /// List available environments
    List,

    /// Demo: Run an environment with random actions
    Demo {
        /// Environment name
        #[arg(default_value = "pendulum")]
        env: String,

        /// Number of steps
        #[arg(long, default_value = "100")]
        steps: usize,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            env,
            config,
            iterations,
            seed,
            log_frequency,
            #[cfg(feature = "tensorboard")]
            logdir,
        } => {
            let mut experiment = match config {
                Some(path) => ExperimentConfig::from_json_file(&path)?,
                None => ExperimentConfig::default(),
            };
            if let Some(env) = env {
                experiment.environment = env;
            }
            if let Some(iterations) = iterations {
                experiment.trainer.max_iterations = iterations;
            }
            if seed.is_some() {
                experiment.seed = seed;
            }
            if let Some(log_frequency) = log_frequency {
                experiment.trainer.log_frequency = log_frequency;
            }

            #[allow(unused_mut)]
            let mut logger = CompositeLogger::new(vec![Box::new(ConsoleLogger::new())]);
            #[cfg(feature = "tensorboard")]
            if let Some(dir) = logdir {
                logger.add(Box::new(TensorBoardLogger::new(dir)));
            }

            train(&experiment, Box::new(logger))?;
        }
        Commands::List => {
            list_envs();
        }
        Commands::Demo { env, steps } => {
            demo(&env, steps)?;
        }
    }

    Ok(())
}

fn train(experiment: &ExperimentConfig, logger: Box<dyn MetricLogger>) -> Result<()> {
    tracing::info!(
        env = %experiment.environment,
        model = %experiment.model.kind,
        horizon = experiment.policy.mpc.horizon,
        iterations = experiment.trainer.max_iterations,
        "Starting training"
    );

    match experiment.environment.as_str() {
        "point_mass" => train_on(PointMass::new(), PointMass::new(), experiment, logger),
        "pendulum" => train_on(Pendulum::new(), Pendulum::new(), experiment, logger),
        other => bail!("unknown environment '{other}'; run `simba list`"),
    }
}

fn train_on<E, R>(
    env: E,
    reward: R,
    experiment: &ExperimentConfig,
    logger: Box<dyn MetricLogger>,
) -> Result<()>
where
    E: Environment,
    R: RewardFunction + 'static,
{
    let agent = MbrlAgent::from_experiment(
        experiment,
        &env.observation_space(),
        env.action_space(),
        Box::new(RewardObjective::new(reward)),
    )?;
    let model = agent.planner().base().model();
    tracing::info!(
        observation_dim = model.observation_dim(),
        action_dim = model.action_dim(),
        "Created transition model"
    );

    let mut trainer = RlTrainer::new(
        agent,
        EpisodeStats::new(ClipAction::new(env)),
        experiment.trainer.clone(),
    )
    .with_logger(logger);
    trainer.train()?;

    let report = trainer.agent().report();
    println!("Training complete after {} iterations", trainer.iteration());
    for (name, value) in &report.metrics {
        println!("  {name:<20} {value:.4}");
    }
    Ok(())
}

fn demo(env_name: &str, steps: usize) -> Result<()> {
    tracing::info!(env = env_name, steps, "Running demo");

    match env_name {
        "point_mass" => run_demo(PointMass::new(), steps),
        "pendulum" => run_demo(Pendulum::new(), steps),
        other => bail!("unknown environment '{other}'; run `simba list`"),
    }
}

fn run_demo<E: Environment>(env: E, steps: usize) -> Result<()> {
    let mut env = EpisodeStats::new(ClipAction::new(env));
    let mut policy = RandomPolicy::new(env.action_space(), Some(42));
    let (mut observation, _) = env.reset(Some(42));

    for step in 0..steps {
        let action = policy.generate_action(observation.view())?;
        let result = env.step(action.view());

        if step % 10 == 0 {
            if let Some(render) = env.render() {
                println!("Step {}: {}", step, render);
            }
        }

        observation = if result.done() {
            if let Some(ret) = result.info.episode_return {
                tracing::info!(step, episode_return = ret, "Episode ended, resetting");
            }
            env.reset(None).0
        } else {
            result.observation
        };
    }

    println!("Demo finished after {} steps", steps);
    Ok(())
}

fn list_envs() {
    println!("Available environments:");
    println!();
    for (name, description) in ENVIRONMENTS {
        println!("  {name:<12} {description}");
    }
    println!();
    println!("Train with: simba train <env> [--config experiment.json]");
}
