//! Built-in continuous-control environments for simba.
//!
//! Each environment also exposes its reward as a
//! [`simba::env::RewardFunction`], so planners can score simulated
//! trajectories with it:
//! - `PointMass` - 1-D double integrator, regulate to the origin
//! - `Pendulum` - Torque-limited swing-up

mod pendulum;
mod point_mass;

pub use pendulum::Pendulum;
pub use point_mass::PointMass;

/// Names accepted by the CLI, with a one-line description each
pub const ENVIRONMENTS: [(&str, &str); 2] = [
    ("point_mass", "1-D double integrator (obs 2, action 1)"),
    ("pendulum", "Pendulum swing-up (obs 3, action 1)"),
];
