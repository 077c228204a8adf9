//! Utility functions.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Seeded generator, or one drawn from OS entropy when `seed` is `None`.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Derive the seed of the `index`-th child component from a parent seed.
pub fn child_seed(seed: Option<u64>, index: u64) -> Option<u64> {
    seed.map(|s| s.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(index + 1))
}

/// Format duration in human-readable form
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 {
        return "0s".to_string();
    }

    let secs = seconds as u64;
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;

    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}
