//! Console logging backend.

use super::MetricLogger;
use std::collections::BTreeMap;

/// Logger that prints metrics through `tracing`.
pub struct ConsoleLogger;

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self
    }
}

impl MetricLogger for ConsoleLogger {
    fn log_scalar(&self, name: &str, value: f64, step: u64) {
        tracing::info!("Step {}: {} = {:.4}", step, name, value);
    }

    fn log_metrics(&self, metrics: &BTreeMap<String, f64>, step: u64) {
        // One line per step; BTreeMap keeps keys sorted
        let body = metrics
            .iter()
            .map(|(key, value)| format!("{key}={value:.4}"))
            .collect::<Vec<_>>()
            .join(", ");

        tracing::info!("Step {}: {}", step, body);
    }

    fn log_group(&self, group: &str, values: &[f64], phase: u64) {
        // Summarize instead of printing every epoch
        if let (Some(first), Some(last)) = (values.first(), values.last()) {
            tracing::info!(
                group,
                phase,
                epochs = values.len(),
                "{} first={:.4} last={:.4}",
                group,
                first,
                last
            );
        }
    }
}
