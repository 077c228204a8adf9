//! Metric logger traits and composites.

use std::collections::BTreeMap;

/// Trait for logging metrics to various backends.
pub trait MetricLogger: Send + Sync {
    /// Log a scalar value (e.g. mean return, plan score).
    fn log_scalar(&self, name: &str, value: f64, step: u64);

    /// Log a set of metrics collected in a map.
    fn log_metrics(&self, metrics: &BTreeMap<String, f64>, step: u64);

    /// Log a sequence of values under one group, indexed by position.
    ///
    /// `phase` distinguishes repeated sequences (e.g. the per-epoch model
    /// losses of each training iteration). Each value lands under
    /// `{group}/phase_{phase}` at step = its index.
    fn log_group(&self, group: &str, values: &[f64], phase: u64) {
        let name = format!("{group}/phase_{phase}");
        for (i, value) in values.iter().enumerate() {
            self.log_scalar(&name, *value, i as u64);
        }
    }

    /// Close the logger and flush any pending writes.
    fn close(&self) {}
}

/// A logger that does nothing (default).
pub struct NoOpLogger;

impl MetricLogger for NoOpLogger {
    fn log_scalar(&self, _name: &str, _value: f64, _step: u64) {}
    fn log_metrics(&self, _metrics: &BTreeMap<String, f64>, _step: u64) {}
    fn log_group(&self, _group: &str, _values: &[f64], _phase: u64) {}
}

/// A composite logger that dispatches to multiple backends.
pub struct CompositeLogger {
    loggers: Vec<Box<dyn MetricLogger>>,
}

impl CompositeLogger {
    pub fn new(loggers: Vec<Box<dyn MetricLogger>>) -> Self {
        Self { loggers }
    }

    pub fn add(&mut self, logger: Box<dyn MetricLogger>) {
        self.loggers.push(logger);
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl MetricLogger for CompositeLogger {
    fn log_scalar(&self, name: &str, value: f64, step: u64) {
        for logger in &self.loggers {
            logger.log_scalar(name, value, step);
        }
    }

    fn log_metrics(&self, metrics: &BTreeMap<String, f64>, step: u64) {
        for logger in &self.loggers {
            logger.log_metrics(metrics, step);
        }
    }

    fn log_group(&self, group: &str, values: &[f64], phase: u64) {
        for logger in &self.loggers {
            logger.log_group(group, values, phase);
        }
    }

    fn close(&self) {
        for logger in &self.loggers {
            logger.close();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Captures every scalar it receives, for assertions in tests.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingLogger {
        pub(crate) records: Arc<Mutex<Vec<(String, f64, u64)>>>,
    }

    impl RecordingLogger {
        pub(crate) fn names(&self) -> Vec<String> {
            self.records
                .lock()
                .unwrap()
                .iter()
                .map(|(n, _, _)| n.clone())
                .collect()
        }
    }

    impl MetricLogger for RecordingLogger {
        fn log_scalar(&self, name: &str, value: f64, step: u64) {
            self.records
                .lock()
                .unwrap()
                .push((name.to_string(), value, step));
        }

        fn log_metrics(&self, metrics: &BTreeMap<String, f64>, step: u64) {
            for (name, value) in metrics {
                self.log_scalar(name, *value, step);
            }
        }
    }

    #[test]
    fn test_log_group_indexes_by_position() {
        let recorder = RecordingLogger::default();
        recorder.log_group("model_training_losses", &[0.5, 0.25], 3);

        let records = recorder.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], ("model_training_losses/phase_3".to_string(), 0.5, 0));
        assert_eq!(records[1], ("model_training_losses/phase_3".to_string(), 0.25, 1));
    }

    #[test]
    fn test_composite_fans_out() {
        let a = RecordingLogger::default();
        let b = RecordingLogger::default();
        let composite = CompositeLogger::new(vec![Box::new(a.clone()), Box::new(b.clone())]);

        let mut metrics = BTreeMap::new();
        metrics.insert("mean_return".to_string(), -12.0);
        composite.log_metrics(&metrics, 7);
        composite.log_group("losses", &[1.0], 0);

        assert_eq!(a.names(), vec!["mean_return", "losses/phase_0"]);
        assert_eq!(b.names(), a.names());
    }
}
