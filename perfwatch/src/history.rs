//! Bounded per-metric measurement history for one subject.

use std::collections::{BTreeSet, HashMap};

use perfwatch_core::PerformanceMeasurement;
use thiserror::Error;
use tracing::debug;

/// Default number of measurements kept per metric.
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistoryError {
    #[error("Subject mismatch: history tracks '{expected}', got '{actual}'")]
    SubjectMismatch { expected: String, actual: String },

    #[error("Non-finite value {value} for metric '{metric}'")]
    NonFiniteValue { metric: String, value: f64 },
}

/// Rolling measurement history for a single subject, keyed by metric name.
///
/// Each metric keeps at most `max_size` entries. Measurements may arrive out
/// of order; once a metric overflows, its list is sorted by timestamp and the
/// oldest entries are dropped.
#[derive(Debug, Clone)]
pub struct PerformanceHistory {
    subject: String,
    metrics: HashMap<String, Vec<PerformanceMeasurement>>,
    max_size: usize,
}

impl PerformanceHistory {
    /// Create an empty history. A `max_size` of zero is raised to one.
    pub fn new(subject: impl Into<String>, max_size: usize) -> Self {
        Self {
            subject: subject.into(),
            metrics: HashMap::new(),
            max_size: max_size.max(1),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Append a measurement, evicting the oldest entries on overflow.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::SubjectMismatch`] if the measurement belongs to
    /// another subject and [`HistoryError::NonFiniteValue`] for a NaN or
    /// infinite value.
    pub fn add_measurement(
        &mut self,
        measurement: PerformanceMeasurement,
    ) -> Result<(), HistoryError> {
        if measurement.subject != self.subject {
            return Err(HistoryError::SubjectMismatch {
                expected: self.subject.clone(),
                actual: measurement.subject,
            });
        }
        if !measurement.value.is_finite() {
            return Err(HistoryError::NonFiniteValue {
                metric: measurement.metric,
                value: measurement.value,
            });
        }

        self.push(measurement);
        Ok(())
    }

    /// Append without checks. The caller guarantees the subject matches and
    /// the value is finite.
    pub(crate) fn push(&mut self, measurement: PerformanceMeasurement) {
        let max_size = self.max_size;
        let entries = self.metrics.entry(measurement.metric.clone()).or_default();
        entries.push(measurement);

        if entries.len() > max_size {
            entries.sort_by_key(|m| m.timestamp);
            let excess = entries.len() - max_size;
            entries.drain(..excess);
            debug!(
                subject = %self.subject,
                evicted = excess,
                oldest_kept = %entries[0].timestamp,
                "Evicted oldest measurements"
            );
        }
    }

    /// Snapshot copy of one metric's measurements, in storage order.
    pub fn history(&self, metric: &str) -> Vec<PerformanceMeasurement> {
        self.metrics.get(metric).cloned().unwrap_or_default()
    }

    /// Number of stored measurements for `metric`.
    pub fn len(&self, metric: &str) -> usize {
        self.metrics.get(metric).map_or(0, Vec::len)
    }

    /// True if no metric has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Metric names with at least one measurement, sorted.
    pub fn tracked_metrics(&self) -> BTreeSet<String> {
        self.metrics.keys().cloned().collect()
    }

    pub fn has_enough_history(&self, metric: &str, minimum: usize) -> bool {
        self.len(metric) >= minimum
    }

    /// The measurement with the latest timestamp, if any.
    pub fn latest_measurement(&self, metric: &str) -> Option<&PerformanceMeasurement> {
        self.metrics
            .get(metric)?
            .iter()
            .max_by_key(|m| m.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn measurement(minutes: i64, metric: &str, value: f64) -> PerformanceMeasurement {
        PerformanceMeasurement::new(at(minutes), "jackson", metric, value, 1.0)
    }

    #[test]
    fn test_new_history_is_empty() {
        let history = PerformanceHistory::new("jackson", 10);
        assert!(history.is_empty());
        assert_eq!(history.subject(), "jackson");
        assert_eq!(history.len("latency"), 0);
        assert!(history.history("latency").is_empty());
        assert!(history.latest_measurement("latency").is_none());
    }

    #[test]
    fn test_add_and_read_back() {
        let mut history = PerformanceHistory::new("jackson", 10);
        history.add_measurement(measurement(0, "latency", 1.0)).unwrap();
        history.add_measurement(measurement(1, "latency", 2.0)).unwrap();
        history.add_measurement(measurement(1, "size", 512.0)).unwrap();

        assert_eq!(history.len("latency"), 2);
        assert_eq!(history.len("size"), 1);
        let metrics: Vec<_> = history.tracked_metrics().into_iter().collect();
        assert_eq!(metrics, vec!["latency", "size"]);
        assert!(history.has_enough_history("latency", 2));
        assert!(!history.has_enough_history("size", 2));
    }

    #[test]
    fn test_subject_mismatch() {
        let mut history = PerformanceHistory::new("jackson", 10);
        let other = PerformanceMeasurement::new(at(0), "gson", "latency", 1.0, 1.0);

        let result = history.add_measurement(other);

        assert_eq!(
            result,
            Err(HistoryError::SubjectMismatch {
                expected: "jackson".to_string(),
                actual: "gson".to_string(),
            })
        );
        assert!(history.is_empty());
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let mut history = PerformanceHistory::new("jackson", 10);

        let result = history.add_measurement(measurement(0, "latency", f64::INFINITY));
        assert_eq!(
            result,
            Err(HistoryError::NonFiniteValue {
                metric: "latency".to_string(),
                value: f64::INFINITY,
            })
        );
        assert!(matches!(
            history.add_measurement(measurement(1, "latency", f64::NAN)),
            Err(HistoryError::NonFiniteValue { .. })
        ));
        assert!(history.is_empty());
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let mut history = PerformanceHistory::new("jackson", 3);
        for minute in 0..5 {
            history
                .add_measurement(measurement(minute, "latency", minute as f64))
                .unwrap();
        }

        let values: Vec<f64> = history.history("latency").iter().map(|m| m.value).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_eviction_sorts_out_of_order_arrivals() {
        let mut history = PerformanceHistory::new("jackson", 3);
        history.add_measurement(measurement(10, "latency", 10.0)).unwrap();
        history.add_measurement(measurement(0, "latency", 0.0)).unwrap();
        history.add_measurement(measurement(20, "latency", 20.0)).unwrap();
        // Overflow: the entry from minute 0 is the oldest even though it arrived second
        history.add_measurement(measurement(5, "latency", 5.0)).unwrap();

        let values: Vec<f64> = history.history("latency").iter().map(|m| m.value).collect();
        assert_eq!(values, vec![5.0, 10.0, 20.0]);
    }

    #[test]
    fn test_latest_measurement_by_timestamp() {
        let mut history = PerformanceHistory::new("jackson", 10);
        history.add_measurement(measurement(30, "latency", 3.0)).unwrap();
        history.add_measurement(measurement(10, "latency", 1.0)).unwrap();

        let latest = history.latest_measurement("latency").unwrap();
        assert_eq!(latest.value, 3.0);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let history = PerformanceHistory::new("jackson", 0);
        assert_eq!(history.max_size(), 1);
    }
}
