//! Regression detection over rolling measurement histories.
//!
//! The detector keeps one [`PerformanceHistory`] per subject in a concurrent
//! map. Ingestion from several threads is safe: each append and eviction runs
//! under the subject's shard lock. Detection copies the metric's history out
//! of the map first and does all statistics on that snapshot.

use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use perfwatch_core::stats::{self, MIN_TREND_POINTS};
use perfwatch_core::{
    PerformanceMeasurement, RegressionResult, RegressionSeverity, SignificanceTest, StatsError,
    TrendAnalysis, TrendDirection,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, RegressionConfig};
use crate::history::{PerformanceHistory, DEFAULT_MAX_HISTORY_SIZE};

/// Why no verdict could be produced for a (subject, metric) pair.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    /// Not enough measurements yet. This is the normal "can't tell yet" state.
    #[error("Not enough history for {subject}[{metric}]: have {available}, need {required}")]
    InsufficientHistory {
        subject: String,
        metric: String,
        available: usize,
        required: usize,
    },

    /// The baseline mean is zero, so a fractional change is undefined.
    #[error("Baseline mean for {subject}[{metric}] is zero")]
    ZeroBaseline { subject: String, metric: String },

    #[error("Statistics error: {0}")]
    Statistics(#[from] StatsError),
}

impl DetectionError {
    pub fn is_insufficient_history(&self) -> bool {
        matches!(self, DetectionError::InsufficientHistory { .. })
    }
}

/// Detects regressions of the newest measurement against its own history.
pub struct RegressionDetector {
    histories: DashMap<String, PerformanceHistory>,
    config: RegressionConfig,
    max_history_size: usize,
}

impl Default for RegressionDetector {
    fn default() -> Self {
        Self::new(RegressionConfig::default())
    }
}

impl RegressionDetector {
    /// Create a detector keeping the default 100 measurements per metric.
    pub fn new(config: RegressionConfig) -> Self {
        Self::with_history_size(config, DEFAULT_MAX_HISTORY_SIZE)
    }

    pub fn with_history_size(config: RegressionConfig, max_history_size: usize) -> Self {
        Self {
            histories: DashMap::new(),
            config,
            max_history_size,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_history_size(config.regression.clone(), config.history.max_size)
    }

    pub fn config(&self) -> &RegressionConfig {
        &self.config
    }

    /// Store a measurement in its subject's history, creating the history on first use.
    ///
    /// NaN and infinite values are logged and dropped so they never reach a
    /// baseline. Returns whether the measurement was stored.
    pub fn add_measurement(&self, measurement: PerformanceMeasurement) -> bool {
        if !measurement.value.is_finite() {
            warn!(
                subject = %measurement.subject,
                metric = %measurement.metric,
                value = measurement.value,
                "Rejected non-finite measurement"
            );
            return false;
        }

        let subject = measurement.subject.clone();
        let metric = measurement.metric.clone();

        // Keyed by subject, so the history's subject always matches
        let mut history = self
            .histories
            .entry(subject.clone())
            .or_insert_with(|| PerformanceHistory::new(subject.clone(), self.max_history_size));
        history.push(measurement);

        debug!(
            subject = %subject,
            metric = %metric,
            stored = history.len(&metric),
            "Stored measurement"
        );
        true
    }

    /// Subjects with at least one measurement, sorted.
    pub fn tracked_subjects(&self) -> Vec<String> {
        let mut subjects: Vec<String> = self.histories.iter().map(|e| e.key().clone()).collect();
        subjects.sort();
        subjects
    }

    /// Metrics recorded for `subject`.
    pub fn tracked_metrics(&self, subject: &str) -> BTreeSet<String> {
        self.histories
            .get(subject)
            .map(|h| h.tracked_metrics())
            .unwrap_or_default()
    }

    /// Copy of the stored measurements for a (subject, metric) pair.
    pub fn history_snapshot(&self, subject: &str, metric: &str) -> Vec<PerformanceMeasurement> {
        self.histories
            .get(subject)
            .map(|h| h.history(metric))
            .unwrap_or_default()
    }

    /// Judge the newest measurement of `(subject, metric)` against the rest of its history.
    ///
    /// The snapshot is ordered by timestamp. The last entry is the current
    /// value and every earlier entry forms the baseline, so the baseline never
    /// contains the point under evaluation. The trend is fitted over the whole
    /// snapshot against position (0, 1, 2, ...), not wall-clock time.
    ///
    /// # Errors
    ///
    /// [`DetectionError::InsufficientHistory`] while fewer than
    /// `minimum_history_samples` measurements exist (an unknown pair counts as
    /// zero). [`DetectionError::ZeroBaseline`] when the baseline mean is zero.
    pub fn detect_regression(
        &self,
        subject: &str,
        metric: &str,
    ) -> Result<RegressionResult, DetectionError> {
        let mut snapshot = self.history_snapshot(subject, metric);
        snapshot.sort_by_key(|m| m.timestamp);
        let required = self.config.minimum_history_samples.max(2);

        let (current, earlier) = match snapshot.split_last() {
            Some(split) if snapshot.len() >= required => split,
            _ => {
                return Err(DetectionError::InsufficientHistory {
                    subject: subject.to_string(),
                    metric: metric.to_string(),
                    available: snapshot.len(),
                    required,
                })
            }
        };
        let values: Vec<f64> = snapshot.iter().map(|m| m.value).collect();
        let baseline_values = &values[..earlier.len()];
        let current_value = current.value;

        let baseline_summary = stats::summarize(baseline_values)?;
        let baseline_mean = baseline_summary.mean;
        if baseline_mean == 0.0 {
            return Err(DetectionError::ZeroBaseline {
                subject: subject.to_string(),
                metric: metric.to_string(),
            });
        }

        // Positive means worse: lower values are assumed better
        let regression_magnitude = (current_value - baseline_mean) / baseline_mean;
        let severity = self.config.classify(regression_magnitude);

        let significance_test =
            self.significance_test(subject, metric, baseline_values, current_value);

        let trend_analysis =
            if self.config.enable_trend_analysis && values.len() >= MIN_TREND_POINTS {
                Some(stats::fit_sequential_trend(&values))
            } else {
                None
            };

        let alerts = generate_alerts(
            severity,
            regression_magnitude,
            significance_test.as_ref(),
            trend_analysis.as_ref(),
        );

        let detected_at = Utc::now();
        let baseline = PerformanceMeasurement::new(
            detected_at - Duration::days(1),
            "baseline",
            metric,
            baseline_mean,
            1.0 - baseline_summary.standard_deviation / baseline_mean,
        )
        .with_metadata("type", "baseline")
        .with_metadata("samples", baseline_summary.sample_size);

        Ok(RegressionResult {
            subject: subject.to_string(),
            metric: metric.to_string(),
            severity,
            regression_magnitude,
            significance_test,
            trend_analysis,
            baseline_summary,
            baseline,
            current: current.clone(),
            alerts,
            detected_at,
        })
    }

    /// Run detection for every pair with enough history.
    ///
    /// Results include pairs without a regression; filter on
    /// [`RegressionResult::has_regression`] if only regressions matter.
    pub fn detect_all_regressions(&self) -> Vec<RegressionResult> {
        let pairs: Vec<(String, String)> = self
            .tracked_subjects()
            .into_iter()
            .flat_map(|subject| {
                self.tracked_metrics(&subject)
                    .into_iter()
                    .map(move |metric| (subject.clone(), metric))
            })
            .collect();

        let mut results = Vec::new();
        for (subject, metric) in pairs {
            match self.detect_regression(&subject, &metric) {
                Ok(result) => results.push(result),
                Err(e) if e.is_insufficient_history() => {}
                Err(e) => {
                    warn!(subject = %subject, metric = %metric, error = %e, "Detection skipped")
                }
            }
        }
        results
    }

    /// Welch test of the baseline against the single current value.
    ///
    /// Failures are logged and reported as `None`; they never block detection.
    fn significance_test(
        &self,
        subject: &str,
        metric: &str,
        baseline_values: &[f64],
        current_value: f64,
    ) -> Option<SignificanceTest> {
        if baseline_values.len() < 2 {
            debug!(subject, metric, "Baseline too small for a significance test");
            return None;
        }

        match stats::compare_two_sample(
            baseline_values,
            &[current_value],
            self.config.significance_level,
        ) {
            Ok(test) => Some(test),
            Err(e) => {
                warn!(subject, metric, error = %e, "Failed to perform statistical test");
                None
            }
        }
    }
}

/// Advisory alert lines for a verdict, escalating in tone with severity.
pub fn generate_alerts(
    severity: RegressionSeverity,
    regression_magnitude: f64,
    significance_test: Option<&SignificanceTest>,
    trend_analysis: Option<&TrendAnalysis>,
) -> Vec<String> {
    let mut alerts = Vec::new();

    match severity {
        RegressionSeverity::Critical => {
            alerts.push("CRITICAL PERFORMANCE REGRESSION DETECTED!".to_string());
            alerts.push(format!(
                "Immediate attention required - performance degraded by {:.1}%",
                regression_magnitude * 100.0
            ));
        }
        RegressionSeverity::Major => {
            alerts.push("Major performance regression detected".to_string());
            alerts.push("Performance monitoring recommended".to_string());
        }
        RegressionSeverity::Moderate => {
            alerts.push("Moderate performance regression detected".to_string());
        }
        RegressionSeverity::Minor => {
            alerts.push("Minor performance regression detected".to_string());
        }
        RegressionSeverity::NoRegression => {}
    }

    if let Some(test) = significance_test.filter(|t| t.is_significant) {
        alerts.push(format!(
            "Regression is statistically significant (p={:.4})",
            test.p_value
        ));
    }

    if trend_analysis.is_some_and(|t| t.direction == TrendDirection::Degrading) {
        alerts.push("Trending performance degradation detected".to_string());
    }

    alerts
}
