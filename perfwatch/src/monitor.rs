//! Fan-out of detected regressions to listeners.

use std::panic::{self, AssertUnwindSafe};

use anyhow::{bail, Result};
use perfwatch_core::{PerformanceMeasurement, RegressionResult, RegressionSeverity};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};

use crate::config::RegressionConfig;
use crate::detector::RegressionDetector;

/// Receives every regression found by a [`RegressionMonitor`].
///
/// Listeners run on the producer's thread. A listener that returns an error
/// or panics is logged and skipped; the others are still notified.
pub trait RegressionListener: Send + Sync {
    fn on_regression(&self, result: &RegressionResult) -> Result<()>;
}

impl<F> RegressionListener for F
where
    F: Fn(&RegressionResult) -> Result<()> + Send + Sync,
{
    fn on_regression(&self, result: &RegressionResult) -> Result<()> {
        self(result)
    }
}

/// Writes each regression and its alerts to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

impl RegressionListener for LogListener {
    fn on_regression(&self, result: &RegressionResult) -> Result<()> {
        let p_value = result.significance_test.as_ref().map(|t| t.p_value);
        if result.severity >= RegressionSeverity::Major {
            warn!(
                subject = %result.subject,
                metric = %result.metric,
                severity = %result.severity,
                magnitude = result.regression_magnitude,
                p_value = ?p_value,
                "PERFORMANCE REGRESSION DETECTED"
            );
        } else {
            info!(
                subject = %result.subject,
                metric = %result.metric,
                severity = %result.severity,
                magnitude = result.regression_magnitude,
                p_value = ?p_value,
                "Performance regression detected"
            );
        }

        for alert in &result.alerts {
            info!(subject = %result.subject, metric = %result.metric, "{}", alert);
        }
        Ok(())
    }
}

/// Hands regressions to a bounded channel without blocking the producer.
///
/// A full or closed channel is reported as a listener failure.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: mpsc::Sender<RegressionResult>,
}

impl ChannelListener {
    pub fn new(sender: mpsc::Sender<RegressionResult>) -> Self {
        Self { sender }
    }

    /// Create a listener together with the receiving end of a channel of `capacity`.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RegressionResult>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender), receiver)
    }
}

impl RegressionListener for ChannelListener {
    fn on_regression(&self, result: &RegressionResult) -> Result<()> {
        match self.sender.try_send(result.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => bail!("regression channel is full"),
            Err(TrySendError::Closed(_)) => bail!("regression channel is closed"),
        }
    }
}

/// Runs detection on every insert and notifies listeners of regressions.
pub struct RegressionMonitor {
    detector: RegressionDetector,
    listeners: Vec<Box<dyn RegressionListener>>,
}

impl RegressionMonitor {
    pub fn new(config: RegressionConfig) -> Self {
        Self::with_detector(RegressionDetector::new(config))
    }

    pub fn with_detector(detector: RegressionDetector) -> Self {
        Self {
            detector,
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: impl RegressionListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn detector(&self) -> &RegressionDetector {
        &self.detector
    }

    /// Store `measurement`, then check its (subject, metric) pair.
    ///
    /// Returns the result when it is a regression, after every listener has
    /// been notified. A rejected measurement triggers no detection.
    pub fn add_measurement(
        &self,
        measurement: PerformanceMeasurement,
    ) -> Option<RegressionResult> {
        let subject = measurement.subject.clone();
        let metric = measurement.metric.clone();
        if !self.detector.add_measurement(measurement) {
            return None;
        }

        match self.detector.detect_regression(&subject, &metric) {
            Ok(result) if result.has_regression() => {
                self.notify(&result);
                Some(result)
            }
            Ok(_) => None,
            Err(e) if e.is_insufficient_history() => None,
            Err(e) => {
                warn!(subject = %subject, metric = %metric, error = %e, "Detection skipped");
                None
            }
        }
    }

    /// Every (subject, metric) verdict currently available, regressions or not.
    pub fn all_regressions(&self) -> Vec<RegressionResult> {
        self.detector.detect_all_regressions()
    }

    fn notify(&self, result: &RegressionResult) {
        for (index, listener) in self.listeners.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_regression(result)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    listener = index,
                    subject = %result.subject,
                    metric = %result.metric,
                    error = %e,
                    "Regression listener failed"
                ),
                Err(_) => warn!(
                    listener = index,
                    subject = %result.subject,
                    metric = %result.metric,
                    "Regression listener panicked"
                ),
            }
        }
    }
}
