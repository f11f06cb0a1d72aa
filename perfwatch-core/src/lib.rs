//! Core types and statistics for perfwatch.
//!
//! This crate holds the stateless statistics engine, the measurement and
//! regression result types shared with the `perfwatch` detector, and the
//! reporters that render results for humans and machines.

pub mod measurement;
pub mod regression;
pub mod report;
pub mod stats;

// Re-export main types for convenience
pub use measurement::PerformanceMeasurement;
pub use regression::{RegressionResult, RegressionSeverity};
pub use report::{generate_report, JsonReporter, ReportError, Reporter, TerminalReporter};
pub use stats::{
    ConfidenceInterval, DataQuality, EffectMagnitude, SignificanceTest, StatisticalSummary,
    StatisticalTest, StatsError, TTestKind, TrendAnalysis, TrendDirection, WelchTTest,
};
