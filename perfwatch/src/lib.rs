//! perfwatch: rolling-history performance regression detection
//!
//! This library keeps a bounded history of measurements per subject and
//! metric, judges each new measurement against the distribution of the ones
//! before it, and fans detected regressions out to listeners.

pub mod cli;
pub mod config;
pub mod detector;
pub mod history;
pub mod input;
pub mod monitor;

// Re-export core types for convenience
pub use perfwatch_core::stats;
pub use perfwatch_core::{
    generate_report, JsonReporter, PerformanceMeasurement, RegressionResult, RegressionSeverity,
    ReportError, Reporter, SignificanceTest, StatisticalSummary, TerminalReporter, TrendAnalysis,
    TrendDirection,
};

// Re-export main types from this crate
pub use cli::{Cli, OutputFormat};
pub use config::{Config, ConfigError, HistoryConfig, RegressionConfig};
pub use detector::{generate_alerts, DetectionError, RegressionDetector};
pub use history::{HistoryError, PerformanceHistory, DEFAULT_MAX_HISTORY_SIZE};
pub use input::{parse_measurements, read_measurements};
pub use monitor::{ChannelListener, LogListener, RegressionListener, RegressionMonitor};
