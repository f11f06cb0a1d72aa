//! Command-line interface for perfwatch.

use crate::config::Config;
use clap::{Parser, ValueEnum};
use perfwatch_core::RegressionSeverity;
use std::path::PathBuf;

/// How the final report is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Colored table
    #[default]
    Terminal,
    /// Plain-text report grouped by severity
    Plain,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "perfwatch")]
#[command(about = "Detect performance regressions in a stream of measurements")]
#[command(version)]
pub struct Cli {
    /// JSON-lines file of measurements, one object per line
    #[arg(short, long)]
    pub input: PathBuf,

    /// Path to config file (defaults to .perfwatch.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Measurements needed before a subject/metric pair is evaluated
    #[arg(long)]
    pub minimum_history_samples: Option<usize>,

    /// Alpha for the significance test (0.0-1.0)
    #[arg(long)]
    pub significance_level: Option<f64>,

    /// Skip trend analysis
    #[arg(long)]
    pub no_trend: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Terminal)]
    pub format: OutputFormat,

    /// Exit with a failure status when any result reaches this severity
    #[arg(long, value_parser = parse_severity)]
    pub fail_on: Option<RegressionSeverity>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_severity(value: &str) -> Result<RegressionSeverity, String> {
    value.parse()
}

impl Cli {
    /// Apply CLI overrides to the configuration.
    ///
    /// CLI arguments take precedence over config file values.
    pub fn apply_to_config(&self, config: &mut Config) {
        if let Some(minimum) = self.minimum_history_samples {
            config.regression.minimum_history_samples = minimum;
        }

        if let Some(significance_level) = self.significance_level {
            config.regression.significance_level = significance_level;
        }

        if self.no_trend {
            config.regression.enable_trend_analysis = false;
        }
    }

    /// True if any result is at or above the `--fail-on` severity.
    pub fn should_fail(&self, severities: impl IntoIterator<Item = RegressionSeverity>) -> bool {
        match self.fail_on {
            Some(threshold) => severities.into_iter().any(|s| s >= threshold),
            None => false,
        }
    }
}
