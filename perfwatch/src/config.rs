//! Configuration loading for perfwatch.
//!
//! Supports loading configuration from TOML files, with sensible defaults
//! for all settings.

use anyhow::{Context, Result};
use perfwatch_core::RegressionSeverity;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Severity thresholds must be strictly increasing, got minor={minor}, moderate={moderate}, major={major}, critical={critical}")]
    ThresholdOrder {
        minor: f64,
        moderate: f64,
        major: f64,
        critical: f64,
    },

    #[error("Threshold {name} must be positive and finite, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Significance level must be between 0 and 1 (exclusive), got {0}")]
    SignificanceLevel(f64),

    #[error("minimum_history_samples must be at least 2, got {0}")]
    MinimumHistory(usize),

    #[error("history max_size must be at least minimum_history_samples ({minimum}), got {max_size}")]
    HistoryCapacity { max_size: usize, minimum: usize },
}

/// Top-level configuration for perfwatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Regression detection policy.
    pub regression: RegressionConfig,
    /// Rolling history settings.
    pub history: HistoryConfig,
}

/// Thresholds and switches for regression detection.
///
/// Thresholds are fractional regression magnitudes: 0.05 means 5% worse
/// than the baseline mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    pub minor_threshold: f64,
    pub moderate_threshold: f64,
    pub major_threshold: f64,
    pub critical_threshold: f64,
    /// Alpha for the significance test.
    pub significance_level: f64,
    /// Measurements needed before a (subject, metric) pair is evaluated.
    pub minimum_history_samples: usize,
    pub enable_trend_analysis: bool,
}

/// Rolling history settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Measurements kept per (subject, metric) before the oldest are evicted.
    pub max_size: usize,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            minor_threshold: 0.05,
            moderate_threshold: 0.10,
            major_threshold: 0.20,
            critical_threshold: 0.50,
            significance_level: 0.05,
            minimum_history_samples: 5,
            enable_trend_analysis: true,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_size: 100 }
    }
}

impl RegressionConfig {
    /// Check that thresholds increase strictly and every knob is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [
            ("minor_threshold", self.minor_threshold),
            ("moderate_threshold", self.moderate_threshold),
            ("major_threshold", self.major_threshold),
            ("critical_threshold", self.critical_threshold),
        ];
        for (name, value) in thresholds {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }

        if !(self.minor_threshold < self.moderate_threshold
            && self.moderate_threshold < self.major_threshold
            && self.major_threshold < self.critical_threshold)
        {
            return Err(ConfigError::ThresholdOrder {
                minor: self.minor_threshold,
                moderate: self.moderate_threshold,
                major: self.major_threshold,
                critical: self.critical_threshold,
            });
        }

        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(ConfigError::SignificanceLevel(self.significance_level));
        }

        if self.minimum_history_samples < 2 {
            return Err(ConfigError::MinimumHistory(self.minimum_history_samples));
        }

        Ok(())
    }

    /// Map a signed regression magnitude to a severity.
    ///
    /// Improvements (magnitude <= 0) are never flagged. Everything else is
    /// bucketed by the first threshold it falls below.
    pub fn classify(&self, regression_magnitude: f64) -> RegressionSeverity {
        if regression_magnitude.is_nan() || regression_magnitude <= 0.0 {
            return RegressionSeverity::NoRegression;
        }

        let magnitude = regression_magnitude.abs();
        if magnitude < self.minor_threshold {
            RegressionSeverity::NoRegression
        } else if magnitude < self.moderate_threshold {
            RegressionSeverity::Minor
        } else if magnitude < self.major_threshold {
            RegressionSeverity::Moderate
        } else if magnitude < self.critical_threshold {
            RegressionSeverity::Major
        } else {
            RegressionSeverity::Critical
        }
    }
}

/// Default configuration file name.
const DEFAULT_CONFIG_FILE: &str = ".perfwatch.toml";

impl Config {
    /// Check every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.regression.validate()?;
        if self.history.max_size < self.regression.minimum_history_samples {
            return Err(ConfigError::HistoryCapacity {
                max_size: self.history.max_size,
                minimum: self.regression.minimum_history_samples,
            });
        }
        Ok(())
    }

    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from the default file (`.perfwatch.toml`) or use defaults.
    ///
    /// If the file doesn't exist, default configuration is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be parsed.
    pub fn load_or_default() -> Result<Config> {
        let path = Path::new(DEFAULT_CONFIG_FILE);

        if path.exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from the specified path, or try the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the specified file cannot be read or parsed.
    pub fn load_from(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(p) => Self::load(p),
            None => Self::load_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.regression.minor_threshold, 0.05);
        assert_eq!(config.regression.moderate_threshold, 0.10);
        assert_eq!(config.regression.major_threshold, 0.20);
        assert_eq!(config.regression.critical_threshold, 0.50);
        assert_eq!(config.regression.significance_level, 0.05);
        assert_eq!(config.regression.minimum_history_samples, 5);
        assert!(config.regression.enable_trend_analysis);
        assert_eq!(config.history.max_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_config() {
        let toml_content = r#"
[regression]
minimum_history_samples = 10

[history]
max_size = 50
"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();

        // Overridden values
        assert_eq!(config.regression.minimum_history_samples, 10);
        assert_eq!(config.history.max_size, 50);

        // Default values
        assert_eq!(config.regression.minor_threshold, 0.05);
        assert!(config.regression.enable_trend_analysis);
    }

    #[test]
    fn test_load_full_config() {
        let toml_content = r#"
[regression]
minor_threshold = 0.02
moderate_threshold = 0.04
major_threshold = 0.08
critical_threshold = 0.16
significance_level = 0.01
minimum_history_samples = 8
enable_trend_analysis = false

[history]
max_size = 250
"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.regression.minor_threshold, 0.02);
        assert_eq!(config.regression.moderate_threshold, 0.04);
        assert_eq!(config.regression.major_threshold, 0.08);
        assert_eq!(config.regression.critical_threshold, 0.16);
        assert_eq!(config.regression.significance_level, 0.01);
        assert_eq!(config.regression.minimum_history_samples, 8);
        assert!(!config.regression.enable_trend_analysis);
        assert_eq!(config.history.max_size, 250);
    }

    #[test]
    fn test_load_rejects_unordered_thresholds() {
        let toml_content = r#"
[regression]
minor_threshold = 0.30
"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let result = Config::load(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"this is not valid toml {{{{").unwrap();

        let result = Config::load(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_errors() {
        let mut config = RegressionConfig {
            significance_level: 1.0,
            ..RegressionConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::SignificanceLevel(1.0)));

        config.significance_level = 0.05;
        config.minimum_history_samples = 1;
        assert_eq!(config.validate(), Err(ConfigError::MinimumHistory(1)));

        config.minimum_history_samples = 5;
        config.critical_threshold = f64::INFINITY;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold {
                name: "critical_threshold",
                ..
            })
        ));

        let full = Config {
            regression: RegressionConfig::default(),
            history: HistoryConfig { max_size: 3 },
        };
        assert!(matches!(
            full.validate(),
            Err(ConfigError::HistoryCapacity { max_size: 3, minimum: 5 })
        ));
    }

    #[test]
    fn test_classify_buckets() {
        let config = RegressionConfig::default();

        assert_eq!(config.classify(0.0), RegressionSeverity::NoRegression);
        assert_eq!(config.classify(0.049), RegressionSeverity::NoRegression);
        assert_eq!(config.classify(0.05), RegressionSeverity::Minor);
        assert_eq!(config.classify(0.10), RegressionSeverity::Moderate);
        assert_eq!(config.classify(0.30), RegressionSeverity::Major);
        assert_eq!(config.classify(0.50), RegressionSeverity::Critical);
        assert_eq!(config.classify(5.0), RegressionSeverity::Critical);
    }

    #[test]
    fn test_classify_never_flags_improvement() {
        let config = RegressionConfig::default();

        assert_eq!(config.classify(-0.05), RegressionSeverity::NoRegression);
        assert_eq!(config.classify(-0.9), RegressionSeverity::NoRegression);
        assert_eq!(config.classify(f64::NAN), RegressionSeverity::NoRegression);
    }

    #[test]
    fn test_classify_is_monotonic() {
        let config = RegressionConfig::default();
        let mut previous = RegressionSeverity::NoRegression;

        for step in -100..=200 {
            let severity = config.classify(step as f64 * 0.005);
            assert!(severity >= previous, "severity dropped at step {}", step);
            previous = severity;
        }
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.regression, parsed.regression);
        assert_eq!(config.history, parsed.history);
    }
}
