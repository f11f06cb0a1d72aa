//! Stateless statistics over a fixed sample.
//!
//! Every function here takes its input by slice and keeps no state between
//! calls. Variance and standard deviation are always the bias-corrected sample
//! estimators (n - 1 denominator).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod descriptive;
pub(crate) mod float_serde;
mod trend;
mod ttest;

pub use descriptive::{
    confidence_interval, detect_outliers, is_stable, remove_outliers, required_sample_size,
    summarize, summarize_with_level, DEFAULT_CONFIDENCE_LEVEL, OUTLIER_IQR_MULTIPLIER,
};
pub use trend::{
    fit_sequential_trend, fit_trend, MIN_TREND_POINTS, SIGNIFICANT_TREND_R_SQUARED,
};
pub use ttest::{compare_two_sample, WelchTTest, DEFAULT_SIGNIFICANCE_LEVEL};

/// Errors returned by the statistics engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    /// The caller passed a sample or parameter the computation cannot accept.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A probability distribution could not be constructed.
    #[error("Distribution error: {0}")]
    Distribution(String),
}

/// Descriptive statistics for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSummary {
    pub mean: f64,
    pub median: f64,
    pub standard_deviation: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
    /// Always `q3 - q1`.
    pub iqr: f64,
    pub sample_size: usize,
    /// Confidence interval for the mean; `None` for single-point samples.
    pub confidence_interval: Option<ConfidenceInterval>,
    pub outliers: Vec<f64>,
    /// `standard_deviation / |mean|`. Not finite when the mean is zero.
    #[serde(with = "float_serde")]
    pub coefficient_of_variation: f64,
    /// Bias-corrected sample skewness. NaN below three points.
    #[serde(with = "float_serde")]
    pub skewness: f64,
    /// Bias-corrected excess kurtosis. NaN below four points.
    #[serde(with = "float_serde")]
    pub kurtosis: f64,
}

impl StatisticalSummary {
    pub fn has_outliers(&self) -> bool {
        !self.outliers.is_empty()
    }

    /// Rough shape check: |skewness| < 2 and |kurtosis| < 7.
    ///
    /// This is a heuristic, not a normality test. Samples too small to have a
    /// skewness or kurtosis never pass it.
    pub fn is_normally_distributed(&self) -> bool {
        self.skewness.abs() < 2.0 && self.kurtosis.abs() < 7.0
    }

    /// Classify the sample by its coefficient of variation.
    ///
    /// Any outlier, or a failed shape check, forces [`DataQuality::Poor`]
    /// regardless of how tight the sample is.
    pub fn data_quality(&self) -> DataQuality {
        let cv = self.coefficient_of_variation;

        if cv > 0.30 || self.has_outliers() || !self.is_normally_distributed() {
            DataQuality::Poor
        } else if cv > 0.15 {
            DataQuality::Fair
        } else if cv > 0.05 {
            DataQuality::Good
        } else {
            DataQuality::Excellent
        }
    }
}

impl fmt::Display for StatisticalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean={:.6}, median={:.6}, std={:.6}, cv={:.3}%, outliers={}, quality={}",
            self.mean,
            self.median,
            self.standard_deviation,
            self.coefficient_of_variation * 100.0,
            self.outliers.len(),
            self.data_quality()
        )
    }
}

/// Four-level quality grade for a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl DataQuality {
    pub fn description(&self) -> &'static str {
        match self {
            DataQuality::Excellent => "Excellent - Very low variance, no outliers",
            DataQuality::Good => "Good - Low variance, minimal outliers",
            DataQuality::Fair => "Fair - Moderate variance or few outliers",
            DataQuality::Poor => "Poor - High variance or many outliers",
        }
    }
}

impl fmt::Display for DataQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataQuality::Excellent => "EXCELLENT",
            DataQuality::Good => "GOOD",
            DataQuality::Fair => "FAIR",
            DataQuality::Poor => "POOR",
        };
        f.write_str(name)
    }
}

/// Two-sided interval for a sample mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// E.g. 0.95 for a 95% interval.
    pub confidence_level: f64,
}

impl ConfidenceInterval {
    pub fn new(lower_bound: f64, upper_bound: f64, confidence_level: f64) -> Self {
        Self {
            lower_bound,
            upper_bound,
            confidence_level,
        }
    }

    pub fn margin_of_error(&self) -> f64 {
        self.width() / 2.0
    }

    pub fn width(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower_bound && value <= self.upper_bound
    }
}

impl fmt::Display for ConfidenceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}] ({:.1}% confidence)",
            self.lower_bound,
            self.upper_bound,
            self.confidence_level * 100.0
        )
    }
}

/// Which t-test variant produced a [`SignificanceTest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TTestKind {
    /// Two independent samples, unequal variances.
    Welch,
    /// A single observation tested against the baseline distribution.
    OneSample,
}

/// Qualitative bucket for |Cohen's d|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMagnitude {
    Negligible,
    Small,
    Medium,
    Large,
}

impl EffectMagnitude {
    pub fn from_cohens_d(d: f64) -> Self {
        let d = d.abs();
        if d < 0.2 {
            EffectMagnitude::Negligible
        } else if d < 0.5 {
            EffectMagnitude::Small
        } else if d < 0.8 {
            EffectMagnitude::Medium
        } else {
            EffectMagnitude::Large
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectMagnitude::Negligible => "negligible",
            EffectMagnitude::Small => "small",
            EffectMagnitude::Medium => "medium",
            EffectMagnitude::Large => "large",
        }
    }
}

impl fmt::Display for EffectMagnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of comparing a baseline sample against a comparison sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceTest {
    pub kind: TTestKind,
    /// `(mean_baseline - mean_comparison) / standard_error`; infinite when
    /// both samples are constant but differ.
    #[serde(with = "float_serde")]
    pub t_statistic: f64,
    #[serde(with = "float_serde")]
    pub degrees_of_freedom: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    pub is_significant: bool,
    pub significance_level: f64,
    /// Cohen's d: `(mean_comparison - mean_baseline) / pooled_std`.
    #[serde(with = "float_serde")]
    pub effect_size: f64,
    pub interpretation: EffectMagnitude,
}

impl fmt::Display for SignificanceTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:.3}, p={:.6} ({}), effect size={:.3} ({})",
            self.t_statistic,
            self.p_value,
            if self.is_significant {
                "significant"
            } else {
                "not significant"
            },
            self.effect_size,
            self.interpretation
        )
    }
}

/// Direction of a fitted trend, assuming lower values are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Improving,
    Stable,
    Degrading,
    InsufficientData,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrendDirection::Improving => "IMPROVING",
            TrendDirection::Stable => "STABLE",
            TrendDirection::Degrading => "DEGRADING",
            TrendDirection::InsufficientData => "INSUFFICIENT_DATA",
        };
        f.write_str(name)
    }
}

/// Ordinary least-squares fit of value against a monotonically increasing x.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub direction: TrendDirection,
    pub is_significant_trend: bool,
    pub interpretation: String,
}

impl TrendAnalysis {
    /// The result returned when there are too few points to fit.
    pub fn insufficient_data() -> Self {
        Self {
            slope: 0.0,
            intercept: 0.0,
            r_squared: 0.0,
            direction: TrendDirection::InsufficientData,
            is_significant_trend: false,
            interpretation: "Insufficient data for trend analysis".to_string(),
        }
    }
}

impl fmt::Display for TrendAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trend: {} (slope={:.6}, R²={:.3}) - {}",
            self.direction, self.slope, self.r_squared, self.interpretation
        )
    }
}

/// Trait for statistical tests that compare a baseline sample with a comparison sample.
pub trait StatisticalTest: Send + Sync {
    /// Compare the two samples and describe how they differ.
    fn compare(&self, baseline: &[f64], comparison: &[f64])
        -> Result<SignificanceTest, StatsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_with(cv: f64, outliers: Vec<f64>, skewness: f64, kurtosis: f64) -> StatisticalSummary {
        StatisticalSummary {
            mean: 100.0,
            median: 100.0,
            standard_deviation: cv * 100.0,
            variance: (cv * 100.0).powi(2),
            min: 90.0,
            max: 110.0,
            q1: 95.0,
            q3: 105.0,
            iqr: 10.0,
            sample_size: 10,
            confidence_interval: None,
            outliers,
            coefficient_of_variation: cv,
            skewness,
            kurtosis,
        }
    }

    #[test]
    fn test_data_quality_thresholds() {
        assert_eq!(summary_with(0.01, vec![], 0.0, 0.0).data_quality(), DataQuality::Excellent);
        assert_eq!(summary_with(0.05, vec![], 0.0, 0.0).data_quality(), DataQuality::Excellent);
        assert_eq!(summary_with(0.10, vec![], 0.0, 0.0).data_quality(), DataQuality::Good);
        assert_eq!(summary_with(0.20, vec![], 0.0, 0.0).data_quality(), DataQuality::Fair);
        assert_eq!(summary_with(0.31, vec![], 0.0, 0.0).data_quality(), DataQuality::Poor);
    }

    #[test]
    fn test_data_quality_forced_poor() {
        // Tight samples are still poor with outliers or a bad shape
        assert_eq!(summary_with(0.01, vec![500.0], 0.0, 0.0).data_quality(), DataQuality::Poor);
        assert_eq!(summary_with(0.01, vec![], 2.5, 0.0).data_quality(), DataQuality::Poor);
        assert_eq!(summary_with(0.01, vec![], 0.0, 8.0).data_quality(), DataQuality::Poor);
        assert_eq!(summary_with(0.01, vec![], f64::NAN, f64::NAN).data_quality(), DataQuality::Poor);
    }

    #[test]
    fn test_confidence_interval_derived_values() {
        let ci = ConfidenceInterval::new(90.0, 110.0, 0.95);
        assert_eq!(ci.width(), 20.0);
        assert_eq!(ci.margin_of_error(), 10.0);
        assert!(ci.contains(100.0));
        assert!(!ci.contains(111.0));
        assert_eq!(ci.to_string(), "[90.000000, 110.000000] (95.0% confidence)");
    }

    #[test]
    fn test_effect_magnitude_buckets() {
        assert_eq!(EffectMagnitude::from_cohens_d(0.1), EffectMagnitude::Negligible);
        assert_eq!(EffectMagnitude::from_cohens_d(-0.3), EffectMagnitude::Small);
        assert_eq!(EffectMagnitude::from_cohens_d(0.5), EffectMagnitude::Medium);
        assert_eq!(EffectMagnitude::from_cohens_d(-0.8), EffectMagnitude::Large);
        assert_eq!(EffectMagnitude::from_cohens_d(f64::INFINITY), EffectMagnitude::Large);
    }

    #[test]
    fn test_insufficient_trend_is_zeroed() {
        let trend = TrendAnalysis::insufficient_data();
        assert_eq!(trend.direction, TrendDirection::InsufficientData);
        assert_eq!(trend.slope, 0.0);
        assert_eq!(trend.intercept, 0.0);
        assert_eq!(trend.r_squared, 0.0);
        assert!(!trend.is_significant_trend);
    }

    #[test]
    fn test_trend_direction_serializes_upper_case() {
        let json = serde_json::to_string(&TrendDirection::InsufficientData).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_DATA\"");
    }
}
