use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::measurement::PerformanceMeasurement;
use crate::stats::{SignificanceTest, StatisticalSummary, TrendAnalysis};

/// Ordered classification of how much worse the latest measurement is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegressionSeverity {
    NoRegression,
    Minor,
    Moderate,
    Major,
    Critical,
}

impl RegressionSeverity {
    /// Every severity in ascending order.
    pub const ALL: [RegressionSeverity; 5] = [
        RegressionSeverity::NoRegression,
        RegressionSeverity::Minor,
        RegressionSeverity::Moderate,
        RegressionSeverity::Major,
        RegressionSeverity::Critical,
    ];

    /// Ordinal level, 0 for no regression up to 4 for critical.
    pub fn level(&self) -> u8 {
        match self {
            RegressionSeverity::NoRegression => 0,
            RegressionSeverity::Minor => 1,
            RegressionSeverity::Moderate => 2,
            RegressionSeverity::Major => 3,
            RegressionSeverity::Critical => 4,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RegressionSeverity::NoRegression => "No Regression",
            RegressionSeverity::Minor => "Minor Regression",
            RegressionSeverity::Moderate => "Moderate Regression",
            RegressionSeverity::Major => "Major Regression",
            RegressionSeverity::Critical => "Critical Regression",
        }
    }
}

impl fmt::Display for RegressionSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl FromStr for RegressionSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "none" | "noregression" => Ok(RegressionSeverity::NoRegression),
            "minor" => Ok(RegressionSeverity::Minor),
            "moderate" => Ok(RegressionSeverity::Moderate),
            "major" => Ok(RegressionSeverity::Major),
            "critical" => Ok(RegressionSeverity::Critical),
            _ => Err(format!(
                "unknown severity '{}' (expected none, minor, moderate, major or critical)",
                s
            )),
        }
    }
}

/// Verdict for the newest measurement of one (subject, metric) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionResult {
    pub subject: String,
    pub metric: String,
    pub severity: RegressionSeverity,
    /// `(current - baseline_mean) / baseline_mean`; positive means worse.
    #[serde(with = "crate::stats::float_serde")]
    pub regression_magnitude: f64,
    /// `None` when the test could not be computed.
    pub significance_test: Option<SignificanceTest>,
    /// `None` when trend analysis is disabled or history is too short.
    pub trend_analysis: Option<TrendAnalysis>,
    /// Summary of the history the current value was compared against.
    pub baseline_summary: StatisticalSummary,
    /// Display stand-in for the baseline: mean as value, backdated one day.
    /// It is not a real historical point.
    pub baseline: PerformanceMeasurement,
    pub current: PerformanceMeasurement,
    /// Advisory text for humans. Consume the typed fields, not these.
    pub alerts: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

impl RegressionResult {
    pub fn has_regression(&self) -> bool {
        self.severity != RegressionSeverity::NoRegression
    }
}

impl fmt::Display for RegressionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Regression: {}[{}] - {} ({:.1}% degradation, ",
            self.subject,
            self.metric,
            self.severity,
            self.regression_magnitude * 100.0
        )?;
        match &self.significance_test {
            Some(test) => write!(f, "p={:.4})", test.p_value),
            None => write!(f, "p=n/a)"),
        }
    }
}
