use std::io::{self, Write};

use thiserror::Error;

use crate::regression::{RegressionResult, RegressionSeverity};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait Reporter: Send + Sync {
    fn report(&self, results: &[RegressionResult]) -> Result<(), ReportError>;
}

/// Render results as a plain-text report grouped by severity.
pub fn generate_report(results: &[RegressionResult]) -> String {
    let mut report = String::from("=== Performance Regression Analysis Report ===\n\n");

    if results.is_empty() {
        report.push_str("No performance regressions detected.\n");
        return report;
    }

    for severity in RegressionSeverity::ALL {
        let group: Vec<&RegressionResult> =
            results.iter().filter(|r| r.severity == severity).collect();
        if group.is_empty() {
            continue;
        }

        let description = severity.description();
        report.push_str(&format!("{} ({} detected):\n", description, group.len()));
        report.push_str(&"=".repeat(description.len() + 1));
        report.push('\n');

        for result in group {
            report.push_str(&format!(
                "• {}[{}]: {:.1}% degradation\n",
                result.subject,
                result.metric,
                result.regression_magnitude * 100.0
            ));

            if let Some(test) = &result.significance_test {
                report.push_str(&format!(
                    "  Statistical significance: p={:.4} ({})\n",
                    test.p_value,
                    if test.is_significant {
                        "significant"
                    } else {
                        "not significant"
                    }
                ));
            }

            if let Some(trend) = &result.trend_analysis {
                report.push_str(&format!("  Trend: {}\n", trend.direction));
            }

            report.push('\n');
        }
    }

    report
}

/// Writes results as pretty-printed JSON.
#[derive(Debug, Clone, Default)]
pub struct JsonReporter;

impl JsonReporter {
    pub fn new() -> Self {
        Self
    }

    fn write_to(
        &self,
        writer: &mut impl Write,
        results: &[RegressionResult],
    ) -> Result<(), ReportError> {
        serde_json::to_writer_pretty(&mut *writer, results)?;
        writeln!(writer)?;
        Ok(())
    }
}

impl Reporter for JsonReporter {
    fn report(&self, results: &[RegressionResult]) -> Result<(), ReportError> {
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        self.write_to(&mut writer, results)
    }
}

mod terminal;
pub use terminal::TerminalReporter;
