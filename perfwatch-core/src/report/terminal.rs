use std::io::{self, Write};

use colored::Colorize;

use super::{ReportError, Reporter};
use crate::regression::{RegressionResult, RegressionSeverity};

/// A reporter that outputs regression results to the terminal as a table.
#[derive(Debug, Clone, Default)]
pub struct TerminalReporter {
    /// Whether to use colors in output (defaults to true).
    use_colors: bool,
}

impl TerminalReporter {
    /// Create a new terminal reporter with default settings.
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    /// Create a terminal reporter with color output disabled.
    pub fn without_colors() -> Self {
        Self { use_colors: false }
    }

    /// Format a value with three decimals, switching to scientific notation for extremes.
    fn format_value(value: f64) -> String {
        let magnitude = value.abs();
        if magnitude != 0.0 && !(1e-3..1e9).contains(&magnitude) {
            format!("{:.3e}", value)
        } else {
            format!("{:.3}", value)
        }
    }

    /// Format the baseline mean with its standard deviation.
    fn format_baseline(result: &RegressionResult) -> String {
        format!(
            "{} (+/- {})",
            Self::format_value(result.baseline_summary.mean),
            Self::format_value(result.baseline_summary.standard_deviation)
        )
    }

    /// Format the signed fractional change as a percentage.
    fn format_change(magnitude: f64) -> String {
        if magnitude > 0.0 {
            format!("+{:.2}%", magnitude * 100.0)
        } else if magnitude < 0.0 {
            format!("-{:.2}%", magnitude.abs() * 100.0)
        } else {
            "0.00%".to_string()
        }
    }

    fn format_p_value(result: &RegressionResult) -> String {
        match &result.significance_test {
            Some(test) => format!("{:.4}", test.p_value),
            None => "-".to_string(),
        }
    }

    /// Short label for the severity column.
    fn severity_label(severity: RegressionSeverity) -> &'static str {
        match severity {
            RegressionSeverity::NoRegression => "ok",
            RegressionSeverity::Minor => "minor",
            RegressionSeverity::Moderate => "moderate",
            RegressionSeverity::Major => "major",
            RegressionSeverity::Critical => "critical",
        }
    }

    /// Apply the severity's color to `text`.
    fn paint(&self, text: &str, severity: RegressionSeverity) -> String {
        if !self.use_colors {
            return text.to_string();
        }
        match severity {
            RegressionSeverity::NoRegression => text.green().to_string(),
            RegressionSeverity::Minor => text.yellow().to_string(),
            RegressionSeverity::Moderate => text.yellow().bold().to_string(),
            RegressionSeverity::Major => text.red().to_string(),
            RegressionSeverity::Critical => text.red().bold().to_string(),
        }
    }

    /// Print the table header.
    fn print_header(&self, writer: &mut impl Write) -> io::Result<()> {
        writeln!(writer)?;
        let header = format!(
            "{:<40} {:>26} {:>16} {:>10} {:>10} {:>10}",
            "Subject[metric]", "Baseline", "Current", "Change", "p-value", "Severity"
        );
        if self.use_colors {
            writeln!(writer, "{}", header.bold())?;
        } else {
            writeln!(writer, "{}", header)?;
        }
        writeln!(writer, "{}", "-".repeat(117))?;
        Ok(())
    }

    /// Print a single result row.
    fn print_row(&self, writer: &mut impl Write, result: &RegressionResult) -> io::Result<()> {
        let full_name = format!("{}[{}]", result.subject, result.metric);
        let name = if full_name.chars().count() > 38 {
            format!("{}...", full_name.chars().take(35).collect::<String>())
        } else {
            full_name
        };

        let baseline = Self::format_baseline(result);
        let current = Self::format_value(result.current.value);
        let change_text = Self::format_change(result.regression_magnitude);
        let label = Self::severity_label(result.severity);

        // Pad before painting so ANSI escape codes do not break alignment
        let change = self.paint(&format!("{:>10}", change_text), result.severity);
        let severity = self.paint(&format!("{:>10}", label), result.severity);

        writeln!(
            writer,
            "{:<40} {:>26} {:>16} {} {:>10} {}",
            name,
            baseline,
            current,
            change,
            Self::format_p_value(result),
            severity,
        )?;

        for alert in &result.alerts {
            writeln!(writer, "    ALERT: {}", alert)?;
        }
        Ok(())
    }

    /// Print the summary footer.
    fn print_summary(
        &self,
        writer: &mut impl Write,
        results: &[RegressionResult],
    ) -> io::Result<()> {
        writeln!(writer)?;
        writeln!(writer, "{}", "-".repeat(117))?;

        let summary_label = "Summary:";
        if self.use_colors {
            write!(writer, "{} ", summary_label.bold())?;
        } else {
            write!(writer, "{} ", summary_label)?;
        }

        let counts: Vec<String> = RegressionSeverity::ALL
            .iter()
            .rev()
            .map(|&severity| {
                let count = results.iter().filter(|r| r.severity == severity).count();
                let text = format!("{} {}", count, Self::severity_label(severity));
                self.paint(&text, severity)
            })
            .collect();
        writeln!(writer, "{}", counts.join(", "))?;

        writeln!(writer)?;
        Ok(())
    }
}

impl Reporter for TerminalReporter {
    fn report(&self, results: &[RegressionResult]) -> Result<(), ReportError> {
        let stdout = io::stdout();
        let mut writer = stdout.lock();

        self.print_header(&mut writer)?;

        for result in results {
            self.print_row(&mut writer, result)?;
        }

        self.print_summary(&mut writer, results)?;

        Ok(())
    }
}
