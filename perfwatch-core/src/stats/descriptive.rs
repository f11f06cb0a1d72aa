use std::collections::HashSet;

use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

use super::{ConfidenceInterval, StatisticalSummary, StatsError};

/// Confidence level used by [`summarize`].
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Tukey fence multiplier for IQR outlier detection.
pub const OUTLIER_IQR_MULTIPLIER: f64 = 1.5;

/// Summarize a sample with a 95% confidence interval for the mean.
///
/// # Errors
///
/// Returns [`StatsError::InvalidInput`] if the sample is empty.
pub fn summarize(sample: &[f64]) -> Result<StatisticalSummary, StatsError> {
    summarize_with_level(sample, DEFAULT_CONFIDENCE_LEVEL)
}

/// Summarize a sample with a confidence interval at `confidence_level`.
///
/// Single-point samples are accepted; their variance is zero and they carry
/// no confidence interval.
///
/// # Errors
///
/// Returns [`StatsError::InvalidInput`] if the sample is empty or the
/// confidence level is outside (0, 1).
pub fn summarize_with_level(
    sample: &[f64],
    confidence_level: f64,
) -> Result<StatisticalSummary, StatsError> {
    if sample.is_empty() {
        return Err(StatsError::InvalidInput(
            "sample must not be empty".to_string(),
        ));
    }
    check_confidence_level(confidence_level)?;

    let sorted = sorted_copy(sample);
    let n = sorted.len();

    let mean = sample.iter().mean();
    let variance = sample_variance(sample, mean);
    let standard_deviation = variance.sqrt();
    let q1 = percentile_sorted(&sorted, 25.0);
    let q3 = percentile_sorted(&sorted, 75.0);

    let confidence_interval = if n >= 2 {
        Some(interval_around(mean, standard_deviation, n, confidence_level)?)
    } else {
        None
    };

    Ok(StatisticalSummary {
        mean,
        median: percentile_sorted(&sorted, 50.0),
        standard_deviation,
        variance,
        min: sorted[0],
        max: sorted[n - 1],
        q1,
        q3,
        iqr: q3 - q1,
        sample_size: n,
        confidence_interval,
        outliers: outside_fences(sample, q1, q3),
        coefficient_of_variation: standard_deviation / mean.abs(),
        skewness: skewness(sample, mean, variance),
        kurtosis: kurtosis(sample, mean, variance),
    })
}

/// Student-t confidence interval for the sample mean (df = n - 1).
///
/// # Errors
///
/// Returns [`StatsError::InvalidInput`] for fewer than two points or a
/// confidence level outside (0, 1).
pub fn confidence_interval(
    sample: &[f64],
    confidence_level: f64,
) -> Result<ConfidenceInterval, StatsError> {
    if sample.len() < 2 {
        return Err(StatsError::InvalidInput(format!(
            "confidence interval needs at least 2 data points, got {}",
            sample.len()
        )));
    }
    check_confidence_level(confidence_level)?;

    let mean = sample.iter().mean();
    let std_dev = sample_variance(sample, mean).sqrt();
    interval_around(mean, std_dev, sample.len(), confidence_level)
}

/// Values strictly outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`, in sample order.
///
/// Duplicates are reported once per occurrence. An empty sample has no outliers.
pub fn detect_outliers(sample: &[f64]) -> Vec<f64> {
    if sample.is_empty() {
        return Vec::new();
    }
    let sorted = sorted_copy(sample);
    let q1 = percentile_sorted(&sorted, 25.0);
    let q3 = percentile_sorted(&sorted, 75.0);
    outside_fences(sample, q1, q3)
}

/// Drop every value equal to a detected outlier.
///
/// Removal is by value, not by position: if a value is an outlier, every
/// occurrence of it goes, including copies that would have sat inside the
/// fences on their own.
pub fn remove_outliers(sample: &[f64]) -> Vec<f64> {
    let outliers: HashSet<u64> = detect_outliers(sample)
        .into_iter()
        .map(f64::to_bits)
        .collect();

    sample
        .iter()
        .copied()
        .filter(|value| !outliers.contains(&value.to_bits()))
        .collect()
}

/// Number of samples needed for a confidence interval half-width of
/// `desired_margin_of_error`, estimated from a pilot sample.
///
/// Never returns fewer than the pilot's own size.
///
/// # Errors
///
/// Returns [`StatsError::InvalidInput`] for a pilot with fewer than two
/// points, a non-positive margin, or a confidence level outside (0, 1).
pub fn required_sample_size(
    pilot: &[f64],
    desired_margin_of_error: f64,
    confidence_level: f64,
) -> Result<usize, StatsError> {
    if pilot.len() < 2 {
        return Err(StatsError::InvalidInput(format!(
            "sample size estimation needs at least 2 pilot points, got {}",
            pilot.len()
        )));
    }
    if !(desired_margin_of_error.is_finite() && desired_margin_of_error > 0.0) {
        return Err(StatsError::InvalidInput(format!(
            "desired margin of error must be positive, got {}",
            desired_margin_of_error
        )));
    }
    check_confidence_level(confidence_level)?;

    let mean = pilot.iter().mean();
    let std_dev = sample_variance(pilot, mean).sqrt();
    let t_critical = t_critical((pilot.len() - 1) as f64, confidence_level)?;

    let required = ((t_critical * std_dev) / desired_margin_of_error)
        .powi(2)
        .ceil();

    Ok((required as usize).max(pilot.len()))
}

/// True when the coefficient of variation is at most `max_cv` and there are no outliers.
///
/// # Errors
///
/// Returns [`StatsError::InvalidInput`] if the sample is empty.
pub fn is_stable(sample: &[f64], max_cv: f64) -> Result<bool, StatsError> {
    let summary = summarize(sample)?;
    Ok(summary.coefficient_of_variation <= max_cv && !summary.has_outliers())
}

/// Bias-corrected sample variance. Zero for a single point.
pub(crate) fn sample_variance(sample: &[f64], mean: f64) -> f64 {
    if sample.len() < 2 {
        return 0.0;
    }
    let sum_sq_diff: f64 = sample.iter().map(|x| (x - mean).powi(2)).sum();
    sum_sq_diff / (sample.len() - 1) as f64
}

/// Two-tailed Student-t critical value.
pub(crate) fn t_critical(degrees_of_freedom: f64, confidence_level: f64) -> Result<f64, StatsError> {
    let dist = StudentsT::new(0.0, 1.0, degrees_of_freedom)
        .map_err(|e| StatsError::Distribution(e.to_string()))?;
    let alpha = 1.0 - confidence_level;
    Ok(dist.inverse_cdf(1.0 - alpha / 2.0))
}

fn check_confidence_level(confidence_level: f64) -> Result<(), StatsError> {
    if confidence_level > 0.0 && confidence_level < 1.0 {
        Ok(())
    } else {
        Err(StatsError::InvalidInput(format!(
            "confidence level must be between 0 and 1 (exclusive), got {}",
            confidence_level
        )))
    }
}

fn interval_around(
    mean: f64,
    std_dev: f64,
    n: usize,
    confidence_level: f64,
) -> Result<ConfidenceInterval, StatsError> {
    let t_critical = t_critical((n - 1) as f64, confidence_level)?;
    let margin = t_critical * std_dev / (n as f64).sqrt();
    Ok(ConfidenceInterval::new(
        mean - margin,
        mean + margin,
        confidence_level,
    ))
}

fn sorted_copy(sample: &[f64]) -> Vec<f64> {
    let mut sorted = sample.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Percentile with position `p (n + 1) / 100`, clamped to the extremes and
/// linearly interpolated between neighbouring order statistics.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let pos = p / 100.0 * (n as f64 + 1.0);
    if pos < 1.0 {
        return sorted[0];
    }
    if pos >= n as f64 {
        return sorted[n - 1];
    }

    let lower = pos.floor();
    let fraction = pos - lower;
    let below = sorted[lower as usize - 1];
    let above = sorted[lower as usize];
    below + fraction * (above - below)
}

fn outside_fences(sample: &[f64], q1: f64, q3: f64) -> Vec<f64> {
    let iqr = q3 - q1;
    let lower_fence = q1 - OUTLIER_IQR_MULTIPLIER * iqr;
    let upper_fence = q3 + OUTLIER_IQR_MULTIPLIER * iqr;

    sample
        .iter()
        .copied()
        .filter(|&value| value < lower_fence || value > upper_fence)
        .collect()
}

/// Below this variance a sample is treated as constant for shape statistics.
const DEGENERATE_VARIANCE: f64 = 1e-19;

fn skewness(sample: &[f64], mean: f64, variance: f64) -> f64 {
    let n = sample.len();
    if n < 3 {
        return f64::NAN;
    }
    if variance < DEGENERATE_VARIANCE {
        return 0.0;
    }

    let std_dev = variance.sqrt();
    let cubed: f64 = sample.iter().map(|x| ((x - mean) / std_dev).powi(3)).sum();
    let n = n as f64;
    n / ((n - 1.0) * (n - 2.0)) * cubed
}

fn kurtosis(sample: &[f64], mean: f64, variance: f64) -> f64 {
    let n = sample.len();
    if n < 4 {
        return f64::NAN;
    }
    if variance < DEGENERATE_VARIANCE {
        return 0.0;
    }

    let fourth: f64 = sample
        .iter()
        .map(|x| (x - mean).powi(4) / variance.powi(2))
        .sum();
    let n = n as f64;
    let coefficient = n * (n + 1.0) / ((n - 1.0) * (n - 2.0) * (n - 3.0));
    let correction = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    coefficient * fourth - correction
}
