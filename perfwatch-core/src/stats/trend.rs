use statrs::statistics::Statistics;

use super::{TrendAnalysis, TrendDirection};

/// Fewest points a trend is fitted over.
pub const MIN_TREND_POINTS: usize = 3;

/// R² above which a trend is reported as significant.
pub const SIGNIFICANT_TREND_R_SQUARED: f64 = 0.5;

/// Slopes smaller than this in magnitude are flat.
const FLAT_SLOPE: f64 = 1e-6;

/// Fits explaining less variance than this are treated as noise.
const MIN_EXPLAINED_VARIANCE: f64 = 0.1;

/// Fit `ys` against `xs` by ordinary least squares.
///
/// Lower values are taken to be better, so a falling line is
/// [`TrendDirection::Improving`]. Mismatched lengths, fewer than
/// [`MIN_TREND_POINTS`] points, or xs with no spread yield
/// [`TrendAnalysis::insufficient_data`] rather than an error.
pub fn fit_trend(xs: &[f64], ys: &[f64]) -> TrendAnalysis {
    if xs.len() != ys.len() || xs.len() < MIN_TREND_POINTS {
        return TrendAnalysis::insufficient_data();
    }

    let x_mean = xs.iter().mean();
    let y_mean = ys.iter().mean();

    let (sxx, sxy, syy) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0, 0.0), |(sxx, sxy, syy), (x, y)| {
            let dx = x - x_mean;
            let dy = y - y_mean;
            (sxx + dx * dx, sxy + dx * dy, syy + dy * dy)
        });

    if sxx == 0.0 {
        return TrendAnalysis::insufficient_data();
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    // Constant ys leave nothing to explain
    let r_squared = if syy == 0.0 {
        0.0
    } else {
        (sxy * sxy / (sxx * syy)).clamp(0.0, 1.0)
    };

    let direction = if slope.abs() < FLAT_SLOPE || r_squared < MIN_EXPLAINED_VARIANCE {
        TrendDirection::Stable
    } else if slope < 0.0 {
        TrendDirection::Improving
    } else {
        TrendDirection::Degrading
    };
    let is_significant_trend = r_squared > SIGNIFICANT_TREND_R_SQUARED;

    let interpretation = format!(
        "{} trend detected (R²={:.3}, {})",
        direction,
        r_squared,
        if is_significant_trend {
            "significant"
        } else {
            "weak"
        }
    );

    TrendAnalysis {
        slope,
        intercept,
        r_squared,
        direction,
        is_significant_trend,
        interpretation,
    }
}

/// Fit `values` against their position (0, 1, 2, ...).
///
/// Positions stand in for time, so irregular sampling intervals do not skew the slope.
pub fn fit_sequential_trend(values: &[f64]) -> TrendAnalysis {
    let index: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    fit_trend(&index, values)
}
