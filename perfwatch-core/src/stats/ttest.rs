use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

use super::descriptive::sample_variance;
use super::{EffectMagnitude, SignificanceTest, StatisticalTest, StatsError, TTestKind};

/// Significance level used when none is configured.
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Welch's t-test for comparing two independent samples with potentially unequal variances.
///
/// A comparison sample with a single value is tested against the baseline
/// distribution: its variance term drops out and the degrees of freedom
/// become `n_baseline - 1`.
#[derive(Debug, Clone)]
pub struct WelchTTest {
    /// Alpha below which a p-value counts as significant (default: 0.05).
    pub significance_level: f64,
}

impl Default for WelchTTest {
    fn default() -> Self {
        Self {
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
        }
    }
}

impl WelchTTest {
    /// Create a new Welch's t-test with the specified significance level.
    ///
    /// # Panics
    /// Panics if significance_level is not in the range (0, 1).
    pub fn new(significance_level: f64) -> Self {
        assert!(
            significance_level > 0.0 && significance_level < 1.0,
            "significance_level must be between 0 and 1 (exclusive)"
        );
        Self { significance_level }
    }

    /// Calculate degrees of freedom using the Welch-Satterthwaite equation.
    ///
    /// df = (var1/n1 + var2/n2)^2 / ((var1/n1)^2/(n1-1) + (var2/n2)^2/(n2-1))
    ///
    /// A single-point sample contributes no term to the denominator.
    fn welch_satterthwaite_df(var1: f64, n1: usize, var2: f64, n2: usize) -> f64 {
        let s1 = var1 / n1 as f64;
        let s2 = var2 / n2 as f64;
        let numerator = (s1 + s2).powi(2);

        let mut denominator = s1.powi(2) / (n1 - 1) as f64;
        if n2 > 1 {
            denominator += s2.powi(2) / (n2 - 1) as f64;
        }

        if denominator == 0.0 {
            // Fallback to minimum df when variances are zero
            return (n1.min(n2).max(2) - 1) as f64;
        }

        numerator / denominator
    }

    /// Cohen's d with the pooled standard deviation.
    fn cohens_d(mean1: f64, var1: f64, n1: usize, mean2: f64, var2: f64, n2: usize) -> f64 {
        let pooled_var = ((n1 - 1) as f64 * var1 + (n2 - 1) as f64 * var2) / (n1 + n2 - 2) as f64;
        let pooled_std = pooled_var.sqrt();
        let mean_diff = mean2 - mean1;

        if pooled_std == 0.0 {
            if mean_diff == 0.0 {
                0.0
            } else {
                mean_diff.signum() * f64::INFINITY
            }
        } else {
            mean_diff / pooled_std
        }
    }
}

impl StatisticalTest for WelchTTest {
    fn compare(
        &self,
        baseline: &[f64],
        comparison: &[f64],
    ) -> Result<SignificanceTest, StatsError> {
        let n1 = baseline.len();
        let n2 = comparison.len();

        if n1 < 2 {
            return Err(StatsError::InvalidInput(format!(
                "baseline needs at least 2 data points, got {}",
                n1
            )));
        }
        if n2 == 0 {
            return Err(StatsError::InvalidInput(
                "comparison sample must not be empty".to_string(),
            ));
        }

        let mean1 = baseline.iter().mean();
        let mean2 = comparison.iter().mean();
        let var1 = sample_variance(baseline, mean1);
        let var2 = sample_variance(comparison, mean2);

        let kind = if n2 == 1 {
            TTestKind::OneSample
        } else {
            TTestKind::Welch
        };
        let effect_size = Self::cohens_d(mean1, var1, n1, mean2, var2, n2);
        let df = Self::welch_satterthwaite_df(var1, n1, var2, n2);

        // Calculate standard error of the difference
        let se = (var1 / n1 as f64 + var2 / n2 as f64).sqrt();

        let (t_statistic, p_value) = if se == 0.0 {
            // Both samples are constant: either identical or certainly different
            if mean1 == mean2 {
                (0.0, 1.0)
            } else {
                ((mean1 - mean2).signum() * f64::INFINITY, 0.0)
            }
        } else {
            let t_statistic = (mean1 - mean2) / se;
            let t_dist = StudentsT::new(0.0, 1.0, df)
                .map_err(|e| StatsError::Distribution(e.to_string()))?;
            // Two-tailed test: p = 2 * P(T > |t|)
            let p_value = 2.0 * (1.0 - t_dist.cdf(t_statistic.abs()));
            (t_statistic, p_value.clamp(0.0, 1.0))
        };

        Ok(SignificanceTest {
            kind,
            t_statistic,
            degrees_of_freedom: df,
            p_value,
            is_significant: p_value < self.significance_level,
            significance_level: self.significance_level,
            effect_size,
            interpretation: EffectMagnitude::from_cohens_d(effect_size),
        })
    }
}

/// Compare two samples with Welch's t-test at the given significance level.
///
/// # Errors
///
/// Returns [`StatsError::InvalidInput`] if the baseline has fewer than two
/// points, the comparison is empty, or `significance_level` is outside (0, 1).
pub fn compare_two_sample(
    baseline: &[f64],
    comparison: &[f64],
    significance_level: f64,
) -> Result<SignificanceTest, StatsError> {
    if !(significance_level > 0.0 && significance_level < 1.0) {
        return Err(StatsError::InvalidInput(format!(
            "significance level must be between 0 and 1 (exclusive), got {}",
            significance_level
        )));
    }
    WelchTTest { significance_level }.compare(baseline, comparison)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_samples() {
        let sample = [98.0, 102.0, 100.0, 101.0, 99.0];
        let result = compare_two_sample(&sample, &sample, 0.05).unwrap();

        assert_eq!(result.kind, TTestKind::Welch);
        assert!((result.p_value - 1.0).abs() < 1e-9);
        assert!(result.effect_size.abs() < 1e-9);
        assert!(!result.is_significant);
        assert_eq!(result.interpretation, EffectMagnitude::Negligible);
    }

    #[test]
    fn test_constant_identical_samples() {
        let result = WelchTTest::default()
            .compare(&[100.0; 5], &[100.0; 5])
            .unwrap();

        assert_eq!(result.p_value, 1.0);
        assert_eq!(result.t_statistic, 0.0);
        assert_eq!(result.effect_size, 0.0);
        assert!(!result.is_significant);
    }

    #[test]
    fn test_clearly_different_samples() {
        let test = WelchTTest::default();
        let baseline = [100.0, 101.0, 102.0, 99.0, 100.0];
        let comparison = [1000.0, 1001.0, 1002.0, 999.0, 1000.0];

        let result = test.compare(&baseline, &comparison).unwrap();

        assert!(result.is_significant);
        assert!(result.p_value < 0.05);
        // Baseline is lower, so t is negative and d is positive
        assert!(result.t_statistic < 0.0);
        assert!(result.effect_size > 0.8);
        assert_eq!(result.interpretation, EffectMagnitude::Large);
    }

    #[test]
    fn test_welch_df_for_unequal_variances() {
        let baseline = [10.0, 10.5, 9.5, 10.2, 9.8, 10.1];
        let comparison = [5.0, 20.0, 12.0, 1.0, 15.0];

        let result = WelchTTest::default().compare(&baseline, &comparison).unwrap();

        // Dominated by the noisy sample: df sits close to n2 - 1
        assert!(result.degrees_of_freedom > 4.0 && result.degrees_of_freedom < 4.2);
        assert!(!result.is_significant);
    }

    #[test]
    fn test_single_point_comparison() {
        let baseline = [100.0, 102.0, 98.0, 101.0, 99.0];
        let result = WelchTTest::default().compare(&baseline, &[130.0]).unwrap();

        assert_eq!(result.kind, TTestKind::OneSample);
        assert_eq!(result.degrees_of_freedom, 4.0);
        assert!(result.is_significant);
        assert!(result.effect_size > 0.0);
    }

    #[test]
    fn test_single_point_against_constant_baseline() {
        let result = WelchTTest::default()
            .compare(&[100.0; 5], &[130.0])
            .unwrap();

        assert_eq!(result.p_value, 0.0);
        assert!(result.is_significant);
        assert_eq!(result.t_statistic, f64::NEG_INFINITY);
        assert_eq!(result.effect_size, f64::INFINITY);
    }

    #[test]
    fn test_insufficient_samples() {
        let test = WelchTTest::default();

        assert!(matches!(
            test.compare(&[100.0], &[200.0, 201.0]),
            Err(StatsError::InvalidInput(_))
        ));
        assert!(matches!(
            test.compare(&[100.0, 101.0], &[]),
            Err(StatsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_custom_significance_level() {
        let test = WelchTTest::new(0.01);
        assert_eq!(test.significance_level, 0.01);
    }

    #[test]
    #[should_panic(expected = "significance_level must be between 0 and 1")]
    fn test_invalid_significance_level() {
        WelchTTest::new(1.5);
    }

    #[test]
    fn test_compare_two_sample_rejects_bad_alpha() {
        let result = compare_two_sample(&[1.0, 2.0], &[1.0, 2.0], 0.0);
        assert!(matches!(result, Err(StatsError::InvalidInput(_))));
    }
}
