use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// A binomial proportion: `successes` out of `trials`.
///
/// # Examples
///
/// ```
/// use retention_stats::proportion::Proportion;
///
/// let p = Proportion::new(40, 100).unwrap();
/// assert_eq!(p.rate(), 0.4);
/// assert_eq!(p.failures(), 60);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proportion {
    /// Number of observations with the outcome.
    pub successes: u64,
    /// Number of observations.
    pub trials: u64,
}

impl Proportion {
    /// Creates a proportion.
    ///
    /// # Returns
    ///
    /// * `Some(Proportion)` - if `trials > 0` and `successes <= trials`
    /// * `None` - otherwise (the rate would be undefined or out of range)
    #[must_use]
    pub fn new(successes: u64, trials: u64) -> Option<Self> {
        (trials > 0 && successes <= trials).then_some(Self { successes, trials })
    }

    #[must_use]
    pub fn failures(&self) -> u64 {
        self.trials - self.successes
    }

    /// Observed rate `successes / trials`, always in `[0.0, 1.0]`.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.successes as f64 / self.trials as f64
    }

    /// Sampling variance of the observed rate, `p * (1 - p) / n`.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn rate_variance(&self) -> f64 {
        let p = self.rate();
        p * (1.0 - p) / self.trials as f64
    }
}

/// Closed interval `[lower, upper]` at a given confidence level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    /// Nominal coverage, e.g. `0.95`.
    pub level: f64,
}

impl ConfidenceInterval {
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Difference between two independent proportions, `other - base`.
///
/// The standard error is the unpooled one,
/// `sqrt(p_base * (1 - p_base) / n_base + p_other * (1 - p_other) / n_other)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProportionDifference {
    pub difference: f64,
    pub standard_error: f64,
}

impl ProportionDifference {
    /// Computes `other.rate() - base.rate()` and its standard error.
    ///
    /// # Examples
    ///
    /// ```
    /// use retention_stats::proportion::{Proportion, ProportionDifference};
    ///
    /// let base = Proportion::new(40, 100).unwrap();
    /// let other = Proportion::new(55, 100).unwrap();
    /// let diff = ProportionDifference::between(&base, &other);
    /// assert!((diff.difference - 0.15).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn between(base: &Proportion, other: &Proportion) -> Self {
        Self {
            difference: other.rate() - base.rate(),
            standard_error: (base.rate_variance() + other.rate_variance()).sqrt(),
        }
    }

    /// Normal-approximation (Wald) interval `difference ± z * standard_error`.
    ///
    /// This is an approximation; it is not an exact binomial interval and is
    /// unreliable for small samples or rates near 0 or 1.
    #[must_use]
    pub fn confidence_interval(&self, level: f64) -> Option<ConfidenceInterval> {
        let z = normal_critical_value(level)?;
        let margin = z * self.standard_error;
        Some(ConfidenceInterval {
            lower: self.difference - margin,
            upper: self.difference + margin,
            level,
        })
    }
}

/// Two-sided standard normal critical value for a confidence level.
///
/// Returns `None` unless `0 < level < 1`. For `0.95` this is about `1.96`.
#[must_use]
pub fn normal_critical_value(level: f64) -> Option<f64> {
    if !(level > 0.0 && level < 1.0) {
        return None;
    }
    let standard = Normal::new(0.0, 1.0).ok()?;
    Some(standard.inverse_cdf(1.0 - (1.0 - level) / 2.0))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_new_rejects_undefined_rates() {
        assert!(Proportion::new(0, 0).is_none());
        assert!(Proportion::new(5, 4).is_none());
        assert!(Proportion::new(0, 1).is_some());
        assert!(Proportion::new(1, 1).is_some());
    }

    #[test]
    fn test_rate_variance() {
        let p = Proportion::new(40, 100).unwrap();
        assert_abs_diff_eq!(p.rate_variance(), 0.4 * 0.6 / 100.0, epsilon = 1e-15);

        let all = Proportion::new(10, 10).unwrap();
        assert_abs_diff_eq!(all.rate_variance(), 0.0);
    }

    #[test]
    fn test_critical_value_at_95() {
        let z = normal_critical_value(0.95).unwrap();
        assert_abs_diff_eq!(z, 1.959_964, epsilon = 1e-5);
    }

    #[test]
    fn test_critical_value_out_of_range() {
        assert!(normal_critical_value(0.0).is_none());
        assert!(normal_critical_value(1.0).is_none());
        assert!(normal_critical_value(f64::NAN).is_none());
    }

    #[test]
    fn test_difference_interval() {
        let base = Proportion::new(40, 100).unwrap();
        let other = Proportion::new(55, 100).unwrap();
        let diff = ProportionDifference::between(&base, &other);

        let se = (0.4 * 0.6 / 100.0 + 0.55 * 0.45 / 100.0_f64).sqrt();
        assert_abs_diff_eq!(diff.standard_error, se, epsilon = 1e-12);

        let ci = diff.confidence_interval(0.95).unwrap();
        assert_abs_diff_eq!(ci.lower, 0.15 - 1.96 * se, epsilon = 1e-4);
        assert_abs_diff_eq!(ci.upper, 0.15 + 1.96 * se, epsilon = 1e-4);
        assert!(ci.contains(diff.difference));
        assert_abs_diff_eq!(ci.level, 0.95);
    }

    #[test]
    fn test_difference_is_antisymmetric() {
        let a = Proportion::new(12, 80).unwrap();
        let b = Proportion::new(30, 90).unwrap();
        let ab = ProportionDifference::between(&a, &b);
        let ba = ProportionDifference::between(&b, &a);
        assert_abs_diff_eq!(ab.difference, -ba.difference, epsilon = 1e-15);
        assert_abs_diff_eq!(ab.standard_error, ba.standard_error, epsilon = 1e-15);
    }
}
