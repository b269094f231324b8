use serde::{Deserialize, Serialize};

/// Descriptive statistics summarizing one numeric column.
///
/// Mirrors a spreadsheet-style "describe" row: count, mean, sample standard
/// deviation, extremes, and quartiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); 0 for a single value.
    pub std_dev: f64,
    pub min: f64,
    /// First quartile.
    pub q1: f64,
    pub median: f64,
    /// Third quartile.
    pub q3: f64,
    pub max: f64,
}

impl DescriptiveStats {
    /// Computes descriptive statistics from unsorted values.
    ///
    /// Returns `None` if the dataset is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// # use retention_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([5.0, 2.0, 4.0, 1.0, 3.0]).unwrap();
    /// assert_eq!(stats.count, 5);
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.max, 5.0);
    /// assert_eq!(stats.median, 3.0);
    /// assert_eq!(stats.q1, 2.0);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Like [`Self::new`], for values already sorted in ascending order.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        debug_assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let count = sorted_values.len();
        let n = count as f64;
        let mean = sorted_values.iter().sum::<f64>() / n;
        let std_dev = if count > 1 {
            let squares = sorted_values
                .iter()
                .map(|v| (v - mean).powi(2))
                .sum::<f64>();
            (squares / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        Some(Self {
            count,
            mean,
            std_dev,
            min,
            q1: quantile(sorted_values, 0.25),
            median: quantile(sorted_values, 0.5),
            q3: quantile(sorted_values, 0.75),
            max,
        })
    }
}

/// Linear interpolation between closest ranks. `sorted` must be non-empty.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - position.floor();
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
