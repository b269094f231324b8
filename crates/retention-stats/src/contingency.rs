use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::proportion::Proportion;

/// Whether to apply a continuity correction to the 2x2 chi-square statistic.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuityCorrection {
    /// Plain Pearson statistic, `Σ (O - E)² / E`.
    #[default]
    None,
    /// Yates correction, `Σ (max(|O - E| - 0.5, 0))² / E`.
    Yates,
}

/// A 2x2 table of observed counts.
///
/// Rows are the two samples (first, second); columns are the outcome
/// (with outcome, without outcome).
///
/// ```text
///             outcome   no outcome
/// first       a         b
/// second      c         d
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyTable {
    pub cells: [[u64; 2]; 2],
}

/// Result of a chi-square test of independence on a 2x2 table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChiSquareTest {
    /// The chi-square statistic.
    pub statistic: f64,
    /// Upper-tail probability of `statistic` under 1 degree of freedom.
    pub p_value: f64,
    /// Always 1 for a 2x2 table.
    pub degrees_of_freedom: u32,
    /// Smallest expected cell count under independence.
    pub min_expected: f64,
    pub correction: ContinuityCorrection,
}

impl ChiSquareTest {
    /// Returns whether any expected cell count is below `threshold`.
    ///
    /// The usual rule of thumb is 5; below it the chi-square approximation
    /// is unreliable.
    #[must_use]
    pub fn has_low_expected_count(&self, threshold: f64) -> bool {
        self.min_expected < threshold
    }
}

impl ContingencyTable {
    #[must_use]
    pub fn new(cells: [[u64; 2]; 2]) -> Self {
        Self { cells }
    }

    /// Builds the table from two proportions, one per row.
    #[must_use]
    pub fn from_proportions(first: &Proportion, second: &Proportion) -> Self {
        Self::new([
            [first.successes, first.failures()],
            [second.successes, second.failures()],
        ])
    }

    #[must_use]
    pub fn row_totals(&self) -> [u64; 2] {
        let [r0, r1] = self.cells;
        [r0[0] + r0[1], r1[0] + r1[1]]
    }

    #[must_use]
    pub fn column_totals(&self) -> [u64; 2] {
        let [r0, r1] = self.cells;
        [r0[0] + r1[0], r0[1] + r1[1]]
    }

    #[must_use]
    pub fn grand_total(&self) -> u64 {
        self.row_totals().iter().sum()
    }

    /// Expected counts under independence, `row_total * column_total / grand_total`.
    ///
    /// All zero for an empty table.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn expected(&self) -> [[f64; 2]; 2] {
        let total = self.grand_total();
        if total == 0 {
            return [[0.0; 2]; 2];
        }
        let rows = self.row_totals();
        let cols = self.column_totals();
        let n = total as f64;
        let cell = |i: usize, j: usize| rows[i] as f64 * cols[j] as f64 / n;
        [[cell(0, 0), cell(0, 1)], [cell(1, 0), cell(1, 1)]]
    }

    /// Chi-square test of independence with 1 degree of freedom.
    ///
    /// When a row or column total is zero the statistic is undefined (0/0);
    /// it is reported as 0 with p-value 1, and `min_expected` is 0 so the
    /// low-count warning fires.
    ///
    /// # Examples
    ///
    /// ```
    /// use retention_stats::contingency::{ContingencyTable, ContinuityCorrection};
    ///
    /// let table = ContingencyTable::new([[40, 60], [55, 45]]);
    /// let test = table.chi_square(ContinuityCorrection::None);
    /// assert!((test.statistic - 4.5113).abs() < 1e-3);
    /// assert!(test.p_value < 0.05);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn chi_square(&self, correction: ContinuityCorrection) -> ChiSquareTest {
        let expected = self.expected();
        let min_expected = expected
            .iter()
            .flatten()
            .copied()
            .min_by(f64::total_cmp)
            .unwrap_or(0.0);

        if min_expected <= 0.0 {
            return ChiSquareTest {
                statistic: 0.0,
                p_value: 1.0,
                degrees_of_freedom: 1,
                min_expected,
                correction,
            };
        }

        let mut statistic = 0.0;
        for (observed_row, expected_row) in self.cells.iter().zip(&expected) {
            for (&observed, &expected) in observed_row.iter().zip(expected_row) {
                let mut deviation = (observed as f64 - expected).abs();
                if correction == ContinuityCorrection::Yates {
                    deviation = (deviation - 0.5).max(0.0);
                }
                statistic += deviation * deviation / expected;
            }
        }

        ChiSquareTest {
            statistic,
            p_value: chi_square_upper_tail(statistic, 1.0),
            degrees_of_freedom: 1,
            min_expected,
            correction,
        }
    }
}

/// Upper-tail probability `P(X >= statistic)` for `X ~ χ²(degrees_of_freedom)`.
///
/// With one degree of freedom this equals the two-tailed normal p-value of
/// `sqrt(statistic)`.
#[must_use]
pub fn chi_square_upper_tail(statistic: f64, degrees_of_freedom: f64) -> f64 {
    if statistic <= 0.0 {
        return 1.0;
    }
    match ChiSquared::new(degrees_of_freedom) {
        Ok(dist) => dist.sf(statistic).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}
