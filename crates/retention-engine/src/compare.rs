//! Two-group retention comparison
//!
//! Compares one retention metric between exactly two experiment groups:
//!
//! 1. Builds the 2x2 contingency table (group x retained/not retained) from
//!    raw counts
//! 2. Runs the chi-square test of independence (1 degree of freedom), flagging
//!    but still reporting results whose expected cell counts are small
//! 3. Computes the absolute difference `rate(second) - rate(first)`, its
//!    unpooled standard error, and a normal-approximation confidence interval
//! 4. Computes the relative lift `difference / rate(first)`, flagged as
//!    undefined when the baseline rate is zero
//!
//! Which group is "first" is decided by [`GroupOrder`]: lexicographic on the
//! label unless a baseline is configured. Swapping the order negates the
//! difference and mirrors the interval; the chi-square statistic and p-value
//! do not change.

use std::collections::BTreeMap;

use retention_stats::{
    contingency::ContingencyTable,
    proportion::{ConfidenceInterval, Proportion, ProportionDifference},
};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AnalysisConfig, GroupOrder},
    error::EngineError,
    row::{Metric, RowTable},
    summary::{GroupSummary, summarize},
};

/// Non-fatal conditions attached to a [`ComparisonResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    /// Some expected cell count is below the configured threshold, so the
    /// chi-square approximation is unreliable.
    #[display("low expected count: smallest expected cell is {min_expected:.2} (< {threshold})")]
    LowExpectedCount { min_expected: f64, threshold: f64 },
    /// The baseline rate is zero, so the relative lift is undefined.
    #[display("undefined lift: baseline group '{baseline}' has a {metric} rate of 0")]
    UndefinedLift { baseline: String, metric: Metric },
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmOutcome {
    pub group: String,
    pub users: usize,
    pub retained: usize,
    pub rate: f64,
}

impl ArmOutcome {
    fn new(summary: &GroupSummary, metric: Metric) -> Self {
        Self {
            group: summary.group.clone(),
            users: summary.users,
            retained: summary.retained(metric),
            rate: summary.rate(metric),
        }
    }
}

/// Result of comparing one metric between two groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub metric: Metric,
    /// Baseline group.
    pub first: ArmOutcome,
    pub second: ArmOutcome,
    /// `second.rate - first.rate`
    pub difference: f64,
    /// Unpooled standard error of `difference`.
    pub standard_error: f64,
    /// `difference / first.rate`; `None` when `first.rate` is zero.
    pub relative_lift: Option<f64>,
    pub chi_square: f64,
    pub p_value: f64,
    /// Normal-approximation interval for `difference` (not an exact binomial interval).
    pub confidence_interval: ConfidenceInterval,
    pub alpha: f64,
    /// `p_value < alpha`
    pub significant: bool,
    /// Smallest expected cell count of the contingency table.
    pub min_expected: f64,
    pub low_expected_count: bool,
    pub undefined_lift: bool,
    pub continuity_corrected: bool,
    /// Threshold `min_expected` was checked against.
    pub min_expected_threshold: f64,
}

impl ComparisonResult {
    /// Relative lift in percent, if defined.
    #[must_use]
    pub fn lift_percent(&self) -> Option<f64> {
        self.relative_lift.map(|lift| lift * 100.0)
    }

    /// The warning flags raised on this result, in a stable order.
    #[must_use]
    pub fn warnings(&self) -> Vec<Warning> {
        let mut warnings = vec![];
        if self.low_expected_count {
            warnings.push(Warning::LowExpectedCount {
                min_expected: self.min_expected,
                threshold: self.min_expected_threshold,
            });
        }
        if self.undefined_lift {
            warnings.push(Warning::UndefinedLift {
                baseline: self.first.group.clone(),
                metric: self.metric,
            });
        }
        warnings
    }
}

/// Compares `metric` between the two groups of `table` using [`AnalysisConfig::default`].
///
/// # Examples
///
/// ```
/// use retention_engine::{
///     compare::compare,
///     row::{Metric, RowTable, UserRow},
/// };
///
/// let rows = (0..100u64)
///     .map(|i| UserRow::new(i, "gate_30", i < 40, false))
///     .chain((100..200u64).map(|i| UserRow::new(i, "gate_40", i < 155, false)));
/// let table = rows.collect::<RowTable>();
///
/// let result = compare(&table, Metric::D1)?;
/// assert_eq!(result.first.group, "gate_30");
/// assert!((result.difference - 0.15).abs() < 1e-12);
/// assert!(result.significant);
/// # Ok::<(), retention_engine::error::EngineError>(())
/// ```
pub fn compare(table: &RowTable, metric: Metric) -> Result<ComparisonResult, EngineError> {
    compare_with(table, metric, &AnalysisConfig::default())
}

/// Compares `metric` between the two groups of `table`.
///
/// Fails with [`EngineError::EmptyInput`] on an empty table,
/// [`EngineError::InvalidGroupCount`] unless there are exactly two distinct
/// group labels, and [`EngineError::UnknownGroup`] when the configured
/// baseline is not one of them.
pub fn compare_with(
    table: &RowTable,
    metric: Metric,
    config: &AnalysisConfig,
) -> Result<ComparisonResult, EngineError> {
    let groups = summarize(table)?;
    let (first, second) = ordered_pair(&groups, &config.group_order)?;
    compare_summaries(first, second, metric, config)
}

/// Picks the (first, second) groups from a summary map.
///
/// Never falls back to an arbitrary pair: anything other than exactly two
/// groups is an error.
pub fn ordered_pair<'a>(
    groups: &'a BTreeMap<String, GroupSummary>,
    order: &GroupOrder,
) -> Result<(&'a GroupSummary, &'a GroupSummary), EngineError> {
    let labels = || groups.keys().cloned().collect::<Vec<_>>();
    let mut iter = groups.values();
    let (Some(a), Some(b), None) = (iter.next(), iter.next(), iter.next()) else {
        return Err(EngineError::InvalidGroupCount {
            observed: groups.len(),
            labels: labels(),
        });
    };

    match order {
        GroupOrder::Lexicographic => Ok((a, b)),
        GroupOrder::Baseline(label) if *label == a.group => Ok((a, b)),
        GroupOrder::Baseline(label) if *label == b.group => Ok((b, a)),
        GroupOrder::Baseline(label) => Err(EngineError::UnknownGroup {
            label: label.clone(),
            available: labels(),
        }),
    }
}

/// Compares `metric` between two precomputed group summaries, `first` being the baseline.
///
/// Fails with [`EngineError::ZeroCountGroup`] when either group has no users.
pub fn compare_summaries(
    first: &GroupSummary,
    second: &GroupSummary,
    metric: Metric,
    config: &AnalysisConfig,
) -> Result<ComparisonResult, EngineError> {
    config.validate()?;

    let first_prop = proportion(first, metric)?;
    let second_prop = proportion(second, metric)?;

    let table = ContingencyTable::from_proportions(&first_prop, &second_prop);
    let test = table.chi_square(config.correction());
    let low_expected_count = test.has_low_expected_count(config.min_expected_count);

    let diff = ProportionDifference::between(&first_prop, &second_prop);
    let confidence_interval =
        diff.confidence_interval(config.confidence_level)
            .ok_or_else(|| EngineError::InvalidConfig {
                reason: format!(
                    "confidence level must be in (0, 1), got {}",
                    config.confidence_level
                ),
            })?;

    let baseline_rate = first_prop.rate();
    let undefined_lift = baseline_rate == 0.0;
    let relative_lift = (!undefined_lift).then(|| diff.difference / baseline_rate);

    let result = ComparisonResult {
        metric,
        first: ArmOutcome::new(first, metric),
        second: ArmOutcome::new(second, metric),
        difference: diff.difference,
        standard_error: diff.standard_error,
        relative_lift,
        chi_square: test.statistic,
        p_value: test.p_value,
        confidence_interval,
        alpha: config.alpha,
        significant: test.p_value < config.alpha,
        min_expected: test.min_expected,
        low_expected_count,
        undefined_lift,
        continuity_corrected: config.continuity_correction,
        min_expected_threshold: config.min_expected_count,
    };

    tracing::debug!(
        %metric,
        first = %result.first.group,
        second = %result.second.group,
        difference = result.difference,
        p_value = result.p_value,
        significant = result.significant,
        "compared retention"
    );
    for warning in result.warnings() {
        tracing::warn!(%metric, "{warning}");
    }

    Ok(result)
}

fn proportion(summary: &GroupSummary, metric: Metric) -> Result<Proportion, EngineError> {
    Proportion::new(summary.retained(metric) as u64, summary.users as u64).ok_or_else(|| {
        EngineError::ZeroCountGroup {
            group: summary.group.clone(),
        }
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::row::UserRow;

    fn arm(table: &mut RowTable, group: &str, users: usize, d1: usize, d7: usize) {
        let start = table.len() as u64;
        for i in 0..users {
            table.push(UserRow::new(start + i as u64, group, i < d1, i < d7));
        }
    }

    fn scenario_a() -> RowTable {
        let mut table = RowTable::default();
        arm(&mut table, "gate_30", 100, 40, 19);
        arm(&mut table, "gate_40", 100, 55, 20);
        table
    }

    #[test]
    fn test_scenario_significant_difference() {
        let result = compare(&scenario_a(), Metric::D1).unwrap();

        assert_eq!(result.first.group, "gate_30");
        assert_eq!(result.second.group, "gate_40");
        assert_abs_diff_eq!(result.first.rate, 0.40);
        assert_abs_diff_eq!(result.second.rate, 0.55);
        assert_abs_diff_eq!(result.difference, 0.15, epsilon = 1e-12);
        assert_abs_diff_eq!(result.chi_square, 4.511_278, epsilon = 1e-5);
        assert!(result.p_value < 0.05);
        assert!(result.significant);
        assert!(!result.low_expected_count);
        assert!(!result.undefined_lift);
        assert!(result.warnings().is_empty());
        assert_abs_diff_eq!(result.relative_lift.unwrap(), 0.375, epsilon = 1e-12);
        assert_abs_diff_eq!(result.lift_percent().unwrap(), 37.5, epsilon = 1e-9);
    }

    #[test]
    fn test_confidence_interval_is_normal_approximation() {
        let result = compare(&scenario_a(), Metric::D1).unwrap();
        let se = (0.40 * 0.60 / 100.0 + 0.55 * 0.45 / 100.0_f64).sqrt();
        assert_abs_diff_eq!(result.standard_error, se, epsilon = 1e-12);
        let ci = result.confidence_interval;
        assert_abs_diff_eq!(ci.lower, 0.15 - 1.96 * se, epsilon = 1e-4);
        assert_abs_diff_eq!(ci.upper, 0.15 + 1.96 * se, epsilon = 1e-4);
        assert_abs_diff_eq!(ci.level, 0.95);
    }

    #[test]
    fn test_scenario_underpowered() {
        let mut table = RowTable::default();
        arm(&mut table, "A", 10, 5, 0);
        arm(&mut table, "B", 10, 6, 0);

        let result = compare(&table, Metric::D1).unwrap();
        assert!(result.p_value > 0.05);
        assert!(!result.significant);
        assert!(result.low_expected_count);
        assert_abs_diff_eq!(result.min_expected, 4.5, epsilon = 1e-12);
        assert!(matches!(
            result.warnings().as_slice(),
            [Warning::LowExpectedCount { .. }]
        ));
    }

    #[test]
    fn test_scenario_zero_baseline_rate() {
        let mut table = RowTable::default();
        arm(&mut table, "A", 10, 0, 0);
        arm(&mut table, "B", 10, 3, 0);

        let result = compare(&table, Metric::D1).unwrap();
        assert_abs_diff_eq!(result.first.rate, 0.0);
        assert_abs_diff_eq!(result.difference, 0.3, epsilon = 1e-12);
        assert!(result.undefined_lift);
        assert!(result.relative_lift.is_none());
        assert!(result.lift_percent().is_none());
        assert!(
            result
                .warnings()
                .iter()
                .any(|w| matches!(w, Warning::UndefinedLift { baseline, .. } if baseline == "A"))
        );
    }

    #[test]
    fn test_identical_outcomes_are_not_significant() {
        let mut table = RowTable::default();
        arm(&mut table, "A", 50, 0, 0);
        arm(&mut table, "B", 50, 0, 0);

        let result = compare(&table, Metric::D7).unwrap();
        assert_abs_diff_eq!(result.chi_square, 0.0);
        assert_abs_diff_eq!(result.p_value, 1.0);
        assert!(!result.significant);
        assert!(result.low_expected_count);
        assert!(result.undefined_lift);
    }

    #[test]
    fn test_three_groups_rejected() {
        let mut table = scenario_a();
        arm(&mut table, "gate_50", 5, 1, 0);
        let err = compare(&table, Metric::D1).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidGroupCount {
                observed: 3,
                labels: vec!["gate_30".into(), "gate_40".into(), "gate_50".into()],
            }
        );
    }

    #[test]
    fn test_single_group_rejected() {
        let mut table = RowTable::default();
        arm(&mut table, "only", 20, 5, 1);
        let err = compare(&table, Metric::D7).unwrap_err();
        assert!(matches!(err, EngineError::InvalidGroupCount { observed: 1, .. }));
    }

    #[test]
    fn test_empty_table_rejected() {
        let err = compare(&RowTable::default(), Metric::D1).unwrap_err();
        assert_eq!(err, EngineError::EmptyInput);
    }

    #[test]
    fn test_swapping_order_negates_difference() {
        let table = scenario_a();
        let forward = compare(&table, Metric::D1).unwrap();
        let config = AnalysisConfig {
            group_order: GroupOrder::Baseline("gate_40".to_owned()),
            ..AnalysisConfig::default()
        };
        let backward = compare_with(&table, Metric::D1, &config).unwrap();

        assert_eq!(backward.first.group, "gate_40");
        assert_abs_diff_eq!(backward.difference, -forward.difference, epsilon = 1e-12);
        assert_abs_diff_eq!(
            backward.confidence_interval.lower,
            -forward.confidence_interval.upper,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            backward.confidence_interval.upper,
            -forward.confidence_interval.lower,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(backward.p_value, forward.p_value, epsilon = 1e-12);
        assert_eq!(backward.low_expected_count, forward.low_expected_count);
    }

    #[test]
    fn test_unknown_baseline_rejected() {
        let config = AnalysisConfig {
            group_order: GroupOrder::Baseline("gate_99".to_owned()),
            ..AnalysisConfig::default()
        };
        let err = compare_with(&scenario_a(), Metric::D1, &config).unwrap_err();
        assert!(err.is_unknown_group());
    }

    #[test]
    fn test_zero_count_group_rejected() {
        let populated = GroupSummary {
            group: "a".to_owned(),
            users: 10,
            d1_retained: 4,
            d7_retained: 1,
            d1_rate: 0.4,
            d7_rate: 0.1,
        };
        let empty = GroupSummary {
            group: "b".to_owned(),
            users: 0,
            d1_retained: 0,
            d7_retained: 0,
            d1_rate: 0.0,
            d7_rate: 0.0,
        };
        let err = compare_summaries(&populated, &empty, Metric::D1, &AnalysisConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::ZeroCountGroup {
                group: "b".to_owned()
            }
        );
    }

    #[test]
    fn test_yates_correction_raises_p_value() {
        let table = scenario_a();
        let plain = compare(&table, Metric::D1).unwrap();
        let config = AnalysisConfig {
            continuity_correction: true,
            ..AnalysisConfig::default()
        };
        let corrected = compare_with(&table, Metric::D1, &config).unwrap();
        assert!(corrected.continuity_corrected);
        assert!(corrected.p_value > plain.p_value);
        assert_abs_diff_eq!(corrected.chi_square, 3.929_825, epsilon = 1e-5);
        assert_abs_diff_eq!(corrected.difference, plain.difference);
    }

    #[test]
    fn test_alpha_controls_significance() {
        let config = AnalysisConfig {
            alpha: 0.01,
            ..AnalysisConfig::default()
        };
        let result = compare_with(&scenario_a(), Metric::D1, &config).unwrap();
        assert!(result.p_value < 0.05);
        assert!(!result.significant);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig {
            alpha: 0.0,
            ..AnalysisConfig::default()
        };
        let err = compare_with(&scenario_a(), Metric::D1, &config).unwrap_err();
        assert!(err.is_invalid_config());
    }

    #[test]
    fn test_d7_uses_day_seven_flags() {
        let result = compare(&scenario_a(), Metric::D7).unwrap();
        assert_eq!(result.first.retained, 19);
        assert_eq!(result.second.retained, 20);
        assert_abs_diff_eq!(result.difference, 0.01, epsilon = 1e-12);
        assert!(!result.significant);
    }
}
