//! Full experiment report: overview, per-group KPIs, both metric comparisons,
//! and a rollout recommendation.
//!
//! The recommendation follows the D7 comparison, as long-term retention is the
//! decision metric for the experiment:
//!
//! | D7 result                  | Recommendation              |
//! |----------------------------|-----------------------------|
//! | significant, positive      | roll out the second group   |
//! | significant, negative      | keep the baseline group     |
//! | otherwise                  | inconclusive                |

use serde::{Deserialize, Serialize};

use crate::{
    compare::{ComparisonResult, compare_summaries, ordered_pair},
    config::AnalysisConfig,
    error::EngineError,
    row::{Metric, RowTable},
    summary::{GroupSummary, KpiOverview, overview, summarize},
};

/// Outcome of one metric comparison, from the second group's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "snake_case")]
pub enum Finding {
    SignificantIncrease,
    SignificantDecrease,
    NoSignificantDifference,
}

impl Finding {
    #[must_use]
    pub fn from_comparison(result: &ComparisonResult) -> Self {
        if !result.significant {
            Finding::NoSignificantDifference
        } else if result.difference > 0.0 {
            Finding::SignificantIncrease
        } else {
            Finding::SignificantDecrease
        }
    }
}

/// What to do with the experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum Recommendation {
    /// The second group retains significantly better on D7.
    RollOut {
        group: String,
        /// Extra D7-retained users per cohort the size of the second group.
        additional_retained: f64,
    },
    /// The second group retains significantly worse on D7.
    KeepBaseline { group: String },
    /// No significant D7 difference.
    Inconclusive,
}

impl Recommendation {
    #[expect(clippy::cast_precision_loss)]
    fn from_d7(d7: &ComparisonResult) -> Self {
        match Finding::from_comparison(d7) {
            Finding::SignificantIncrease => Recommendation::RollOut {
                group: d7.second.group.clone(),
                additional_retained: d7.difference * d7.second.users as f64,
            },
            Finding::SignificantDecrease => Recommendation::KeepBaseline {
                group: d7.first.group.clone(),
            },
            Finding::NoSignificantDifference => Recommendation::Inconclusive,
        }
    }
}

/// A metric comparison together with its finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub comparison: ComparisonResult,
    pub finding: Finding,
}

impl MetricReport {
    fn new(comparison: ComparisonResult) -> Self {
        let finding = Finding::from_comparison(&comparison);
        Self {
            comparison,
            finding,
        }
    }
}

/// Everything a presentation layer needs to render an experiment.
///
/// All numbers shown to the user come from here; renderers must not recompute
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub overview: KpiOverview,
    /// The two groups, baseline first.
    pub groups: [GroupSummary; 2],
    pub d1: MetricReport,
    pub d7: MetricReport,
    pub recommendation: Recommendation,
    pub config: AnalysisConfig,
}

impl ExperimentReport {
    /// Builds the report for a two-group table.
    ///
    /// Fails with the same errors as [`compare_with`](crate::compare::compare_with).
    ///
    /// # Examples
    ///
    /// ```
    /// use retention_engine::{
    ///     config::AnalysisConfig,
    ///     report::{ExperimentReport, Recommendation},
    ///     row::{RowTable, UserRow},
    /// };
    ///
    /// let rows = (0..400u64)
    ///     .map(|i| UserRow::new(i, "gate_30", i < 180, i < 60))
    ///     .chain((400..800u64).map(|i| UserRow::new(i, "gate_40", i < 590, i < 520)));
    /// let table = rows.collect::<RowTable>();
    ///
    /// let report = ExperimentReport::build(&table, &AnalysisConfig::default())?;
    /// assert_eq!(report.overview.total_users, 800);
    /// assert!(matches!(report.recommendation, Recommendation::RollOut { .. }));
    /// # Ok::<(), retention_engine::error::EngineError>(())
    /// ```
    pub fn build(table: &RowTable, config: &AnalysisConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let overview = overview(table)?;
        let summaries = summarize(table)?;
        let (first, second) = ordered_pair(&summaries, &config.group_order)?;

        let d1 = MetricReport::new(compare_summaries(first, second, Metric::D1, config)?);
        let d7 = MetricReport::new(compare_summaries(first, second, Metric::D7, config)?);
        let recommendation = Recommendation::from_d7(&d7.comparison);

        tracing::info!(
            users = overview.total_users,
            baseline = %first.group,
            treatment = %second.group,
            ?recommendation,
            "experiment report built"
        );

        Ok(Self {
            overview,
            groups: [first.clone(), second.clone()],
            d1,
            d7,
            recommendation,
            config: config.clone(),
        })
    }

    #[must_use]
    pub fn metric(&self, metric: Metric) -> &MetricReport {
        match metric {
            Metric::D1 => &self.d1,
            Metric::D7 => &self.d7,
        }
    }

    /// Share of users in each group (baseline first), summing to 1.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn group_shares(&self) -> [f64; 2] {
        let total = self.overview.total_users as f64;
        self.groups
            .each_ref()
            .map(|group| group.users as f64 / total)
    }
}
