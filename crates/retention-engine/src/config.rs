//! Analysis parameters.

use retention_stats::contingency::ContinuityCorrection;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Rule deciding which of the two groups is "first" (the baseline).
///
/// The sign of every difference and lift depends on this:
/// `difference = rate(second) - rate(first)`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOrder {
    /// The label that sorts first by byte-wise string comparison is first.
    #[default]
    Lexicographic,
    /// The named label is first; the other label is second.
    Baseline(String),
}

/// Parameters of an A/B comparison.
///
/// # Examples
///
/// ```
/// use retention_engine::config::{AnalysisConfig, GroupOrder};
///
/// let config: AnalysisConfig =
///     serde_json::from_str(r#"{ "alpha": 0.01, "group_order": { "baseline": "gate_30" } }"#)
///         .unwrap();
/// assert_eq!(config.alpha, 0.01);
/// assert_eq!(config.confidence_level, 0.95);
/// assert_eq!(config.group_order, GroupOrder::Baseline("gate_30".to_owned()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Significance threshold; a result is significant when `p_value < alpha`.
    pub alpha: f64,
    /// Coverage of the confidence interval on the difference.
    pub confidence_level: f64,
    /// Expected cell count below which the chi-square result is flagged.
    pub min_expected_count: f64,
    /// Apply the Yates continuity correction to the chi-square statistic.
    pub continuity_correction: bool,
    pub group_order: GroupOrder,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            confidence_level: 0.95,
            min_expected_count: 5.0,
            continuity_correction: false,
            group_order: GroupOrder::Lexicographic,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |reason: String| Err(EngineError::InvalidConfig { reason });
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return invalid(format!("alpha must be in (0, 1), got {}", self.alpha));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return invalid(format!(
                "confidence level must be in (0, 1), got {}",
                self.confidence_level
            ));
        }
        if self.min_expected_count.is_nan() || self.min_expected_count < 0.0 {
            return invalid(format!(
                "minimum expected count must be non-negative, got {}",
                self.min_expected_count
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn correction(&self) -> ContinuityCorrection {
        if self.continuity_correction {
            ContinuityCorrection::Yates
        } else {
            ContinuityCorrection::None
        }
    }
}
