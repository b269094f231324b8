use std::path::PathBuf;

use retention_data::loader::ColumnMapping;
use retention_engine::config::{AnalysisConfig, GroupOrder};
use serde::{Deserialize, Serialize};

use crate::util;

/// Contents of a `--config` settings file.
///
/// ```json
/// {
///   "analysis": { "alpha": 0.01, "group_order": { "baseline": "gate_30" } },
///   "columns": { "user_id": "id", "group": "arm" }
/// }
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analysis: AnalysisConfig,
    pub columns: ColumnMapping,
}

/// Data source and analysis options shared by `analyze` and `dashboard`.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct AnalysisArgs {
    /// Experiment CSV file; synthetic sample data is used when omitted
    pub csv: Option<PathBuf>,
    /// JSON settings file with `analysis` and `columns` sections
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Significance level
    #[arg(long)]
    pub alpha: Option<f64>,
    /// Confidence level of the interval on the difference
    #[arg(long)]
    pub confidence: Option<f64>,
    /// Expected cell count below which the chi-square test is flagged
    #[arg(long)]
    pub min_expected: Option<f64>,
    /// Apply the Yates continuity correction
    #[arg(long)]
    pub yates: bool,
    /// Group to use as the baseline (default: lexicographically first)
    #[arg(long)]
    pub baseline: Option<String>,
}

impl AnalysisArgs {
    /// Reads the settings file, if any, and applies command line overrides.
    ///
    /// The result is not validated; the engine rejects invalid values.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => util::read_json_file::<Settings, _>("settings", path)?,
            None => Settings::default(),
        };
        self.apply(&mut settings.analysis);
        Ok(settings)
    }

    fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(level) = self.confidence {
            config.confidence_level = level;
        }
        if let Some(count) = self.min_expected {
            config.min_expected_count = count;
        }
        if self.yates {
            config.continuity_correction = true;
        }
        if let Some(label) = &self.baseline {
            config.group_order = GroupOrder::Baseline(label.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_file_values() {
        let args = AnalysisArgs {
            alpha: Some(0.01),
            yates: true,
            baseline: Some("gate_40".to_owned()),
            ..AnalysisArgs::default()
        };
        let mut config = AnalysisConfig {
            confidence_level: 0.9,
            ..AnalysisConfig::default()
        };
        args.apply(&mut config);

        assert_eq!(
            config,
            AnalysisConfig {
                alpha: 0.01,
                confidence_level: 0.9,
                min_expected_count: 5.0,
                continuity_correction: true,
                group_order: GroupOrder::Baseline("gate_40".to_owned()),
            }
        );
    }

    #[test]
    fn test_partial_settings_file() {
        let settings: Settings =
            serde_json::from_str(r#"{ "columns": { "group": "arm" } }"#).unwrap();
        assert_eq!(settings.analysis, AnalysisConfig::default());
        assert_eq!(settings.columns.group, "arm");
        assert_eq!(settings.columns.user_id, "userid");
    }
}
