use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use retention_data::loader::{self, ColumnMapping, LoadSummary};
use retention_engine::{error::EngineError, report::ExperimentReport, row::RowTable};
use serde::Serialize;

use crate::{
    command::{dataset::DataSource, settings::AnalysisArgs},
    util::Output,
};

mod text;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct AnalyzeArg {
    #[clap(flatten)]
    analysis: AnalysisArgs,
    /// Report format
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
    /// Output file path (default: stdout)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Also write the loaded rows, without dropped ones, to this CSV file
    #[arg(long)]
    export_csv: Option<PathBuf>,
}

/// JSON form of the report.
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    source: String,
    load: Option<LoadSummary>,
    #[serde(flatten)]
    report: &'a ExperimentReport,
}

pub fn run(arg: &AnalyzeArg) -> anyhow::Result<()> {
    let AnalyzeArg {
        analysis,
        format,
        output,
        export_csv,
    } = arg;

    let settings = analysis.settings()?;
    let source = DataSource::from_path(analysis.csv.clone());
    tracing::info!(%source, "loading dataset");
    let dataset = source.load(&settings.columns)?;
    if let Some(path) = export_csv {
        export_table(&dataset.table, path, &settings.columns)?;
    }

    let report = ExperimentReport::build(&dataset.table, &settings.analysis)
        .map_err(with_remediation)?;

    let mut output = Output::from_output_path(output.as_deref())?;
    match format {
        OutputFormat::Text => {
            let mut buf = String::new();
            text::render(&mut buf, &report, &source.to_string(), dataset.load.as_ref())?;
            output.write_text(&buf)?;
        }
        OutputFormat::Json => {
            output.write_json(&JsonReport {
                generated_at: Utc::now(),
                source: source.to_string(),
                load: dataset.load,
                report: &report,
            })?;
        }
    }
    Ok(())
}

fn export_table(table: &RowTable, path: &Path, columns: &ColumnMapping) -> anyhow::Result<()> {
    let mut output = Output::create(path)?;
    loader::write_csv(table, &mut output, columns)
        .with_context(|| format!("Failed to write CSV to {}", path.display()))?;
    output.finish()
}

/// Wraps an engine error so the user sees what to do about it.
fn with_remediation(err: EngineError) -> anyhow::Error {
    tracing::error!(%err, "analysis failed");
    let remediation = err.remediation();
    anyhow::Error::new(err).context(remediation)
}

#[cfg(test)]
mod tests {
    use retention_engine::{
        config::AnalysisConfig,
        row::{RowTable, UserRow},
    };

    use super::*;

    #[test]
    fn test_remediation_is_outermost_message() {
        let err = with_remediation(EngineError::EmptyInput);
        assert_eq!(err.to_string(), EngineError::EmptyInput.remediation());
        assert!(err.downcast_ref::<EngineError>().is_some());
    }

    #[test]
    fn test_export_writes_clean_rows() {
        let columns = ColumnMapping::default();
        let csv = b"userid,version,retention_1,retention_7\n1,a,1,0\n2,b,oops,0\n3,b,0,1\n";
        let loaded = loader::load_csv_bytes(csv, &columns).unwrap();

        let path = std::env::temp_dir().join(format!("retention-export-{}.csv", std::process::id()));
        export_table(&loaded.table, &path, &columns).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(
            written,
            "userid,version,retention_1,retention_7\n1,a,True,False\n3,b,False,True\n"
        );
    }

    #[test]
    fn test_json_report_shape() {
        let table: RowTable = (0..10u64)
            .map(|i| UserRow::new(i, if i < 5 { "a" } else { "b" }, i % 2 == 0, i % 3 == 0))
            .collect();
        let report = ExperimentReport::build(&table, &AnalysisConfig::default()).unwrap();
        let json = serde_json::to_value(JsonReport {
            generated_at: Utc::now(),
            source: "test".to_owned(),
            load: None,
            report: &report,
        })
        .unwrap();

        assert!(json["generated_at"].is_string());
        assert!(json["load"].is_null());
        assert_eq!(json["overview"]["total_users"], 10);
        assert_eq!(json["d1"]["comparison"]["first"]["group"], "a");
        assert_eq!(json["recommendation"]["action"], "inconclusive");
    }
}
