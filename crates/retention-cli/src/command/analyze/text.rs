//! Plain-text experiment report.

use std::fmt::{self, Write};

use retention_data::loader::LoadSummary;
use retention_engine::{
    report::{ExperimentReport, MetricReport},
    row::Metric,
};

use crate::format;

pub fn render<W>(
    w: &mut W,
    report: &ExperimentReport,
    source: &str,
    load: Option<&LoadSummary>,
) -> fmt::Result
where
    W: Write,
{
    writeln!(w, "Retention A/B Test Report")?;
    writeln!(w, "=========================")?;
    writeln!(w, "Source: {source}")?;
    if let Some(load) = load {
        writeln!(w, "Rows:   {}", format::load_summary(load))?;
    }
    writeln!(w)?;

    let overview = &report.overview;
    writeln!(w, "Overview")?;
    writeln!(w, "  Total users         {:>10}", overview.total_users)?;
    writeln!(w, "  Daily active users  {:>10}", overview.daily_active_users)?;
    writeln!(w, "  D1 retention        {:>10}", format::percent(overview.d1_rate))?;
    writeln!(w, "  D7 retention        {:>10}", format::percent(overview.d7_rate))?;
    writeln!(w)?;

    writeln!(w, "Groups")?;
    writeln!(
        w,
        "  {:<16} {:>8} {:>8} {:>9} {:>9}",
        "group", "users", "share", "D1 rate", "D7 rate"
    )?;
    for (group, share) in report.groups.iter().zip(report.group_shares()) {
        writeln!(
            w,
            "  {:<16} {:>8} {:>8} {:>9} {:>9}",
            group.group,
            group.users,
            format!("{:.1}%", share * 100.0),
            format::percent(group.d1_rate),
            format::percent(group.d7_rate),
        )?;
    }
    writeln!(w)?;

    for metric in Metric::ALL {
        render_metric(w, report.metric(metric))?;
        writeln!(w)?;
    }

    writeln!(w, "Recommendation")?;
    writeln!(w, "  {}", format::recommendation(&report.recommendation))?;
    Ok(())
}

fn render_metric<W>(w: &mut W, metric: &MetricReport) -> fmt::Result
where
    W: Write,
{
    let result = &metric.comparison;
    let correction = if result.continuity_corrected {
        "Yates-corrected"
    } else {
        "Pearson"
    };

    writeln!(
        w,
        "{} retention: {} vs {}",
        result.metric, result.second.group, result.first.group
    )?;
    writeln!(
        w,
        "  Rates          {} -> {}",
        format::percent(result.first.rate),
        format::percent(result.second.rate)
    )?;
    writeln!(
        w,
        "  Difference     {} ({})",
        format::points(result.difference),
        format::confidence_interval(result)
    )?;
    writeln!(w, "  Relative lift  {}", format::lift(result))?;
    writeln!(
        w,
        "  Chi-square     {:.4} ({correction}, p = {})",
        result.chi_square,
        format::p_value(result.p_value)
    )?;
    writeln!(w, "  Finding        {}", format::finding(result, metric.finding))?;
    for warning in result.warnings() {
        writeln!(w, "  Warning        {warning}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use retention_engine::{
        config::AnalysisConfig,
        row::{RowTable, UserRow},
    };

    use super::*;

    fn table(d1: [usize; 2], d7: [usize; 2], users: usize) -> RowTable {
        let mut table = RowTable::default();
        let mut id = 0u64;
        for (i, group) in ["gate_30", "gate_40"].into_iter().enumerate() {
            for n in 0..users {
                table.push(UserRow::new(id, group, n < d1[i], n < d7[i]));
                id += 1;
            }
        }
        table
    }

    fn render_string(report: &ExperimentReport, load: Option<&LoadSummary>) -> String {
        let mut text = String::new();
        render(&mut text, report, "test.csv", load).unwrap();
        text
    }

    #[test]
    fn test_report_sections() {
        let report =
            ExperimentReport::build(&table([40, 55], [20, 35], 100), &AnalysisConfig::default())
                .unwrap();
        let load = LoadSummary {
            rows: 200,
            dropped: 3,
            duplicate_user_ids: 0,
        };
        let text = render_string(&report, Some(&load));

        assert!(text.contains("Source: test.csv"));
        assert!(text.contains("200 loaded, 3 dropped"));
        assert!(text.contains("D1 retention: gate_40 vs gate_30"));
        assert!(text.contains("40.00% -> 55.00%"));
        assert!(text.contains("+15.00 pp"));
        assert!(text.contains("+37.50%"));
        assert!(text.contains("4.5113 (Pearson, p = 0.0337)"));
        assert!(text.contains("significant D1 increase"));
        assert!(text.contains("D7 retention: gate_40 vs gate_30"));
        assert!(text.contains("Roll out gate_40"));
        assert!(!text.contains("Warning"));
    }

    #[test]
    fn test_warnings_are_listed() {
        let report =
            ExperimentReport::build(&table([0, 2], [0, 1], 4), &AnalysisConfig::default())
                .unwrap();
        let text = render_string(&report, None);

        assert!(!text.contains("Rows:"));
        assert!(text.contains("Relative lift  undefined"));
        assert!(text.contains("Warning        low expected count"));
        assert!(text.contains("Warning        undefined lift"));
        assert!(text.contains("Inconclusive"));
    }
}
