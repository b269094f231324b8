use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect, Spacing},
    prelude::Direction,
    style::{Color, Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span, Text},
    widgets::{Bar, BarChart, Block, Cell, Paragraph, Row, Table, Widget, Wrap},
};
use retention_data::loader::ColumnMapping;
use retention_engine::{
    report::{ExperimentReport, Finding, MetricReport, Recommendation},
    row::UserRow,
    summary::TableDescription,
};
use retention_stats::descriptive::DescriptiveStats;

use crate::{command::dashboard::app::Failure, format};

const BAR_COLORS: [Color; 2] = [Color::Blue, Color::Magenta];

fn panel(title: impl Into<Line<'static>>) -> Block<'static> {
    Block::bordered()
        .title(title)
        .merge_borders(MergeStrategy::Exact)
}

fn finding_style(finding: Finding) -> Style {
    match finding {
        Finding::SignificantIncrease => Style::default().fg(Color::Green),
        Finding::SignificantDecrease => Style::default().fg(Color::Red),
        Finding::NoSignificantDifference => Style::default().fg(Color::Gray),
    }
}

/// Rate as a bar height in basis points.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn basis_points(rate: f64) -> u64 {
    (rate * 10_000.0).round() as u64
}

pub struct KpiStrip<'a> {
    pub report: &'a ExperimentReport,
}

impl Widget for KpiStrip<'_> {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        let overview = &self.report.overview;
        let cards = [
            ("Total Users", overview.total_users.to_string()),
            ("Daily Active Users", overview.daily_active_users.to_string()),
            ("D1 Retention", format::percent(overview.d1_rate)),
            ("D7 Retention", format::percent(overview.d7_rate)),
        ];
        let areas: [Rect; 4] = Layout::horizontal([Constraint::Fill(1); 4])
            .spacing(Spacing::Overlap(1))
            .areas(area);
        for ((title, value), area) in cards.into_iter().zip(areas) {
            let value = Text::from(value)
                .style(Style::default().add_modifier(Modifier::BOLD))
                .centered();
            Paragraph::new(value).block(panel(title)).render(area, buf);
        }
    }
}

pub struct MetricPanel<'a> {
    pub report: &'a MetricReport,
}

impl Widget for MetricPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        let result = &self.report.comparison;
        let block = panel(format!(
            "{} Retention: {} vs {}",
            result.metric, result.second.group, result.first.group
        ));
        let [chart_area, stats_area] =
            Layout::horizontal([Constraint::Length(24), Constraint::Fill(1)])
                .areas(block.inner(area));

        let bars = [&result.first, &result.second]
            .into_iter()
            .zip(BAR_COLORS)
            .map(|(arm, color)| {
                Bar::with_label(arm.group.clone(), basis_points(arm.rate))
                    .text_value(format::percent(arm.rate))
                    .style(Style::default().fg(color))
            })
            .collect::<Vec<_>>();
        let chart = BarChart::new(bars).bar_width(9).bar_gap(2);

        let mut lines = vec![
            Line::raw(format!("Difference: {}", format::points(result.difference))),
            Line::raw(format::confidence_interval(result)),
            Line::raw(format!("Lift:       {}", format::lift(result))),
            Line::raw(format!("Chi-square: {:.4}", result.chi_square)),
            Line::raw(format!("p-value:    {}", format::p_value(result.p_value))),
            Line::raw(""),
            Line::styled(
                format::finding(result, self.report.finding),
                finding_style(self.report.finding),
            ),
        ];
        for warning in result.warnings() {
            lines.push(Line::styled(
                format!("⚠ {warning}"),
                Style::default().fg(Color::Yellow),
            ));
        }

        Widget::render(block, area, buf);
        Widget::render(chart, chart_area, buf);
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .render(stats_area, buf);
    }
}

pub struct DistributionPanel<'a> {
    pub report: &'a ExperimentReport,
}

impl Widget for DistributionPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        let bars = self
            .report
            .groups
            .iter()
            .zip(self.report.group_shares())
            .zip(BAR_COLORS)
            .map(|((group, share), color)| {
                Bar::with_label(group.group.clone(), group.users as u64)
                    .text_value(format!("{} ({:.1}%)", group.users, share * 100.0))
                    .style(Style::default().fg(color))
            })
            .collect::<Vec<_>>();
        BarChart::new(bars)
            .block(panel("Group Distribution"))
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(1)
            .render(area, buf);
    }
}

pub struct SummaryPanel<'a> {
    pub report: &'a ExperimentReport,
}

impl Widget for SummaryPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        let report = self.report;
        let action_style = match report.recommendation {
            Recommendation::RollOut { .. } => Style::default().fg(Color::Green),
            Recommendation::KeepBaseline { .. } => Style::default().fg(Color::Red),
            Recommendation::Inconclusive => Style::default().fg(Color::Yellow),
        };
        let mut lines = vec![];
        for metric in [&report.d1, &report.d7] {
            lines.push(Line::from(vec![
                Span::raw("• "),
                Span::styled(
                    format::finding(&metric.comparison, metric.finding),
                    finding_style(metric.finding),
                ),
            ]));
        }
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            format::recommendation(&report.recommendation),
            action_style.add_modifier(Modifier::BOLD),
        ));

        Paragraph::new(lines)
            .block(panel("Executive Summary"))
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}

pub struct ColumnSummaryPanel<'a> {
    pub description: &'a TableDescription,
    pub columns: &'a ColumnMapping,
}

impl Widget for ColumnSummaryPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        let header = ["column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"];
        let stats_row = |name: &str, stats: &DescriptiveStats| {
            let mut cells = vec![Cell::from(name.to_owned()), Cell::from(stats.count.to_string())];
            cells.extend(
                [
                    stats.mean,
                    stats.std_dev,
                    stats.min,
                    stats.q1,
                    stats.median,
                    stats.q3,
                    stats.max,
                ]
                .map(|value| Cell::from(format!("{value:.4}"))),
            );
            Row::new(cells)
        };

        let description = self.description;
        let mut rows = vec![];
        match &description.user_id {
            Some(stats) => rows.push(stats_row(&self.columns.user_id, stats)),
            None => rows.push(Row::new([
                Cell::from(self.columns.user_id.clone()),
                Cell::from("text ids"),
            ])),
        }
        rows.push(stats_row(&self.columns.retained_1, &description.retained_1));
        rows.push(stats_row(&self.columns.retained_7, &description.retained_7));

        let widths = [Constraint::Length(14)]
            .into_iter()
            .chain([Constraint::Length(8)])
            .chain([Constraint::Length(11); 7]);
        Table::new(rows, widths)
            .header(Row::new(header).style(Style::default().add_modifier(Modifier::BOLD)))
            .block(panel(format!(
                "Data Summary ({} groups in {})",
                description.groups, self.columns.group
            )))
            .render(area, buf);
    }
}

pub struct RowPreviewPanel<'a> {
    pub rows: &'a [UserRow],
    pub offset: usize,
    pub columns: &'a ColumnMapping,
}

impl Widget for RowPreviewPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        // border and header take three lines
        let visible = usize::from(area.height.saturating_sub(3));
        let start = self.offset.min(self.rows.len());
        let end = (start + visible).min(self.rows.len());
        let flag = |value: bool| if value { "1" } else { "0" };
        let rows = self.rows[start..end].iter().map(|row| {
            Row::new([
                row.user_id.to_string(),
                row.group.clone(),
                flag(row.retained_1).to_owned(),
                flag(row.retained_7).to_owned(),
            ])
        });
        let header = Row::new([
            self.columns.user_id.as_str(),
            self.columns.group.as_str(),
            self.columns.retained_1.as_str(),
            self.columns.retained_7.as_str(),
        ])
        .style(Style::default().add_modifier(Modifier::BOLD));

        let title = if start < end {
            format!("Sample Data (rows {}-{} of {})", start + 1, end, self.rows.len())
        } else {
            "Sample Data (no rows)".to_owned()
        };
        Table::new(rows, [Constraint::Length(16); 4])
            .header(header)
            .block(panel(title))
            .render(area, buf);
    }
}

pub struct ErrorPanel<'a> {
    pub failure: &'a Failure,
}

impl Widget for ErrorPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        let block = panel(self.failure.title.clone()).border_style(Style::default().fg(Color::Red));
        Paragraph::new(self.failure.message.clone())
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use retention_engine::{
        config::AnalysisConfig,
        row::RowTable,
        summary::describe,
    };

    use super::*;

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_basis_points() {
        assert_eq!(basis_points(0.4482), 4482);
        assert_eq!(basis_points(0.0), 0);
        assert_eq!(basis_points(1.0), 10_000);
    }

    #[test]
    fn test_panels_render_numbers() {
        let table: RowTable = (0..200u64)
            .map(|i| {
                let group = if i < 100 { "gate_30" } else { "gate_40" };
                let n = i % 100;
                let d1 = if i < 100 { n < 40 } else { n < 55 };
                UserRow::new(i, group, d1, n < 20)
            })
            .collect();
        let report = ExperimentReport::build(&table, &AnalysisConfig::default()).unwrap();

        let area = Rect::new(0, 0, 80, 12);
        let mut buf = Buffer::empty(area);
        KpiStrip { report: &report }.render(area, &mut buf);
        let text = buffer_text(&buf);
        assert!(text.contains("Total Users"));
        assert!(text.contains("47.50%"));

        let area = Rect::new(0, 0, 100, 14);
        let mut buf = Buffer::empty(area);
        MetricPanel { report: &report.d1 }.render(area, &mut buf);
        let text = buffer_text(&buf);
        assert!(text.contains("D1 Retention: gate_40 vs gate_30"));
        assert!(text.contains("+15.00 pp"));
    }

    #[test]
    fn test_error_panel_shows_remediation() {
        let failure = Failure {
            title: "no rows".to_owned(),
            message: "No data: load a CSV".to_owned(),
        };
        let area = Rect::new(0, 0, 40, 5);
        let mut buf = Buffer::empty(area);
        ErrorPanel { failure: &failure }.render(area, &mut buf);
        let text = buffer_text(&buf);
        assert!(text.contains("no rows"));
        assert!(text.contains("No data: load a CSV"));
    }

    #[test]
    fn test_column_summary_uses_mapped_names() {
        let table: RowTable = (1..=4u64)
            .map(|i| UserRow::new(i, if i % 2 == 0 { "a" } else { "b" }, i <= 2, i == 1))
            .collect();
        let description = describe(&table).unwrap();
        let columns = ColumnMapping::default();

        let area = Rect::new(0, 0, 110, 7);
        let mut buf = Buffer::empty(area);
        ColumnSummaryPanel {
            description: &description,
            columns: &columns,
        }
        .render(area, &mut buf);
        let text = buffer_text(&buf);
        assert!(text.contains("2 groups in version"));
        assert!(text.contains("userid"));
        assert!(text.contains("retention_1"));
        assert!(text.contains("0.5000"));
        assert!(text.contains("0.2500"));
    }

    #[test]
    fn test_row_preview_window() {
        let rows = (1..=50u64)
            .map(|i| UserRow::new(i, "gate_30", i % 2 == 0, false))
            .collect::<Vec<_>>();
        let columns = ColumnMapping::default();

        let area = Rect::new(0, 0, 70, 8);
        let mut buf = Buffer::empty(area);
        RowPreviewPanel {
            rows: &rows,
            offset: 10,
            columns: &columns,
        }
        .render(area, &mut buf);
        let text = buffer_text(&buf);
        assert!(text.contains("rows 11-15 of 50"));
        assert!(text.contains("gate_30"));
        assert!(text.contains("11"));
        assert!(!text.contains("16 "));

        let mut buf = Buffer::empty(area);
        RowPreviewPanel {
            rows: &[],
            offset: 0,
            columns: &columns,
        }
        .render(area, &mut buf);
        assert!(buffer_text(&buf).contains("no rows"));
    }
}
