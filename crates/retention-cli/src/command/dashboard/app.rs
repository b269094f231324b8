use std::sync::Arc;

use crossterm::event::{Event, KeyCode};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect, Spacing},
    style::{Color, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Text},
    widgets::{Block, Paragraph},
};
use retention_data::loader::ColumnMapping;
use retention_engine::{
    cache::{DatasetCache, DatasetKey},
    config::{AnalysisConfig, GroupOrder},
    error::EngineError,
    report::ExperimentReport,
    row::Metric,
    summary::{TableDescription, describe},
};

use crate::{
    command::{
        dashboard::widgets::{
            ColumnSummaryPanel, DistributionPanel, ErrorPanel, KpiStrip, MetricPanel,
            RowPreviewPanel, SummaryPanel,
        },
        dataset::{DataSource, Dataset},
    },
    format,
    tui::App,
};

/// Why the dashboard has nothing to show.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub title: String,
    pub message: String,
}

impl Failure {
    fn engine(err: &EngineError) -> Self {
        Self {
            title: err.to_string(),
            message: err.remediation(),
        }
    }

    fn load(err: &anyhow::Error) -> Self {
        Self {
            title: "Failed to load data".to_owned(),
            message: format!("{err:#}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, derive_more::IsVariant)]
pub enum View {
    /// KPIs, metric comparisons, and the recommendation.
    #[default]
    Results,
    /// Column summary and a scrollable preview of the rows.
    Data,
}

#[derive(Debug)]
pub struct DashboardApp {
    source: DataSource,
    columns: ColumnMapping,
    config: AnalysisConfig,
    cache: DatasetCache<Dataset>,
    current_key: Option<DatasetKey>,
    dataset: Option<Arc<Dataset>>,
    description: Option<TableDescription>,
    analysis: Result<ExperimentReport, Failure>,
    view: View,
    preview_offset: usize,
    status: String,
    should_exit: bool,
}

impl DashboardApp {
    pub fn new(source: DataSource, columns: ColumnMapping, config: AnalysisConfig) -> Self {
        let mut app = Self {
            source,
            columns,
            config,
            cache: DatasetCache::default(),
            current_key: None,
            dataset: None,
            description: None,
            analysis: Err(Failure {
                title: "No data".to_owned(),
                message: "Press r to load the dataset.".to_owned(),
            }),
            view: View::default(),
            preview_offset: 0,
            status: String::new(),
            should_exit: false,
        };
        app.reload();
        app
    }

    /// Re-reads the source. Unchanged bytes are served from the cache; changed
    /// bytes are parsed again and the previous entry is dropped.
    fn reload(&mut self) {
        let (key, bytes) = match self.source.fingerprint() {
            Ok(fingerprint) => fingerprint,
            Err(err) => return self.fail_reload(&err),
        };

        let cached = self.cache.contains(&key);
        let source = &self.source;
        let columns = &self.columns;
        let dataset = match self
            .cache
            .get_or_try_insert_with(&key, || source.materialize(bytes.as_deref(), columns))
        {
            Ok(dataset) => dataset,
            Err(err) => return self.fail_reload(&err),
        };

        if let Some(previous) = self.current_key.take()
            && previous != key
        {
            self.cache.invalidate(&previous);
            tracing::info!(old = previous.short(), new = key.short(), "dataset changed");
        }

        let rows = match &dataset.load {
            Some(load) => format::load_summary(load),
            None => format!("{} rows generated", dataset.table.len()),
        };
        self.status = format!(
            "{rows} | key {} ({}) | cache hits {} / misses {}",
            key.short(),
            if cached { "cached" } else { "parsed" },
            self.cache.hits(),
            self.cache.misses(),
        );
        self.current_key = Some(key);
        self.description = describe(&dataset.table).ok();
        self.preview_offset = self
            .preview_offset
            .min(dataset.table.len().saturating_sub(1));
        self.dataset = Some(dataset);
        self.analyze();
    }

    /// Forgets the current dataset so nothing is shown for data that could
    /// not be read.
    fn fail_reload(&mut self, err: &anyhow::Error) {
        tracing::warn!(error = %format!("{err:#}"), "reload failed");
        if let Some(previous) = self.current_key.take() {
            self.cache.invalidate(&previous);
        }
        self.dataset = None;
        self.description = None;
        self.preview_offset = 0;
        self.status = "Reload failed".to_owned();
        self.analysis = Err(Failure::load(err));
    }

    fn analyze(&mut self) {
        let Some(dataset) = &self.dataset else {
            return;
        };
        self.analysis =
            ExperimentReport::build(&dataset.table, &self.config).map_err(|err| Failure::engine(&err));
    }

    /// Makes the current second group the baseline.
    fn swap_order(&mut self) {
        let Ok(report) = &self.analysis else {
            return;
        };
        self.config.group_order = GroupOrder::Baseline(report.groups[1].group.clone());
        self.analyze();
    }

    fn toggle_correction(&mut self) {
        self.config.continuity_correction = !self.config.continuity_correction;
        self.analyze();
    }

    fn toggle_view(&mut self) {
        self.view = match self.view {
            View::Results => View::Data,
            View::Data => View::Results,
        };
    }

    fn scroll(&mut self, down: bool) {
        let Some(dataset) = &self.dataset else {
            return;
        };
        let last = dataset.table.len().saturating_sub(1);
        self.preview_offset = if down {
            (self.preview_offset + 1).min(last)
        } else {
            self.preview_offset.saturating_sub(1)
        };
    }

    fn draw_help(&self, frame: &mut Frame, area: Rect) {
        let help = match self.view {
            View::Results => {
                let yates = if self.config.continuity_correction {
                    "on"
                } else {
                    "off"
                };
                format!(
                    "r: Reload | s: Swap order | y: Yates ({yates}) | d: Data | q/Esc: Quit"
                )
            }
            View::Data => "↑/↓: Scroll | d: Results | r: Reload | q/Esc: Quit".to_owned(),
        };
        let help = Text::from(help)
            .style(Style::default().fg(Color::DarkGray))
            .centered();
        frame.render_widget(help, area);
    }

    fn draw_results(&self, frame: &mut Frame, area: Rect, report: &ExperimentReport) {
        let [kpi_area, metrics_area, bottom_area] = Layout::vertical([
            Constraint::Length(5),
            Constraint::Fill(1),
            Constraint::Length(9),
        ])
        .spacing(Spacing::Overlap(1))
        .areas(area);
        let [d1_area, d7_area] =
            Layout::horizontal([Constraint::Fill(1), Constraint::Fill(1)])
                .spacing(Spacing::Overlap(1))
                .areas(metrics_area);
        let [distribution_area, summary_area] =
            Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)])
                .spacing(Spacing::Overlap(1))
                .areas(bottom_area);

        frame.render_widget(KpiStrip { report }, kpi_area);
        frame.render_widget(
            MetricPanel {
                report: report.metric(Metric::D1),
            },
            d1_area,
        );
        frame.render_widget(
            MetricPanel {
                report: report.metric(Metric::D7),
            },
            d7_area,
        );
        frame.render_widget(DistributionPanel { report }, distribution_area);
        frame.render_widget(SummaryPanel { report }, summary_area);
    }

    fn draw_data(
        &self,
        frame: &mut Frame,
        area: Rect,
        dataset: &Dataset,
        description: &TableDescription,
    ) {
        let [summary_area, preview_area] =
            Layout::vertical([Constraint::Length(7), Constraint::Fill(1)])
                .spacing(Spacing::Overlap(1))
                .areas(area);
        frame.render_widget(
            ColumnSummaryPanel {
                description,
                columns: &self.columns,
            },
            summary_area,
        );
        frame.render_widget(
            RowPreviewPanel {
                rows: dataset.table.rows(),
                offset: self.preview_offset,
                columns: &self.columns,
            },
            preview_area,
        );
    }
}

impl App for DashboardApp {
    fn should_exit(&self) -> bool {
        self.should_exit
    }

    fn handle_event(&mut self, event: &Event) {
        if let Some(event) = event.as_key_event() {
            match event.code {
                KeyCode::Char('q') | KeyCode::Esc => self.should_exit = true,
                KeyCode::Char('r') => self.reload(),
                KeyCode::Char('s') => self.swap_order(),
                KeyCode::Char('y') => self.toggle_correction(),
                KeyCode::Char('d') => self.toggle_view(),
                KeyCode::Up if self.view.is_data() => self.scroll(false),
                KeyCode::Down if self.view.is_data() => self.scroll(true),
                _ => {}
            }
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let [header_area, main_area, help_area] = Layout::vertical([
            Constraint::Length(4),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let header = Paragraph::new(vec![
            Line::raw(format!("Source: {}", self.source)),
            Line::raw(self.status.clone()).style(Style::default().fg(Color::DarkGray)),
        ])
        .block(
            Block::bordered()
                .title("Retention A/B Test Dashboard")
                .merge_borders(MergeStrategy::Exact),
        );
        frame.render_widget(header, header_area);
        self.draw_help(frame, help_area);

        match (self.view, &self.analysis, &self.dataset, &self.description) {
            (View::Data, _, Some(dataset), Some(description)) => {
                self.draw_data(frame, main_area, dataset, description);
            }
            (_, Ok(report), _, _) => self.draw_results(frame, main_area, report),
            (_, Err(failure), _, _) => frame.render_widget(ErrorPanel { failure }, main_area),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use crossterm::event::KeyEvent;
    use ratatui::{Terminal, backend::TestBackend};
    use retention_data::synthetic::{ArmProfile, SyntheticConfig};

    use super::*;

    fn press(app: &mut DashboardApp, key: impl Into<KeyPress>) {
        let KeyPress(code) = key.into();
        app.handle_event(&Event::Key(KeyEvent::from(code)));
    }

    struct KeyPress(KeyCode);

    impl From<char> for KeyPress {
        fn from(c: char) -> Self {
            KeyPress(KeyCode::Char(c))
        }
    }

    impl From<KeyCode> for KeyPress {
        fn from(code: KeyCode) -> Self {
            KeyPress(code)
        }
    }

    fn sample_app() -> DashboardApp {
        let source = DataSource::Sample(SyntheticConfig {
            users: 2_000,
            ..SyntheticConfig::default()
        });
        DashboardApp::new(source, ColumnMapping::default(), AnalysisConfig::default())
    }

    fn report(app: &DashboardApp) -> &ExperimentReport {
        app.analysis.as_ref().unwrap()
    }

    #[test]
    fn test_starts_with_report() {
        let app = sample_app();
        let report = report(&app);
        assert_eq!(report.overview.total_users, 2_000);
        assert_eq!(report.groups[0].group, "gate_30");
    }

    #[test]
    fn test_swap_and_yates_keys() {
        let mut app = sample_app();
        let before = report(&app).d1.comparison.difference;

        press(&mut app, 's');
        let swapped = report(&app);
        assert_eq!(swapped.groups[0].group, "gate_40");
        assert!((swapped.d1.comparison.difference + before).abs() < 1e-12);

        press(&mut app, 's');
        assert_eq!(report(&app).groups[0].group, "gate_30");

        press(&mut app, 'y');
        assert!(report(&app).d1.comparison.continuity_corrected);
        press(&mut app, 'y');
        assert!(!report(&app).d1.comparison.continuity_corrected);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = sample_app();
        assert!(!app.should_exit());
        press(&mut app, 'q');
        assert!(app.should_exit());

        let mut app = sample_app();
        press(&mut app, KeyCode::Esc);
        assert!(app.should_exit());
    }

    #[test]
    fn test_reload_uses_cache_until_bytes_change() {
        let path: PathBuf = std::env::temp_dir().join(format!(
            "retention-dashboard-{}.csv",
            std::process::id()
        ));
        let header = "userid,version,retention_1,retention_7\n";
        fs::write(&path, format!("{header}1,a,1,0\n2,b,0,0\n")).unwrap();

        let mut app = DashboardApp::new(
            DataSource::Csv(path.clone()),
            ColumnMapping::default(),
            AnalysisConfig::default(),
        );
        assert_eq!(app.cache.misses(), 1);
        let first_key = app.current_key.clone().unwrap();

        press(&mut app, 'r');
        assert_eq!(app.cache.hits(), 1);
        assert_eq!(app.cache.len(), 1);

        fs::write(&path, format!("{header}1,a,1,0\n2,b,0,0\n3,b,1,1\n")).unwrap();
        press(&mut app, 'r');
        assert_eq!(app.cache.misses(), 2);
        assert_eq!(app.cache.len(), 1);
        assert!(!app.cache.contains(&first_key));
        assert_eq!(report(&app).overview.total_users, 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_errors_become_panels() {
        let source = DataSource::Sample(SyntheticConfig {
            users: 100,
            arms: vec![ArmProfile::new("only", 0.5, 0.2)],
            ..SyntheticConfig::default()
        });
        let app = DashboardApp::new(source, ColumnMapping::default(), AnalysisConfig::default());
        let failure = app.analysis.as_ref().unwrap_err();
        assert!(failure.message.starts_with("Wrong number of groups"));

        let mut app = DashboardApp::new(
            DataSource::Csv(PathBuf::from("/nonexistent/retention.csv")),
            ColumnMapping::default(),
            AnalysisConfig::default(),
        );
        assert_eq!(app.analysis.as_ref().unwrap_err().title, "Failed to load data");
        press(&mut app, 's');
        assert!(app.analysis.is_err());
    }

    fn temp_csv(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "retention-dashboard-{name}-{}.csv",
            std::process::id()
        ));
        fs::write(&path, format!("userid,version,retention_1,retention_7\n{body}")).unwrap();
        path
    }

    fn csv_app(path: &std::path::Path) -> DashboardApp {
        DashboardApp::new(
            DataSource::Csv(path.to_owned()),
            ColumnMapping::default(),
            AnalysisConfig::default(),
        )
    }

    #[test]
    fn test_status_reports_dropped_rows() {
        let path = temp_csv("dropped", "1,a,1,0\n2,b,0,0\n3,b,maybe,0\n2,b,1,1\n");
        let app = csv_app(&path);
        fs::remove_file(&path).unwrap();

        assert!(
            app.status
                .starts_with("3 loaded, 1 dropped, 1 duplicate user ids"),
            "{}",
            app.status
        );
        assert_eq!(report(&app).overview.total_users, 3);
    }

    #[test]
    fn test_failed_reload_keeps_error_visible() {
        let path = temp_csv("vanished", "1,a,1,0\n2,b,0,0\n");
        let mut app = csv_app(&path);
        let key = app.current_key.clone().unwrap();
        assert!(app.analysis.is_ok());

        fs::remove_file(&path).unwrap();
        press(&mut app, 'r');
        assert!(app.analysis.is_err());
        assert!(app.dataset.is_none());
        assert!(app.current_key.is_none());
        assert!(!app.cache.contains(&key));

        for c in ['y', 's', 'd'] {
            press(&mut app, c);
            assert!(app.analysis.is_err(), "after {c}");
        }
        assert_eq!(app.status, "Reload failed");
    }

    #[test]
    fn test_unparseable_reload_clears_dataset() {
        let path = temp_csv("header", "1,a,1,0\n2,b,0,0\n");
        let mut app = csv_app(&path);
        fs::write(&path, "id,arm\n1,a\n").unwrap();
        press(&mut app, 'r');
        fs::remove_file(&path).unwrap();

        assert!(app.dataset.is_none());
        assert_eq!(app.cache.len(), 0);
        press(&mut app, 'y');
        assert_eq!(
            app.analysis.as_ref().unwrap_err().title,
            "Failed to load data"
        );
    }

    #[test]
    fn test_data_view_scrolls() {
        let mut app = sample_app();
        press(&mut app, KeyCode::Down);
        assert_eq!(app.preview_offset, 0);

        press(&mut app, 'd');
        assert!(app.view.is_data());
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.preview_offset, 1);

        press(&mut app, 'd');
        assert!(app.view.is_results());
    }

    #[test]
    fn test_draw_both_views() {
        let mut app = sample_app();
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();

        terminal.draw(|f| app.draw(f)).unwrap();
        let text = format!("{:?}", terminal.backend().buffer());
        assert!(text.contains("Executive Summary"));

        press(&mut app, 'd');
        terminal.draw(|f| app.draw(f)).unwrap();
        let text = format!("{:?}", terminal.backend().buffer());
        assert!(text.contains("Data Summary"));
        assert!(text.contains("Sample Data (rows 1-"));
    }
}
