use crate::{
    command::{dataset::DataSource, settings::AnalysisArgs},
    tui::Tui,
};

use self::app::DashboardApp;

mod app;
mod widgets;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct DashboardArg {
    #[clap(flatten)]
    analysis: AnalysisArgs,
}

pub fn run(arg: &DashboardArg) -> anyhow::Result<()> {
    let settings = arg.analysis.settings()?;
    let source = DataSource::from_path(arg.analysis.csv.clone());

    let mut app = DashboardApp::new(source, settings.columns, settings.analysis);
    Tui::new().run(&mut app)?;

    Ok(())
}
