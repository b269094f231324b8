use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use self::{analyze::AnalyzeArg, dashboard::DashboardArg, generate::GenerateArg};

mod analyze;
mod dashboard;
mod dataset;
mod generate;
mod settings;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log verbosity (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    /// What mode to run the program in
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Subcommand, derive_more::IsVariant)]
enum Mode {
    /// Analyze an experiment and print a report
    Analyze(#[clap(flatten)] AnalyzeArg),
    /// Write a synthetic experiment dataset as CSV
    Generate(#[clap(flatten)] GenerateArg),
    /// Explore an experiment in the terminal dashboard
    Dashboard(#[clap(flatten)] DashboardArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    let mode = args.mode.unwrap_or(Mode::Analyze(AnalyzeArg::default()));
    init_logging(args.log_level, mode.is_dashboard());

    match mode {
        Mode::Analyze(arg) => analyze::run(&arg)?,
        Mode::Generate(arg) => generate::run(&arg)?,
        Mode::Dashboard(arg) => dashboard::run(&arg)?,
    }
    Ok(())
}

/// Installs the stderr subscriber.
///
/// While the dashboard owns the terminal, log lines would corrupt the screen,
/// so logging is off unless `RUST_LOG` asks for it.
fn init_logging(level: tracing::Level, dashboard: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if dashboard {
            EnvFilter::new("off")
        } else {
            EnvFilter::new(level.to_string())
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
