use std::path::PathBuf;

use anyhow::Context as _;
use retention_data::{
    loader::{self, ColumnMapping},
    synthetic::SyntheticConfig,
};

use crate::util::Output;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GenerateArg {
    /// Number of users to generate
    #[arg(long, default_value_t = 90_189)]
    users: u64,
    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Output file path (default: stdout)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub fn run(arg: &GenerateArg) -> anyhow::Result<()> {
    let GenerateArg {
        users,
        seed,
        output,
    } = arg;

    let config = SyntheticConfig {
        users: *users,
        seed: *seed,
        ..SyntheticConfig::default()
    };
    tracing::info!(users, seed, "generating synthetic dataset");
    let table = config.generate().context("Failed to generate sample data")?;

    let mut output = Output::from_output_path(output.as_deref())?;
    loader::write_csv(&table, &mut output, &ColumnMapping::default())
        .with_context(|| format!("Failed to write CSV to {}", output.display_path()))?;
    output.finish()?;

    Ok(())
}
