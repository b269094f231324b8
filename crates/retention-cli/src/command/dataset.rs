use std::{fmt, fs, path::PathBuf};

use anyhow::Context as _;
use retention_data::{
    loader::{self, ColumnMapping, LoadSummary},
    synthetic::SyntheticConfig,
};
use retention_engine::{cache::DatasetKey, row::RowTable};

/// Where the experiment rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Csv(PathBuf),
    Sample(SyntheticConfig),
}

impl DataSource {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => DataSource::Csv(path),
            None => DataSource::Sample(SyntheticConfig::default()),
        }
    }

    /// Reads the raw bytes behind this source, keyed by their digest.
    ///
    /// Sample data has no bytes of its own; its key covers the generator
    /// settings instead.
    pub fn fingerprint(&self) -> anyhow::Result<(DatasetKey, Option<Vec<u8>>)> {
        match self {
            DataSource::Csv(path) => {
                let bytes = fs::read(path)
                    .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;
                Ok((DatasetKey::from_bytes(&bytes), Some(bytes)))
            }
            DataSource::Sample(config) => {
                let bytes = format!("synthetic:{}:{}:{:?}", config.users, config.seed, config.arms);
                Ok((DatasetKey::from_bytes(bytes.as_bytes()), None))
            }
        }
    }

    /// Parses or generates the dataset.
    ///
    /// `bytes` are the CSV contents returned by [`Self::fingerprint`].
    pub fn materialize(
        &self,
        bytes: Option<&[u8]>,
        columns: &ColumnMapping,
    ) -> anyhow::Result<Dataset> {
        match (self, bytes) {
            (DataSource::Csv(path), Some(bytes)) => {
                let loaded = loader::load_csv_bytes(bytes, columns)
                    .with_context(|| format!("Failed to load CSV file: {}", path.display()))?;
                let load = loaded.summary();
                Ok(Dataset {
                    table: loaded.table,
                    load: Some(load),
                })
            }
            (DataSource::Csv(path), None) => {
                let loaded = loader::load_csv_path(path, columns)
                    .with_context(|| format!("Failed to load CSV file: {}", path.display()))?;
                let load = loaded.summary();
                Ok(Dataset {
                    table: loaded.table,
                    load: Some(load),
                })
            }
            (DataSource::Sample(config), _) => {
                tracing::info!(
                    users = config.users,
                    seed = config.seed,
                    "no CSV given, using synthetic sample data"
                );
                let table = config
                    .generate()
                    .context("Failed to generate sample data")?;
                Ok(Dataset { table, load: None })
            }
        }
    }

    pub fn load(&self, columns: &ColumnMapping) -> anyhow::Result<Dataset> {
        self.materialize(None, columns)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Csv(path) => write!(f, "{}", path.display()),
            DataSource::Sample(config) => {
                write!(f, "synthetic sample (seed {}, {} users)", config.seed, config.users)
            }
        }
    }
}

/// A parsed dataset and, for CSV input, what the loader dropped.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub table: RowTable,
    pub load: Option<LoadSummary>,
}
