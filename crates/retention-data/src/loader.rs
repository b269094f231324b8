//! CSV loading and export
//!
//! Parses an experiment CSV into a [`RowTable`], validating every row. Rows
//! that cannot be interpreted are dropped and recorded in
//! [`LoadedTable::dropped`] with their line number and reason, so the caller
//! can report how many rows the analysis excludes.
//!
//! # Expected Format
//!
//! ```text
//! userid,version,retention_1,retention_7
//! 116,gate_30,False,False
//! 337,gate_30,True,False
//! 377,gate_40,1,0
//! ```
//!
//! Column names are configurable through [`ColumnMapping`]; extra columns are
//! ignored. Flags accept `0`, `1`, `true` and `false` in any case, as well as
//! `0.0` and `1.0`.

use std::{
    collections::HashSet,
    fs::File,
    io::{self, Read},
    path::Path,
};

use retention_engine::row::{RowTable, UserId, UserRow};
use serde::{Deserialize, Serialize};

/// Names of the CSV columns holding each field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub user_id: String,
    pub group: String,
    pub retained_1: String,
    pub retained_7: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            user_id: "userid".to_owned(),
            group: "version".to_owned(),
            retained_1: "retention_1".to_owned(),
            retained_7: "retention_7".to_owned(),
        }
    }
}

impl ColumnMapping {
    fn header(&self) -> [&str; 4] {
        [
            &self.user_id,
            &self.group,
            &self.retained_1,
            &self.retained_7,
        ]
    }
}

/// Errors that abort loading as a whole.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum LoadError {
    #[display("failed to read CSV input")]
    Io(io::Error),
    #[display("failed to parse CSV header")]
    Header(csv::Error),
    #[display("required column '{column}' not found in header")]
    MissingColumn { column: String },
}

/// Why a row was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DropReason {
    #[display("missing field '{column}'")]
    MissingField { column: String },
    #[display("empty field '{column}'")]
    EmptyField { column: String },
    #[display("invalid flag '{value}' in column '{column}'")]
    InvalidFlag { column: String, value: String },
    #[display("unreadable record: {message}")]
    Malformed { message: String },
}

/// A row excluded from the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedRow {
    /// 1-based line number in the input, when known.
    pub line: Option<u64>,
    pub reason: DropReason,
}

/// Result of loading a CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedTable {
    pub table: RowTable,
    pub dropped: Vec<DroppedRow>,
    /// Number of rows whose user id already appeared earlier. These rows are
    /// kept; duplicates bias the aggregates and should be reported.
    pub duplicate_user_ids: usize,
}

/// Counts of a load, for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub rows: usize,
    pub dropped: usize,
    pub duplicate_user_ids: usize,
}

impl LoadedTable {
    #[must_use]
    pub fn summary(&self) -> LoadSummary {
        LoadSummary {
            rows: self.table.len(),
            dropped: self.dropped.len(),
            duplicate_user_ids: self.duplicate_user_ids,
        }
    }
}

pub fn load_csv_path<P>(path: P, columns: &ColumnMapping) -> Result<LoadedTable, LoadError>
where
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref()).map_err(LoadError::Io)?;
    load_csv_reader(io::BufReader::new(file), columns)
}

pub fn load_csv_bytes(bytes: &[u8], columns: &ColumnMapping) -> Result<LoadedTable, LoadError> {
    load_csv_reader(bytes, columns)
}

/// Parses CSV from `reader`, dropping invalid rows.
///
/// # Examples
///
/// ```
/// use retention_data::loader::{ColumnMapping, load_csv_bytes};
///
/// let csv = b"userid,version,retention_1,retention_7\n\
///             1,gate_30,True,False\n\
///             2,gate_40,maybe,False\n";
/// let loaded = load_csv_bytes(csv, &ColumnMapping::default())?;
/// assert_eq!(loaded.table.len(), 1);
/// assert_eq!(loaded.dropped.len(), 1);
/// # Ok::<(), retention_data::loader::LoadError>(())
/// ```
pub fn load_csv_reader<R>(reader: R, columns: &ColumnMapping) -> Result<LoadedTable, LoadError>
where
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(LoadError::Header)?.clone();
    let index_of = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| LoadError::MissingColumn {
                column: column.to_owned(),
            })
    };
    let indices = RowIndices {
        user_id: index_of(&columns.user_id)?,
        group: index_of(&columns.group)?,
        retained_1: index_of(&columns.retained_1)?,
        retained_7: index_of(&columns.retained_7)?,
    };

    let mut loaded = LoadedTable::default();
    let mut seen = HashSet::new();
    for result in rdr.records() {
        let (line, parsed) = match result {
            Ok(record) => (
                record.position().map(csv::Position::line),
                parse_record(&record, &indices, columns),
            ),
            Err(err) => (
                err.position().map(csv::Position::line),
                Err(DropReason::Malformed {
                    message: err.to_string(),
                }),
            ),
        };
        match parsed {
            Ok(row) => {
                if !seen.insert(row.user_id.clone()) {
                    loaded.duplicate_user_ids += 1;
                }
                loaded.table.push(row);
            }
            Err(reason) => {
                tracing::debug!(?line, %reason, "dropping CSV row");
                loaded.dropped.push(DroppedRow { line, reason });
            }
        }
    }

    if !loaded.dropped.is_empty() {
        tracing::warn!(
            dropped = loaded.dropped.len(),
            "dropped invalid rows while loading CSV"
        );
    }
    if loaded.duplicate_user_ids > 0 {
        tracing::warn!(
            duplicates = loaded.duplicate_user_ids,
            "duplicate user ids found; aggregates may be biased"
        );
    }
    tracing::info!(rows = loaded.table.len(), "loaded CSV");
    Ok(loaded)
}

struct RowIndices {
    user_id: usize,
    group: usize,
    retained_1: usize,
    retained_7: usize,
}

fn parse_record(
    record: &csv::StringRecord,
    indices: &RowIndices,
    columns: &ColumnMapping,
) -> Result<UserRow, DropReason> {
    let field = |index: usize, column: &str| -> Result<&str, DropReason> {
        match record.get(index) {
            None => Err(DropReason::MissingField {
                column: column.to_owned(),
            }),
            Some("") => Err(DropReason::EmptyField {
                column: column.to_owned(),
            }),
            Some(value) => Ok(value),
        }
    };
    let flag = |index: usize, column: &str| -> Result<bool, DropReason> {
        let value = field(index, column)?;
        parse_flag(value).ok_or_else(|| DropReason::InvalidFlag {
            column: column.to_owned(),
            value: value.to_owned(),
        })
    };

    let user_id = parse_user_id(field(indices.user_id, &columns.user_id)?);
    let group = field(indices.group, &columns.group)?.to_owned();
    let retained_1 = flag(indices.retained_1, &columns.retained_1)?;
    let retained_7 = flag(indices.retained_7, &columns.retained_7)?;

    Ok(UserRow {
        user_id,
        group,
        retained_1,
        retained_7,
    })
}

fn parse_user_id(value: &str) -> UserId {
    value
        .parse::<u64>()
        .map_or_else(|_| UserId::Text(value.to_owned()), UserId::Numeric)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(true),
        "0" | "0.0" | "false" => Some(false),
        _ => None,
    }
}

/// Writes `table` as CSV with the header named by `columns`.
///
/// Flags are written as `True`/`False`, which [`load_csv_reader`] reads back.
pub fn write_csv<W>(table: &RowTable, writer: W, columns: &ColumnMapping) -> csv::Result<()>
where
    W: io::Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(columns.header())?;
    let flag = |value: bool| if value { "True" } else { "False" };
    for row in table {
        wtr.write_record([
            row.user_id.to_string().as_str(),
            row.group.as_str(),
            flag(row.retained_1),
            flag(row.retained_7),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
