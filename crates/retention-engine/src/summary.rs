//! Per-group KPI aggregation
//!
//! Groups the rows of a [`RowTable`] by experiment arm and reduces each group
//! to a [`GroupSummary`]: user count, retained counts, and D1/D7 retention
//! rates. The whole-table [`KpiOverview`] is computed the same way without
//! grouping. [`describe`] summarizes each column for data exploration.
//!
//! # Invariants
//!
//! - Every row lands in exactly one group: the group counts sum to the
//!   table's row count.
//! - Every rate is a ratio of a retained count to a non-zero user count, so
//!   it lies in `[0.0, 1.0]`.
//! - The output is a [`BTreeMap`] keyed by label; iteration order is the
//!   byte-wise order of the labels and does not depend on row order.
//!
//! # Examples
//!
//! ```
//! use retention_engine::{
//!     row::{RowTable, UserRow},
//!     summary::summarize,
//! };
//!
//! let table = RowTable::new(vec![
//!     UserRow::new(1u64, "gate_30", true, false),
//!     UserRow::new(2u64, "gate_30", false, false),
//!     UserRow::new(3u64, "gate_40", true, true),
//! ]);
//!
//! let groups = summarize(&table)?;
//! assert_eq!(groups["gate_30"].users, 2);
//! assert_eq!(groups["gate_30"].d1_rate, 0.5);
//! assert_eq!(groups["gate_40"].d7_rate, 1.0);
//! # Ok::<(), retention_engine::error::EngineError>(())
//! ```

use std::collections::{BTreeMap, BTreeSet};

use retention_stats::descriptive::DescriptiveStats;
use serde::{Deserialize, Serialize};

use crate::{
    error::EngineError,
    row::{Metric, RowTable, UserId, UserRow},
};

/// Retention KPIs of one experiment group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Group label as it appears in the data.
    pub group: String,
    /// Number of users in the group.
    pub users: usize,
    /// Users with `retained_1 = true`.
    pub d1_retained: usize,
    /// Users with `retained_7 = true`.
    pub d7_retained: usize,
    /// `d1_retained / users`
    pub d1_rate: f64,
    /// `d7_retained / users`
    pub d7_rate: f64,
}

impl GroupSummary {
    fn from_counts(group: String, counts: Counts) -> Self {
        Self {
            group,
            users: counts.users,
            d1_retained: counts.d1_retained,
            d7_retained: counts.d7_retained,
            d1_rate: counts.rate(counts.d1_retained),
            d7_rate: counts.rate(counts.d7_retained),
        }
    }

    #[must_use]
    pub fn retained(&self, metric: Metric) -> usize {
        match metric {
            Metric::D1 => self.d1_retained,
            Metric::D7 => self.d7_retained,
        }
    }

    #[must_use]
    pub fn rate(&self, metric: Metric) -> f64 {
        match metric {
            Metric::D1 => self.d1_rate,
            Metric::D7 => self.d7_rate,
        }
    }
}

/// Whole-experiment KPIs, ignoring group assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiOverview {
    pub total_users: usize,
    /// Daily active users. Every participant is active on the day of install,
    /// so this equals `total_users` for an install cohort.
    pub daily_active_users: usize,
    pub d1_rate: f64,
    pub d7_rate: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    users: usize,
    d1_retained: usize,
    d7_retained: usize,
}

impl Counts {
    fn add(&mut self, row: &UserRow) {
        self.users += 1;
        self.d1_retained += usize::from(row.retained_1);
        self.d7_retained += usize::from(row.retained_7);
    }

    #[expect(clippy::cast_precision_loss)]
    fn rate(self, retained: usize) -> f64 {
        if self.users == 0 {
            0.0
        } else {
            retained as f64 / self.users as f64
        }
    }
}

/// Groups rows by `group` and computes each group's count and retention rates.
///
/// Fails with [`EngineError::EmptyInput`] when the table has no rows.
pub fn summarize(table: &RowTable) -> Result<BTreeMap<String, GroupSummary>, EngineError> {
    if table.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    let mut counts = BTreeMap::<&str, Counts>::new();
    for row in table {
        counts.entry(row.group.as_str()).or_default().add(row);
    }

    let summaries = counts
        .into_iter()
        .map(|(group, counts)| {
            let group = group.to_owned();
            (group.clone(), GroupSummary::from_counts(group, counts))
        })
        .collect::<BTreeMap<_, _>>();

    tracing::debug!(
        rows = table.len(),
        groups = summaries.len(),
        "summarized retention table"
    );
    Ok(summaries)
}

/// Computes the whole-table KPIs.
///
/// Fails with [`EngineError::EmptyInput`] when the table has no rows.
pub fn overview(table: &RowTable) -> Result<KpiOverview, EngineError> {
    if table.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    let mut counts = Counts::default();
    for row in table {
        counts.add(row);
    }

    Ok(KpiOverview {
        total_users: counts.users,
        daily_active_users: counts.users,
        d1_rate: counts.rate(counts.d1_retained),
        d7_rate: counts.rate(counts.d7_retained),
    })
}

/// Column-by-column summary of a table, for data exploration.
///
/// Retention flags are described as 0/1 values, so their mean is the
/// retention rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescription {
    /// Numeric user ids only; `None` when every id is textual.
    pub user_id: Option<DescriptiveStats>,
    pub retained_1: DescriptiveStats,
    pub retained_7: DescriptiveStats,
    /// Number of distinct group labels.
    pub groups: usize,
}

impl TableDescription {
    #[must_use]
    pub fn retained(&self, metric: Metric) -> &DescriptiveStats {
        match metric {
            Metric::D1 => &self.retained_1,
            Metric::D7 => &self.retained_7,
        }
    }
}

/// Describes every column of `table`.
///
/// Fails with [`EngineError::EmptyInput`] when the table has no rows.
#[expect(clippy::cast_precision_loss)]
pub fn describe(table: &RowTable) -> Result<TableDescription, EngineError> {
    let flags = |metric: Metric| {
        DescriptiveStats::new(table.iter().map(|row| f64::from(u8::from(row.retained(metric)))))
            .ok_or(EngineError::EmptyInput)
    };
    let retained_1 = flags(Metric::D1)?;
    let retained_7 = flags(Metric::D7)?;

    let user_id = DescriptiveStats::new(table.iter().filter_map(|row| match row.user_id {
        UserId::Numeric(id) => Some(id as f64),
        UserId::Text(_) => None,
    }));
    let groups = table
        .iter()
        .map(|row| row.group.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    Ok(TableDescription {
        user_id,
        retained_1,
        retained_7,
        groups,
    })
}
