//! Per-user experiment rows and the table the engine reads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an experiment participant.
///
/// Loaders produce [`UserId::Numeric`] when the raw id parses as an unsigned
/// integer and [`UserId::Text`] otherwise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Numeric(u64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Numeric(id) => fmt::Display::fmt(id, f),
            UserId::Text(id) => fmt::Display::fmt(id, f),
        }
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        UserId::Numeric(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        UserId::Text(id)
    }
}

/// Retention metric selecting one of the per-user flags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
pub enum Metric {
    /// Day-1 retention (`retained_1`).
    #[display("D1")]
    D1,
    /// Day-7 retention (`retained_7`).
    #[display("D7")]
    D7,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::D1, Metric::D7];

    /// Days after install the metric looks at.
    #[must_use]
    pub fn day(self) -> u32 {
        match self {
            Metric::D1 => 1,
            Metric::D7 => 7,
        }
    }
}

/// One experiment participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub user_id: UserId,
    /// Experiment arm the user was assigned to.
    pub group: String,
    /// Whether the user returned on day 1.
    pub retained_1: bool,
    /// Whether the user returned on day 7.
    pub retained_7: bool,
}

impl UserRow {
    pub fn new(
        user_id: impl Into<UserId>,
        group: impl Into<String>,
        retained_1: bool,
        retained_7: bool,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            group: group.into(),
            retained_1,
            retained_7,
        }
    }

    #[must_use]
    pub fn retained(&self, metric: Metric) -> bool {
        match metric {
            Metric::D1 => self.retained_1,
            Metric::D7 => self.retained_7,
        }
    }
}

/// The rows of one analysis run.
///
/// Row order carries no meaning. The engine only ever borrows a table; it
/// never mutates it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowTable {
    rows: Vec<UserRow>,
}

impl RowTable {
    #[must_use]
    pub fn new(rows: Vec<UserRow>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[UserRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserRow> + '_ {
        self.rows.iter()
    }

    pub fn push(&mut self, row: UserRow) {
        self.rows.push(row);
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<UserRow> {
        self.rows
    }
}

impl FromIterator<UserRow> for RowTable {
    fn from_iter<T: IntoIterator<Item = UserRow>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Extend<UserRow> for RowTable {
    fn extend<T: IntoIterator<Item = UserRow>>(&mut self, iter: T) {
        self.rows.extend(iter);
    }
}

impl<'a> IntoIterator for &'a RowTable {
    type Item = &'a UserRow;
    type IntoIter = std::slice::Iter<'a, UserRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
