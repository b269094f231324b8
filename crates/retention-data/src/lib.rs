//! Data sources for retention experiments.
//!
//! - [`loader`]: reads an experiment CSV into a
//!   [`RowTable`](retention_engine::row::RowTable), reporting dropped rows and
//!   duplicate user ids, and writes tables back out as CSV
//! - [`synthetic`]: seeded sample data for demos and tests

pub mod loader;
pub mod synthetic;
