//! Retention statistics engine for two-arm mobile game experiments
//!
//! Given one row per experiment participant (user id, group label, day-1 and
//! day-7 retention flags), this crate computes per-group KPIs and a rigorous
//! A/B comparison: rates, absolute difference, relative lift, confidence
//! interval, chi-square p-value, and a significance verdict.
//!
//! The engine does no I/O and keeps no state between calls. Every operation
//! borrows its [`RowTable`](row::RowTable) read-only, so independent tables
//! can be analyzed concurrently without locking.
//!
//! # Overview
//!
//! 1. **Rows** ([`row::RowTable`]): the participant table produced by a loader
//! 2. **Summaries** ([`summary::summarize`]): per-group counts and D1/D7 rates
//! 3. **Comparison** ([`compare::compare`]): chi-square test, difference, lift,
//!    and interval for one metric between exactly two groups
//! 4. **Report** ([`report::ExperimentReport`]): overview, both metrics, and a
//!    rollout recommendation for presentation layers
//!
//! Sessions that accept uploads keep parsed datasets in a
//! [`cache::DatasetCache`] keyed by the hash of the uploaded bytes.
//!
//! # Group order
//!
//! Differences are always `rate(second) - rate(first)`. By default the first
//! group is the label that sorts first (byte-wise); configure
//! [`config::GroupOrder::Baseline`] to name the control group explicitly.
//!
//! # Examples
//!
//! ```
//! use retention_engine::{
//!     compare::compare,
//!     row::{Metric, RowTable, UserRow},
//!     summary::summarize,
//! };
//!
//! let mut table = RowTable::default();
//! for i in 0..10u64 {
//!     table.push(UserRow::new(i, "A", i < 5, false));
//!     table.push(UserRow::new(100 + i, "B", i < 6, false));
//! }
//!
//! let groups = summarize(&table)?;
//! assert_eq!(groups.len(), 2);
//!
//! let result = compare(&table, Metric::D1)?;
//! assert!(!result.significant);
//! assert!(result.low_expected_count);
//! # Ok::<(), retention_engine::error::EngineError>(())
//! ```

pub mod cache;
pub mod compare;
pub mod config;
pub mod error;
pub mod report;
pub mod row;
pub mod summary;
