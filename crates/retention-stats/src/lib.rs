//! Statistical building blocks for retention experiments.
//!
//! This crate contains the numeric pieces that the retention engine composes
//! into an A/B comparison:
//!
//! - **Proportions**: binomial rates, their sampling variance, and the
//!   difference between two independent proportions with a normal-approximation
//!   confidence interval
//! - **Contingency tables**: 2x2 observed/expected counts and the chi-square
//!   test of independence, with optional Yates continuity correction
//! - **Descriptive statistics**: per-column count, mean, spread, and quartiles
//!   for data exploration
//!
//! # Modules
//!
//! - [`proportion`]: Proportions, differences, and confidence intervals
//! - [`contingency`]: 2x2 contingency tables and the chi-square test
//! - [`descriptive`]: Column summaries
//!
//! # Examples
//!
//! ## Comparing two proportions
//!
//! ```
//! use retention_stats::proportion::{Proportion, ProportionDifference};
//!
//! let control = Proportion::new(40, 100).unwrap();
//! let treatment = Proportion::new(55, 100).unwrap();
//! let diff = ProportionDifference::between(&control, &treatment);
//! let ci = diff.confidence_interval(0.95).unwrap();
//! assert!(ci.lower > 0.0);
//! ```
//!
//! ## Testing for independence
//!
//! ```
//! use retention_stats::{
//!     contingency::{ContingencyTable, ContinuityCorrection},
//!     proportion::Proportion,
//! };
//!
//! let control = Proportion::new(5, 10).unwrap();
//! let treatment = Proportion::new(6, 10).unwrap();
//! let table = ContingencyTable::from_proportions(&control, &treatment);
//! let test = table.chi_square(ContinuityCorrection::None);
//! assert!(test.p_value > 0.05);
//! assert!(test.has_low_expected_count(5.0));
//! ```

pub mod contingency;
pub mod descriptive;
pub mod proportion;
