//! Deterministic sample data
//!
//! Generates a Cookie Cats style experiment when no CSV is available. The
//! default configuration splits 90,189 users between `gate_30` and `gate_40`
//! with retention probabilities close to those of the public dataset.
//!
//! Generation is fully determined by [`SyntheticConfig`]: the same seed,
//! user count and arms always yield the same table.
//!
//! # Examples
//!
//! ```
//! use retention_data::synthetic::SyntheticConfig;
//!
//! let config = SyntheticConfig {
//!     users: 1_000,
//!     ..SyntheticConfig::default()
//! };
//! let table = config.generate()?;
//! assert_eq!(table.len(), 1_000);
//! assert_eq!(table, config.generate()?);
//! # Ok::<(), retention_data::synthetic::SyntheticError>(())
//! ```

use rand::{Rng as _, SeedableRng as _};
use rand_distr::Bernoulli;
use rand_pcg::Pcg32;
use retention_engine::row::{Metric, RowTable, UserRow};
use serde::{Deserialize, Serialize};

/// One experiment arm and its true retention probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmProfile {
    pub group: String,
    pub d1_probability: f64,
    pub d7_probability: f64,
}

impl ArmProfile {
    #[must_use]
    pub fn new(group: impl Into<String>, d1_probability: f64, d7_probability: f64) -> Self {
        Self {
            group: group.into(),
            d1_probability,
            d7_probability,
        }
    }

    fn probability(&self, metric: Metric) -> f64 {
        match metric {
            Metric::D1 => self.d1_probability,
            Metric::D7 => self.d7_probability,
        }
    }

    fn sampler(&self, metric: Metric) -> Result<Bernoulli, SyntheticError> {
        let value = self.probability(metric);
        Bernoulli::new(value).map_err(|_| SyntheticError::InvalidProbability {
            group: self.group.clone(),
            metric,
            value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub users: u64,
    pub seed: u64,
    pub arms: Vec<ArmProfile>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            users: 90_189,
            seed: 42,
            arms: vec![
                ArmProfile::new("gate_30", 0.44, 0.19),
                ArmProfile::new("gate_40", 0.47, 0.20),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum SyntheticError {
    #[display("at least one arm is required")]
    NoArms,
    #[display("{metric} probability {value} of arm '{group}' is outside [0, 1]")]
    InvalidProbability {
        group: String,
        metric: Metric,
        value: f64,
    },
}

impl SyntheticConfig {
    /// Generates the table.
    ///
    /// Users are split evenly across arms in order, with the remainder going
    /// to the last arm. User ids are numbered from 1.
    pub fn generate(&self) -> Result<RowTable, SyntheticError> {
        if self.arms.is_empty() {
            return Err(SyntheticError::NoArms);
        }
        let mut samplers = Vec::with_capacity(self.arms.len());
        for arm in &self.arms {
            samplers.push((arm, arm.sampler(Metric::D1)?, arm.sampler(Metric::D7)?));
        }

        let mut rng = Pcg32::seed_from_u64(self.seed);
        let arm_count = self.arms.len() as u64;
        let per_arm = self.users / arm_count;
        let mut table = RowTable::default();
        let mut next_id = 1u64;
        for (i, (arm, d1, d7)) in samplers.into_iter().enumerate() {
            let size = if i as u64 + 1 == arm_count {
                self.users - per_arm * (arm_count - 1)
            } else {
                per_arm
            };
            for _ in 0..size {
                let retained_1 = rng.sample(d1);
                let retained_7 = rng.sample(d7);
                table.push(UserRow::new(next_id, arm.group.as_str(), retained_1, retained_7));
                next_id += 1;
            }
        }

        tracing::debug!(
            users = self.users,
            seed = self.seed,
            arms = self.arms.len(),
            "generated synthetic dataset"
        );
        Ok(table)
    }
}
