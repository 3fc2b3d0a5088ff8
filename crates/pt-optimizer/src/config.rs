//! Search-core configuration.

use pt_types::{validation_error, PtResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a REMOVE phase picks the passes to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovePolicy {
    /// Drop exactly one pass, chosen uniformly.
    #[default]
    DropOne,
    /// Drop each pass independently with probability `1 / (ceil(len / K) + 1)`.
    /// May select nothing, in which case the phase is skipped.
    Bernoulli,
}

impl std::str::FromStr for RemovePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop-one" => Ok(Self::DropOne),
            "bernoulli" => Ok(Self::Bernoulli),
            other => Err(format!(
                "unknown remove policy {other:?} (expected \"drop-one\" or \"bernoulli\")"
            )),
        }
    }
}

/// How two cost measurements are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonMode {
    /// Single cost, lower wins.
    #[default]
    Scalar,
    /// Product of per-metric ratios below one wins.
    GeometricMean,
}

/// Knobs for one search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Upper bound K on passes appended per ADD phase; the count is uniform in `[1, K]`.
    pub max_added_passes: usize,

    pub remove_policy: RemovePolicy,

    pub comparison: ComparisonMode,

    /// Wall-clock limit handed to the oracle for each evaluation.
    pub oracle_timeout_secs: u64,

    /// Stop after this many evaluated phases. `None` runs until the operator stops it.
    pub max_phases: Option<u64>,

    /// RNG seed. `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_added_passes: 10,
            remove_policy: RemovePolicy::DropOne,
            comparison: ComparisonMode::Scalar,
            oracle_timeout_secs: 10,
            max_phases: None,
            seed: None,
        }
    }
}

impl OptimizerConfig {
    pub fn with_max_added_passes(mut self, k: usize) -> Self {
        self.max_added_passes = k;
        self
    }

    pub fn with_remove_policy(mut self, policy: RemovePolicy) -> Self {
        self.remove_policy = policy;
        self
    }

    pub fn with_comparison(mut self, mode: ComparisonMode) -> Self {
        self.comparison = mode;
        self
    }

    pub fn with_oracle_timeout_secs(mut self, secs: u64) -> Self {
        self.oracle_timeout_secs = secs;
        self
    }

    pub fn with_max_phases(mut self, phases: u64) -> Self {
        self.max_phases = Some(phases);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    pub fn validate(&self) -> PtResult<()> {
        if self.max_added_passes == 0 {
            return Err(validation_error!("max_added_passes must be at least 1"));
        }
        if self.oracle_timeout_secs == 0 {
            return Err(validation_error!("oracle_timeout_secs must be positive"));
        }
        Ok(())
    }
}
