//! Run bookkeeping: lifecycle, phase tallies and the final result.

use chrono::{DateTime, Utc};
use pt_types::{Candidate, CostMeasurement, PtResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Unique search run identifier.
pub type RunId = Uuid;

/// Lifecycle state for a search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Initializing,
    Running,
    Terminated,
}

/// Why the loop left the running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    OperatorStop,
    PhaseLimit,
}

/// Aggregate status of a search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub run_id: RunId,
    pub seed: u64,
    pub state: RunState,
    /// Phases that reached the oracle.
    pub phases: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub oracle_failures: u64,
    /// Degenerate REMOVE phases skipped without an oracle call.
    pub skipped: u64,
    pub baseline_cost: Option<CostMeasurement>,
    pub best_cost: Option<CostMeasurement>,
    pub best_candidate: Candidate,
    pub stop_reason: Option<StopReason>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SearchReport {
    pub fn new(seed: u64) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            seed,
            state: RunState::Initializing,
            phases: 0,
            accepted: 0,
            rejected: 0,
            oracle_failures: 0,
            skipped: 0,
            baseline_cost: None,
            best_cost: None,
            best_candidate: Candidate::empty(),
            stop_reason: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn mark_running(&mut self, baseline: &Candidate, cost: &CostMeasurement) {
        self.state = RunState::Running;
        self.baseline_cost = Some(cost.clone());
        self.best_cost = Some(cost.clone());
        self.best_candidate = baseline.clone();
    }

    pub fn record_accepted(&mut self, candidate: &Candidate, cost: &CostMeasurement) {
        self.accepted += 1;
        self.best_cost = Some(cost.clone());
        self.best_candidate = candidate.clone();
    }

    pub fn mark_terminated(&mut self, reason: StopReason) {
        self.state = RunState::Terminated;
        self.stop_reason = Some(reason);
        self.finished_at = Some(Utc::now());
    }

    /// Write the report as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> PtResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
