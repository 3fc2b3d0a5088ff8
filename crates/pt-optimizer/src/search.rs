//! The search loop: alternate ADD and REMOVE phases around the best pass list.
//!
//! ```text
//! INITIALIZING ──▶ ADD ──▶ REMOVE ──▶ ADD ──▶ … ──▶ TERMINATED
//! ```
//!
//! Every phase checks for a stop request, mutates the optimum, asks the
//! oracle for a cost and applies the phase's acceptance rule. Accepted
//! candidates are appended to the result log and saved to the optimum store
//! before the next phase starts.

use pt_types::{Candidate, CostMeasurement, OracleFailure, PtError, PtResult};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::catalog::PassCatalog;
use crate::comparator::{comparator_for, Comparator};
use crate::config::OptimizerConfig;
use crate::mutator::{Mutator, PhaseKind};
use crate::oracle::CostOracle;
use crate::report::{SearchReport, StopReason};
use crate::result_log::ResultLog;
use crate::stop::StopHandle;
use crate::store::OptimumStore;

/// The optimum and the phase counter. Only the search loop writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    optimum: Candidate,
    cost: CostMeasurement,
    phase: u64,
}

impl SearchState {
    pub fn optimum(&self) -> &Candidate {
        &self.optimum
    }

    pub fn cost(&self) -> &CostMeasurement {
        &self.cost
    }

    /// Number of phases that reached the oracle so far.
    pub fn phase(&self) -> u64 {
        self.phase
    }
}

/// What a single phase did.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseOutcome {
    /// The candidate replaced the optimum.
    Accepted { phase: u64, cost: CostMeasurement },
    /// Measured, but failed the acceptance rule.
    Rejected { phase: u64, cost: CostMeasurement },
    /// The oracle reported a failure; treated as "not better".
    OracleFailed { phase: u64, failure: OracleFailure },
    /// REMOVE selected nothing to drop; no oracle call was made.
    Skipped,
    /// A stop was requested before the phase began.
    Stopped,
}

pub struct SearchLoop<O> {
    config: OptimizerConfig,
    catalog: PassCatalog,
    mutator: Mutator,
    comparator: Box<dyn Comparator>,
    oracle: O,
    log: ResultLog,
    store: OptimumStore,
    stop: StopHandle,
    rng: ChaCha8Rng,
    state: SearchState,
    next_kind: PhaseKind,
    report: SearchReport,
}

impl<O: CostOracle> SearchLoop<O> {
    /// Evaluate the initial pass list and set up the loop around it.
    ///
    /// Fails if the configuration is invalid, if the oracle cannot measure the
    /// baseline, or if the baseline cost is not comparable under the
    /// configured comparator. There is nothing to search from in any of
    /// those cases.
    pub async fn initialize(
        config: OptimizerConfig,
        catalog: PassCatalog,
        initial: Candidate,
        mut oracle: O,
        log: ResultLog,
        store: OptimumStore,
        stop: StopHandle,
    ) -> PtResult<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let mut report = SearchReport::new(seed);
        let comparator = comparator_for(config.comparison);

        info!(
            run_id = %report.run_id,
            seed,
            passes = initial.len(),
            catalog = catalog.len(),
            comparator = comparator.name(),
            remove_policy = ?config.remove_policy,
            "evaluating baseline pass list: {}",
            initial
        );

        let cost = oracle
            .evaluate(&initial, config.oracle_timeout())
            .await
            .map_err(PtError::Baseline)?;
        // Comparing the baseline with itself checks the comparator's
        // preconditions before any phase depends on them.
        comparator.non_worse(&cost, &cost)?;

        info!(run_id = %report.run_id, cost = %cost, "baseline measured");
        report.mark_running(&initial, &cost);

        Ok(Self {
            mutator: Mutator::new(config.max_added_passes, config.remove_policy),
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
            catalog,
            comparator,
            oracle,
            log,
            store,
            stop,
            state: SearchState {
                optimum: initial,
                cost,
                phase: 0,
            },
            next_kind: PhaseKind::Add,
            report,
        })
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn report(&self) -> &SearchReport {
        &self.report
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Run phases until a stop is requested or `max_phases` is reached, then
    /// save the final optimum once more.
    pub async fn run(&mut self) -> PtResult<SearchReport> {
        info!(run_id = %self.report.run_id, "search started");

        let reason = loop {
            if self.phase_limit_reached() {
                break StopReason::PhaseLimit;
            }

            let kind = self.next_kind;
            if self.step(kind).await? == PhaseOutcome::Stopped {
                break StopReason::OperatorStop;
            }
            self.next_kind = kind.next();

            if kind == PhaseKind::Remove {
                info!(
                    cost = %self.state.cost,
                    passes = self.state.optimum.len(),
                    "current optimum: {}",
                    self.state.optimum
                );
            }
        };

        self.finish(reason)
    }

    /// Execute one phase of the given type.
    ///
    /// Errors are fatal: a comparison whose preconditions fail, or a failure
    /// to write the result log or the optimum store.
    pub async fn step(&mut self, kind: PhaseKind) -> PtResult<PhaseOutcome> {
        if self.stop.is_requested() {
            info!(run_id = %self.report.run_id, "stop requested");
            return Ok(PhaseOutcome::Stopped);
        }

        let mutation = self
            .mutator
            .mutate(kind, &self.state.optimum, &self.catalog, &mut self.rng);
        if mutation.is_noop() {
            debug!(kind = %kind, "nothing selected to remove, skipping phase");
            self.report.skipped += 1;
            return Ok(PhaseOutcome::Skipped);
        }

        self.state.phase += 1;
        self.report.phases = self.state.phase;
        let phase = self.state.phase;

        let changed = Candidate::new(mutation.changed);
        match kind {
            PhaseKind::Add => info!(phase, "trying to add passes: {}", changed),
            PhaseKind::Remove => info!(phase, "trying to remove passes: {}", changed),
        }

        let candidate = mutation.candidate;
        let cost = match self
            .oracle
            .evaluate(&candidate, self.config.oracle_timeout())
            .await
        {
            Ok(cost) => cost,
            Err(failure) => {
                warn!(phase, kind = %kind, error = %failure, "no improvement found: oracle failed");
                self.report.oracle_failures += 1;
                return Ok(PhaseOutcome::OracleFailed { phase, failure });
            }
        };

        if !self.comparator.accepts(kind, &cost, &self.state.cost)? {
            info!(phase, kind = %kind, cost = %cost, best = %self.state.cost, "no improvement found");
            self.report.rejected += 1;
            return Ok(PhaseOutcome::Rejected { phase, cost });
        }

        // Persist before committing: the stored optimum is never older than
        // the one in memory.
        self.store.save(&candidate)?;
        self.log.append(phase, &cost, &candidate)?;

        self.report.record_accepted(&candidate, &cost);
        self.state.optimum = candidate;
        self.state.cost = cost.clone();

        info!(
            phase,
            kind = %kind,
            cost = %cost,
            passes = self.state.optimum.len(),
            "new optimum found"
        );
        Ok(PhaseOutcome::Accepted { phase, cost })
    }

    fn phase_limit_reached(&self) -> bool {
        self.config
            .max_phases
            .is_some_and(|limit| self.state.phase >= limit)
    }

    fn finish(&mut self, reason: StopReason) -> PtResult<SearchReport> {
        self.store.save(&self.state.optimum)?;
        self.report.mark_terminated(reason);

        info!(
            run_id = %self.report.run_id,
            reason = ?reason,
            phases = self.report.phases,
            accepted = self.report.accepted,
            rejected = self.report.rejected,
            oracle_failures = self.report.oracle_failures,
            skipped = self.report.skipped,
            cost = %self.state.cost,
            "search terminated with {}",
            self.state.optimum
        );
        Ok(self.report.clone())
    }
}
