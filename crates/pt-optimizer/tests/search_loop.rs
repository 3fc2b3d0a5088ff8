use async_trait::async_trait;
use pt_optimizer::{
    ComparisonMode, CostOracle, OptimizerConfig, OptimumStore, PassCatalog, PhaseKind,
    PhaseOutcome, RemovePolicy, ResultLog, SearchLoop, StopHandle, StopReason,
};
use pt_types::{Candidate, ComparisonError, CostMeasurement, OracleFailure, PtError};
use std::time::Duration;
use tempfile::TempDir;

type CostFn = Box<dyn FnMut(&Candidate) -> Result<CostMeasurement, OracleFailure> + Send>;

/// Oracle answering from a closure and recording every candidate it saw.
struct StubOracle {
    cost_fn: CostFn,
    calls: Vec<Candidate>,
}

impl StubOracle {
    fn new<F>(cost_fn: F) -> Self
    where
        F: FnMut(&Candidate) -> Result<CostMeasurement, OracleFailure> + Send + 'static,
    {
        Self {
            cost_fn: Box::new(cost_fn),
            calls: Vec::new(),
        }
    }

    fn constant(cost: f64) -> Self {
        Self::new(move |_| Ok(CostMeasurement::Scalar(cost)))
    }
}

#[async_trait]
impl CostOracle for StubOracle {
    async fn evaluate(
        &mut self,
        candidate: &Candidate,
        _timeout: Duration,
    ) -> Result<CostMeasurement, OracleFailure> {
        self.calls.push(candidate.clone());
        (self.cost_fn)(candidate)
    }
}

fn candidate(names: &[&str]) -> Candidate {
    names.iter().copied().collect()
}

fn xyz_catalog() -> PassCatalog {
    PassCatalog::parse("x\ny\nz\n", "test").unwrap()
}

struct Files {
    dir: TempDir,
}

impl Files {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn log(&self) -> ResultLog {
        ResultLog::create(self.dir.path().join("passes_optimizer.log")).unwrap()
    }

    fn log_text(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("passes_optimizer.log")).unwrap()
    }

    fn store(&self) -> OptimumStore {
        OptimumStore::new(self.dir.path().join("llvm_passes.txt"))
    }
}

async fn start(
    config: OptimizerConfig,
    initial: Candidate,
    oracle: StubOracle,
    files: &Files,
    stop: StopHandle,
) -> SearchLoop<StubOracle> {
    match SearchLoop::initialize(
        config,
        xyz_catalog(),
        initial,
        oracle,
        files.log(),
        files.store(),
        stop,
    )
    .await
    {
        Ok(search) => search,
        Err(e) => panic!("initialization failed: {e}"),
    }
}

fn seeded() -> OptimizerConfig {
    OptimizerConfig::default().with_seed(17)
}

#[tokio::test]
async fn test_add_phase_rejects_tie() {
    let files = Files::new();
    let mut search = start(
        seeded(),
        candidate(&["x"]),
        StubOracle::constant(100.0),
        &files,
        StopHandle::new(),
    )
    .await;

    let outcome = search.step(PhaseKind::Add).await.unwrap();
    assert_eq!(
        outcome,
        PhaseOutcome::Rejected {
            phase: 1,
            cost: CostMeasurement::Scalar(100.0)
        }
    );
    assert_eq!(search.state().optimum(), &candidate(&["x"]));
    assert_eq!(files.log_text(), "");
    assert_eq!(search.report().rejected, 1);
}

#[tokio::test]
async fn test_remove_phase_accepts_tie() {
    let files = Files::new();
    let log = files.log();
    let mut search = SearchLoop::initialize(
        seeded(),
        xyz_catalog(),
        candidate(&["x", "y"]),
        StubOracle::constant(100.0),
        log.clone(),
        files.store(),
        StopHandle::new(),
    )
    .await
    .unwrap_or_else(|e| panic!("initialization failed: {e}"));

    let outcome = search.step(PhaseKind::Remove).await.unwrap();
    assert!(matches!(outcome, PhaseOutcome::Accepted { phase: 1, .. }));
    assert_eq!(search.state().optimum().len(), 1);

    let entries = log.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].phase, 1);
    assert_eq!(entries[0].cost, vec![100.0]);
    assert_eq!(&entries[0].candidate, search.state().optimum());

    assert_eq!(&files.store().load().unwrap(), search.state().optimum());
}

#[tokio::test]
async fn test_oracle_failure_leaves_state_untouched() {
    let files = Files::new();
    let mut first = true;
    let oracle = StubOracle::new(move |_| {
        if std::mem::take(&mut first) {
            Ok(CostMeasurement::Scalar(100.0))
        } else {
            Err(OracleFailure::BuildFailed {
                status: Some(1),
                stderr: "error: unknown pass".into(),
            })
        }
    });
    let mut search = start(seeded(), candidate(&["x"]), oracle, &files, StopHandle::new()).await;

    let before = search.state().clone();
    for kind in [PhaseKind::Add, PhaseKind::Remove, PhaseKind::Add] {
        let outcome = search.step(kind).await.unwrap();
        assert!(matches!(outcome, PhaseOutcome::OracleFailed { .. }));
        assert_eq!(search.state().optimum(), before.optimum());
        assert_eq!(search.state().cost(), before.cost());
    }
    assert_eq!(search.state().phase(), 3);
    assert_eq!(search.report().oracle_failures, 3);
    assert!(!files.store().path().exists());
}

#[tokio::test]
async fn test_baseline_failure_is_fatal() {
    let files = Files::new();
    let oracle = StubOracle::new(|_| {
        Err(OracleFailure::Timeout {
            stage: "benchmark".into(),
            after_secs: 10.0,
        })
    });
    let result = SearchLoop::initialize(
        seeded(),
        xyz_catalog(),
        candidate(&["x"]),
        oracle,
        files.log(),
        files.store(),
        StopHandle::new(),
    )
    .await;

    match result {
        Err(PtError::Baseline(OracleFailure::Timeout { .. })) => {}
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("baseline failure must abort the run"),
    }
}

#[tokio::test]
async fn test_remove_on_single_pass_evaluates_empty_candidate() {
    let files = Files::new();
    let mut search = start(
        seeded(),
        candidate(&["x"]),
        StubOracle::constant(100.0),
        &files,
        StopHandle::new(),
    )
    .await;

    let outcome = search.step(PhaseKind::Remove).await.unwrap();
    assert!(matches!(outcome, PhaseOutcome::Accepted { .. }));
    assert_eq!(search.oracle().calls.last(), Some(&Candidate::empty()));
    assert!(search.state().optimum().is_empty());
    assert_eq!(std::fs::read_to_string(files.store().path()).unwrap(), "");
}

#[tokio::test]
async fn test_remove_on_empty_optimum_is_skipped() {
    let files = Files::new();
    let config = seeded().with_remove_policy(RemovePolicy::Bernoulli);
    let mut search = start(
        config,
        Candidate::empty(),
        StubOracle::constant(100.0),
        &files,
        StopHandle::new(),
    )
    .await;

    let outcome = search.step(PhaseKind::Remove).await.unwrap();
    assert_eq!(outcome, PhaseOutcome::Skipped);
    assert_eq!(search.oracle().calls.len(), 1);
    assert_eq!(search.state().phase(), 0);
    assert_eq!(search.report().skipped, 1);
}

#[tokio::test]
async fn test_finds_the_cheap_pass() {
    let files = Files::new();
    let oracle = StubOracle::new(|c: &Candidate| {
        Ok(CostMeasurement::Scalar(if c.contains("y") { 50.0 } else { 100.0 }))
    });
    let config = seeded().with_max_phases(200);
    let mut search = start(config, candidate(&["x"]), oracle, &files, StopHandle::new()).await;

    let report = search.run().await.unwrap();

    assert!(search.state().optimum().contains("y"));
    assert_eq!(search.state().cost(), &CostMeasurement::Scalar(50.0));
    assert_eq!(report.stop_reason, Some(StopReason::PhaseLimit));
    assert_eq!(report.phases, 200);
    assert_eq!(report.best_cost, Some(CostMeasurement::Scalar(50.0)));
    assert_eq!(&report.best_candidate, search.state().optimum());
    assert_eq!(&files.store().load().unwrap(), search.state().optimum());
}

#[tokio::test]
async fn test_cost_never_regresses() {
    let files = Files::new();
    // Deterministic but irregular cost landscape with occasional failures.
    let oracle = StubOracle::new(|c: &Candidate| {
        let score: u64 = c
            .iter()
            .map(|t| t.as_str().bytes().map(u64::from).sum::<u64>())
            .sum::<u64>()
            .wrapping_mul(2654435761)
            % 1000;
        if score % 7 == 0 {
            Err(OracleFailure::RunFailed {
                status: Some(139),
                stderr: "segfault".into(),
            })
        } else {
            Ok(CostMeasurement::Scalar(100.0 + score as f64 - c.len() as f64))
        }
    });
    let mut search = start(seeded(), candidate(&["x", "z"]), oracle, &files, StopHandle::new()).await;

    let mut kind = PhaseKind::Add;
    let mut previous = match search.state().cost() {
        CostMeasurement::Scalar(v) => *v,
        other => panic!("unexpected cost {other}"),
    };
    for _ in 0..150 {
        search.step(kind).await.unwrap();
        let current = match search.state().cost() {
            CostMeasurement::Scalar(v) => *v,
            other => panic!("unexpected cost {other}"),
        };
        assert!(current <= previous, "cost regressed from {previous} to {current}");
        previous = current;
        kind = kind.next();
    }

    let report = search.report();
    assert_eq!(
        report.accepted + report.rejected + report.oracle_failures,
        search.state().phase()
    );
}

#[tokio::test]
async fn test_log_tracks_every_accepted_phase() {
    let files = Files::new();
    let log = files.log();
    let oracle = StubOracle::new(|c: &Candidate| {
        let ys = c.iter().filter(|t| t.as_str() == "y").count() as f64;
        Ok(CostMeasurement::Scalar(100.0 - ys.min(5.0) * 10.0 + c.len() as f64 * 0.1))
    });
    let mut search = SearchLoop::initialize(
        seeded(),
        xyz_catalog(),
        candidate(&["x"]),
        oracle,
        log.clone(),
        files.store(),
        StopHandle::new(),
    )
    .await
    .unwrap_or_else(|e| panic!("initialization failed: {e}"));

    let mut accepted = Vec::new();
    let mut kind = PhaseKind::Add;
    for _ in 0..60 {
        if let PhaseOutcome::Accepted { phase, .. } = search.step(kind).await.unwrap() {
            accepted.push(phase);
        }
        kind = kind.next();
    }

    let entries = log.entries().unwrap();
    let logged: Vec<u64> = entries.iter().map(|e| e.phase).collect();
    assert_eq!(logged, accepted);
    assert!(logged.windows(2).all(|w| w[0] < w[1]));
    if let Some(last) = entries.last() {
        assert_eq!(&last.candidate, search.state().optimum());
    }
}

#[tokio::test]
async fn test_stop_request_ends_run_before_next_mutation() {
    let files = Files::new();
    let stop = StopHandle::new();
    let mut search = start(
        seeded(),
        candidate(&["x", "y"]),
        StubOracle::constant(100.0),
        &files,
        stop.clone(),
    )
    .await;

    stop.request();
    let report = search.run().await.unwrap();

    assert_eq!(report.stop_reason, Some(StopReason::OperatorStop));
    assert_eq!(report.phases, 0);
    assert_eq!(search.oracle().calls.len(), 1);
    // Terminating always persists the optimum.
    assert_eq!(files.store().load().unwrap(), candidate(&["x", "y"]));
}

#[tokio::test]
async fn test_geometric_mean_mode_trades_metrics() {
    let files = Files::new();
    // y halves cache misses at the price of 10% more instructions.
    let oracle = StubOracle::new(|c: &Candidate| {
        Ok(if c.contains("y") {
            CostMeasurement::Vector(vec![110.0, 50.0])
        } else {
            CostMeasurement::Vector(vec![100.0, 100.0])
        })
    });
    let config = seeded()
        .with_comparison(ComparisonMode::GeometricMean)
        .with_max_phases(100);
    let mut search = start(config, candidate(&["x"]), oracle, &files, StopHandle::new()).await;

    search.run().await.unwrap();
    assert!(search.state().optimum().contains("y"));
    assert_eq!(search.state().cost(), &CostMeasurement::Vector(vec![110.0, 50.0]));
}

#[tokio::test]
async fn test_zero_metric_in_baseline_is_fatal() {
    let files = Files::new();
    let oracle = StubOracle::new(|_| Ok(CostMeasurement::Vector(vec![10.0, 0.0])));
    let config = seeded().with_comparison(ComparisonMode::GeometricMean);
    let result = SearchLoop::initialize(
        config,
        xyz_catalog(),
        candidate(&["x"]),
        oracle,
        files.log(),
        files.store(),
        StopHandle::new(),
    )
    .await;

    match result {
        Err(PtError::Comparison(ComparisonError::NonPositive { index: 1, .. })) => {}
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("zero metric must be rejected"),
    }
}

#[tokio::test]
async fn test_same_seed_same_search() {
    async fn trace(seed: u64) -> Vec<PhaseOutcome> {
        let files = Files::new();
        let oracle = StubOracle::new(|c: &Candidate| {
            Ok(CostMeasurement::Scalar(if c.contains("z") { 80.0 } else { 90.0 }))
        });
        let config = OptimizerConfig::default().with_seed(seed);
        let mut search = start(config, candidate(&["x"]), oracle, &files, StopHandle::new()).await;
        let mut kind = PhaseKind::Add;
        let mut outcomes = Vec::new();
        for _ in 0..20 {
            outcomes.push(search.step(kind).await.unwrap());
            kind = kind.next();
        }
        outcomes
    }

    assert_eq!(trace(5).await, trace(5).await);
}

#[tokio::test]
async fn test_bernoulli_remove_keeping_every_pass_is_skipped() {
    let files = Files::new();
    // Longer lists are cheaper, so every REMOVE that reaches the oracle is rejected.
    let oracle =
        StubOracle::new(|c: &Candidate| Ok(CostMeasurement::Scalar(100.0 - c.len() as f64)));
    let config = seeded().with_remove_policy(RemovePolicy::Bernoulli);
    let mut search = start(config, candidate(&["x", "y", "z"]), oracle, &files, StopHandle::new()).await;

    let mut skipped = false;
    for _ in 0..200 {
        match search.step(PhaseKind::Remove).await.unwrap() {
            PhaseOutcome::Skipped => {
                skipped = true;
                break;
            }
            PhaseOutcome::Rejected { .. } => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert!(skipped, "no REMOVE phase kept every pass");
    assert!(search.report().skipped > 0);
    assert_eq!(search.oracle().calls.len() as u64, search.state().phase() + 1);
    assert_eq!(search.state().optimum(), &candidate(&["x", "y", "z"]));
}

#[tokio::test]
async fn test_bernoulli_run_to_phase_limit() {
    let files = Files::new();
    let oracle = StubOracle::new(|c: &Candidate| {
        let base = if c.contains("y") { 50.0 } else { 100.0 };
        Ok(CostMeasurement::Scalar(base + c.len() as f64 * 0.1))
    });
    let config = seeded()
        .with_remove_policy(RemovePolicy::Bernoulli)
        .with_max_added_passes(3)
        .with_max_phases(150);
    let mut search = start(config, candidate(&["x", "z"]), oracle, &files, StopHandle::new()).await;

    let report = search.run().await.unwrap();

    assert_eq!(report.stop_reason, Some(StopReason::PhaseLimit));
    assert_eq!(report.phases, 150);
    assert_eq!(search.oracle().calls.len() as u64, report.phases + 1);
    assert_eq!(
        report.accepted + report.rejected + report.oracle_failures,
        report.phases
    );
    assert!(search.state().optimum().contains("y"));
    assert_eq!(&files.store().load().unwrap(), search.state().optimum());
}

#[tokio::test]
async fn test_log_write_failure_keeps_optimum_persisted() {
    let files = Files::new();
    let log = files.log();
    let mut search = SearchLoop::initialize(
        seeded(),
        xyz_catalog(),
        candidate(&["x", "y"]),
        StubOracle::constant(100.0),
        log.clone(),
        files.store(),
        StopHandle::new(),
    )
    .await
    .unwrap_or_else(|e| panic!("initialization failed: {e}"));

    std::fs::remove_file(log.path()).unwrap();
    std::fs::create_dir(log.path()).unwrap();

    let result = search.step(PhaseKind::Remove).await;
    assert!(matches!(result, Err(PtError::Persistence { .. })));

    // Nothing is committed in memory, but the accepted list already reached the store.
    assert_eq!(search.state().optimum(), &candidate(&["x", "y"]));
    assert_eq!(search.report().accepted, 0);
    let stored = files.store().load().unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored.contains("x") || stored.contains("y"));
}
