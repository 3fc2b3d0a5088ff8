//! Wires configuration, command oracle and search loop into one run.

use pt_optimizer::{OptimumStore, ResultLog, SearchLoop, SearchReport, StopHandle};
use pt_types::{config_error, PtResult};
use tracing::info;

use crate::config::EngineConfig;
use crate::oracle::CommandOracle;

/// Execute a full search run and return its report.
///
/// The initial pass list is read from `passes_file`, which then doubles as
/// the optimum store. The result log is truncated before the baseline is
/// measured.
pub async fn run(config: EngineConfig, stop: StopHandle) -> PtResult<SearchReport> {
    config.validate()?;

    let catalog = config.catalog.load()?;
    let store = OptimumStore::new(&config.passes_file);
    let initial = store.load().map_err(|e| {
        config_error!(
            "cannot read initial pass list {}: {}",
            config.passes_file.display(),
            e
        )
    })?;
    info!(
        path = %config.passes_file.display(),
        passes = initial.len(),
        "loaded initial pass list"
    );

    let oracle = CommandOracle::new(config.oracle.clone(), &config.candidate_file)?;
    oracle.setup().await?;

    let log = ResultLog::create(&config.log_file)?;

    let mut search = SearchLoop::initialize(
        config.optimizer.clone(),
        catalog,
        initial,
        oracle,
        log,
        store,
        stop,
    )
    .await?;
    let report = search.run().await?;

    if let Some(path) = &config.report_file {
        report.save(path)?;
        info!(path = %path.display(), "wrote run report");
    }
    Ok(report)
}
