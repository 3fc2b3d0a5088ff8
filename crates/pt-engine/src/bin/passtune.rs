use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use pt_engine::{operator, EngineConfig};
use pt_optimizer::{RemovePolicy, StopHandle};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "passtune",
    about = "Search for a better LLVM pass list by adding and removing passes.",
    after_help = "Type any line and press Enter, or hit Ctrl-C, to stop after the current phase."
)]
struct Args {
    /// JSON run configuration (defaults apply to anything left out)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seed for the mutation RNG, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many evaluated phases
    #[arg(long, value_name = "N")]
    max_phases: Option<u64>,

    /// REMOVE phase policy: drop-one or bernoulli
    #[arg(long, value_name = "POLICY")]
    remove_policy: Option<RemovePolicy>,

    /// Benchmark timeout per candidate, in seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.optimizer.seed = Some(seed);
        }
        if let Some(max_phases) = self.max_phases {
            config.optimizer.max_phases = Some(max_phases);
        }
        if let Some(policy) = self.remove_policy {
            config.optimizer.remove_policy = policy;
        }
        if let Some(secs) = self.timeout_secs {
            config.optimizer.oracle_timeout_secs = secs;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;

    let stop = StopHandle::new();
    operator::watch_stdin(stop.clone()).context("failed to start stdin watcher")?;
    operator::watch_ctrl_c(stop.clone());

    let report = pt_engine::run(config, stop)
        .await
        .context("pass search failed")?;

    println!("run {} finished: {:?}", report.run_id, report.stop_reason);
    println!(
        "phases: {} (accepted {}, rejected {}, oracle failures {}, skipped {})",
        report.phases, report.accepted, report.rejected, report.oracle_failures, report.skipped
    );
    if let (Some(baseline), Some(best)) = (&report.baseline_cost, &report.best_cost) {
        println!("cost: {baseline} -> {best}");
    }
    println!("best pass list: {}", report.best_candidate);
    Ok(())
}
