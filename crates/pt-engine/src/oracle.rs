//! Cost oracle backed by external build and benchmark commands.

use async_trait::async_trait;
use pt_optimizer::CostOracle;
use pt_types::{Candidate, CostMeasurement, OracleFailure, PtError, PtResult};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::OracleConfig;

const CANDIDATE_PLACEHOLDER: &str = "{candidate}";

/// Keep at most this many trailing bytes of stderr in a failure.
const STDERR_TAIL_BYTES: usize = 2048;

/// Writes the candidate to a file, builds the target with it and runs the
/// benchmark, reading the cost from the benchmark's stdout.
pub struct CommandOracle {
    config: OracleConfig,
    candidate_file: PathBuf,
}

impl CommandOracle {
    /// `candidate_file` is made absolute so that commands running in
    /// `work_dir` can still find it.
    pub fn new(config: OracleConfig, candidate_file: impl AsRef<Path>) -> PtResult<Self> {
        if config.build.is_empty() || config.run.is_empty() {
            return Err(PtError::Config(
                "oracle needs both a build and a run command".into(),
            ));
        }
        let candidate_file = candidate_file.as_ref();
        let candidate_file = if candidate_file.is_absolute() {
            candidate_file.to_path_buf()
        } else {
            std::env::current_dir()?.join(candidate_file)
        };
        Ok(Self {
            config,
            candidate_file,
        })
    }

    pub fn candidate_file(&self) -> &Path {
        &self.candidate_file
    }

    /// Run the one-off setup command, if any, in the current directory.
    pub async fn setup(&self) -> PtResult<()> {
        if self.config.setup.is_empty() {
            return Ok(());
        }
        info!(command = ?self.config.setup, "running setup");
        let output = self
            .command(&self.config.setup, None)
            .output()
            .await
            .map_err(|e| PtError::Setup {
                message: format!("could not start {}: {}", self.config.setup[0], e),
            })?;
        if !output.status.success() {
            return Err(PtError::Setup {
                message: format!(
                    "{} exited with {:?}: {}",
                    self.config.setup[0],
                    output.status.code(),
                    stderr_tail(&output)
                ),
            });
        }
        Ok(())
    }

    fn command(&self, argv: &[String], cwd: Option<&Path>) -> Command {
        let candidate = self.candidate_file.display().to_string();
        let mut cmd = Command::new(&argv[0]);
        cmd.args(
            argv[1..]
                .iter()
                .map(|arg| arg.replace(CANDIDATE_PLACEHOLDER, &candidate)),
        )
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Spawn one stage and wait for it, killing it once `limit` elapses.
    ///
    /// On unix each stage leads its own process group, and a timeout kills
    /// the whole group so that tools the stage started do not outlive it.
    async fn run_stage(
        &self,
        stage: &str,
        argv: &[String],
        limit: Duration,
    ) -> Result<Output, OracleFailure> {
        let started = Instant::now();
        let mut cmd = self.command(argv, Some(&self.config.work_dir));
        #[cfg(unix)]
        cmd.process_group(0);
        let child = cmd.spawn().map_err(|e| OracleFailure::Spawn {
            program: argv[0].clone(),
            message: e.to_string(),
        })?;
        let pid = child.id();

        let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| OracleFailure::Spawn {
                program: argv[0].clone(),
                message: e.to_string(),
            })?,
            Err(_) => {
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                warn!(stage, pid = ?pid, after_secs = limit.as_secs_f64(), "stage timed out, killed");
                return Err(OracleFailure::Timeout {
                    stage: stage.to_string(),
                    after_secs: limit.as_secs_f64(),
                });
            }
        };

        debug!(
            stage,
            status = ?output.status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage finished"
        );
        Ok(output)
    }

    fn parse_cost(&self, output: &Output) -> Result<CostMeasurement, OracleFailure> {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("");
        CostMeasurement::parse_fields(line, self.config.delimiter, &self.config.cost_fields)
            .map_err(|e| OracleFailure::Unparseable {
                output: line.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl CostOracle for CommandOracle {
    async fn evaluate(
        &mut self,
        candidate: &Candidate,
        timeout: Duration,
    ) -> Result<CostMeasurement, OracleFailure> {
        tokio::fs::write(&self.candidate_file, candidate.to_pass_list())
            .await
            .map_err(|e| OracleFailure::CandidateWrite {
                message: format!("{}: {}", self.candidate_file.display(), e),
            })?;

        let build_limit = Duration::from_secs(self.config.build_timeout_secs);
        let build = self.run_stage("build", &self.config.build, build_limit).await?;
        if !build.status.success() {
            return Err(OracleFailure::BuildFailed {
                status: build.status.code(),
                stderr: stderr_tail(&build),
            });
        }

        let run = self.run_stage("benchmark", &self.config.run, timeout).await?;
        if !run.status.success() {
            return Err(OracleFailure::RunFailed {
                status: run.status.code(),
                stderr: stderr_tail(&run),
            });
        }

        self.parse_cost(&run)
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: killpg takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(pgid, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

// kill_on_drop covers the direct child elsewhere.
#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

fn stderr_tail(output: &Output) -> String {
    let start = output.stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&output.stderr[start..])
        .trim()
        .to_string()
}
