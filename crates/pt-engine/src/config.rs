//! Run configuration, loaded from JSON with every field defaulted.
//!
//! The defaults target the Fix compiler's speedtest benchmark: the compiler
//! is installed from the working tree, `benchmark/speedtest` is built with
//! the candidate pass list and measured under cachegrind, whose output line
//! is `<binary>,<cycles>`.

use pt_optimizer::{OptimizerConfig, PassCatalog};
use pt_types::{config_error, PtResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the sampleable passes come from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Newline-delimited pass list. `None` uses the built-in LLVM list.
    pub file: Option<PathBuf>,
    /// Passes never to sample, e.g. ones that crash the target.
    pub exclude: Vec<String>,
}

impl CatalogConfig {
    pub fn load(&self) -> PtResult<PassCatalog> {
        let catalog = match &self.file {
            Some(path) => PassCatalog::from_file(path)?,
            None => PassCatalog::llvm_default(),
        };
        Ok(catalog.without(self.exclude.as_slice())?)
    }
}

/// External commands that make up the cost oracle.
///
/// Any argument equal to or containing `{candidate}` has it replaced by the
/// absolute path of the candidate pass-list file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Run once before the baseline. Empty to skip.
    pub setup: Vec<String>,
    pub build: Vec<String>,
    /// Benchmark command; prints the cost line on stdout.
    pub run: Vec<String>,
    /// Working directory for `build` and `run`.
    pub work_dir: PathBuf,
    pub build_timeout_secs: u64,
    pub delimiter: char,
    /// Zero-based fields of the benchmark output holding the cost.
    /// One field is a scalar cost, several form a cost vector.
    pub cost_fields: Vec<usize>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            setup: args(&["cargo", "install", "--locked", "--path", "."]),
            build: args(&[
                "fix",
                "build",
                "-O",
                "experimental",
                "--llvm-passes-file",
                "{candidate}",
            ]),
            run: args(&["python3", "./cachegrind-benchmarking/cachegrind.py", "./a.out"]),
            work_dir: PathBuf::from("./benchmark/speedtest"),
            build_timeout_secs: 600,
            delimiter: ',',
            cost_fields: vec![1],
        }
    }
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Top-level configuration for a `passtune` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial pass list; overwritten with every new optimum.
    pub passes_file: PathBuf,
    /// Scratch file the oracle reads the candidate from.
    pub candidate_file: PathBuf,
    /// Result log, truncated at start-up.
    pub log_file: PathBuf,
    /// Optional JSON run report written at exit.
    pub report_file: Option<PathBuf>,
    pub catalog: CatalogConfig,
    pub oracle: OracleConfig,
    pub optimizer: OptimizerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            passes_file: PathBuf::from("./src/llvm_passes.txt"),
            candidate_file: PathBuf::from("./llvm_passes_tmp.txt"),
            log_file: PathBuf::from("./passes_optimizer.log"),
            report_file: None,
            catalog: CatalogConfig::default(),
            oracle: OracleConfig::default(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> PtResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| config_error!("cannot read {}: {}", path.display(), e))?;
        serde_json::from_str(&text)
            .map_err(|e| config_error!("invalid config {}: {}", path.display(), e))
    }

    pub fn validate(&self) -> PtResult<()> {
        self.optimizer.validate()?;
        if self.oracle.build.is_empty() {
            return Err(config_error!("oracle.build must name a command"));
        }
        if self.oracle.run.is_empty() {
            return Err(config_error!("oracle.run must name a command"));
        }
        if self.oracle.cost_fields.is_empty() {
            return Err(config_error!("oracle.cost_fields must list at least one field"));
        }
        if self.oracle.build_timeout_secs == 0 {
            return Err(config_error!("oracle.build_timeout_secs must be positive"));
        }
        Ok(())
    }
}
