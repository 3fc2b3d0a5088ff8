use thiserror::Error;

/// Main error type for PassTune. Every variant is fatal to a run.
#[derive(Error, Debug)]
pub enum PtError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Comparison error: {0}")]
    Comparison(#[from] ComparisonError),

    #[error("Initial baseline evaluation failed: {0}")]
    Baseline(OracleFailure),

    #[error("Setup command failed: {message}")]
    Setup { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to write {path}: {message}")]
    Persistence { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Pass catalog errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("pass catalog from {source_name} is empty")]
    Empty { source_name: String },

    #[error("every pass in the catalog was excluded ({excluded} exclusion(s))")]
    AllExcluded { excluded: usize },

    #[error("cannot read pass catalog {path}: {message}")]
    Unreadable { path: String, message: String },
}

/// Which side of a comparison carried a bad value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Candidate,
    Incumbent,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Candidate => f.write_str("candidate"),
            Self::Incumbent => f.write_str("incumbent"),
        }
    }
}

/// Preconditions violated while comparing two measurements
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComparisonError {
    #[error("cannot compare a scalar cost with a vector cost")]
    KindMismatch,

    #[error("cost vectors have different lengths: {candidate} vs {incumbent}")]
    LengthMismatch { candidate: usize, incumbent: usize },

    #[error("cost vectors are empty")]
    EmptyVector,

    #[error("{side} cost metric {index} must be strictly positive, got {value}")]
    NonPositive { side: Side, index: usize, value: f64 },

    #[error("{side} cost must be a finite non-negative number, got {value}")]
    InvalidScalar { side: Side, value: f64 },
}

/// Why the cost oracle produced no measurement.
///
/// Inside the search loop these are expected and only mean "not better";
/// they become fatal solely through [`PtError::Baseline`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleFailure {
    #[error("could not write candidate file: {message}")]
    CandidateWrite { message: String },

    #[error("could not start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("build failed (exit status {status:?}): {stderr}")]
    BuildFailed { status: Option<i32>, stderr: String },

    #[error("benchmark run failed (exit status {status:?}): {stderr}")]
    RunFailed { status: Option<i32>, stderr: String },

    #[error("{stage} timed out after {after_secs:.1}s")]
    Timeout { stage: String, after_secs: f64 },

    #[error("unparseable benchmark output {output:?}: {reason}")]
    Unparseable { output: String, reason: String },
}

/// Result type alias for PassTune operations
pub type PtResult<T> = Result<T, PtError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::PtError::Validation(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::PtError::Config(format!($($arg)*))
    };
}
