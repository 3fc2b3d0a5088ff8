//! # pt-optimizer
//!
//! Stochastic local search over LLVM pass lists for PassTune.
//!
//! Starting from a baseline pass list, the search loop alternates between
//! appending random passes from the [`PassCatalog`] and dropping passes from
//! the current optimum, keeping a change only when the [`CostOracle`] says it
//! helps (ADD) or at least does not hurt (REMOVE). Accepted pass lists are
//! appended to a [`ResultLog`] and saved to an [`OptimumStore`] as they are
//! found.

mod catalog;
mod comparator;
mod config;
mod mutator;
mod oracle;
mod report;
mod result_log;
mod search;
mod stop;
mod store;

pub use catalog::PassCatalog;
pub use comparator::{comparator_for, Comparator, GeometricMeanComparator, ScalarComparator};
pub use config::{ComparisonMode, OptimizerConfig, RemovePolicy};
pub use mutator::{Mutation, Mutator, PhaseKind};
pub use oracle::CostOracle;
pub use report::{RunId, RunState, SearchReport, StopReason};
pub use result_log::{LogEntry, ResultLog};
pub use search::{PhaseOutcome, SearchLoop, SearchState};
pub use stop::StopHandle;
pub use store::OptimumStore;
