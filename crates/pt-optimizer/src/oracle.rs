//! Cost oracle abstraction.

use async_trait::async_trait;
use pt_types::{Candidate, CostMeasurement, OracleFailure};
use std::time::Duration;

/// Builds and benchmarks the target with a candidate pass list.
///
/// Implementations may spawn the real toolchain (see `pt-engine`) or answer
/// from a table in tests. A call must return within roughly `timeout`; an
/// overrun is reported as [`OracleFailure::Timeout`], never as a panic.
#[async_trait]
pub trait CostOracle: Send {
    async fn evaluate(
        &mut self,
        candidate: &Candidate,
        timeout: Duration,
    ) -> Result<CostMeasurement, OracleFailure>;
}
