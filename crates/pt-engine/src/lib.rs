// PassTune engine
// Runs the pass-list search against real build and benchmark commands.

pub mod config;
pub mod operator;
pub mod oracle;
pub mod runner;

pub use config::{CatalogConfig, EngineConfig, OracleConfig};
pub use oracle::CommandOracle;
pub use runner::run;
