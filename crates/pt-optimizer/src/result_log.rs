//! Append-only record of accepted phases.
//!
//! One CSV row per accepted phase: the phase index, one column per cost
//! component, then the quoted, comma-joined pass list:
//!
//! ```text
//! 3,48211,"sroa,gvn,licm"
//! ```

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use pt_types::{Candidate, CostMeasurement, PtError, PtResult};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// A parsed row of the result log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub phase: u64,
    pub cost: Vec<f64>,
    pub candidate: Candidate,
}

#[derive(Debug, Clone)]
pub struct ResultLog {
    path: PathBuf,
}

impl ResultLog {
    /// Create the log, truncating whatever a previous run left behind.
    pub fn create(path: impl Into<PathBuf>) -> PtResult<Self> {
        let path = path.into();
        File::create(&path).map_err(|e| persistence_error(&path, e))?;
        Ok(Self { path })
    }

    /// Attach to an existing log without truncating it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row and flush it to disk before returning.
    pub fn append(
        &self,
        phase: u64,
        cost: &CostMeasurement,
        candidate: &Candidate,
    ) -> PtResult<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| persistence_error(&self.path, e))?;

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::NonNumeric)
            .from_writer(file);

        let mut record = Vec::with_capacity(cost.values().len() + 2);
        record.push(phase.to_string());
        record.extend(cost.values().iter().map(f64::to_string));
        record.push(candidate.join(","));

        writer
            .write_record(&record)
            .map_err(|e| persistence_error(&self.path, e))?;
        writer.flush().map_err(|e| persistence_error(&self.path, e))?;
        Ok(())
    }

    /// Read every row back, oldest first.
    pub fn entries(&self) -> PtResult<Vec<LogEntry>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| persistence_error(&self.path, e))?;

        let mut entries = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| persistence_error(&self.path, e))?;
            if record.len() < 3 {
                return Err(PtError::Validation(format!(
                    "{} line {}: expected at least 3 fields, found {}",
                    self.path.display(),
                    line + 1,
                    record.len()
                )));
            }

            let parse_number = |field: &str| -> PtResult<f64> {
                field.trim().parse().map_err(|_| {
                    PtError::Validation(format!(
                        "{} line {}: not a number: {field:?}",
                        self.path.display(),
                        line + 1
                    ))
                })
            };

            let phase = parse_number(&record[0])? as u64;
            let cost = (1..record.len() - 1)
                .map(|i| parse_number(&record[i]))
                .collect::<PtResult<Vec<f64>>>()?;
            let passes = &record[record.len() - 1];
            let candidate = passes
                .split(',')
                .filter(|p| !p.is_empty())
                .collect::<Candidate>();

            entries.push(LogEntry {
                phase,
                cost,
                candidate,
            });
        }
        Ok(entries)
    }
}

fn persistence_error(path: &Path, err: impl std::fmt::Display) -> PtError {
    PtError::Persistence {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
