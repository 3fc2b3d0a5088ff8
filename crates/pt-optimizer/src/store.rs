//! Durable copy of the best pass list found so far.

use pt_types::{Candidate, PtError, PtResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Writes the optimum in pass-list format (one pass per line), replacing the
/// whole file each time.
///
/// The new contents go to a sibling `*.tmp` file first and are renamed over
/// the target, so a reader never sees a half-written list.
#[derive(Debug, Clone)]
pub struct OptimumStore {
    path: PathBuf,
}

impl OptimumStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, candidate: &Candidate) -> PtResult<()> {
        let tmp = self.tmp_path();
        std::fs::write(&tmp, candidate.to_pass_list())
            .and_then(|()| std::fs::rename(&tmp, &self.path))
            .map_err(|e| PtError::Persistence {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(path = %self.path.display(), passes = candidate.len(), "saved optimum");
        Ok(())
    }

    pub fn load(&self) -> PtResult<Candidate> {
        let text = std::fs::read_to_string(&self.path)?;
        Ok(Candidate::parse_pass_list(&text))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}
