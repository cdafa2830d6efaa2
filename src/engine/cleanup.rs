//! Best-effort removal of temporary and partial files
//!
//! Failures are logged and collected in a [`CleanupReport`], never
//! propagated to the caller.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// What a cleanup pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    /// Paths that were already gone
    pub missing: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: CleanupReport) {
        self.removed.extend(other.removed);
        self.missing.extend(other.missing);
        self.failed.extend(other.failed);
    }
}

/// Remove one file, recording the result.
pub fn remove_best_effort(path: &Path, report: &mut CleanupReport) {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed temporary file");
            report.removed.push(path.to_path_buf());
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            report.missing.push(path.to_path_buf());
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not remove temporary file");
            report.failed.push((path.to_path_buf(), e.to_string()));
        }
    }
}

/// Remove every path in order.
pub fn remove_all<I, P>(paths: I) -> CleanupReport
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut report = CleanupReport::default();
    for path in paths {
        remove_best_effort(path.as_ref(), &mut report);
    }
    report
}
