//! Tally of what happened to each target in a run.

use std::{fmt, path::PathBuf};

use crate::{download::TransferOutcome, plan::FetchTarget};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes: u64,
    pub failures: Vec<(PathBuf, String)>,
    pub archive_errors: Vec<(PathBuf, String)>,
}

impl Summary {
    pub fn record(&mut self, target: &FetchTarget, outcome: &TransferOutcome) {
        match outcome {
            TransferOutcome::Downloaded(bytes) => {
                self.downloaded += 1;
                self.bytes += bytes;
            }
            TransferOutcome::Skipped(_) => self.skipped += 1,
            TransferOutcome::Failed(cause) => {
                self.failed += 1;
                self.failures.push((target.local_path.clone(), cause.clone()));
            }
        }
    }

    /// Notes an archive that downloaded but could not be expanded.
    pub fn record_archive_error(&mut self, target: &FetchTarget, cause: String) {
        self.archive_errors.push((target.local_path.clone(), cause));
    }

    pub fn total(&self) -> u64 {
        self.downloaded + self.skipped + self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Folds another run into this one.
    pub fn merge(&mut self, other: Summary) {
        self.downloaded += other.downloaded;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.bytes += other.bytes;
        self.failures.extend(other.failures);
        self.archive_errors.extend(other.archive_errors);
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Downloaded: {} files ({} bytes)", self.downloaded, self.bytes)?;
        writeln!(f, "  Skipped: {} files", self.skipped)?;
        write!(f, "  Failed: {} files", self.failed)?;

        for (path, cause) in &self.failures {
            write!(f, "\n    ✗ {}: {}", path.display(), cause)?;
        }
        for (path, cause) in &self.archive_errors {
            write!(f, "\n    ✗ could not expand {}: {}", path.display(), cause)?;
        }

        Ok(())
    }
}

// -- Tests -------------------------------------------------------------------
