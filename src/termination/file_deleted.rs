// src/termination/file_deleted.rs
//! External stop request: trips when a watched file disappears

use crate::model::TerminationStatus;
use crate::termination::TerminationCondition;
use crate::utils::errors::{EngineError, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

pub struct FileDeletedCondition {
    path: PathBuf,
    tripped: AtomicBool,
}

impl FileDeletedCondition {
    /// Watch `path`, which must exist now
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(EngineError::Parameter(format!(
                "File to watch for termination does not exist: {}",
                path.display()
            )));
        }

        info!("Will terminate if {} is deleted", path.display());
        Ok(Self {
            path,
            tripped: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TerminationCondition for FileDeletedCondition {
    fn must_stop(&self) -> bool {
        if self.tripped.load(Ordering::Acquire) {
            return true;
        }
        if !self.path.exists() {
            self.tripped.store(true, Ordering::Release);
            return true;
        }
        false
    }

    fn status(&self) -> Vec<TerminationStatus> {
        Vec::new()
    }

    fn reason(&self) -> String {
        if self.must_stop() {
            format!("Termination file ({}) was deleted", self.path.display())
        } else {
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_trips_when_file_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep-running");
        fs::write(&path, b"").unwrap();

        let condition = FileDeletedCondition::new(&path).unwrap();
        assert!(!condition.must_stop());

        fs::remove_file(&path).unwrap();
        assert!(condition.must_stop());
        assert!(condition.reason().contains("keep-running"));

        // Recreating the file does not reset a tripped condition
        fs::write(&path, b"").unwrap();
        assert!(condition.must_stop());
    }

    #[test]
    fn test_missing_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileDeletedCondition::new(dir.path().join("missing")).is_err());
    }
}
