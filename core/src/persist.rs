//! Append-only anomaly log.
//!
//! One JSON object per line. Each append opens the file, writes the whole
//! line in a single `write_all`, and closes it, all while holding the writer
//! lock, so lines from concurrent deliveries never interleave. Serialization
//! happens before the lock is taken.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use driftwatch_types::AnomalyRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileSyncPolicy {
    /// Leave flushing to the OS.
    #[default]
    SkipSync,
    /// `sync_data` after every append, inside the writer lock.
    SyncData,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to serialize anomaly record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to open anomaly log {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to append to anomaly log {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug)]
pub struct AnomalyLog {
    path: PathBuf,
    sync: FileSyncPolicy,
    writer: Mutex<()>,
}

impl AnomalyLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, sync: FileSyncPolicy) -> Self {
        Self {
            path: path.into(),
            sync,
            writer: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, creating the file (and its directory) if absent.
    ///
    /// Returns the number of bytes written. Failures are not retried and
    /// nothing is buffered for a later attempt.
    pub fn append(&self, record: &AnomalyRecord) -> Result<usize, PersistError> {
        let line = record.to_json_line()?;

        // The guarded state is `()`, so a panic in another writer leaves
        // nothing to repair.
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|source| PersistError::Open {
                path: self.path.clone(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| PersistError::Open {
                path: self.path.clone(),
                source,
            })?;

        let write_err = |source| PersistError::Write {
            path: self.path.clone(),
            source,
        };
        file.write_all(&line).map_err(write_err)?;
        if self.sync == FileSyncPolicy::SyncData {
            file.sync_data().map_err(write_err)?;
        }

        Ok(line.len())
    }
}
