use camino::Utf8PathBuf;
use mirror_config::{
    DEFAULT_FILE_COPY_BATCH_SIZE, DEFAULT_HASHING_CHUNK_SIZE, DEFAULT_MAX_WORKERS,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod compare;
pub mod copy;
pub mod engine;
pub mod reconcile;
pub mod summary;

/// Tuning for a single pass. Read-only for the duration of the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    pub file_copy_batch_size: usize,
    pub max_workers: usize,
    pub hashing_file_chunk_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            file_copy_batch_size: DEFAULT_FILE_COPY_BATCH_SIZE,
            max_workers: DEFAULT_MAX_WORKERS,
            hashing_file_chunk_size: DEFAULT_HASHING_CHUNK_SIZE,
        }
    }
}

impl SyncOptions {
    pub fn validate(&self) -> Result<(), SyncError> {
        let fields = [
            ("file_copy_batch_size", self.file_copy_batch_size),
            ("max_workers", self.max_workers),
            ("hashing_file_chunk_size", self.hashing_file_chunk_size),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(SyncError::InvalidOptions(format!(
                    "{name} must be a positive integer"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub source_root: Utf8PathBuf,
    pub replica_root: Utf8PathBuf,
    pub options: SyncOptions,
}

/// Where a pass currently is. A pass always ends back in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Comparing,
    Copying,
    Reconciling,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Comparing => "comparing",
            SyncPhase::Copying => "copying",
            SyncPhase::Reconciling => "reconciling",
        };
        f.write_str(name)
    }
}

/// Errors that abort a whole pass. Per-file failures are reported through
/// [`SyncSummary`] instead.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Source tree unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Replica tree unavailable: {0}")]
    ReplicaUnavailable(String),
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

pub use engine::SyncEngine;
pub use summary::{FailureKind, FileOpError, Operation, SyncSummary};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        assert!(SyncOptions::default().validate().is_ok());
    }

    #[test]
    fn zero_fields_are_rejected() {
        let opts = SyncOptions {
            max_workers: 0,
            ..SyncOptions::default()
        };
        match opts.validate() {
            Err(SyncError::InvalidOptions(msg)) => assert!(msg.contains("max_workers")),
            other => panic!("expected invalid options, got {other:?}"),
        }
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let opts: SyncOptions = serde_json::from_str(r#"{"max_workers": 2}"#).unwrap();
        assert_eq!(opts.max_workers, 2);
        assert_eq!(opts.file_copy_batch_size, DEFAULT_FILE_COPY_BATCH_SIZE);
        assert_eq!(opts.hashing_file_chunk_size, DEFAULT_HASHING_CHUNK_SIZE);
    }
}
