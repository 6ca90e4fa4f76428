use mirror_core::{WalkIssue, WalkIssueKind};
use serde::Serialize;
use std::fmt;
use std::io;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Scan,
    CreateDir,
    Copy,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Scan => "scan",
            Operation::CreateDir => "create directory",
            Operation::Copy => "copy",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PermissionDenied,
    NotFound,
    DiskFull,
    BrokenLink,
    LinkLoop,
    Unreadable,
    UnsafePath,
    Io,
}

impl FailureKind {
    pub fn from_io(err: &io::Error) -> Self {
        #[cfg(unix)]
        if err.raw_os_error() == Some(28) {
            // ENOSPC
            return FailureKind::DiskFull;
        }
        match err.kind() {
            io::ErrorKind::PermissionDenied => FailureKind::PermissionDenied,
            io::ErrorKind::NotFound => FailureKind::NotFound,
            _ => FailureKind::Io,
        }
    }
}

/// A failure scoped to one path. Never aborts the pass it happened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{operation} {path} failed ({kind:?}): {message}")]
pub struct FileOpError {
    pub path: String,
    pub operation: Operation,
    pub kind: FailureKind,
    pub message: String,
}

impl FileOpError {
    pub fn io(path: impl Into<String>, operation: Operation, err: &io::Error) -> Self {
        Self {
            path: path.into(),
            operation,
            kind: FailureKind::from_io(err),
            message: err.to_string(),
        }
    }

    pub fn unsafe_path(path: impl Into<String>, operation: Operation) -> Self {
        let path = path.into();
        Self {
            message: format!("refusing to touch path outside the replica: {path}"),
            path,
            operation,
            kind: FailureKind::UnsafePath,
        }
    }
}

impl From<&WalkIssue> for FileOpError {
    fn from(issue: &WalkIssue) -> Self {
        let kind = match issue.kind {
            WalkIssueKind::BrokenLink => FailureKind::BrokenLink,
            WalkIssueKind::LinkLoop => FailureKind::LinkLoop,
            WalkIssueKind::Unreadable => FailureKind::Unreadable,
        };
        Self {
            path: issue.rel_path.clone(),
            operation: Operation::Scan,
            kind,
            message: issue.message.clone(),
        }
    }
}

/// What one pass did. Produced once per pass and handed to the log.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    pub files_created: u64,
    pub files_updated: u64,
    pub files_deleted: u64,
    pub dirs_created: u64,
    pub dirs_deleted: u64,
    pub unchanged: u64,
    pub bytes_copied: u64,
    pub errors: Vec<FileOpError>,
    pub elapsed: Duration,
}

impl SyncSummary {
    pub fn record(&mut self, err: FileOpError) {
        self.errors.push(err);
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when the pass changed nothing in the replica.
    pub fn is_noop(&self) -> bool {
        self.files_created == 0
            && self.files_updated == 0
            && self.files_deleted == 0
            && self.dirs_created == 0
            && self.dirs_deleted == 0
    }

    /// Emit the per-pass summary record followed by one record per error.
    pub fn log(&self) {
        info!(
            files_created = self.files_created,
            files_updated = self.files_updated,
            files_deleted = self.files_deleted,
            dirs_created = self.dirs_created,
            dirs_deleted = self.dirs_deleted,
            unchanged = self.unchanged,
            bytes_copied = self.bytes_copied,
            errors = self.errors.len(),
            elapsed_ms = self.elapsed.as_millis() as u64,
            "Synchronization pass finished"
        );
        for err in &self.errors {
            warn!(
                path = %err.path,
                operation = %err.operation,
                kind = ?err.kind,
                "{}",
                err.message
            );
        }
    }
}
