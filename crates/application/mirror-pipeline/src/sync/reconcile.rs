use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use mirror_core::path_utils::MirrorPath;
use mirror_core::EntryKind;
use tracing::{debug, info};

use crate::io_utils::remove_entry;
use crate::sync::{FileOpError, Operation, SyncSummary};

/// Applies directory creations and deletions to the replica, one path at a
/// time, recording failures instead of stopping.
pub struct TreeReconciler {
    replica_root: Utf8PathBuf,
}

impl TreeReconciler {
    pub fn new(replica_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            replica_root: replica_root.into(),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.replica_root
    }

    /// Create directories parents-first.
    pub fn apply_creates(&self, dirs: &[String], summary: &mut SyncSummary) {
        let mut ordered: Vec<&String> = dirs.iter().collect();
        ordered.sort();

        for rel in ordered {
            if !MirrorPath::verify_safe(rel) {
                summary.record(FileOpError::unsafe_path(rel, Operation::CreateDir));
                continue;
            }
            let path = self.replica_root.join(rel);
            if path.is_dir() {
                continue;
            }
            match fs::create_dir_all(&path) {
                Ok(()) => {
                    info!("Creating directory {}", path);
                    summary.dirs_created += 1;
                }
                Err(e) => summary.record(FileOpError::io(rel, Operation::CreateDir, &e)),
            }
        }
    }

    /// Remove entries children-first. Directories are only removed once
    /// empty, so a failed child keeps its parent in place.
    pub fn apply_deletes(&self, deletes: &[(String, EntryKind)], summary: &mut SyncSummary) {
        let mut ordered: Vec<&(String, EntryKind)> = deletes.iter().collect();
        ordered.sort_by(|a, b| b.0.cmp(&a.0));

        for (rel, planned) in ordered {
            if !MirrorPath::verify_safe(rel) {
                summary.record(FileOpError::unsafe_path(rel, Operation::Delete));
                continue;
            }
            let path = self.replica_root.join(rel);
            match remove_entry(&path) {
                Ok(Some(EntryKind::File)) => {
                    info!("Deleting file {}", path);
                    summary.files_deleted += 1;
                }
                Ok(Some(EntryKind::Directory)) => {
                    info!("Deleting directory {}", path);
                    summary.dirs_deleted += 1;
                }
                Ok(None) => debug!("{} ({:?}) already gone", path, planned),
                Err(e) => summary.record(FileOpError::io(rel, Operation::Delete, &e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::FailureKind;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, TreeReconciler) {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, TreeReconciler::new(root))
    }

    #[test]
    fn creates_nested_directories_in_any_input_order() {
        let (_dir, rec) = setup();
        let mut summary = SyncSummary::default();

        rec.apply_creates(
            &["a/b/c".to_string(), "a".to_string(), "a/b".to_string()],
            &mut summary,
        );

        assert!(rec.root().join("a/b/c").is_dir());
        assert_eq!(summary.dirs_created, 3);
        assert!(summary.is_clean());
    }

    #[test]
    fn deletes_subtree_children_first() {
        let (_dir, rec) = setup();
        let root = rec.root().to_owned();
        fs::create_dir_all(root.join("old/inner")).unwrap();
        fs::write(root.join("old/inner/x.bin"), b"x").unwrap();
        fs::write(root.join("old/y.txt"), b"y").unwrap();
        let mut summary = SyncSummary::default();

        rec.apply_deletes(
            &[
                ("old".to_string(), EntryKind::Directory),
                ("old/inner".to_string(), EntryKind::Directory),
                ("old/inner/x.bin".to_string(), EntryKind::File),
                ("old/y.txt".to_string(), EntryKind::File),
            ],
            &mut summary,
        );

        assert!(!root.join("old").exists());
        assert_eq!(summary.files_deleted, 2);
        assert_eq!(summary.dirs_deleted, 2);
        assert!(summary.is_clean());
    }

    #[test]
    fn vanished_entry_is_not_an_error() {
        let (_dir, rec) = setup();
        let mut summary = SyncSummary::default();

        rec.apply_deletes(&[("gone.txt".to_string(), EntryKind::File)], &mut summary);

        assert!(summary.is_clean());
        assert_eq!(summary.files_deleted, 0);
    }

    #[test]
    fn undeletable_directory_is_recorded() {
        let (_dir, rec) = setup();
        let root = rec.root().to_owned();
        fs::create_dir_all(root.join("keep")).unwrap();
        fs::write(root.join("keep/unlisted.txt"), b"x").unwrap();
        let mut summary = SyncSummary::default();

        rec.apply_deletes(&[("keep".to_string(), EntryKind::Directory)], &mut summary);

        assert_eq!(summary.error_count(), 1);
        assert_eq!(summary.errors[0].operation, Operation::Delete);
        assert!(root.join("keep/unlisted.txt").exists());
    }

    #[test]
    fn unsafe_paths_are_refused() {
        let (_dir, rec) = setup();
        let mut summary = SyncSummary::default();

        rec.apply_deletes(&[("../x".to_string(), EntryKind::File)], &mut summary);
        rec.apply_creates(&["/abs".to_string()], &mut summary);

        assert_eq!(summary.error_count(), 2);
        assert!(summary
            .errors
            .iter()
            .all(|e| e.kind == FailureKind::UnsafePath));
    }
}
