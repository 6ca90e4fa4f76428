use camino::Utf8Path;
use mirror_core::diff::classify;
use mirror_core::{ComparisonResult, TreeSnapshot};
use mirror_infra::hashing::ContentHasher;
use mirror_scanner::{LocalTreeWalker, ScannerError, TreeWalker};
use tracing::{debug, warn};

use crate::sync::SyncError;

/// Walks both trees and classifies every path.
pub struct TreeComparator {
    source: Box<dyn TreeWalker>,
    replica: Box<dyn TreeWalker>,
}

impl Default for TreeComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeComparator {
    pub fn new() -> Self {
        Self::with_walkers(
            Box::new(LocalTreeWalker::source()),
            Box::new(LocalTreeWalker::replica()),
        )
    }

    pub fn with_walkers(source: Box<dyn TreeWalker>, replica: Box<dyn TreeWalker>) -> Self {
        Self { source, replica }
    }

    /// Snapshot both roots and decide what the replica needs.
    ///
    /// A missing replica root compares as an empty tree; it is created later
    /// by the engine. Nothing is written here.
    pub fn compare(
        &self,
        source_root: &Utf8Path,
        replica_root: &Utf8Path,
        hasher: &dyn ContentHasher,
    ) -> Result<ComparisonResult, SyncError> {
        let source = self
            .source
            .snapshot(source_root)
            .map_err(|e| SyncError::SourceUnavailable(format!("{source_root}: {e}")))?;

        let replica = match self.replica.snapshot(replica_root) {
            Ok(snap) => snap,
            Err(ScannerError::RootMissing(_)) => {
                debug!("Replica root {} does not exist yet", replica_root);
                TreeSnapshot::default()
            }
            Err(e) => {
                return Err(SyncError::ReplicaUnavailable(format!(
                    "{replica_root}: {e}"
                )))
            }
        };

        let result = classify(&source, &replica, |rel| {
            files_match(hasher, &source_root.join(rel), &replica_root.join(rel), rel)
        });

        debug!(
            "Compared {} source / {} replica entries: {} create, {} update, {} delete, {} unchanged",
            source.len(),
            replica.len(),
            result.to_create.len(),
            result.to_update.len(),
            result.to_delete.len(),
            result.unchanged.len()
        );
        Ok(result)
    }
}

/// Any hashing failure counts as "changed" so the file gets a copy attempt.
fn files_match(
    hasher: &dyn ContentHasher,
    source: &Utf8Path,
    replica: &Utf8Path,
    rel: &str,
) -> bool {
    let source_digest = match hasher.digest(source) {
        Ok(d) => d,
        Err(e) => {
            warn!("Cannot hash {}: {}; assuming it changed", rel, e);
            return false;
        }
    };
    match hasher.digest(replica) {
        Ok(replica_digest) => source_digest == replica_digest,
        Err(e) => {
            warn!("Cannot hash replica copy of {}: {}; assuming it changed", rel, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use mirror_core::PathEntry;
    use mirror_infra::hashing::{hash_reader, Digest, HashError};
    use std::collections::HashMap;
    use std::io;

    struct FixedWalker(Result<TreeSnapshot, fn(&Utf8Path) -> ScannerError>);

    impl TreeWalker for FixedWalker {
        fn snapshot(&self, root: &Utf8Path) -> Result<TreeSnapshot, ScannerError> {
            match &self.0 {
                Ok(snap) => Ok(snap.clone()),
                Err(make) => Err(make(root)),
            }
        }
    }

    /// Serves digests from memory; unknown paths fail like a vanished file.
    struct MemoryHasher(HashMap<Utf8PathBuf, &'static [u8]>);

    impl ContentHasher for MemoryHasher {
        fn digest(&self, path: &Utf8Path) -> Result<Digest, HashError> {
            match self.0.get(path) {
                Some(bytes) => Ok(hash_reader(*bytes, 4).unwrap()),
                None => Err(HashError::Io {
                    path: path.to_owned(),
                    source: io::Error::from(io::ErrorKind::NotFound),
                }),
            }
        }
    }

    fn walker(entries: Vec<PathEntry>) -> Box<dyn TreeWalker> {
        Box::new(FixedWalker(Ok(entries.into_iter().collect())))
    }

    #[test]
    fn compares_synthetic_trees_by_content() {
        let comparator = TreeComparator::with_walkers(
            walker(vec![
                PathEntry::file("same.txt"),
                PathEntry::file("edited.txt"),
                PathEntry::file("new.txt"),
            ]),
            walker(vec![
                PathEntry::file("same.txt"),
                PathEntry::file("edited.txt"),
                PathEntry::file("stale.txt"),
            ]),
        );
        let hasher = MemoryHasher(HashMap::from([
            (Utf8PathBuf::from("/s/same.txt"), &b"x"[..]),
            (Utf8PathBuf::from("/r/same.txt"), &b"x"[..]),
            (Utf8PathBuf::from("/s/edited.txt"), &b"z"[..]),
            (Utf8PathBuf::from("/r/edited.txt"), &b"x"[..]),
        ]));

        let result = comparator
            .compare(Utf8Path::new("/s"), Utf8Path::new("/r"), &hasher)
            .unwrap();

        assert!(result.unchanged.contains("same.txt"));
        assert!(result.to_update.contains("edited.txt"));
        assert!(result.to_create.contains_key("new.txt"));
        assert!(result.to_delete.contains_key("stale.txt"));
    }

    #[test]
    fn unhashable_file_is_assumed_changed() {
        let comparator = TreeComparator::with_walkers(
            walker(vec![PathEntry::file("flaky.txt")]),
            walker(vec![PathEntry::file("flaky.txt")]),
        );
        let hasher = MemoryHasher(HashMap::from([(
            Utf8PathBuf::from("/r/flaky.txt"),
            &b"x"[..],
        )]));

        let result = comparator
            .compare(Utf8Path::new("/s"), Utf8Path::new("/r"), &hasher)
            .unwrap();

        assert!(result.to_update.contains("flaky.txt"));
    }

    #[test]
    fn missing_replica_root_compares_as_empty() {
        let comparator = TreeComparator::with_walkers(
            walker(vec![PathEntry::dir("d")]),
            Box::new(FixedWalker(Err(|root| {
                ScannerError::RootMissing(root.to_owned())
            }))),
        );
        let hasher = MemoryHasher(HashMap::new());

        let result = comparator
            .compare(Utf8Path::new("/s"), Utf8Path::new("/r"), &hasher)
            .unwrap();

        assert!(result.to_create.contains_key("d"));
    }

    #[test]
    fn unusable_source_root_is_fatal() {
        let comparator = TreeComparator::with_walkers(
            Box::new(FixedWalker(Err(|root| {
                ScannerError::RootMissing(root.to_owned())
            }))),
            walker(vec![]),
        );
        let hasher = MemoryHasher(HashMap::new());

        let err = comparator
            .compare(Utf8Path::new("/s"), Utf8Path::new("/r"), &hasher)
            .unwrap_err();

        assert!(matches!(err, SyncError::SourceUnavailable(_)));
    }

    #[test]
    fn replica_root_that_is_a_file_is_fatal() {
        let comparator = TreeComparator::with_walkers(
            walker(vec![]),
            Box::new(FixedWalker(Err(|root| {
                ScannerError::NotADirectory(root.to_owned())
            }))),
        );
        let hasher = MemoryHasher(HashMap::new());

        let err = comparator
            .compare(Utf8Path::new("/s"), Utf8Path::new("/r"), &hasher)
            .unwrap_err();

        assert!(matches!(err, SyncError::ReplicaUnavailable(_)));
    }
}
