use camino::{Utf8Path, Utf8PathBuf};
use mirror_core::path_utils::MirrorPath;
use mirror_core::{PathEntry, TreeSnapshot, WalkIssue, WalkIssueKind};
use std::fs;
use std::io;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("root {0} does not exist")]
    RootMissing(Utf8PathBuf),
    #[error("root {0} is not a directory")]
    NotADirectory(Utf8PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Produces a snapshot of the tree under `root`.
///
/// Implementations other than [`LocalTreeWalker`] exist mainly so comparison
/// logic can run against synthetic trees.
pub trait TreeWalker: Send + Sync {
    fn snapshot(&self, root: &Utf8Path) -> Result<TreeSnapshot, ScannerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPolicy {
    /// Record the link target's kind and content.
    Follow,
    /// Record the link itself, flagged so it is never treated as up to date.
    Preserve,
}

/// Walks a directory on the local filesystem.
#[derive(Debug, Clone, Copy)]
pub struct LocalTreeWalker {
    links: LinkPolicy,
}

impl LocalTreeWalker {
    pub fn new(links: LinkPolicy) -> Self {
        Self { links }
    }

    /// Walker for the authoritative tree: links are materialized.
    pub fn source() -> Self {
        Self::new(LinkPolicy::Follow)
    }

    /// Walker for the mirrored tree: links are never written through.
    pub fn replica() -> Self {
        Self::new(LinkPolicy::Preserve)
    }

    fn check_root(root: &Utf8Path) -> Result<(), ScannerError> {
        match fs::metadata(root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(ScannerError::NotADirectory(root.to_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ScannerError::RootMissing(root.to_owned()))
            }
            Err(e) => Err(ScannerError::Io(e)),
        }
    }

    fn relative(root: &Utf8Path, path: &std::path::Path) -> Option<String> {
        let rel = path.strip_prefix(root.as_std_path()).ok()?;
        rel.to_str().map(MirrorPath::normalize)
    }

    fn describe_error(&self, root: &Utf8Path, err: &walkdir::Error) -> WalkIssue {
        let rel_path = err
            .path()
            .and_then(|p| Self::relative(root, p))
            .unwrap_or_default();

        let kind = if err.loop_ancestor().is_some() {
            WalkIssueKind::LinkLoop
        } else if self.links == LinkPolicy::Follow
            && err.io_error().map(|e| e.kind()) == Some(io::ErrorKind::NotFound)
            && err
                .path()
                .and_then(|p| fs::symlink_metadata(p).ok())
                .is_some_and(|m| m.file_type().is_symlink())
        {
            WalkIssueKind::BrokenLink
        } else {
            WalkIssueKind::Unreadable
        };

        WalkIssue {
            rel_path,
            kind,
            message: err.to_string(),
        }
    }
}

impl Default for LocalTreeWalker {
    fn default() -> Self {
        Self::source()
    }
}

impl TreeWalker for LocalTreeWalker {
    fn snapshot(&self, root: &Utf8Path) -> Result<TreeSnapshot, ScannerError> {
        Self::check_root(root)?;
        info!("Scanning {} ({:?})", root, self.links);

        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(self.links == LinkPolicy::Follow)
            .sort_by_file_name();

        let mut builder = TreeSnapshot::builder();
        let mut count = 0usize;

        for item in walker {
            let entry = match item {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => return Err(ScannerError::Walk(err)),
                Err(err) => {
                    let issue = self.describe_error(root, &err);
                    warn!("Skipping {} ({:?}): {}", issue.rel_path, issue.kind, issue.message);
                    builder.issue(issue);
                    continue;
                }
            };

            let Some(rel) = Self::relative(root, entry.path()) else {
                let issue = WalkIssue {
                    rel_path: entry.path().to_string_lossy().into_owned(),
                    kind: WalkIssueKind::Unreadable,
                    message: "path is not valid UTF-8".to_string(),
                };
                warn!("Skipping {}: {}", issue.rel_path, issue.message);
                builder.issue(issue);
                continue;
            };

            let file_type = entry.file_type();
            let path_entry = if file_type.is_dir() {
                PathEntry::dir(rel)
            } else if file_type.is_file() {
                PathEntry::file(rel)
            } else if file_type.is_symlink() {
                PathEntry::link(rel)
            } else {
                // Sockets, fifos and devices have no content to mirror.
                debug!("Ignoring special file {}", rel);
                builder.issue(WalkIssue {
                    rel_path: rel,
                    kind: WalkIssueKind::Unreadable,
                    message: "unsupported file type".to_string(),
                });
                continue;
            };

            builder.insert(path_entry);
            count += 1;
        }

        let snapshot = builder.finish();
        debug!(
            "Scanned {}: {} entries, {} issues",
            root,
            count,
            snapshot.issues().len()
        );
        Ok(snapshot)
    }
}
