use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub mod diff;
pub mod path_utils;

use path_utils::MirrorPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One node of a walked tree, keyed by its forward-slash relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    pub rel_path: String,
    pub kind: EntryKind,
    /// Symbolic link that was recorded as-is instead of being followed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_link: bool,
}

impl PathEntry {
    pub fn file(rel_path: impl Into<String>) -> Self {
        Self {
            rel_path: MirrorPath::normalize(&rel_path.into()),
            kind: EntryKind::File,
            is_link: false,
        }
    }

    pub fn dir(rel_path: impl Into<String>) -> Self {
        Self {
            rel_path: MirrorPath::normalize(&rel_path.into()),
            kind: EntryKind::Directory,
            is_link: false,
        }
    }

    pub fn link(rel_path: impl Into<String>) -> Self {
        Self {
            is_link: true,
            ..Self::file(rel_path)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkIssueKind {
    BrokenLink,
    LinkLoop,
    Unreadable,
}

/// A path the walker saw but could not classify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkIssue {
    pub rel_path: String,
    pub kind: WalkIssueKind,
    pub message: String,
}

/// Point-in-time listing of one tree. Iteration is in path order, which puts
/// every directory before its descendants.
#[derive(Debug, Clone, Default)]
pub struct TreeSnapshot {
    entries: BTreeMap<String, PathEntry>,
    issues: Vec<WalkIssue>,
}

impl TreeSnapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    pub fn get(&self, rel_path: &str) -> Option<&PathEntry> {
        self.entries.get(rel_path)
    }

    pub fn contains(&self, rel_path: &str) -> bool {
        self.entries.contains_key(rel_path)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PathEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn issues(&self) -> &[WalkIssue] {
        &self.issues
    }
}

#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    entries: BTreeMap<String, PathEntry>,
    issues: Vec<WalkIssue>,
}

impl SnapshotBuilder {
    pub fn insert(&mut self, entry: PathEntry) -> &mut Self {
        self.entries.insert(entry.rel_path.clone(), entry);
        self
    }

    pub fn issue(&mut self, issue: WalkIssue) -> &mut Self {
        self.issues.push(issue);
        self
    }

    pub fn finish(self) -> TreeSnapshot {
        TreeSnapshot {
            entries: self.entries,
            issues: self.issues,
        }
    }
}

impl FromIterator<PathEntry> for TreeSnapshot {
    fn from_iter<I: IntoIterator<Item = PathEntry>>(iter: I) -> Self {
        let mut builder = SnapshotBuilder::default();
        for entry in iter {
            builder.insert(entry);
        }
        builder.finish()
    }
}

/// Outcome of comparing a source snapshot against a replica snapshot.
///
/// `to_create` and `to_delete` share a path only when the entry changed kind;
/// the replica entry has to go before the source entry can be created.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonResult {
    pub to_create: BTreeMap<String, EntryKind>,
    pub to_update: BTreeSet<String>,
    /// Keyed by path, valued by the kind currently in the replica.
    pub to_delete: BTreeMap<String, EntryKind>,
    pub unchanged: BTreeSet<String>,
    pub issues: Vec<WalkIssue>,
}

impl ComparisonResult {
    /// True when the replica already matches the source.
    pub fn is_converged(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Directories to create, parents first.
    pub fn directories_to_create(&self) -> Vec<String> {
        self.to_create
            .iter()
            .filter(|(_, kind)| **kind == EntryKind::Directory)
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Replica entries sitting at or below a path that is about to be created.
    /// Returned children first so they can be removed in order.
    pub fn conflicting_deletes(&self) -> Vec<(String, EntryKind)> {
        self.to_delete
            .iter()
            .rev()
            .filter(|(path, _)| self.blocks_creation(path))
            .map(|(path, kind)| (path.clone(), *kind))
            .collect()
    }

    /// Replica entries absent from the source, children first.
    pub fn stale_deletes(&self) -> Vec<(String, EntryKind)> {
        self.to_delete
            .iter()
            .rev()
            .filter(|(path, _)| !self.blocks_creation(path))
            .map(|(path, kind)| (path.clone(), *kind))
            .collect()
    }

    fn blocks_creation(&self, path: &str) -> bool {
        self.to_create.contains_key(path)
            || MirrorPath::ancestors(path).any(|a| self.to_create.contains_key(a))
    }

    /// One task per file that has to be written into the replica, in path order.
    pub fn copy_tasks(&self, source_root: &Utf8Path, replica_root: &Utf8Path) -> Vec<CopyTask> {
        let creates = self
            .to_create
            .iter()
            .filter(|(_, kind)| **kind == EntryKind::File)
            .map(|(path, _)| (path, CopyIntent::Create));
        let updates = self.to_update.iter().map(|path| (path, CopyIntent::Update));

        let mut tasks: Vec<CopyTask> = creates
            .chain(updates)
            .map(|(path, intent)| CopyTask {
                rel_path: path.clone(),
                source: source_root.join(path),
                destination: replica_root.join(path),
                intent,
            })
            .collect();
        tasks.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        tasks
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyIntent {
    Create,
    Update,
}

/// A single file copy from the source tree into the replica tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyTask {
    pub rel_path: String,
    pub source: Utf8PathBuf,
    pub destination: Utf8PathBuf,
    pub intent: CopyIntent,
}
