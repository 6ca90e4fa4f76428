use crate::path_utils::MirrorPath;
use crate::{ComparisonResult, EntryKind, TreeSnapshot};

/// Classify every path of both snapshots.
///
/// `same_content` is asked only for paths that are a regular file on both
/// sides and must answer `false` whenever equality cannot be established.
pub fn classify<F>(
    source: &TreeSnapshot,
    replica: &TreeSnapshot,
    mut same_content: F,
) -> ComparisonResult
where
    F: FnMut(&str) -> bool,
{
    let mut result = ComparisonResult::default();

    for entry in source.iter() {
        let path = &entry.rel_path;
        match replica.get(path) {
            None => {
                result.to_create.insert(path.clone(), entry.kind);
            }
            Some(existing) if existing.is_link || existing.kind != entry.kind => {
                // Kind changed: the replica entry goes first, then the source kind is created.
                result.to_delete.insert(path.clone(), existing.kind);
                result.to_create.insert(path.clone(), entry.kind);
            }
            Some(_) => match entry.kind {
                EntryKind::Directory => {
                    result.unchanged.insert(path.clone());
                }
                EntryKind::File => {
                    if same_content(path) {
                        result.unchanged.insert(path.clone());
                    } else {
                        result.to_update.insert(path.clone());
                    }
                }
            },
        }
    }

    for entry in replica.iter() {
        let path = &entry.rel_path;
        if source.contains(path) {
            continue;
        }
        // A source path the walker could not read is not evidence of removal.
        let shadowed = source
            .issues()
            .iter()
            .any(|issue| MirrorPath::is_within(path, &issue.rel_path));
        if shadowed {
            continue;
        }
        result.to_delete.insert(path.clone(), entry.kind);
    }

    result.issues.extend(source.issues().iter().cloned());
    result.issues.extend(replica.issues().iter().cloned());
    result
}
