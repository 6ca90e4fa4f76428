use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};

/// Invalid startup input. The process reports it and exits before any pass.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("source folder {0} does not exist")]
    SourceMissing(Utf8PathBuf),
    #[error("source {0} is not a directory")]
    SourceNotDirectory(Utf8PathBuf),
    #[error("replica {0} exists but is not a directory")]
    ReplicaNotDirectory(Utf8PathBuf),
    #[error("parent folder of replica {0} does not exist")]
    ReplicaParentMissing(Utf8PathBuf),
    #[error("replica {replica} and source {src} overlap")]
    Overlap { src: Utf8PathBuf, replica: Utf8PathBuf },
    #[error("log file {log} must not be inside {tree}")]
    LogInsideTree { log: Utf8PathBuf, tree: Utf8PathBuf },
    #[error("folder {path} is not writable: {cause}")]
    NotWritable { path: Utf8PathBuf, cause: io::Error },
    #[error("cannot open log file {path}: {cause}")]
    LogFile { path: Utf8PathBuf, cause: io::Error },
    #[error("sync interval must be a positive number of seconds")]
    ZeroInterval,
    #[error("cannot resolve {path}: {cause}")]
    Resolve { path: Utf8PathBuf, cause: io::Error },
}

/// Check everything a pass relies on before the first one starts.
pub fn validate_inputs(
    source: &Utf8Path,
    replica: &Utf8Path,
    log_file: &Utf8Path,
    interval_secs: u64,
) -> Result<(), ValidationError> {
    if interval_secs == 0 {
        return Err(ValidationError::ZeroInterval);
    }

    match fs::metadata(source) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(ValidationError::SourceNotDirectory(source.to_owned())),
        Err(_) => return Err(ValidationError::SourceMissing(source.to_owned())),
    }

    let replica_parent = parent_or_cwd(replica);
    if replica.exists() {
        if !replica.is_dir() {
            return Err(ValidationError::ReplicaNotDirectory(replica.to_owned()));
        }
        check_writable(replica)?;
    } else {
        if !replica_parent.is_dir() {
            return Err(ValidationError::ReplicaParentMissing(replica.to_owned()));
        }
        check_writable(replica_parent)?;
    }

    let src_abs = resolve(source)?;
    let replica_abs = resolve(replica)?;
    if src_abs.starts_with(&replica_abs) || replica_abs.starts_with(&src_abs) {
        return Err(ValidationError::Overlap {
            src: source.to_owned(),
            replica: replica.to_owned(),
        });
    }

    let log_dir = parent_or_cwd(log_file);
    check_writable(log_dir)?;
    let log_abs = resolve(log_file)?;
    for (tree, tree_abs) in [(source, &src_abs), (replica, &replica_abs)] {
        if log_abs.starts_with(tree_abs) {
            return Err(ValidationError::LogInsideTree {
                log: log_file.to_owned(),
                tree: tree.to_owned(),
            });
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|cause| ValidationError::LogFile {
            path: log_file.to_owned(),
            cause,
        })?;

    Ok(())
}

fn parent_or_cwd(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => Utf8Path::new("."),
    }
}

fn check_writable(dir: &Utf8Path) -> Result<(), ValidationError> {
    tempfile::tempfile_in(dir)
        .map(drop)
        .map_err(|cause| ValidationError::NotWritable {
            path: dir.to_owned(),
            cause,
        })
}

/// Absolute, symlink-free form of `path`. A missing last component is
/// resolved through its parent.
fn resolve(path: &Utf8Path) -> Result<PathBuf, ValidationError> {
    let err = |cause| ValidationError::Resolve {
        path: path.to_owned(),
        cause,
    };
    match path.canonicalize() {
        Ok(p) => Ok(p),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let parent = parent_or_cwd(path).canonicalize().map_err(err)?;
            Ok(parent.join(path.file_name().unwrap_or("")))
        }
        Err(e) => Err(err(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn root() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn accepts_missing_replica_under_writable_parent() {
        let (_dir, root) = root();
        fs::create_dir(root.join("src")).unwrap();

        validate_inputs(
            &root.join("src"),
            &root.join("replica"),
            &root.join("sync.log"),
            5,
        )
        .unwrap();

        assert!(root.join("sync.log").is_file());
        assert!(!root.join("replica").exists());
    }

    #[test]
    fn rejects_zero_interval() {
        let (_dir, root) = root();
        let err = validate_inputs(&root, &root.join("r"), &root.join("l.log"), 0).unwrap_err();
        assert!(matches!(err, ValidationError::ZeroInterval));
    }

    #[test]
    fn rejects_missing_or_file_source() {
        let (_dir, root) = root();
        fs::write(root.join("plain.txt"), b"x").unwrap();

        let missing =
            validate_inputs(&root.join("nope"), &root.join("r"), &root.join("l.log"), 1)
                .unwrap_err();
        assert!(matches!(missing, ValidationError::SourceMissing(_)));

        let file =
            validate_inputs(&root.join("plain.txt"), &root.join("r"), &root.join("l.log"), 1)
                .unwrap_err();
        assert!(matches!(file, ValidationError::SourceNotDirectory(_)));
    }

    #[test]
    fn rejects_replica_without_parent() {
        let (_dir, root) = root();
        fs::create_dir(root.join("src")).unwrap();

        let err = validate_inputs(
            &root.join("src"),
            &root.join("missing/replica"),
            &root.join("l.log"),
            1,
        )
        .unwrap_err();

        assert!(matches!(err, ValidationError::ReplicaParentMissing(_)));
    }

    #[test]
    fn rejects_nested_trees() {
        let (_dir, root) = root();
        fs::create_dir(root.join("src")).unwrap();

        let inside = validate_inputs(
            &root.join("src"),
            &root.join("src/replica"),
            &root.join("l.log"),
            1,
        )
        .unwrap_err();
        assert!(matches!(inside, ValidationError::Overlap { .. }));

        let same =
            validate_inputs(&root.join("src"), &root.join("src"), &root.join("l.log"), 1)
                .unwrap_err();
        assert!(matches!(same, ValidationError::Overlap { .. }));

        let outside =
            validate_inputs(&root.join("src"), &root, &root.join("l.log"), 1).unwrap_err();
        assert!(matches!(outside, ValidationError::Overlap { .. }));
    }

    #[test]
    fn rejects_log_file_in_missing_folder() {
        let (_dir, root) = root();
        fs::create_dir(root.join("src")).unwrap();

        let err = validate_inputs(
            &root.join("src"),
            &root.join("replica"),
            &root.join("logs/sync.log"),
            1,
        )
        .unwrap_err();

        assert!(matches!(err, ValidationError::NotWritable { .. }));
    }

    #[test]
    fn rejects_log_file_inside_replica() {
        let (_dir, root) = root();
        fs::create_dir(root.join("src")).unwrap();
        fs::create_dir(root.join("replica")).unwrap();
        let log = root.join("replica/mirror.log");

        let err = validate_inputs(&root.join("src"), &root.join("replica"), &log, 5).unwrap_err();

        assert!(
            matches!(err, ValidationError::LogInsideTree { ref tree, .. } if tree == &root.join("replica"))
        );
        assert!(!log.exists());
    }

    #[test]
    fn rejects_log_file_inside_source() {
        let (_dir, root) = root();
        fs::create_dir_all(root.join("src/logs")).unwrap();
        let log = root.join("src/logs/mirror.log");

        let err = validate_inputs(&root.join("src"), &root.join("replica"), &log, 5).unwrap_err();

        assert!(
            matches!(err, ValidationError::LogInsideTree { ref tree, .. } if tree == &root.join("src"))
        );
        assert!(!log.exists());
    }

    #[test]
    fn accepts_log_file_next_to_source_with_shared_prefix() {
        let (_dir, root) = root();
        fs::create_dir(root.join("src")).unwrap();

        validate_inputs(
            &root.join("src"),
            &root.join("replica"),
            &root.join("src.log"),
            5,
        )
        .unwrap();

        assert!(root.join("src.log").is_file());
    }
}
