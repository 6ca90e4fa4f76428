use camino::Utf8Path;
use filetime::FileTime;
use mirror_config::STAGING_SUFFIX;
use mirror_core::EntryKind;
use std::fs::{self, File};
use std::io;
use tempfile::NamedTempFile;

/// Copy `src` over `dst` preserving timestamps and permission bits.
///
/// Bytes land in a uniquely named hidden file next to `dst` that is renamed
/// into place only once complete, so a failed copy never leaves a truncated
/// `dst` behind and never touches any other replica entry.
pub fn copy_with_metadata(src: &Utf8Path, dst: &Utf8Path) -> io::Result<u64> {
    let dir = match dst.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => Utf8Path::new("."),
    };
    // Dropping the staged file on any early return removes it.
    let mut staged = tempfile::Builder::new()
        .prefix(".")
        .suffix(STAGING_SUFFIX)
        .tempfile_in(dir)?;

    let meta = fs::metadata(src)?;
    let mut input = File::open(src)?;
    let bytes = io::copy(&mut input, staged.as_file_mut())?;
    apply_metadata(&meta, &staged)?;
    staged.persist(dst).map_err(|e| e.error)?;
    Ok(bytes)
}

fn apply_metadata(meta: &fs::Metadata, staged: &NamedTempFile) -> io::Result<()> {
    fs::set_permissions(staged.path(), meta.permissions())?;
    filetime::set_file_times(
        staged.path(),
        FileTime::from_last_access_time(meta),
        FileTime::from_last_modification_time(meta),
    )?;
    preserve_owner(meta, staged.path());
    Ok(())
}

#[cfg(unix)]
fn preserve_owner(meta: &fs::Metadata, path: &std::path::Path) {
    use std::os::unix::fs::MetadataExt;

    if let Err(e) = std::os::unix::fs::chown(path, Some(meta.uid()), Some(meta.gid())) {
        tracing::debug!("Could not preserve ownership of {}: {}", path.display(), e);
    }
}

#[cfg(not(unix))]
fn preserve_owner(_meta: &fs::Metadata, _path: &std::path::Path) {}

/// Remove a file, link or empty directory. Returns the kind removed, or
/// `None` when the path was already gone.
pub fn remove_entry(path: &Utf8Path) -> io::Result<Option<EntryKind>> {
    let meta = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let (kind, result) = if meta.is_dir() {
        (EntryKind::Directory, fs::remove_dir(path))
    } else {
        (EntryKind::File, fs::remove_file(path))
    };

    match result {
        Ok(()) => Ok(Some(kind)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
