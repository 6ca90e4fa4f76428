pub struct MirrorPath;

impl MirrorPath {
    /// Standardize directory separators to forward slashes.
    /// This is the key format used in snapshots and comparison results.
    pub fn normalize(path: &str) -> String {
        path.replace('\\', "/").trim_matches('/').to_string()
    }

    /// Reject paths that could escape the root they are joined onto.
    pub fn verify_safe(rel_path: &str) -> bool {
        let p = std::path::Path::new(rel_path);
        !rel_path.is_empty()
            && !p.is_absolute()
            && !p.components().any(|c| {
                matches!(
                    c,
                    std::path::Component::ParentDir
                        | std::path::Component::RootDir
                        | std::path::Component::Prefix(_)
                )
            })
    }

    /// Proper ancestors of a normalized relative path, nearest first.
    /// `ancestors("a/b/c")` yields `"a/b"` then `"a"`.
    pub fn ancestors(rel_path: &str) -> impl Iterator<Item = &str> {
        rel_path
            .char_indices()
            .rev()
            .filter(|(_, c)| *c == '/')
            .map(move |(i, _)| &rel_path[..i])
    }

    /// True when `rel_path` equals `ancestor` or lies beneath it.
    pub fn is_within(rel_path: &str, ancestor: &str) -> bool {
        rel_path == ancestor
            || (rel_path.starts_with(ancestor) && rel_path[ancestor.len()..].starts_with('/'))
    }
}
