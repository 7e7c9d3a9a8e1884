//! Slash-delimited path mapping between the remote tree and the object store.
//!
//! All comparisons work on segment sequences, never on raw strings, so
//! leading, trailing and duplicate separators never cause a mismatch.

/// Splits `path` on `/`, discarding empty segments.
pub fn to_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Re-roots `source_path` from `source_root` onto `dest_root`.
///
/// Drops as many leading segments from `source_path` as `source_root` has,
/// then joins the remainder under `dest_root`. The result has no leading or
/// trailing separator; an empty result means root-level placement.
pub fn map_destination(source_root: &str, source_path: &str, dest_root: &str) -> String {
    let strip = to_segments(source_root).len();
    to_segments(dest_root)
        .into_iter()
        .chain(to_segments(source_path).into_iter().skip(strip))
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns true if `prefix` is a whole-segment prefix of `path`.
///
/// `bucket/sub` is a prefix of `bucket/sub/dir/x` but not of `bucket/subdir/x`.
pub fn is_segment_prefix(prefix: &str, path: &str) -> bool {
    let prefix = to_segments(prefix);
    let path = to_segments(path);
    path.len() >= prefix.len() && path[..prefix.len()] == prefix[..]
}

/// Joins a directory listing path and an entry name.
pub fn child(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{name}", dir.trim_end_matches('/'))
    }
}

/// Joins non-empty parts with `/`, skipping empty ones.
pub fn join<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
