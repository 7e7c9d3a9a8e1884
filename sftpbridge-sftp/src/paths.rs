//! Remote path helpers.

use chrono::{DateTime, Utc};

/// Parent directories of `path`, shallowest first, excluding `path` itself.
///
/// Absolute paths yield absolute ancestors (`/a/b/c` → `/a`, `/a/b`);
/// relative paths stay relative to the login directory.
pub fn ancestor_dirs(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((_, parents)) = segments.split_last() else {
        return Vec::new();
    };

    let mut current = String::new();
    parents
        .iter()
        .map(|segment| {
            if absolute || !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            current.clone()
        })
        .collect()
}

/// Listing mtime (seconds since the epoch) as a timestamp.
pub fn mtime_to_datetime(mtime: Option<u32>) -> Option<DateTime<Utc>> {
    mtime.and_then(|secs| DateTime::from_timestamp(i64::from(secs), 0))
}
