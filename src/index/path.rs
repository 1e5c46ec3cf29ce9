//! Entry path normalization and splitting
//!
//! Index paths are relative, `/`-separated and never contain empty, `.` or `..`
//! segments. The flat lookup cache is keyed by the case-folded form.

use crate::error::{ArchiveError, Result};

/// Normalize a raw archive path, rejecting empty, absolute and escaping paths.
///
/// Backslashes are treated as separators, and empty or `.` segments are dropped.
pub fn normalize(raw: &str) -> Result<String> {
    let invalid = |reason| ArchiveError::InvalidPath {
        path: raw.to_string(),
        reason,
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty path"));
    }
    if trimmed.starts_with('/') || trimmed.starts_with('\\') || has_drive_prefix(trimmed) {
        return Err(invalid("absolute path"));
    }

    let mut normalized = String::with_capacity(trimmed.len());
    for segment in trimmed.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return Err(invalid("path escapes the archive root")),
            _ => {
                if !normalized.is_empty() {
                    normalized.push('/');
                }
                normalized.push_str(segment);
            }
        }
    }

    if normalized.is_empty() {
        return Err(invalid("empty path"));
    }
    Ok(normalized)
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Whether a raw listing path names a directory rather than a file.
pub fn is_directory_marker(raw: &str) -> bool {
    let trimmed = raw.trim_end();
    trimmed.ends_with('/') || trimmed.ends_with('\\')
}

/// Case-folded cache key for a normalized path.
pub fn fold_key(path: &str) -> String {
    path.to_lowercase()
}

/// Split a normalized path into its parent directory and final segment.
/// Top-level paths have an empty parent.
pub fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

/// Every proper directory prefix of a normalized directory path, root-first,
/// including the path itself. `"a/b/c"` yields `"a"`, `"a/b"`, `"a/b/c"`.
pub fn directory_prefixes(dir: &str) -> impl Iterator<Item = &str> {
    dir.match_indices('/')
        .map(move |(i, _)| &dir[..i])
        .chain((!dir.is_empty()).then_some(dir))
}
