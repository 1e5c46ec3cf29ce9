//! Configuration types for loading and the worker pool

use std::time::Duration;

/// Where records sit inside a records archive, and how their paths are shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    /// Leading directory stripped from every record path (case-insensitive).
    pub root_prefix: String,
    /// Trailing extension stripped from record names, e.g. `.xml`.
    pub strip_extension: Option<String>,
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self {
            root_prefix: "libs/foundry/records/".to_string(),
            strip_extension: Some(".xml".to_string()),
        }
    }
}

impl RecordLayout {
    /// Display path for a normalized record path. Paths outside the root
    /// prefix are kept as they are.
    pub fn apply<'a>(&self, path: &'a str) -> &'a str {
        let prefix = self.root_prefix.trim_matches('/');
        let path = match strip_prefix_ignore_case(path, prefix) {
            Some(rest) if !prefix.is_empty() => rest.strip_prefix('/').unwrap_or(path),
            _ => path,
        };
        match &self.strip_extension {
            Some(ext) => strip_suffix_ignore_case(path, ext)
                .filter(|rest| !rest.is_empty() && !rest.ends_with('/'))
                .unwrap_or(path),
            None => path,
        }
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = s.len().checked_sub(suffix.len())?;
    let tail = s.get(cut..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &s[..cut])
}

/// Configuration for a single archive load.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Minimum wall-clock gap between progress events.
    pub progress_interval: Duration,
    /// Stop after this many listing entries. Debug aid.
    pub load_limit: Option<usize>,
    /// Applied to records archives only.
    pub record_layout: Option<RecordLayout>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(500),
            load_limit: None,
            record_layout: Some(RecordLayout::default()),
        }
    }
}

/// Configuration for a workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Worker threads for loads and extractions.
    /// 0 = auto-detect (rayon's global pool)
    /// N = use N worker threads
    pub parallel_workers: usize,
    /// Minimum gap between extraction progress events.
    pub progress_interval: Duration,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 0,
            progress_interval: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_strips_prefix_and_extension() {
        let layout = RecordLayout::default();
        assert_eq!(layout.apply("libs/foundry/records/ships/aurora.xml"), "ships/aurora");
        assert_eq!(layout.apply("Libs/Foundry/Records/ships/Aurora.XML"), "ships/Aurora");
        assert_eq!(layout.apply("other/thing.xml"), "other/thing");
        assert_eq!(layout.apply("libs/foundry/records/notes.txt"), "notes.txt");
    }

    #[test]
    fn test_layout_never_empties_a_name() {
        let layout = RecordLayout::default();
        assert_eq!(layout.apply("libs/foundry/records/.xml"), ".xml");
        assert_eq!(layout.apply(".xml"), ".xml");
    }

    #[test]
    fn test_layout_without_extension() {
        let layout = RecordLayout {
            root_prefix: "/db/".to_string(),
            strip_extension: None,
        };
        assert_eq!(layout.apply("db/a.xml"), "a.xml");
        assert_eq!(layout.apply("DB/sub/a.xml"), "sub/a.xml");
        assert_eq!(layout.apply("dbx/a.xml"), "dbx/a.xml");
    }

    #[test]
    fn test_default_interval() {
        assert_eq!(LoaderConfig::default().progress_interval, Duration::from_millis(500));
        assert_eq!(WorkspaceConfig::default().parallel_workers, 0);
    }
}
