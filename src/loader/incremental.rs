//! IncrementalLoader - builds a PathTreeIndex from an entry source
//!
//! The listing is consumed once and grouped by parent directory; the index is
//! then populated with one `insert_batch` call per directory. Per-entry
//! problems are logged and reported, never fatal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::entry::Entry;
use crate::error::{ArchiveError, Result};
use crate::index::{
    BatchItem, PathTreeIndex, fold_key, is_directory_marker, normalize, split_parent,
};
use crate::progress::{ProgressSink, ProgressThrottle, TaskId};
use crate::source::{ArchiveKind, EntrySource};

use super::config::LoaderConfig;

/// An entry that did not make it into the index as a full leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub path: Option<String>,
    pub reason: String,
}

/// What happened during one load.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub label: String,
    /// Listing entries looked at, directory markers included.
    pub consumed: usize,
    /// Leaves placed in the index.
    pub inserted: usize,
    /// Duplicates placed under `<name>.<key>`.
    pub renamed: usize,
    /// Leaves placed without metadata because it could not be read.
    pub without_metadata: Vec<SkippedEntry>,
    /// Entries left out of the index.
    pub skipped: Vec<SkippedEntry>,
    /// The listing was cut short by `load_limit`.
    pub truncated: bool,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl LoadReport {
    fn skip(&mut self, path: Option<&str>, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(archive = %self.label, path = path.unwrap_or("<unknown>"), "skipping entry: {}", reason);
        self.skipped.push(SkippedEntry {
            path: path.map(str::to_string),
            reason,
        });
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_millis())
    }
}

/// A finished load: the populated index and its report.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub index: Arc<PathTreeIndex>,
    pub report: LoadReport,
}

/// Leaves sharing a parent directory, keyed by the folded parent path.
type Groups = IndexMap<String, (String, Vec<BatchItem>)>;

/// Loads one archive. Holds no state shared with other loaders.
pub struct IncrementalLoader {
    source: Arc<dyn EntrySource>,
    config: LoaderConfig,
    task: TaskId,
}

impl IncrementalLoader {
    pub fn new(source: Arc<dyn EntrySource>, config: LoaderConfig) -> Self {
        Self {
            source,
            config,
            task: TaskId::new("load"),
        }
    }

    /// Report progress under `task` instead of the default `load`.
    pub fn with_task(mut self, task: TaskId) -> Self {
        self.task = task;
        self
    }

    pub fn kind(&self) -> ArchiveKind {
        self.source.kind()
    }

    pub fn label(&self) -> &str {
        self.source.label()
    }

    /// Consume the source and build its index.
    ///
    /// Only a failure to open the source is returned as an error; it is also
    /// reported as a failed task on `sink`.
    pub fn run(&self, sink: &ProgressSink) -> Result<LoadOutcome> {
        let started = Instant::now();
        let label = self.source.label().to_string();

        let listing = match self.source.entries() {
            Ok(listing) => listing,
            Err(err) => {
                warn!(archive = %label, "cannot open archive: {}", err);
                sink.finished(
                    &self.task,
                    false,
                    Some(format!("Loading {} failed: {}", label, err)),
                );
                return Err(err);
            }
        };

        let available = listing.len();
        let total = self.config.load_limit.map_or(available, |limit| limit.min(available));
        sink.started(&self.task, format!("Loading {}", label), 0, total as u64);

        let mut report = LoadReport {
            label,
            truncated: total < available,
            ..LoadReport::default()
        };
        let mut throttle = ProgressThrottle::new(self.config.progress_interval);
        let mut groups = Groups::new();

        for (ordinal, result) in listing.into_iter().take(total).enumerate() {
            if throttle.ready() {
                sink.progress(&self.task, ordinal as u64);
            }
            report.consumed += 1;
            if let Some(item) = self.prepare(ordinal, result, &mut report) {
                let (parent, _) = split_parent(item.path());
                groups
                    .entry(fold_key(parent))
                    .or_insert_with(|| (parent.to_string(), Vec::new()))
                    .1
                    .push(item);
            }
        }
        sink.progress(&self.task, total as u64);

        let batches = groups.len();
        let mut index = PathTreeIndex::with_capacity(total);
        for (_, (parent, items)) in groups {
            self.insert_group(&mut index, &parent, items, &mut report);
        }

        report.elapsed = started.elapsed();
        debug!(
            archive = %report.label,
            entries = report.consumed,
            leaves = report.inserted,
            batches,
            skipped = report.skipped.len(),
            elapsed = ?report.elapsed,
            "load finished"
        );
        sink.finished(&self.task, true, None);

        Ok(LoadOutcome {
            index: Arc::new(index),
            report,
        })
    }

    /// Turn one listing item into a batch item, or record why it is left out.
    fn prepare(
        &self,
        ordinal: usize,
        result: Result<Entry>,
        report: &mut LoadReport,
    ) -> Option<BatchItem> {
        match result {
            Ok(entry) => {
                if is_directory_marker(entry.path()) {
                    return None;
                }
                match self.index_path(entry.path()) {
                    Ok(path) if path == entry.path() => Some(BatchItem::new(ordinal, entry)),
                    Ok(path) => Some(BatchItem::new(ordinal, entry.relocated(path))),
                    Err(err) => {
                        report.skip(Some(entry.path()), err.to_string());
                        None
                    }
                }
            }
            Err(err) => {
                let usable = err
                    .entry_path()
                    .filter(|raw| !is_directory_marker(raw))
                    .and_then(|raw| self.index_path(raw).ok());
                match usable {
                    Some(path) => {
                        warn!(archive = %report.label, path = %path, "entry without metadata: {}", err);
                        report.without_metadata.push(SkippedEntry {
                            path: Some(path.clone()),
                            reason: err.to_string(),
                        });
                        Some(BatchItem::bare(ordinal, path))
                    }
                    None => {
                        report.skip(err.entry_path(), err.to_string());
                        None
                    }
                }
            }
        }
    }

    /// Normalized path, with the record layout applied for records archives.
    fn index_path(&self, raw: &str) -> Result<String> {
        let normalized = normalize(raw)?;
        match (&self.config.record_layout, self.source.kind()) {
            (Some(layout), ArchiveKind::Records) => Ok(layout.apply(&normalized).to_string()),
            _ => Ok(normalized),
        }
    }

    fn insert_group(
        &self,
        index: &mut PathTreeIndex,
        parent: &str,
        items: Vec<BatchItem>,
        report: &mut LoadReport,
    ) {
        let paths: Vec<String> = items.iter().map(|item| item.path().to_string()).collect();
        let batch = match index.insert_batch(parent, items) {
            Ok(batch) => batch,
            Err(err) => {
                for path in &paths {
                    report.skip(Some(path.as_str()), err.to_string());
                }
                return;
            }
        };
        report.inserted += batch.inserted.len();

        for (item, err) in batch.rejected {
            let key = item.entry().and_then(Entry::secondary_key).map(str::to_string);
            match (&err, key) {
                (ArchiveError::DuplicatePath { .. }, Some(key)) => {
                    let renamed = format!("{}.{}", item.path(), key);
                    let ordinal = item.ordinal();
                    let original = item.path().to_string();
                    let Some(entry) = item.into_entry() else {
                        continue;
                    };
                    let retry = BatchItem::new(ordinal, entry.relocated(renamed));
                    match index.insert_batch(parent, vec![retry]) {
                        Ok(again) if again.rejected.is_empty() => {
                            debug!(path = %original, "duplicate renamed with its key");
                            report.inserted += 1;
                            report.renamed += 1;
                        }
                        Ok(again) => {
                            for (item, err) in again.rejected {
                                report.skip(Some(item.path()), err.to_string());
                            }
                        }
                        Err(err) => report.skip(Some(original.as_str()), err.to_string()),
                    }
                }
                _ => report.skip(Some(item.path()), err.to_string()),
            }
        }
    }
}
