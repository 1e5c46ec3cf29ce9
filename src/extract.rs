//! Writing leaf content out to the file system

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ArchiveError, Result};
use crate::index::{Node, NodeId, PathTreeIndex, name_suffix};
use crate::progress::{ArchiveId, ProgressSink, ProgressThrottle, TaskId};

impl Node {
    /// Write this leaf's content to `target_dir/<path>`, creating parent
    /// directories. If that file already exists and the entry has a secondary
    /// key, `<stem>.<key><suffix>` is written instead.
    pub fn extract_to(&self, target_dir: &Path) -> Result<PathBuf> {
        let entry = match self.entry() {
            Some(entry) if !self.is_dir() => entry,
            _ => {
                return Err(ArchiveError::NotALeaf {
                    path: self.path().to_string(),
                });
            }
        };
        let failed = |source: io::Error| ArchiveError::Extraction {
            path: self.path().to_string(),
            source,
        };

        let mut dest = target_dir.join(self.path());
        if dest.exists() {
            if let Some(key) = entry.secondary_key() {
                let name = self.display_name();
                let suffix = name_suffix(name);
                let stem = &name[..name.len() - suffix.len()];
                dest.set_file_name(format!("{}.{}{}", stem, key, suffix));
            }
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(failed)?;
        }

        let mut reader = entry.backing().open().map_err(failed)?;
        let mut file = File::create(&dest).map_err(failed)?;
        io::copy(&mut reader, &mut file).map_err(failed)?;
        Ok(dest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of one extraction batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractReport {
    pub target: PathBuf,
    pub written: Vec<PathBuf>,
    pub failed: Vec<ExtractFailure>,
}

impl ExtractReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Expand `selection` to leaves and extract each below `target`.
///
/// A failing item is logged and recorded; the batch carries on.
pub fn extract_nodes(
    index: &PathTreeIndex,
    selection: &[NodeId],
    target: &Path,
    task: &TaskId,
    sink: &ProgressSink,
    interval: Duration,
) -> ExtractReport {
    let started = Instant::now();
    let leaves = index.leaves_under(selection);
    let total = leaves.len() as u64;
    sink.started(task, format!("Extracting to {}", target.display()), 0, total);

    let mut report = ExtractReport {
        target: target.to_path_buf(),
        ..ExtractReport::default()
    };
    let mut throttle = ProgressThrottle::new(interval);

    for (i, &id) in leaves.iter().enumerate() {
        if throttle.ready() {
            sink.progress(task, i as u64);
        }
        let node = index.node(id);
        match node.extract_to(target) {
            Ok(dest) => report.written.push(dest),
            Err(err) => {
                warn!(path = node.path(), "extraction failed: {}", err);
                report.failed.push(ExtractFailure {
                    path: node.path().to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }

    sink.progress(task, total);
    sink.finished(task, true, None);
    debug!(
        written = report.written.len(),
        failed = report.failed.len(),
        elapsed = ?started.elapsed(),
        "extraction finished"
    );
    report
}

/// An extraction batch, ready to hand to a worker.
#[derive(Debug, Clone)]
pub struct ExtractJob {
    pub archive: ArchiveId,
    pub task: TaskId,
    pub index: Arc<PathTreeIndex>,
    pub selection: Vec<NodeId>,
    pub target: PathBuf,
    pub interval: Duration,
}

impl ExtractJob {
    pub fn run(&self, sink: &ProgressSink) -> ExtractReport {
        extract_nodes(
            &self.index,
            &self.selection,
            &self.target,
            &self.task,
            sink,
            self.interval,
        )
    }
}
