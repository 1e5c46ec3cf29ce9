//! Workspace - open archives, background work and the status pump
//!
//! Workers only ever talk to the workspace through its event channel. The
//! owner calls `pump` (or `wait_idle`) on its own thread; that is the only
//! place archive state and the progress aggregator change.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::{info, trace, warn};

use crate::error::{ArchiveError, Result};
use crate::extract::{ExtractJob, ExtractReport};
use crate::index::{NodeId, PathTreeIndex};
use crate::loader::{IncrementalLoader, LoadReport, LoaderConfig, LoaderPool, WorkspaceConfig};
use crate::progress::{
    AggregateStatus, ArchiveId, ProgressAggregator, ProgressSink, TaskId, WorkerEvent,
};
use crate::source::{ArchiveKind, EntrySource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveState {
    Loading,
    Ready,
    Failed(String),
}

/// One open archive.
#[derive(Debug)]
pub struct ArchiveHandle {
    label: String,
    kind: ArchiveKind,
    state: ArchiveState,
    index: Option<Arc<PathTreeIndex>>,
    report: Option<LoadReport>,
}

impl ArchiveHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    pub fn state(&self) -> &ArchiveState {
        &self.state
    }

    /// Present once the load has completed.
    pub fn index(&self) -> Option<&Arc<PathTreeIndex>> {
        self.index.as_ref()
    }

    pub fn report(&self) -> Option<&LoadReport> {
        self.report.as_ref()
    }
}

/// What the owner learns from a pump.
#[derive(Debug)]
pub enum Notification {
    StatusChanged(AggregateStatus),
    LoadCompleted {
        archive: ArchiveId,
        kind: ArchiveKind,
    },
    LoadFailed {
        archive: ArchiveId,
        message: String,
    },
    ExtractionFinished {
        archive: ArchiveId,
        report: ExtractReport,
    },
}

pub struct Workspace {
    config: WorkspaceConfig,
    pool: LoaderPool,
    tx: Sender<WorkerEvent>,
    rx: Receiver<WorkerEvent>,
    archives: BTreeMap<ArchiveId, ArchiveHandle>,
    aggregator: ProgressAggregator,
    /// Unfinished jobs per archive, closed archives included.
    pending: HashMap<ArchiveId, usize>,
    next_archive: u64,
    next_job: u64,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(WorkspaceConfig::default())
    }
}

impl Workspace {
    pub fn new(config: WorkspaceConfig) -> Self {
        let (tx, rx) = unbounded();
        Self {
            pool: LoaderPool::new(config.parallel_workers),
            config,
            tx,
            rx,
            archives: BTreeMap::new(),
            aggregator: ProgressAggregator::new(),
            pending: HashMap::new(),
            next_archive: 1,
            next_job: 1,
        }
    }

    /// Start loading `source` in the background.
    pub fn open(&mut self, source: Arc<dyn EntrySource>, config: LoaderConfig) -> ArchiveId {
        let id = ArchiveId::new(self.next_archive);
        self.next_archive += 1;

        self.archives.insert(
            id,
            ArchiveHandle {
                label: source.label().to_string(),
                kind: source.kind(),
                state: ArchiveState::Loading,
                index: None,
                report: None,
            },
        );
        info!(archive = %id, label = source.label(), "opening archive");

        let loader =
            IncrementalLoader::new(source, config).with_task(TaskId::for_archive(id, "load"));
        *self.pending.entry(id).or_default() += 1;
        self.pool.spawn_load(id, loader, self.sink());
        id
    }

    /// Forget an archive and its tasks. Work still running for it finishes
    /// in the background and its events are dropped.
    pub fn close(&mut self, id: ArchiveId) -> bool {
        self.aggregator.discard_archive(id);
        self.archives.remove(&id).is_some()
    }

    /// Extract `selection` from a loaded archive below `target`.
    pub fn extract(&mut self, id: ArchiveId, selection: Vec<NodeId>, target: PathBuf) -> Result<()> {
        let index = self
            .index(id)
            .cloned()
            .ok_or_else(|| ArchiveError::NotFound(format!("loaded archive {}", id)))?;
        if let Some(unknown) = selection.iter().find(|&&node| index.get(node).is_none()) {
            return Err(ArchiveError::NotFound(format!(
                "node {} in archive {}",
                unknown.index(),
                id
            )));
        }
        let task = TaskId::for_archive(id, format!("extract-{}", self.next_job));
        self.next_job += 1;

        *self.pending.entry(id).or_default() += 1;
        let job = ExtractJob {
            archive: id,
            task,
            index,
            selection,
            target,
            interval: self.config.progress_interval,
        };
        self.pool.spawn_extract(job, self.sink());
        Ok(())
    }

    fn sink(&self) -> ProgressSink {
        ProgressSink::new(self.tx.clone())
    }

    /// Handle every queued event without blocking.
    pub fn pump(&mut self) -> Vec<Notification> {
        let mut notifications = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            notifications.extend(self.handle(event));
        }
        notifications
    }

    /// Block until no load or extraction is outstanding, or `timeout` passes.
    /// Returns whether the workspace went idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        self.wait_idle_with(timeout, |_| {})
    }

    /// Like `wait_idle`, passing every notification to `notify` as it arrives.
    pub fn wait_idle_with(
        &mut self,
        timeout: Duration,
        mut notify: impl FnMut(&Notification),
    ) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_idle() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(event) => {
                    if let Some(notification) = self.handle(event) {
                        notify(&notification);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(pending = self.pending.len(), "timed out waiting for workers");
                    return false;
                }
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        for notification in self.pump() {
            notify(&notification);
        }
        true
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    fn finish_job(&mut self, id: ArchiveId) {
        if let Some(count) = self.pending.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(&id);
            }
        }
    }

    fn handle(&mut self, event: WorkerEvent) -> Option<Notification> {
        let terminal = !matches!(event, WorkerEvent::Status(_));
        if let Some(id) = event.archive() {
            if terminal {
                self.finish_job(id);
            }
            if !self.archives.contains_key(&id) {
                trace!(archive = %id, "event for closed archive dropped");
                return None;
            }
        }

        match event {
            WorkerEvent::Status(status) => {
                self.aggregator.apply(&status);
                Some(Notification::StatusChanged(self.aggregator.snapshot()))
            }
            WorkerEvent::LoadCompleted {
                archive,
                kind,
                outcome,
            } => {
                let handle = self.archives.get_mut(&archive)?;
                info!(
                    archive = %archive,
                    label = %handle.label,
                    leaves = outcome.report.inserted,
                    skipped = outcome.report.skipped.len(),
                    "archive loaded"
                );
                handle.state = ArchiveState::Ready;
                handle.index = Some(outcome.index);
                handle.report = Some(outcome.report);
                Some(Notification::LoadCompleted { archive, kind })
            }
            WorkerEvent::LoadFailed { archive, message } => {
                let handle = self.archives.get_mut(&archive)?;
                handle.state = ArchiveState::Failed(message.clone());
                Some(Notification::LoadFailed { archive, message })
            }
            WorkerEvent::ExtractionFinished { archive, report } => {
                Some(Notification::ExtractionFinished { archive, report })
            }
        }
    }

    pub fn archive(&self, id: ArchiveId) -> Option<&ArchiveHandle> {
        self.archives.get(&id)
    }

    /// Open archives in the order they were opened.
    pub fn archives(&self) -> impl Iterator<Item = (ArchiveId, &ArchiveHandle)> {
        self.archives.iter().map(|(&id, handle)| (id, handle))
    }

    pub fn index(&self, id: ArchiveId) -> Option<&Arc<PathTreeIndex>> {
        self.archives.get(&id).and_then(ArchiveHandle::index)
    }

    pub fn report(&self, id: ArchiveId) -> Option<&LoadReport> {
        self.archives.get(&id).and_then(ArchiveHandle::report)
    }

    pub fn state(&self, id: ArchiveId) -> Option<&ArchiveState> {
        self.archives.get(&id).map(ArchiveHandle::state)
    }

    pub fn status(&self) -> AggregateStatus {
        self.aggregator.snapshot()
    }

    /// Remove a retained failed task from the status.
    pub fn dismiss(&mut self, task: &TaskId) -> bool {
        self.aggregator.dismiss(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(10);

    fn workspace() -> Workspace {
        Workspace::new(WorkspaceConfig {
            parallel_workers: 2,
            ..WorkspaceConfig::default()
        })
    }

    #[test]
    fn test_concurrent_loads() {
        let mut ws = workspace();
        let a = ws.open(
            Arc::new(MemorySource::package("A").file("x/1", "1").file("x/2", "2")),
            LoaderConfig::default(),
        );
        let b = ws.open(
            Arc::new(MemorySource::records("B").record("libs/foundry/records/r.xml", "k", "T", "")),
            LoaderConfig::default(),
        );
        assert_ne!(a, b);
        assert!(ws.wait_idle(WAIT));

        assert_eq!(ws.state(a), Some(&ArchiveState::Ready));
        assert_eq!(ws.index(a).unwrap().leaf_count(), 2);
        let b_index = ws.index(b).unwrap();
        assert_eq!(b_index.node(b_index.lookup_by_key("k").unwrap()).path(), "r");
        assert!(ws.status().is_idle());
        assert_eq!(ws.archives().count(), 2);
    }

    #[test]
    fn test_failed_load_is_retained_in_status() {
        let mut ws = workspace();
        let id = ws.open(
            Arc::new(MemorySource::package("bad.p4k").failing_open("bad magic")),
            LoaderConfig::default(),
        );
        let mut failed = false;
        assert!(ws.wait_idle_with(WAIT, |n| {
            failed |= matches!(n, Notification::LoadFailed { .. });
        }));
        assert!(failed);
        assert!(matches!(ws.state(id), Some(ArchiveState::Failed(_))));
        assert!(ws.status().message.contains("bad magic"));

        assert!(ws.dismiss(&TaskId::for_archive(id, "load")));
        assert!(ws.status().is_idle());
    }

    #[test]
    fn test_close_discards_late_events() {
        let mut ws = workspace();
        let id = ws.open(
            Arc::new(MemorySource::package("A").file("a", "")),
            LoaderConfig::default(),
        );
        assert!(ws.close(id));
        assert!(ws.wait_idle(WAIT));
        assert!(ws.index(id).is_none());
        assert!(ws.status().is_idle());
        assert!(!ws.close(id));
    }

    #[test]
    fn test_extract_in_background() {
        let mut ws = workspace();
        let id = ws.open(
            Arc::new(MemorySource::package("A").file("d/a.txt", "a").file("d/b.txt", "b")),
            LoaderConfig::default(),
        );
        assert!(ws.wait_idle(WAIT));

        let out = TempDir::new().unwrap();
        ws.extract(id, vec![NodeId::ROOT], out.path().to_path_buf())
            .unwrap();
        let mut report = None;
        assert!(ws.wait_idle_with(WAIT, |n| {
            if let Notification::ExtractionFinished { report: r, .. } = n {
                report = Some(r.clone());
            }
        }));
        let report = report.unwrap();
        assert_eq!(report.written.len(), 2);
        assert!(out.path().join("d/b.txt").exists());
    }

    #[test]
    fn test_extract_requires_loaded_archive() {
        let mut ws = workspace();
        let err = ws
            .extract(ArchiveId::new(99), vec![], PathBuf::from("."))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(_)));
    }

    #[test]
    fn test_extract_rejects_nodes_from_another_archive() {
        let mut ws = workspace();
        let small = ws.open(
            Arc::new(MemorySource::package("small").file("a", "a")),
            LoaderConfig::default(),
        );
        let big = ws.open(
            Arc::new(
                MemorySource::package("big")
                    .file("x/1", "1")
                    .file("x/2", "2")
                    .file("x/3", "3"),
            ),
            LoaderConfig::default(),
        );
        assert!(ws.wait_idle(WAIT));

        let big_index = ws.index(big).unwrap();
        let foreign = big_index.lookup_by_path("x/3").unwrap();
        let out = TempDir::new().unwrap();
        let err = ws
            .extract(small, vec![foreign], out.path().to_path_buf())
            .unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(_)));
        assert!(ws.is_idle());
        assert!(ws.status().is_idle());
    }
}
