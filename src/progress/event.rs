//! Status events and the channel they travel on

use std::fmt;

use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::Serialize;
use tracing::trace;

use crate::extract::ExtractReport;
use crate::loader::LoadOutcome;
use crate::source::ArchiveKind;

/// Identity of one opened archive within a workspace. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ArchiveId(u64);

impl ArchiveId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named long-running task, optionally tied to an archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId {
    archive: Option<ArchiveId>,
    name: String,
}

impl TaskId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            archive: None,
            name: name.into(),
        }
    }

    pub fn for_archive(archive: ArchiveId, name: impl Into<String>) -> Self {
        Self {
            archive: Some(archive),
            name: name.into(),
        }
    }

    pub fn archive(&self) -> Option<ArchiveId> {
        self.archive
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.archive {
            Some(archive) => write!(f, "{}{}", self.name, archive),
            None => f.write_str(&self.name),
        }
    }
}

/// Progress of a single task, as consumed by `ProgressAggregator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    TaskStarted {
        task: TaskId,
        message: String,
        min: u64,
        max: u64,
    },
    TaskProgress {
        task: TaskId,
        value: u64,
        min: Option<u64>,
        max: Option<u64>,
        message: Option<String>,
    },
    TaskFinished {
        task: TaskId,
        success: bool,
        message: Option<String>,
    },
}

impl StatusEvent {
    pub fn task(&self) -> &TaskId {
        match self {
            StatusEvent::TaskStarted { task, .. }
            | StatusEvent::TaskProgress { task, .. }
            | StatusEvent::TaskFinished { task, .. } => task,
        }
    }
}

/// Everything a worker reports back to the consumer, in emission order.
#[derive(Debug)]
pub enum WorkerEvent {
    Status(StatusEvent),
    LoadCompleted {
        archive: ArchiveId,
        kind: ArchiveKind,
        outcome: LoadOutcome,
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

impl WorkerEvent {
    pub fn archive(&self) -> Option<ArchiveId> {
        match self {
            WorkerEvent::Status(event) => event.task().archive(),
            WorkerEvent::LoadCompleted { archive, .. }
            | WorkerEvent::LoadFailed { archive, .. }
            | WorkerEvent::ExtractionFinished { archive, .. } => Some(*archive),
        }
    }
}

/// Sending half handed to workers. A sink whose receiver is gone, or a
/// detached sink, drops events silently.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<Sender<WorkerEvent>>,
}

impl ProgressSink {
    pub fn new(tx: Sender<WorkerEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink plus the receiver draining it.
    pub fn channel() -> (Self, Receiver<WorkerEvent>) {
        let (tx, rx) = unbounded();
        (Self::new(tx), rx)
    }

    /// A sink that goes nowhere, for synchronous use.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, event: WorkerEvent) {
        if let Some(tx) = &self.tx {
            if let Err(err) = tx.send(event) {
                trace!(event = ?err.into_inner(), "event dropped, receiver gone");
            }
        }
    }

    pub fn started(&self, task: &TaskId, message: impl Into<String>, min: u64, max: u64) {
        self.send(WorkerEvent::Status(StatusEvent::TaskStarted {
            task: task.clone(),
            message: message.into(),
            min,
            max,
        }));
    }

    pub fn progress(&self, task: &TaskId, value: u64) {
        self.send(WorkerEvent::Status(StatusEvent::TaskProgress {
            task: task.clone(),
            value,
            min: None,
            max: None,
            message: None,
        }));
    }

    pub fn finished(&self, task: &TaskId, success: bool, message: Option<String>) {
        self.send(WorkerEvent::Status(StatusEvent::TaskFinished {
            task: task.clone(),
            success,
            message,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_display() {
        assert_eq!(TaskId::new("extract").to_string(), "extract");
        assert_eq!(
            TaskId::for_archive(ArchiveId::new(3), "load").to_string(),
            "load#3"
        );
    }

    #[test]
    fn test_sink_delivers_in_order() {
        let (sink, rx) = ProgressSink::channel();
        let task = TaskId::new("t");
        sink.started(&task, "Working", 0, 2);
        sink.progress(&task, 1);
        sink.finished(&task, true, None);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            WorkerEvent::Status(StatusEvent::TaskStarted { max: 2, .. })
        ));
        assert!(matches!(
            &events[2],
            WorkerEvent::Status(StatusEvent::TaskFinished { success: true, .. })
        ));
    }

    #[test]
    fn test_closed_receiver_is_harmless() {
        let (sink, rx) = ProgressSink::channel();
        drop(rx);
        sink.progress(&TaskId::new("t"), 1);
        ProgressSink::detached().progress(&TaskId::new("t"), 1);
    }
}
