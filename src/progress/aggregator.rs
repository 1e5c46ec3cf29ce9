//! ProgressAggregator - many concurrent tasks folded into one status

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use super::event::{ArchiveId, StatusEvent, TaskId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskState {
    pub message: String,
    pub value: u64,
    pub min: u64,
    pub max: u64,
}

/// Combined view of every active task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStatus {
    /// Non-empty task messages joined with `", "`, in task start order.
    pub message: String,
    pub value: u64,
    pub min: u64,
    pub max: u64,
    pub tasks: usize,
}

impl AggregateStatus {
    /// No meaningful range to show a bar for.
    pub fn is_indeterminate(&self) -> bool {
        self.min == self.max
    }

    pub fn is_idle(&self) -> bool {
        self.tasks == 0
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_indeterminate() {
            f.write_str(&self.message)
        } else {
            write!(
                f,
                "{} [{}/{}]",
                self.message,
                self.value.saturating_sub(self.min),
                self.max.saturating_sub(self.min)
            )
        }
    }
}

/// Task table in insertion order.
#[derive(Debug, Default)]
pub struct ProgressAggregator {
    tasks: IndexMap<TaskId, TaskState>,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_started(&mut self, task: TaskId, message: impl Into<String>, min: u64, max: u64) {
        self.tasks.insert(
            task,
            TaskState {
                message: message.into(),
                value: min,
                min,
                max,
            },
        );
    }

    /// Update a task, creating it if unknown. Range bounds and message are
    /// only replaced by non-zero / non-blank values.
    pub fn task_progress(
        &mut self,
        task: TaskId,
        value: u64,
        min: Option<u64>,
        max: Option<u64>,
        message: Option<&str>,
    ) {
        let state = self.tasks.entry(task).or_default();
        state.value = value;
        if let Some(min) = min.filter(|&m| m != 0) {
            state.min = min;
        }
        if let Some(max) = max.filter(|&m| m != 0) {
            state.max = max;
        }
        if let Some(message) = message.filter(|m| !m.trim().is_empty()) {
            state.message = message.to_string();
        }
    }

    /// A successful task disappears. A failed one stays, flagged in its
    /// message, until dismissed.
    pub fn task_finished(&mut self, task: TaskId, success: bool, message: Option<&str>) {
        if success {
            self.tasks.shift_remove(&task);
            return;
        }
        let state = self.tasks.entry(task).or_default();
        state.message = match message.filter(|m| !m.trim().is_empty()) {
            Some(message) => message.to_string(),
            None if state.message.is_empty() => "failed".to_string(),
            None => format!("{} failed", state.message),
        };
    }

    pub fn apply(&mut self, event: &StatusEvent) {
        match event {
            StatusEvent::TaskStarted {
                task,
                message,
                min,
                max,
            } => self.task_started(task.clone(), message.clone(), *min, *max),
            StatusEvent::TaskProgress {
                task,
                value,
                min,
                max,
                message,
            } => self.task_progress(task.clone(), *value, *min, *max, message.as_deref()),
            StatusEvent::TaskFinished {
                task,
                success,
                message,
            } => self.task_finished(task.clone(), *success, message.as_deref()),
        }
    }

    /// Drop a task regardless of its state.
    pub fn dismiss(&mut self, task: &TaskId) -> bool {
        self.tasks.shift_remove(task).is_some()
    }

    /// Drop every task belonging to `archive`.
    pub fn discard_archive(&mut self, archive: ArchiveId) {
        self.tasks.retain(|task, _| task.archive() != Some(archive));
    }

    pub fn get(&self, task: &TaskId) -> Option<&TaskState> {
        self.tasks.get(task)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn snapshot(&self) -> AggregateStatus {
        let mut status = AggregateStatus {
            tasks: self.tasks.len(),
            ..AggregateStatus::default()
        };
        let mut messages = Vec::new();
        for state in self.tasks.values() {
            status.min += state.min;
            status.max += state.max;
            status.value += state.value;
            if !state.message.is_empty() {
                messages.push(state.message.as_str());
            }
        }
        status.message = messages.join(", ");
        status
    }
}
