//! Task progress: events, throttling and aggregation

mod aggregator;
mod event;
mod throttle;

pub use aggregator::{AggregateStatus, ProgressAggregator, TaskState};
pub use event::{ArchiveId, ProgressSink, StatusEvent, TaskId, WorkerEvent};
pub use throttle::ProgressThrottle;
