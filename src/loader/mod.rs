//! Background loading of archive listings into an index

mod config;
mod incremental;
mod pool;

pub use config::{LoaderConfig, RecordLayout, WorkspaceConfig};
pub use incremental::{IncrementalLoader, LoadOutcome, LoadReport, SkippedEntry};
pub use pool::LoaderPool;
