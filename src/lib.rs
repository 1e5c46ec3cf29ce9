//! Arbor - incremental hierarchical index over flat archive listings

pub mod entry;
pub mod error;
pub mod extract;
pub mod index;
pub mod loader;
pub mod output;
pub mod progress;
pub mod source;
pub mod stats;
pub mod workspace;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use entry::{BackingRef, ContentReader, Entry, EntryKind};
pub use error::{ArchiveError, Result};
pub use extract::{ExtractReport, extract_nodes};
pub use index::{
    FilteredProjection, Node, NodeId, PathTreeIndex, SortKey, SortOrder, SortSpec, TreeFilter,
};
pub use loader::{IncrementalLoader, LoadReport, LoaderConfig, RecordLayout, WorkspaceConfig};
pub use output::{JsonNode, OutputConfig, TreeFormatter, print_json};
pub use progress::{AggregateStatus, ArchiveId, ProgressAggregator, StatusEvent, TaskId};
pub use source::{ArchiveKind, DirectorySource, EntrySource, ManifestSource, MemorySource};
pub use stats::{ArchiveStats, print_stats};
pub use workspace::{ArchiveState, Notification, Workspace};
