//! Hierarchical index over flat archive listings
//!
//! - `PathTreeIndex`: arena-backed tree with flat path and secondary-key lookup
//! - `TreeFilter`: per-node predicates (text, regex, clauses)
//! - `FilteredProjection`: ancestor-preserving, sorted read-only view

mod filter;
mod keys;
mod node;
mod path;
mod projection;
mod tree;
mod utils;

pub use filter::{ClauseOp, ClauseTest, FilterClause, TextMatcher, TreeFilter};
pub use keys::SecondaryKeyCache;
pub use node::{Node, NodeId, NodeKind};
pub use path::{directory_prefixes, fold_key, is_directory_marker, normalize, split_parent};
pub use projection::{FilteredProjection, ProjectedRow, SortKey, SortOrder, SortSpec};
pub use tree::{BatchItem, InsertedBatch, PathTreeIndex};
pub use utils::{format_date, format_size, name_suffix};
