//! Tree nodes owned by a `PathTreeIndex`

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::entry::Entry;

use super::utils::name_suffix;

/// Identity of a node inside its index. Stable for the lifetime of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Directory,
    Leaf,
}

/// Lazily formatted display columns. Each cell is written at most once; racing
/// readers compute the same value and one of them wins.
#[derive(Debug, Default)]
pub(crate) struct Derived {
    pub(crate) total_size: OnceLock<Option<u64>>,
    pub(crate) latest: OnceLock<Option<NaiveDateTime>>,
    pub(crate) size_label: OnceLock<String>,
    pub(crate) date_label: OnceLock<String>,
    pub(crate) type_label: OnceLock<String>,
}

/// One directory or leaf of the materialized tree.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    parent: Option<NodeId>,
    path: String,
    name_start: usize,
    kind: NodeKind,
    entry: Option<Entry>,
    ordinal: Option<usize>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) derived: Derived,
}

impl Node {
    pub(crate) fn root() -> Self {
        Self {
            id: NodeId::ROOT,
            parent: None,
            path: String::new(),
            name_start: 0,
            kind: NodeKind::Directory,
            entry: None,
            ordinal: None,
            children: Vec::new(),
            derived: Derived::default(),
        }
    }

    pub(crate) fn directory(id: NodeId, parent: NodeId, path: String) -> Self {
        Self::new(id, parent, path, NodeKind::Directory, None, None)
    }

    pub(crate) fn leaf(
        id: NodeId,
        parent: NodeId,
        path: String,
        entry: Option<Entry>,
        ordinal: usize,
    ) -> Self {
        Self::new(id, parent, path, NodeKind::Leaf, entry, Some(ordinal))
    }

    fn new(
        id: NodeId,
        parent: NodeId,
        path: String,
        kind: NodeKind,
        entry: Option<Entry>,
        ordinal: Option<usize>,
    ) -> Self {
        let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
        Self {
            id,
            parent: Some(parent),
            path,
            name_start,
            kind,
            entry,
            ordinal,
            children: Vec::new(),
            derived: Derived::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Full normalized path; empty for the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Final path segment, `.` for the root.
    pub fn display_name(&self) -> &str {
        if self.path.is_empty() {
            "."
        } else {
            &self.path[self.name_start..]
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The entry behind a leaf. `None` for directories and for leaves whose
    /// metadata could not be read.
    pub fn entry(&self) -> Option<&Entry> {
        self.entry.as_ref()
    }

    /// Position of the leaf's entry in the source listing.
    pub fn ordinal(&self) -> Option<usize> {
        self.ordinal
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn secondary_key(&self) -> Option<&str> {
        self.entry.as_ref().and_then(Entry::secondary_key)
    }

    /// The record type when known, otherwise the name suffix.
    pub fn type_label(&self) -> &str {
        self.derived.type_label.get_or_init(|| {
            match self.entry.as_ref().and_then(Entry::type_name) {
                Some(type_name) => type_name.to_string(),
                None if self.is_dir() => String::new(),
                None => name_suffix(self.display_name()).to_string(),
            }
        })
    }
}
