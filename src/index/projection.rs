//! FilteredProjection - recursive, sortable read-only view over an index

use std::cmp::Ordering;

use super::filter::TreeFilter;
use super::node::{Node, NodeId};
use super::tree::PathTreeIndex;

/// Column a projection sorts siblings by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Size,
    /// Type label (record type or name suffix).
    Kind,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }
}

/// One visible node in depth-first display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectedRow {
    pub node: NodeId,
    /// 0 for the root.
    pub depth: usize,
    /// Last visible sibling under its parent.
    pub is_last: bool,
}

/// Nodes that match a filter, plus every ancestor of a match.
///
/// Siblings keep insertion order in the index; sorting happens here, stably,
/// with directories and leaves interleaved. The borrow on the index means a
/// projection can never observe a half-mutated tree.
pub struct FilteredProjection<'a> {
    index: &'a PathTreeIndex,
    filter: TreeFilter,
    sort: SortSpec,
    visible: Vec<bool>,
    matched: usize,
}

impl<'a> FilteredProjection<'a> {
    pub fn new(index: &'a PathTreeIndex, filter: TreeFilter, sort: SortSpec) -> Self {
        let mut projection = Self {
            index,
            filter,
            sort,
            visible: Vec::new(),
            matched: 0,
        };
        projection.refresh();
        projection
    }

    /// The whole tree, sorted by name.
    pub fn unfiltered(index: &'a PathTreeIndex) -> Self {
        Self::new(index, TreeFilter::new(), SortSpec::default())
    }

    pub fn set_filter(&mut self, filter: TreeFilter) {
        self.filter = filter;
        self.refresh();
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
    }

    pub fn filter(&self) -> &TreeFilter {
        &self.filter
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn index(&self) -> &'a PathTreeIndex {
        self.index
    }

    /// Recompute visibility in one pass. Parents precede children in the
    /// arena, so walking it backwards sees every descendant before its ancestor.
    fn refresh(&mut self) {
        let mut visible = vec![false; self.index.len()];
        let mut matched = 0;

        for node in self.index.iter().rev() {
            if node.is_root() {
                continue;
            }
            let slot = node.id().index();
            if self.filter.accepts(node) {
                matched += 1;
                visible[slot] = true;
            }
            if visible[slot] {
                if let Some(parent) = node.parent() {
                    visible[parent.index()] = true;
                }
            }
        }
        visible[NodeId::ROOT.index()] = true;

        self.visible = visible;
        self.matched = matched;
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        self.visible.get(id.index()).copied().unwrap_or(false)
    }

    /// Nodes accepted by the filter on their own account.
    pub fn matched_count(&self) -> usize {
        self.matched
    }

    /// Visible nodes excluding the root.
    pub fn visible_count(&self) -> usize {
        self.visible.iter().filter(|v| **v).count() - 1
    }

    /// Visible children of `id`, sorted.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children: Vec<NodeId> = self
            .index
            .node(id)
            .children()
            .iter()
            .copied()
            .filter(|&child| self.is_visible(child))
            .collect();
        children.sort_by(|&a, &b| self.compare(a, b));
        children
    }

    fn compare(&self, a: NodeId, b: NodeId) -> Ordering {
        let index = self.index;
        let (na, nb) = (index.node(a), index.node(b));
        let ordering = match self.sort.key {
            SortKey::Name => cmp_ignore_case(na.display_name(), nb.display_name()),
            SortKey::Size => index.total_size(a).cmp(&index.total_size(b)),
            SortKey::Kind => cmp_ignore_case(na.type_label(), nb.type_label()),
            SortKey::Modified => index.latest_modified(a).cmp(&index.latest_modified(b)),
        };
        match self.sort.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }

    /// The visible tree flattened depth-first in sorted order, root first.
    pub fn rows(&self) -> Vec<ProjectedRow> {
        let mut rows = Vec::new();
        let mut stack = vec![ProjectedRow {
            node: NodeId::ROOT,
            depth: 0,
            is_last: true,
        }];

        while let Some(row) = stack.pop() {
            rows.push(row);
            let children = self.children(row.node);
            let last = children.len().saturating_sub(1);
            for (i, &child) in children.iter().enumerate().rev() {
                stack.push(ProjectedRow {
                    node: child,
                    depth: row.depth + 1,
                    is_last: i == last,
                });
            }
        }
        rows
    }

    /// Expand a selection to its visible leaves, in display order.
    pub fn leaves(&self, selection: &[NodeId]) -> Vec<NodeId> {
        let mut seen = vec![false; self.index.len()];
        let mut leaves = Vec::new();
        let mut stack = Vec::new();

        for &start in selection {
            if !self.is_visible(start) {
                continue;
            }
            stack.push(start);
            while let Some(id) = stack.pop() {
                if std::mem::replace(&mut seen[id.index()], true) {
                    continue;
                }
                if self.index.node(id).is_dir() {
                    stack.extend(self.children(id).into_iter().rev());
                } else {
                    leaves.push(id);
                }
            }
        }
        leaves
    }

    pub fn node(&self, id: NodeId) -> &'a Node {
        self.index.node(id)
    }
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}
