//! PathTreeIndex - materialized directory tree with flat path and key lookup
//!
//! Nodes live in an arena owned by the index. The tree links, the flat
//! `path -> NodeId` cache and the secondary-key cache all refer to nodes by id,
//! so dropping the index tears everything down at once.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::NaiveDateTime;

use crate::entry::Entry;
use crate::error::{ArchiveError, Result};

use super::keys::SecondaryKeyCache;
use super::node::{Node, NodeId};
use super::path::{directory_prefixes, fold_key, normalize, split_parent};
use super::utils::{format_date, format_size};

/// One leaf waiting to be inserted under a parent directory.
#[derive(Debug, Clone)]
pub struct BatchItem {
    ordinal: usize,
    path: String,
    entry: Option<Entry>,
}

impl BatchItem {
    /// A leaf for `entry`, which sits at position `ordinal` of the source listing.
    pub fn new(ordinal: usize, entry: Entry) -> Self {
        Self {
            ordinal,
            path: entry.path().to_string(),
            entry: Some(entry),
        }
    }

    /// A leaf whose metadata could not be read but whose path is usable.
    pub fn bare(ordinal: usize, path: String) -> Self {
        Self {
            ordinal,
            path,
            entry: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn entry(&self) -> Option<&Entry> {
        self.entry.as_ref()
    }

    pub fn into_entry(self) -> Option<Entry> {
        self.entry
    }
}

/// Outcome of a single `insert_batch` call.
#[derive(Debug, Default)]
pub struct InsertedBatch {
    pub inserted: Vec<NodeId>,
    /// Items that were not inserted, with the reason.
    pub rejected: Vec<(BatchItem, ArchiveError)>,
}

/// Hierarchical index over an archive's flat listing.
#[derive(Debug)]
pub struct PathTreeIndex {
    nodes: Vec<Node>,
    by_path: HashMap<String, NodeId>,
    keys: SecondaryKeyCache,
    leaves: usize,
}

impl Default for PathTreeIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTreeIndex {
    pub fn new() -> Self {
        let mut by_path = HashMap::new();
        by_path.insert(String::new(), NodeId::ROOT);
        Self {
            nodes: vec![Node::root()],
            by_path,
            keys: SecondaryKeyCache::new(),
            leaves: 0,
        }
    }

    /// Pre-size the arena for roughly `entries` leaves.
    pub fn with_capacity(entries: usize) -> Self {
        let mut index = Self::new();
        index.nodes.reserve(entries);
        index.by_path.reserve(entries);
        index
    }

    /// Directory node for the parent of `path`, creating missing ancestors.
    pub fn get_or_create_parent_chain(&mut self, path: &str) -> Result<NodeId> {
        let (parent, _) = split_parent(path);
        self.get_or_create_directory(parent)
    }

    /// Directory node for `dir`, creating every missing ancestor root-first.
    /// Each directory is created at most once no matter how often it is asked for.
    pub fn get_or_create_directory(&mut self, dir: &str) -> Result<NodeId> {
        if dir.is_empty() {
            return Ok(NodeId::ROOT);
        }
        if let Some(&id) = self.by_path.get(&fold_key(dir)) {
            return self.expect_directory(id);
        }

        let mut current = NodeId::ROOT;
        for prefix in directory_prefixes(dir) {
            let key = fold_key(prefix);
            current = match self.by_path.get(&key) {
                Some(&id) => self.expect_directory(id)?,
                None => self.push_directory(current, prefix, key),
            };
        }
        Ok(current)
    }

    fn expect_directory(&self, id: NodeId) -> Result<NodeId> {
        let node = self.node(id);
        if node.is_dir() {
            Ok(id)
        } else {
            Err(ArchiveError::PathConflict {
                path: node.path().to_string(),
            })
        }
    }

    fn push_directory(&mut self, parent: NodeId, path: &str, key: String) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node::directory(id, parent, path.to_string()));
        self.nodes[parent.index()].children.push(id);
        self.by_path.insert(key, id);
        id
    }

    /// Insert leaves that all share the parent directory `parent_path`.
    ///
    /// The parent chain is resolved once for the whole batch. Items whose path
    /// is already taken are returned in `rejected`; the rest keep their order.
    /// Fails only when the parent itself cannot be a directory.
    pub fn insert_batch(
        &mut self,
        parent_path: &str,
        items: Vec<BatchItem>,
    ) -> Result<InsertedBatch> {
        let parent = self.get_or_create_directory(parent_path)?;
        let mut batch = InsertedBatch {
            inserted: Vec::with_capacity(items.len()),
            rejected: Vec::new(),
        };

        for item in items {
            debug_assert_eq!(
                fold_key(split_parent(&item.path).0),
                fold_key(parent_path),
                "batch item outside its parent"
            );

            let key = fold_key(&item.path);
            if let Some(&existing) = self.by_path.get(&key) {
                let err = if self.node(existing).is_dir() {
                    ArchiveError::PathConflict {
                        path: item.path.clone(),
                    }
                } else {
                    ArchiveError::DuplicatePath {
                        path: item.path.clone(),
                    }
                };
                batch.rejected.push((item, err));
                continue;
            }

            let id = NodeId::from_index(self.nodes.len());
            if let Some(secondary) = item.entry.as_ref().and_then(Entry::secondary_key) {
                self.keys.register(secondary, id, item.ordinal);
            }
            self.nodes.push(Node::leaf(id, parent, item.path, item.entry, item.ordinal));
            self.nodes[parent.index()].children.push(id);
            self.by_path.insert(key, id);
            self.leaves += 1;
            batch.inserted.push(id);
        }

        Ok(batch)
    }

    /// O(1) lookup by full path. Case-insensitive; separators are normalized.
    pub fn lookup_by_path(&self, path: &str) -> Option<NodeId> {
        if path.trim().is_empty() {
            return Some(NodeId::ROOT);
        }
        let normalized = normalize(path).ok()?;
        self.by_path.get(&fold_key(&normalized)).copied()
    }

    pub fn lookup_by_key(&self, key: &str) -> Option<NodeId> {
        self.keys.lookup(key)
    }

    pub fn keys(&self) -> &SecondaryKeyCache {
        &self.keys
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// The node for `id`. Ids are only handed out by this index.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node> {
        self.node(id).children.iter().map(|&child| self.node(child))
    }

    pub fn parent(&self, id: NodeId) -> Option<&Node> {
        self.node(id).parent().map(|parent| self.node(parent))
    }

    /// Every node, root first. Parents always precede their children.
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Number of nodes including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves == 0
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves
    }

    /// Directories excluding the root.
    pub fn directory_count(&self) -> usize {
        self.nodes.len() - self.leaves - 1
    }

    /// Expand a selection to leaves: leaves stay, directories contribute every
    /// leaf below them. Tree order, no duplicates. Ids this index does not
    /// hold are skipped.
    pub fn leaves_under(&self, selection: &[NodeId]) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut leaves = Vec::new();
        let mut stack = Vec::new();

        for &start in selection.iter().filter(|&&id| self.get(id).is_some()) {
            stack.push(start);
            while let Some(id) = stack.pop() {
                if std::mem::replace(&mut seen[id.index()], true) {
                    continue;
                }
                let node = self.node(id);
                if node.is_dir() {
                    stack.extend(node.children.iter().rev());
                } else {
                    leaves.push(id);
                }
            }
        }
        leaves
    }

    /// Size of a leaf, or the sum of the known sizes below a directory.
    pub fn total_size(&self, id: NodeId) -> Option<u64> {
        for dir in self.uncached_directories(id, |n| &n.derived.total_size) {
            let node = self.node(dir);
            let total = node
                .children
                .iter()
                .filter_map(|&child| self.cached_size(child))
                .fold(None, |acc, size| Some(acc.unwrap_or(0) + size));
            node.derived.total_size.get_or_init(|| total);
        }
        self.cached_size(id)
    }

    /// Modification time of a leaf, or the latest known time below a directory.
    pub fn latest_modified(&self, id: NodeId) -> Option<NaiveDateTime> {
        for dir in self.uncached_directories(id, |n| &n.derived.latest) {
            let node = self.node(dir);
            let latest = node
                .children
                .iter()
                .filter_map(|&child| self.cached_modified(child))
                .max();
            node.derived.latest.get_or_init(|| latest);
        }
        self.cached_modified(id)
    }

    /// Directories at or below `id` whose aggregate is not computed yet,
    /// children before their parents.
    fn uncached_directories<T>(
        &self,
        id: NodeId,
        cell: impl Fn(&Node) -> &OnceLock<T>,
    ) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.is_dir() && cell(node).get().is_none() {
                order.push(id);
                stack.extend(node.children.iter().copied());
            }
        }
        order.reverse();
        order
    }

    fn cached_size(&self, id: NodeId) -> Option<u64> {
        let node = self.node(id);
        if node.is_dir() {
            node.derived.total_size.get().copied().flatten()
        } else {
            *node
                .derived
                .total_size
                .get_or_init(|| node.entry().map(Entry::size))
        }
    }

    fn cached_modified(&self, id: NodeId) -> Option<NaiveDateTime> {
        let node = self.node(id);
        if node.is_dir() {
            node.derived.latest.get().copied().flatten()
        } else {
            *node
                .derived
                .latest
                .get_or_init(|| node.entry().map(Entry::modified))
        }
    }

    pub fn size_label(&self, id: NodeId) -> &str {
        self.node(id)
            .derived
            .size_label
            .get_or_init(|| self.total_size(id).map(format_size).unwrap_or_default())
    }

    pub fn date_label(&self, id: NodeId) -> &str {
        self.node(id)
            .derived
            .date_label
            .get_or_init(|| self.latest_modified(id).map(format_date).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{entry_at, file_entry};

    fn batch(paths: &[&str]) -> Vec<BatchItem> {
        paths
            .iter()
            .enumerate()
            .map(|(i, p)| BatchItem::new(i, file_entry(p, 10)))
            .collect()
    }

    fn names(index: &PathTreeIndex, id: NodeId) -> Vec<String> {
        index
            .children(id)
            .map(|n| n.display_name().to_string())
            .collect()
    }

    #[test]
    fn test_parent_chain_created_once() {
        let mut index = PathTreeIndex::new();
        let first = index.get_or_create_parent_chain("a/b/c/file.txt").unwrap();
        let second = index.get_or_create_parent_chain("a/b/c/other.txt").unwrap();
        let shorter = index.get_or_create_parent_chain("a/b/x.txt").unwrap();

        assert_eq!(first, second);
        assert_eq!(index.node(first).path(), "a/b/c");
        assert_eq!(index.node(shorter).path(), "a/b");
        // root + a + a/b + a/b/c
        assert_eq!(index.len(), 4);
        assert_eq!(index.directory_count(), 3);
    }

    #[test]
    fn test_top_level_parent_is_root() {
        let mut index = PathTreeIndex::new();
        assert_eq!(index.get_or_create_parent_chain("d.txt").unwrap(), NodeId::ROOT);
    }

    #[test]
    fn test_insert_batch_appends_in_order() {
        let mut index = PathTreeIndex::new();
        let out = index
            .insert_batch("a", batch(&["a/c.txt", "a/b.txt"]))
            .unwrap();
        assert_eq!(out.inserted.len(), 2);
        assert!(out.rejected.is_empty());

        let a = index.lookup_by_path("a").unwrap();
        assert_eq!(names(&index, a), vec!["c.txt", "b.txt"]);
        assert_eq!(index.lookup_by_path("a/b.txt"), Some(out.inserted[1]));
        assert_eq!(index.leaf_count(), 2);
    }

    #[test]
    fn test_lookup_is_case_insensitive_and_normalized() {
        let mut index = PathTreeIndex::new();
        let out = index
            .insert_batch("Data/Textures", batch(&["Data/Textures/Hull.dds"]))
            .unwrap();
        let id = out.inserted[0];
        assert_eq!(index.lookup_by_path("data/textures/hull.dds"), Some(id));
        assert_eq!(index.lookup_by_path("Data\\Textures\\Hull.dds"), Some(id));
        assert_eq!(index.lookup_by_path("Data/missing.dds"), None);
        assert_eq!(index.lookup_by_path("../x"), None);
        assert_eq!(index.lookup_by_path(""), Some(NodeId::ROOT));
    }

    #[test]
    fn test_duplicate_leaf_rejected() {
        let mut index = PathTreeIndex::new();
        index.insert_batch("a", batch(&["a/b.txt"])).unwrap();
        let out = index.insert_batch("a", batch(&["a/B.txt"])).unwrap();
        assert!(out.inserted.is_empty());
        assert!(matches!(out.rejected[0].1, ArchiveError::DuplicatePath { .. }));
        assert_eq!(index.leaf_count(), 1);
    }

    #[test]
    fn test_leaf_in_the_way_of_directory() {
        let mut index = PathTreeIndex::new();
        index.insert_batch("", batch(&["a"])).unwrap();
        let err = index.insert_batch("a", batch(&["a/b.txt"])).unwrap_err();
        assert!(matches!(err, ArchiveError::PathConflict { ref path } if path == "a"));
        assert_eq!(index.leaf_count(), 1);

        let mut index = PathTreeIndex::new();
        index.insert_batch("x", batch(&["x/y.txt"])).unwrap();
        let out = index.insert_batch("", batch(&["x"])).unwrap();
        assert!(matches!(out.rejected[0].1, ArchiveError::PathConflict { .. }));
    }

    #[test]
    fn test_secondary_keys_registered() {
        let mut index = PathTreeIndex::new();
        let items = vec![
            BatchItem::new(0, file_entry("r/a", 1).with_secondary_key("k1")),
            BatchItem::new(1, file_entry("r/b", 1)),
        ];
        let out = index.insert_batch("r", items).unwrap();
        assert_eq!(index.lookup_by_key("k1"), Some(out.inserted[0]));
        assert_eq!(index.keys().len(), 1);
    }

    #[test]
    fn test_bare_leaf_has_no_metadata() {
        let mut index = PathTreeIndex::new();
        let out = index
            .insert_batch("", vec![BatchItem::bare(0, "broken.bin".to_string())])
            .unwrap();
        let id = out.inserted[0];
        assert!(!index.node(id).is_dir());
        assert!(index.node(id).entry().is_none());
        assert_eq!(index.size_label(id), "");
        assert_eq!(index.date_label(id), "");
    }

    #[test]
    fn test_directory_size_and_date_aggregate() {
        let mut index = PathTreeIndex::new();
        let items = vec![
            BatchItem::new(0, entry_at("d/a.bin", 1024, 100)),
            BatchItem::new(1, entry_at("d/b.bin", 1024, 300)),
        ];
        index.insert_batch("d", items).unwrap();
        index
            .insert_batch("d/e", vec![BatchItem::bare(2, "d/e/c.bin".to_string())])
            .unwrap();

        let d = index.lookup_by_path("d").unwrap();
        assert_eq!(index.total_size(d), Some(2048));
        assert_eq!(index.size_label(d), "2.0K");
        let e = index.lookup_by_path("d/e").unwrap();
        assert_eq!(index.total_size(e), None);
        assert_eq!(
            index.latest_modified(d),
            index.latest_modified(index.lookup_by_path("d/b.bin").unwrap())
        );
    }

    #[test]
    fn test_aggregates_on_very_deep_path() {
        let dir = vec!["d"; 5000].join("/");
        let leaf = format!("{}/leaf.bin", dir);
        let mut index = PathTreeIndex::new();
        index
            .insert_batch(&dir, vec![BatchItem::new(0, entry_at(&leaf, 7, 500))])
            .unwrap();
        assert_eq!(index.len(), 5002);

        assert_eq!(index.total_size(NodeId::ROOT), Some(7));
        assert_eq!(
            index.latest_modified(NodeId::ROOT),
            index.latest_modified(index.lookup_by_path(&leaf).unwrap())
        );
        let top = index.lookup_by_path("d").unwrap();
        assert_eq!(index.size_label(top), "7B");
        assert_eq!(index.total_size(index.lookup_by_path(&dir).unwrap()), Some(7));
    }

    #[test]
    fn test_leaves_under_selection() {
        let mut index = PathTreeIndex::new();
        index.insert_batch("a", batch(&["a/1", "a/2"])).unwrap();
        index.insert_batch("a/b", batch(&["a/b/3"])).unwrap();
        index.insert_batch("", batch(&["top"])).unwrap();

        let a = index.lookup_by_path("a").unwrap();
        let three = index.lookup_by_path("a/b/3").unwrap();
        let leaves = index.leaves_under(&[a, three]);
        let paths: Vec<_> = leaves.iter().map(|&id| index.node(id).path()).collect();
        assert_eq!(paths, vec!["a/1", "a/2", "a/b/3"]);

        assert_eq!(index.leaves_under(&[NodeId::ROOT]).len(), 4);
        assert_eq!(
            index.leaves_under(&[NodeId::from_index(index.len() + 3), three]),
            vec![three]
        );
    }
}
