//! Secondary-key lookup (e.g. record GUIDs) alongside the path index

use std::collections::HashMap;

use super::node::NodeId;

#[derive(Debug, Clone, Copy)]
struct Slot {
    node: NodeId,
    ordinal: usize,
}

/// Maps a stable identifier to the leaf carrying it.
///
/// Duplicate keys resolve to the entry that came last in the source listing,
/// independent of the order in which batches were inserted.
#[derive(Debug, Default)]
pub struct SecondaryKeyCache {
    slots: HashMap<String, Slot>,
}

impl SecondaryKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` under `key`. `ordinal` is the entry's position in the
    /// source listing. Blank keys are ignored.
    pub fn register(&mut self, key: &str, node: NodeId, ordinal: usize) {
        if key.trim().is_empty() {
            return;
        }
        match self.slots.get_mut(key) {
            Some(slot) if slot.ordinal > ordinal => {}
            Some(slot) => *slot = Slot { node, ordinal },
            None => {
                self.slots.insert(key.to_string(), Slot { node, ordinal });
            }
        }
    }

    pub fn lookup(&self, key: &str) -> Option<NodeId> {
        self.slots.get(key).map(|slot| slot.node)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All registered keys with their nodes, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.slots.iter().map(|(key, slot)| (key.as_str(), slot.node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut cache = SecondaryKeyCache::new();
        cache.register("guid-1", NodeId::from_index(3), 0);
        assert_eq!(cache.lookup("guid-1"), Some(NodeId::from_index(3)));
        assert_eq!(cache.lookup("guid-2"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_duplicate_key_last_in_source_order_wins() {
        let mut cache = SecondaryKeyCache::new();
        // inserted out of source order, as directory batching does
        cache.register("dup", NodeId::from_index(1), 0);
        cache.register("dup", NodeId::from_index(2), 2);
        cache.register("dup", NodeId::from_index(3), 1);
        assert_eq!(cache.lookup("dup"), Some(NodeId::from_index(2)));
    }

    #[test]
    fn test_blank_key_ignored() {
        let mut cache = SecondaryKeyCache::new();
        cache.register("", NodeId::from_index(1), 0);
        cache.register("  ", NodeId::from_index(1), 1);
        assert!(cache.is_empty());
    }
}
