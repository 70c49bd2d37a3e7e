//! Ordered set of vertices eligible for collapse

use crate::connectivity::VertexId;
use priority_queue::PriorityQueue;
use std::cmp::Ordering;

/// Ordering key of an active vertex: cost first, then original index.
#[derive(Debug, Clone, Copy)]
pub struct CollapseKey {
    pub cost: f64,
    pub original_index: u32,
}

impl CollapseKey {
    pub fn new(cost: f64, original_index: u32) -> Self {
        Self {
            cost,
            original_index,
        }
    }
}

impl PartialEq for CollapseKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CollapseKey {}

impl PartialOrd for CollapseKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CollapseKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: the queue pops its greatest key, we want the cheapest
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.original_index.cmp(&self.original_index))
    }
}

/// The active vertices, keyed by [`CollapseKey`].
///
/// Keys cannot be changed in place. A vertex whose cost changes is removed
/// first and inserted again with its new key.
#[derive(Debug, Clone, Default)]
pub struct ActiveSet {
    queue: PriorityQueue<VertexId, CollapseKey>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: PriorityQueue::with_capacity(capacity),
        }
    }

    /// Insert a vertex that is not currently in the set.
    pub fn insert(&mut self, id: VertexId, key: CollapseKey) {
        let previous = self.queue.push(id, key);
        debug_assert!(previous.is_none(), "vertex {} inserted twice", id.0);
    }

    /// Remove a vertex, returning the key it was inserted with.
    pub fn remove(&mut self, id: VertexId) -> Option<CollapseKey> {
        self.queue.remove(&id).map(|(_, key)| key)
    }

    /// Remove and return the vertex with the smallest key.
    ///
    /// # Panics
    ///
    /// Panics if the set is empty; check [`ActiveSet::is_empty`] first.
    pub fn extract_min(&mut self) -> (VertexId, CollapseKey) {
        match self.queue.pop() {
            Some(entry) => entry,
            None => panic!("extract_min called on an empty active set"),
        }
    }

    pub fn contains(&self, id: VertexId) -> bool {
        self.queue.get_priority(&id).is_some()
    }

    /// Key a vertex was inserted with, if present
    pub fn key(&self, id: VertexId) -> Option<CollapseKey> {
        self.queue.get_priority(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_in_cost_order() {
        let mut set = ActiveSet::new();
        set.insert(VertexId(0), CollapseKey::new(3.0, 0));
        set.insert(VertexId(1), CollapseKey::new(1.0, 1));
        set.insert(VertexId(2), CollapseKey::new(2.0, 2));

        assert_eq!(set.len(), 3);
        assert_eq!(set.extract_min().0, VertexId(1));
        assert_eq!(set.extract_min().0, VertexId(2));
        assert_eq!(set.extract_min().0, VertexId(0));
        assert!(set.is_empty());
    }

    #[test]
    fn test_equal_cost_tie_break() {
        let mut set = ActiveSet::new();
        set.insert(VertexId(7), CollapseKey::new(1.0, 7));
        set.insert(VertexId(2), CollapseKey::new(1.0, 2));
        set.insert(VertexId(5), CollapseKey::new(1.0, 5));

        assert_eq!(set.extract_min().0, VertexId(2));
        assert_eq!(set.extract_min().0, VertexId(5));
        assert_eq!(set.extract_min().0, VertexId(7));
    }

    #[test]
    fn test_remove_then_reinsert() {
        let mut set = ActiveSet::new();
        set.insert(VertexId(0), CollapseKey::new(1.0, 0));
        set.insert(VertexId(1), CollapseKey::new(2.0, 1));

        let old = set.remove(VertexId(0)).unwrap();
        assert_eq!(old.cost, 1.0);
        assert!(!set.contains(VertexId(0)));
        assert!(set.remove(VertexId(0)).is_none());

        set.insert(VertexId(0), CollapseKey::new(5.0, 0));
        assert_eq!(set.key(VertexId(0)).map(|k| k.cost), Some(5.0));
        assert_eq!(set.extract_min().0, VertexId(1));
        assert_eq!(set.extract_min().0, VertexId(0));
    }

    #[test]
    #[should_panic(expected = "empty active set")]
    fn test_extract_from_empty_panics() {
        let mut set = ActiveSet::new();
        set.extract_min();
    }
}
