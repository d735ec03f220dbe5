//! Write Order Tracker
//!
//! Tracks write recency for eviction. Eviction removes the least recently
//! *written* key (oldest `created_at`), a deliberate simplification of LRU:
//! reads never reorder the queue, only writes do.

use std::collections::VecDeque;

// == Write Order ==
/// Keys ordered by write time.
///
/// - Front = most recently written
/// - Back = least recently written
#[derive(Debug, Default)]
pub struct WriteOrder {
    order: VecDeque<String>,
}

impl WriteOrder {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Record Write ==
    /// Marks a key as just written (moves to front).
    ///
    /// An overwrite counts as a fresh write, so the key moves to the front.
    pub fn record_write(&mut self, key: &str) {
        self.remove(key);
        self.order.push_front(key.to_string());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently written key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        self.order.pop_back()
    }

    // == Peek Oldest ==
    /// Returns the least recently written key without removing it.
    pub fn peek_oldest(&self) -> Option<&String> {
        self.order.back()
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // == Clear ==
    /// Drops all tracked keys.
    pub fn clear(&mut self) {
        self.order.clear();
    }

    // == Contains ==
    #[allow(dead_code)]
    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_new() {
        let order = WriteOrder::new();
        assert!(order.is_empty());
        assert_eq!(order.len(), 0);
    }

    #[test]
    fn test_oldest_is_first_written() {
        let mut order = WriteOrder::new();

        order.record_write("key1");
        order.record_write("key2");
        order.record_write("key3");

        assert_eq!(order.len(), 3);
        assert_eq!(order.peek_oldest(), Some(&"key1".to_string()));
    }

    #[test]
    fn test_overwrite_moves_to_front() {
        let mut order = WriteOrder::new();

        order.record_write("key1");
        order.record_write("key2");
        order.record_write("key3");

        // Rewriting key1 makes key2 the oldest
        order.record_write("key1");

        assert_eq!(order.len(), 3);
        assert_eq!(order.peek_oldest(), Some(&"key2".to_string()));
    }

    #[test]
    fn test_evict_oldest_pops_in_write_order() {
        let mut order = WriteOrder::new();

        order.record_write("a");
        order.record_write("b");
        order.record_write("c");

        assert_eq!(order.evict_oldest(), Some("a".to_string()));
        assert_eq!(order.evict_oldest(), Some("b".to_string()));
        assert_eq!(order.evict_oldest(), Some("c".to_string()));
        assert_eq!(order.evict_oldest(), None);
    }

    #[test]
    fn test_remove_nonexistent_key_is_noop() {
        let mut order = WriteOrder::new();

        order.record_write("key1");
        order.remove("nonexistent");

        assert_eq!(order.len(), 1);
        assert!(order.contains("key1"));
    }

    #[test]
    fn test_clear() {
        let mut order = WriteOrder::new();

        order.record_write("key1");
        order.record_write("key2");
        order.clear();

        assert!(order.is_empty());
    }

    #[test]
    fn test_duplicate_writes_keep_single_entry() {
        let mut order = WriteOrder::new();

        order.record_write("key1");
        order.record_write("key1");
        order.record_write("key1");

        assert_eq!(order.len(), 1);
    }
}
