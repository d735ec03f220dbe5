//! Cache Store Module
//!
//! Main cache engine: HashMap storage with TTL expiration, a write-time
//! eviction bound, prefix and pattern invalidation, and snapshot support for
//! persistence.

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, EntryMetadata, WriteOrder, MAX_KEY_LENGTH};
use crate::error::{CacheError, CacheResult};

// == Cache Store ==
/// Size-bounded key → entry map with lazy TTL expiry.
///
/// Entry lifecycle: absent → present(fresh) → present(expired) → absent.
/// Expired entries are removed on read, by the background sweep, or by
/// invalidation; they are never returned to callers.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Write-recency tracker used for eviction
    write_order: WriteOrder,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            write_order: WriteOrder::new(),
            stats: CacheStats::new(),
            max_entries,
        }
    }

    // == Set ==
    /// Stores a payload under `key` with the given TTL.
    ///
    /// If the key already exists the entry is fully replaced and its write
    /// recency resets. If the store exceeds its size bound after the insert,
    /// the least recently written entry is evicted (oldest write time; reads
    /// do not protect an entry from eviction).
    pub fn set(
        &mut self,
        key: String,
        data: Value,
        ttl_ms: u64,
        metadata: Option<EntryMetadata>,
    ) -> CacheResult<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidKey(format!(
                "key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        let entry = CacheEntry::new(data, ttl_ms, metadata);
        self.entries.insert(key.clone(), entry);
        self.write_order.record_write(&key);

        if self.entries.len() > self.max_entries {
            if let Some(evicted) = self.write_order.evict_oldest() {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
                debug!(key = %evicted, "Evicted least recently written entry");
            }
        }

        self.stats.set_total_entries(self.entries.len());
        Ok(())
    }

    // == Get ==
    /// Retrieves a payload by key.
    ///
    /// Expired entries are deleted on read and reported as misses; they never
    /// reach the caller.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                self.entries.remove(key);
                self.write_order.remove(key);
                self.stats.record_expiration();
                self.stats.record_miss();
                self.stats.set_total_entries(self.entries.len());
                None
            }
            Some(entry) => {
                let data = entry.data.clone();
                self.stats.record_hit();
                Some(data)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether the key was present.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.write_order.remove(key);
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.write_order.clear();
        self.stats.set_total_entries(0);
    }

    // == Clear Endpoint Prefix ==
    /// Removes every key equal to `prefix` or scoped under it.
    ///
    /// A key is scoped under a prefix when it continues with the `:` that
    /// separates the parameter hash, or with a `/` sub-path. Returns the
    /// number of entries removed.
    pub fn clear_endpoint_prefix(&mut self, prefix: &str) -> usize {
        let with_hash = format!("{}:", prefix);
        let with_path = format!("{}/", prefix);
        let matched: Vec<String> = self
            .entries
            .keys()
            .filter(|k| {
                k.as_str() == prefix || k.starts_with(&with_hash) || k.starts_with(&with_path)
            })
            .cloned()
            .collect();

        for key in &matched {
            self.entries.remove(key);
            self.write_order.remove(key);
        }
        self.stats.set_total_entries(self.entries.len());
        matched.len()
    }

    // == Invalidate Matching ==
    /// Removes every key matching the pattern.
    ///
    /// Used for entity-scoped invalidation after a mutation references a
    /// specific record identifier.
    pub fn invalidate_matching(&mut self, pattern: &Regex) -> usize {
        let matched: Vec<String> = self
            .entries
            .keys()
            .filter(|k| pattern.is_match(k))
            .cloned()
            .collect();

        for key in &matched {
            self.entries.remove(key);
            self.write_order.remove(key);
        }
        self.stats.set_total_entries(self.entries.len());
        matched.len()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, independent of reads.
    ///
    /// Returns the number of entries removed. Bounds growth from keys that
    /// are written often but read rarely.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.write_order.remove(key);
            self.stats.record_expiration();
        }
        self.stats.set_total_entries(self.entries.len());
        expired.len()
    }

    // == Snapshot ==
    /// Returns the full entry set as `(key, entry)` pairs for persistence.
    pub fn snapshot(&self) -> Vec<(String, CacheEntry)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    // == Restore ==
    /// Replaces the store contents from a persisted snapshot.
    ///
    /// Already-expired pairs are skipped. Write order is rebuilt from entry
    /// creation times, so eviction picks up where the previous session left
    /// off. If the snapshot exceeds the size bound, the oldest writes are
    /// dropped.
    pub fn restore(&mut self, mut pairs: Vec<(String, CacheEntry)>) {
        self.clear();
        pairs.retain(|(_, entry)| !entry.is_expired());
        pairs.sort_by_key(|(_, entry)| entry.created_at);

        for (key, entry) in pairs {
            self.write_order.record_write(&key);
            self.entries.insert(key, entry);
        }
        while self.entries.len() > self.max_entries {
            if let Some(evicted) = self.write_order.evict_oldest() {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
            } else {
                break;
            }
        }
        self.stats.set_total_entries(self.entries.len());
    }

    // == Keys ==
    /// Returns all currently stored keys (expired entries included until the
    /// next read or sweep touches them).
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Returns whether a key is present, without touching stats or expiry.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
