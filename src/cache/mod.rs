//! Cache Module
//!
//! The page-side cache store: in-memory key → entry map with TTL expiry,
//! size-bounded write-time eviction, prefix/pattern invalidation, and JSON
//! snapshot persistence.

mod entry;
mod persist;
mod stats;
mod store;
mod write_order;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry, EntryMetadata};
pub use persist::{Snapshot, SNAPSHOT_FILE_NAME};
pub use stats::CacheStats;
pub use store::CacheStore;
pub use write_order::WriteOrder;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 512;

/// Default maximum number of entries the store holds
pub const DEFAULT_MAX_ENTRIES: usize = 1000;
