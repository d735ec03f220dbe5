//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Entry Metadata ==
/// Optional request context recorded with an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// URL the data was fetched from
    pub source_url: String,
    /// Request parameters, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Entity identifier associated with the payload, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_tag: Option<String>,
}

// == Cache Entry ==
/// A single cache entry: payload plus timestamps and optional metadata.
///
/// Entries are immutable once written; a `set` on the same key replaces the
/// whole entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The stored response payload
    pub data: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Request context, if recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EntryMetadata>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl_ms` milliseconds from now.
    pub fn new(data: Value, ttl_ms: u64, metadata: Option<EntryMetadata>) -> Self {
        let now = current_timestamp_ms();
        Self {
            data,
            created_at: now,
            expires_at: now.saturating_add(ttl_ms),
            metadata,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired when the current time is
    /// greater than or equal to the expiration time, so a TTL that has fully
    /// elapsed makes the entry immediately unavailable.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() >= self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds (0 once expired).
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(current_timestamp_ms())
    }

    /// Returns the entry age in milliseconds.
    pub fn age_ms(&self) -> u64 {
        current_timestamp_ms().saturating_sub(self.created_at)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
