//! Snapshot Persistence Module
//!
//! Serializes the full cache store to a single JSON blob under a fixed
//! well-known filename so state survives restarts. A missing or corrupt
//! snapshot is treated as an empty store, never a startup failure.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStore};

/// Well-known snapshot filename inside the data directory.
pub const SNAPSHOT_FILE_NAME: &str = "cache_snapshot.json";

// == Snapshot ==
/// Handle to the on-disk snapshot of a `CacheStore`.
#[derive(Debug, Clone)]
pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    // == Constructor ==
    /// Creates a snapshot handle inside `data_dir`, creating the directory
    /// if needed.
    pub fn in_dir(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;
        Ok(Self {
            path: data_dir.join(SNAPSHOT_FILE_NAME),
        })
    }

    /// The snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // == Save ==
    /// Writes the store's current entry set to disk as `[key, entry]` pairs.
    pub fn save(&self, store: &CacheStore) -> Result<()> {
        let pairs = store.snapshot();
        let contents = serde_json::to_string(&pairs)
            .context("Failed to serialize cache snapshot")?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write snapshot {}", self.path.display()))?;
        debug!(entries = pairs.len(), path = %self.path.display(), "Cache snapshot saved");
        Ok(())
    }

    // == Load ==
    /// Loads the persisted pair set.
    ///
    /// Absent file → empty. Unreadable or corrupt file → empty with a
    /// warning; corruption must not take down initialization.
    pub fn load(&self) -> Vec<(String, CacheEntry)> {
        if !self.path.exists() {
            return Vec::new();
        }

        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read cache snapshot, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt cache snapshot, starting empty");
                Vec::new()
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TTL: u64 = 300_000;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::in_dir(dir.path()).unwrap();

        let mut store = CacheStore::new(100);
        store
            .set("/classes:h1".to_string(), json!(["7a"]), TTL, None)
            .unwrap();
        store
            .set("/students:h2".to_string(), json!(["amy"]), TTL, None)
            .unwrap();
        snapshot.save(&store).unwrap();

        let mut restored = CacheStore::new(100);
        restored.restore(snapshot.load());

        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get("/classes:h1").unwrap(), json!(["7a"]));
        assert_eq!(restored.get("/students:h2").unwrap(), json!(["amy"]));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::in_dir(dir.path()).unwrap();
        assert!(snapshot.load().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::in_dir(dir.path()).unwrap();
        std::fs::write(snapshot.path(), "{not json!").unwrap();

        assert!(snapshot.load().is_empty());
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::in_dir(dir.path()).unwrap();

        let mut store = CacheStore::new(100);
        store.set("a".to_string(), json!(1), TTL, None).unwrap();
        snapshot.save(&store).unwrap();

        store.delete("a");
        store.set("b".to_string(), json!(2), TTL, None).unwrap();
        snapshot.save(&store).unwrap();

        let mut restored = CacheStore::new(100);
        restored.restore(snapshot.load());
        assert!(!restored.contains_key("a"));
        assert!(restored.contains_key("b"));
    }
}
