//! Background Maintenance Tasks
//!
//! Periodic tasks that keep the cache store bounded and persisted: an expiry
//! sweep (so write-heavy, read-rarely keys do not accumulate) and a snapshot
//! writer (so state survives restarts).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, Snapshot};

/// Spawns a background task that periodically removes expired entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. It acquires a write lock on the cache store to remove
/// expired entries, independent of any reads.
///
/// # Arguments
/// * `cache` - shared reference to the cache store
/// * `sweep_interval_secs` - interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, used to abort it during shutdown.
pub fn spawn_sweep_task(
    cache: Arc<RwLock<CacheStore>>,
    sweep_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs);

    tokio::spawn(async move {
        info!(
            interval_secs = sweep_interval_secs,
            "Starting expiry sweep task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut cache_guard = cache.write().await;
                cache_guard.cleanup_expired()
            };

            if removed > 0 {
                info!(removed, "Expiry sweep removed entries");
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}

/// Spawns a background task that periodically persists the cache store.
///
/// A failed save is logged and retried on the next tick; persistence is
/// best-effort and never takes the store down.
pub fn spawn_snapshot_task(
    cache: Arc<RwLock<CacheStore>>,
    snapshot: Snapshot,
    snapshot_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(snapshot_interval_secs);

    tokio::spawn(async move {
        info!(
            interval_secs = snapshot_interval_secs,
            "Starting snapshot task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let result = {
                let cache_guard = cache.read().await;
                snapshot.save(&cache_guard)
            };

            if let Err(e) = result {
                warn!(error = %e, "Periodic snapshot failed");
            } else {
                debug!("Periodic snapshot written");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let cache = Arc::new(RwLock::new(CacheStore::new(100)));

        {
            let mut cache_guard = cache.write().await;
            cache_guard
                .set("expire_soon".to_string(), json!("v"), 200, None)
                .unwrap();
        }

        let handle = spawn_sweep_task(cache.clone(), 1);

        // Wait for entry to expire and the sweep to run
        tokio::time::sleep(Duration::from_millis(2500)).await;

        {
            let cache_guard = cache.read().await;
            assert!(
                !cache_guard.contains_key("expire_soon"),
                "Expired entry should have been swept"
            );
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let cache = Arc::new(RwLock::new(CacheStore::new(100)));

        {
            let mut cache_guard = cache.write().await;
            cache_guard
                .set("long_lived".to_string(), json!("v"), 3_600_000, None)
                .unwrap();
        }

        let handle = spawn_sweep_task(cache.clone(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        {
            let mut cache_guard = cache.write().await;
            assert_eq!(cache_guard.get("long_lived"), Some(json!("v")));
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_snapshot_task_writes_periodically() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::in_dir(dir.path()).unwrap();
        let cache = Arc::new(RwLock::new(CacheStore::new(100)));

        {
            let mut cache_guard = cache.write().await;
            cache_guard
                .set("persisted".to_string(), json!(1), 300_000, None)
                .unwrap();
        }

        let handle = spawn_snapshot_task(cache.clone(), snapshot.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.abort();

        let pairs = snapshot.load();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "persisted");
    }

    #[tokio::test]
    async fn test_tasks_can_be_aborted() {
        let cache = Arc::new(RwLock::new(CacheStore::new(100)));

        let handle = spawn_sweep_task(cache, 1);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
