//! Named Response Buckets
//!
//! Durable containers for the network-boundary cache. Each bucket is one
//! JSON file under the worker directory, written through on every mutation
//! and loaded tolerantly on open. Bucket names carry a version tag so
//! activation can delete containers left behind by previous versions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::worker::request::WorkerResponse;

/// Version tag embedded in bucket names; bump to drop all previous buckets
/// on activation.
pub const CACHE_VERSION: &str = "v1";

// == Bucket Kind ==
/// The three route classes, each with its own container so eviction and
/// versioning stay independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKind {
    Static,
    Images,
    Api,
}

impl BucketKind {
    pub const ALL: [BucketKind; 3] = [BucketKind::Static, BucketKind::Images, BucketKind::Api];

    /// Versioned container name, e.g. `static-v1`.
    pub fn bucket_name(&self) -> String {
        let prefix = match self {
            BucketKind::Static => "static",
            BucketKind::Images => "images",
            BucketKind::Api => "api",
        };
        format!("{}-{}", prefix, CACHE_VERSION)
    }
}

// == Bucket Store ==
/// All named buckets plus their on-disk files.
#[derive(Debug)]
pub struct BucketStore {
    dir: PathBuf,
    buckets: HashMap<BucketKind, HashMap<String, WorkerResponse>>,
}

impl BucketStore {
    // == Open ==
    /// Opens the bucket directory, loading any current-version bucket files.
    ///
    /// Missing or corrupt files load as empty buckets; they never fail the
    /// open.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create bucket dir {}", dir.display()))?;

        let mut buckets = HashMap::new();
        for kind in BucketKind::ALL {
            buckets.insert(kind, Self::load_bucket(dir, kind));
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            buckets,
        })
    }

    fn bucket_path(dir: &Path, kind: BucketKind) -> PathBuf {
        dir.join(format!("{}.json", kind.bucket_name()))
    }

    fn load_bucket(dir: &Path, kind: BucketKind) -> HashMap<String, WorkerResponse> {
        let path = Self::bucket_path(dir, kind);
        if !path.exists() {
            return HashMap::new();
        }
        match std::fs::read_to_string(&path).map_err(anyhow::Error::from).and_then(|contents| {
            serde_json::from_str(&contents).map_err(anyhow::Error::from)
        }) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable bucket file, starting empty");
                HashMap::new()
            }
        }
    }

    fn persist_bucket(&self, kind: BucketKind) -> Result<()> {
        let path = Self::bucket_path(&self.dir, kind);
        let entries = self.buckets.get(&kind).cloned().unwrap_or_default();
        let contents =
            serde_json::to_string(&entries).context("Failed to serialize bucket")?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write bucket {}", path.display()))?;
        Ok(())
    }

    // == Put ==
    /// Stores a response under its request key and writes the bucket through
    /// to disk.
    pub fn put(&mut self, kind: BucketKind, key: String, response: WorkerResponse) -> Result<()> {
        self.buckets.entry(kind).or_default().insert(key, response);
        self.persist_bucket(kind)
    }

    // == Get ==
    /// Looks up a stored response by request key.
    pub fn get(&self, kind: BucketKind, key: &str) -> Option<&WorkerResponse> {
        self.buckets.get(&kind).and_then(|b| b.get(key))
    }

    /// Number of entries in a bucket.
    pub fn len(&self, kind: BucketKind) -> usize {
        self.buckets.get(&kind).map(|b| b.len()).unwrap_or(0)
    }

    // == Remove Stale Versions ==
    /// Deletes every bucket file whose name does not carry the current
    /// version tag. Returns the number of files removed.
    pub fn remove_stale_versions(&self) -> Result<usize> {
        let current: Vec<String> = BucketKind::ALL
            .iter()
            .map(|k| format!("{}.json", k.bucket_name()))
            .collect();

        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read bucket dir {}", self.dir.display()))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(".json") && !current.contains(&name) {
                if let Err(e) = std::fs::remove_file(entry.path()) {
                    warn!(file = %name, error = %e, "Failed to delete stale bucket");
                } else {
                    debug!(file = %name, "Deleted stale bucket");
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    // == Wipe All ==
    /// Clears every bucket, in memory and on disk.
    pub fn wipe_all(&mut self) -> Result<()> {
        for kind in BucketKind::ALL {
            if let Some(bucket) = self.buckets.get_mut(&kind) {
                bucket.clear();
            }
            let path = Self::bucket_path(&self.dir, kind);
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove bucket {}", path.display()))?;
            }
        }
        Ok(())
    }
}
