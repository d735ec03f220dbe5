//! Durable Per-Entity Store
//!
//! A small fixed set of named tables persisted as JSON files, one record per
//! file, addressed by entity identity rather than endpoint+params. Each
//! table carries its own freshness window; stale records are returned with a
//! flag instead of being withheld.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Bump to discard all persisted tables on next open.
pub const SCHEMA_VERSION: u32 = 1;

/// Field injected into every stored record at write time (unix ms).
pub const CACHED_AT_FIELD: &str = "_cached_at";

const VERSION_FILE: &str = "schema_version";
const META_TABLE: &str = "meta";

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;

// == Entity Table ==
/// The named tables. Fixed at compile time; adding one means a schema bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityTable {
    Profile,
    Dashboard,
    Assignments,
    Activities,
}

impl EntityTable {
    pub const ALL: [EntityTable; 4] = [
        EntityTable::Profile,
        EntityTable::Dashboard,
        EntityTable::Assignments,
        EntityTable::Activities,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            EntityTable::Profile => "profile",
            EntityTable::Dashboard => "dashboard",
            EntityTable::Assignments => "assignments",
            EntityTable::Activities => "activities",
        }
    }

    /// Per-table freshness window, tiered by how fast the data moves.
    pub fn max_age_ms(&self) -> i64 {
        match self {
            EntityTable::Profile => HOUR_MS,
            EntityTable::Dashboard => 5 * MINUTE_MS,
            EntityTable::Assignments => 10 * MINUTE_MS,
            EntityTable::Activities => 2 * MINUTE_MS,
        }
    }
}

// == Entity Read ==
/// A record handed back by `get`, with its write stamp and staleness verdict.
#[derive(Debug, Clone)]
pub struct EntityRead {
    pub data: Value,
    pub cached_at: i64,
    pub is_stale: bool,
}

/// Metadata row kept alongside every record write.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MetaRecord {
    table: String,
    key: String,
    last_updated: i64,
}

// == Entity Store ==
/// All tables under one directory: `{dir}/{table}/{key}.json` per record,
/// plus a `meta` table and a schema version file.
#[derive(Debug)]
pub struct EntityStore {
    dir: PathBuf,
}

impl EntityStore {
    // == Open ==
    /// Opens (or creates) the store directory, creating missing tables and
    /// wiping everything when the persisted schema version does not match.
    ///
    /// Failures here are real errors; callers must not proceed with a
    /// half-initialized store.
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create entity store dir {}", dir.display()))?;

        let version_path = dir.join(VERSION_FILE);
        let on_disk: Option<u32> = match tokio::fs::read_to_string(&version_path).await {
            Ok(contents) => contents.trim().parse().ok(),
            Err(_) => None,
        };

        let store = Self {
            dir: dir.to_path_buf(),
        };

        if on_disk != Some(SCHEMA_VERSION) {
            if let Some(old) = on_disk {
                info!(old, new = SCHEMA_VERSION, "Schema version bump, wiping entity tables");
            }
            store.clear_all().await?;
            tokio::fs::write(&version_path, SCHEMA_VERSION.to_string())
                .await
                .context("Failed to write schema version")?;
        }

        for table in EntityTable::ALL {
            tokio::fs::create_dir_all(store.table_dir(table.table_name())).await?;
        }
        tokio::fs::create_dir_all(store.table_dir(META_TABLE)).await?;

        debug!(dir = %dir.display(), version = SCHEMA_VERSION, "Entity store open");
        Ok(store)
    }

    fn table_dir(&self, table: &str) -> PathBuf {
        self.dir.join(table)
    }

    fn record_path(&self, table: &str, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            bail!("Invalid entity key: {:?}", key);
        }
        Ok(self.table_dir(table).join(format!("{}.json", key)))
    }

    // == Put ==
    /// Stamps the record with the current time and upserts it by key, also
    /// upserting the matching metadata row.
    pub async fn put(&self, table: EntityTable, key: &str, record: Value) -> Result<()> {
        let Value::Object(mut fields) = record else {
            bail!("Entity records must be JSON objects");
        };

        let now = Utc::now().timestamp_millis();
        fields.insert(CACHED_AT_FIELD.to_string(), json!(now));

        let path = self.record_path(table.table_name(), key)?;
        let contents = serde_json::to_string(&Value::Object(fields))?;
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let meta = MetaRecord {
            table: table.table_name().to_string(),
            key: key.to_string(),
            last_updated: now,
        };
        let meta_path = self.record_path(META_TABLE, &format!("{}__{}", meta.table, key))?;
        tokio::fs::write(&meta_path, serde_json::to_string(&meta)?)
            .await
            .with_context(|| format!("Failed to write {}", meta_path.display()))?;

        Ok(())
    }

    // == Get ==
    /// Reads one record. A record older than its table's window comes back
    /// flagged stale rather than withheld.
    pub async fn get(&self, table: EntityTable, key: &str) -> Result<Option<EntityRead>> {
        let path = self.record_path(table.table_name(), key)?;
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        let data: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Corrupt entity record {}", path.display()))?;

        let cached_at = data
            .get(CACHED_AT_FIELD)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let age = Utc::now().timestamp_millis().saturating_sub(cached_at);

        Ok(Some(EntityRead {
            data,
            cached_at,
            is_stale: age > table.max_age_ms(),
        }))
    }

    // == Bulk Reads ==
    /// Every record in a table. No staleness filtering at this layer.
    pub async fn get_all(&self, table: EntityTable) -> Result<Vec<Value>> {
        self.read_table(table.table_name()).await
    }

    /// Records whose named field equals the given value.
    pub async fn get_all_by_index(
        &self,
        table: EntityTable,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>> {
        let all = self.get_all(table).await?;
        Ok(all
            .into_iter()
            .filter(|record| record.get(field) == Some(value))
            .collect())
    }

    async fn read_table(&self, table: &str) -> Result<Vec<Value>> {
        let dir = self.table_dir(table);
        let mut records = Vec::new();

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(e).with_context(|| format!("Failed to list {}", dir.display())),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(value) => records.push(value),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping corrupt entity record")
                    }
                },
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable record"),
            }
        }

        Ok(records)
    }

    /// When the metadata row for a record was last written, if ever.
    pub async fn last_updated(&self, table: EntityTable, key: &str) -> Result<Option<i64>> {
        let meta_path =
            self.record_path(META_TABLE, &format!("{}__{}", table.table_name(), key))?;
        match tokio::fs::read_to_string(&meta_path).await {
            Ok(contents) => {
                let meta: MetaRecord = serde_json::from_str(&contents)?;
                Ok(Some(meta.last_updated))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // == Delete / Clear ==
    /// Removes one record (and its metadata row). Returns whether it existed.
    pub async fn delete(&self, table: EntityTable, key: &str) -> Result<bool> {
        let path = self.record_path(table.table_name(), key)?;
        let existed = match tokio::fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to delete {}", path.display()))
            }
        };

        let meta_path =
            self.record_path(META_TABLE, &format!("{}__{}", table.table_name(), key))?;
        let _ = tokio::fs::remove_file(&meta_path).await;

        Ok(existed)
    }

    /// Empties one table. Tables are independent, so no ordering concern.
    pub async fn clear(&self, table: EntityTable) -> Result<()> {
        self.clear_dir(table.table_name()).await
    }

    /// Empties every table including metadata.
    pub async fn clear_all(&self) -> Result<()> {
        for table in EntityTable::ALL {
            self.clear_dir(table.table_name()).await?;
        }
        self.clear_dir(META_TABLE).await
    }

    async fn clear_dir(&self, table: &str) -> Result<()> {
        let dir = self.table_dir(table);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).with_context(|| format!("Failed to list {}", dir.display())),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                warn!(path = %entry.path().display(), error = %e, "Failed to remove record");
            }
        }
        Ok(())
    }
}

// == Shared Handle ==
/// Opens the store once; concurrent callers before initialization completes
/// share the same pending open instead of racing schema creation.
#[derive(Debug)]
pub struct SharedEntityStore {
    dir: PathBuf,
    cell: OnceCell<Arc<EntityStore>>,
}

impl SharedEntityStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            cell: OnceCell::new(),
        }
    }

    /// The open store, initializing it on first call. An open failure is
    /// surfaced to every waiting caller.
    pub async fn get(&self) -> Result<Arc<EntityStore>> {
        let store = self
            .cell
            .get_or_try_init(|| async { EntityStore::open(&self.dir).await.map(Arc::new) })
            .await?;
        Ok(store.clone())
    }
}
