//! Background Tasks Module
//!
//! Periodic maintenance that runs alongside the cache store.
//!
//! # Tasks
//! - Expiry sweep: removes expired entries at configured intervals
//! - Snapshot: persists the store to disk at configured intervals

mod cleanup;

pub use cleanup::{spawn_snapshot_task, spawn_sweep_task};
