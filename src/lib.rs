//! classcache - Client-side caching layer for a school administration API
//!
//! Sits between UI/query code and the network: a page-side cache store with
//! TTL expiry and bounded eviction, an HTTP client wrapper with write-through
//! caching and mutation-driven invalidation, a network-boundary response
//! cache with offline fallback, and a durable per-entity store.

pub mod cache;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod key;
pub mod policy;
pub mod tasks;
pub mod worker;

pub use cache::CacheStore;
pub use client::{ApiClient, CacheOptions, CachedResponse};
pub use config::Config;
pub use error::ClientError;
pub use key::derive_key;
pub use policy::TtlPolicy;
pub use tasks::{spawn_snapshot_task, spawn_sweep_task};
