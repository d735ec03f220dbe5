//! Durable Per-Entity Store Module
//!
//! Structured persistence for a fixed set of named entities, independent of
//! the generic endpoint-keyed cache store.

pub mod store;

pub use store::{
    EntityRead, EntityStore, EntityTable, SharedEntityStore, CACHED_AT_FIELD, SCHEMA_VERSION,
};
