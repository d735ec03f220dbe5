//! HTTP Client Module
//!
//! The caching HTTP client wrapper and its mutation invalidation rules.
//!
//! GET requests are served from the injected cache store when fresh and
//! written through otherwise; POST/PUT/DELETE always hit the network and
//! invalidate related entries after a confirmed success.

pub mod http;
pub mod invalidate;

pub use http::{ApiClient, CacheOptions, CachedResponse};
pub use invalidate::{apply_mutation_invalidation, extract_entity_id, PARENT_PREFIXES};
