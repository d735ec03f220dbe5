//! Mutation Invalidation Rules
//!
//! After a successful mutation the client removes cache entries that may now
//! be stale: everything under the mutated endpoint, everything under the
//! coarse parent collections referenced by the URL, and every key carrying
//! the mutated record's identifier.

use regex::Regex;
use tracing::debug;

use crate::cache::CacheStore;

/// Coarse parent collection prefixes.
///
/// A write to a sub-resource invalidates cached listings of any of these
/// parents that appear textually in the endpoint.
pub const PARENT_PREFIXES: &[&str] = &[
    "/students",
    "/teachers",
    "/classes",
    "/subjects",
    "/academic",
    "/assignments",
    "/attendance",
    "/activities",
    "/finance",
    "/fees",
    "/dashboard",
];

// == Entity Identifier Extraction ==
/// Extracts an entity identifier from the trailing path segment, if the
/// segment parses as one: a UUID-shaped string or an all-digits id.
///
/// Returns `None` otherwise; identifier-scoped invalidation is then skipped
/// while prefix-scoped invalidation still applies (degraded precision, not an
/// error).
pub fn extract_entity_id(endpoint: &str) -> Option<&str> {
    let trimmed = endpoint.trim_end_matches('/');
    let segment = trimmed.rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }
    if is_uuid_shaped(segment) || segment.chars().all(|c| c.is_ascii_digit()) {
        Some(segment)
    } else {
        None
    }
}

/// UUID shape: 36 characters, dashes at positions 8/13/18/23, hex elsewhere.
fn is_uuid_shaped(s: &str) -> bool {
    if s.len() != 36 {
        return false;
    }
    s.chars().enumerate().all(|(i, c)| {
        if i == 8 || i == 13 || i == 18 || i == 23 {
            c == '-'
        } else {
            c.is_ascii_hexdigit()
        }
    })
}

// == Apply Invalidation ==
/// Applies the full invalidation cascade for a mutation of `endpoint`.
///
/// Runs synchronously under the store lock, so a read issued after the
/// mutation resolves cannot observe stale data for the invalidated scopes.
/// Returns the number of entries removed.
pub fn apply_mutation_invalidation(store: &mut CacheStore, endpoint: &str) -> usize {
    let mut removed = 0;

    // (a) the mutated endpoint's own prefix
    let own = endpoint.trim_end_matches('/');
    if !own.is_empty() {
        removed += store.clear_endpoint_prefix(own);
    }

    // (b) coarse parent collections referenced by the URL
    for parent in PARENT_PREFIXES {
        if own != *parent && endpoint.contains(parent) {
            removed += store.clear_endpoint_prefix(parent);
        }
    }

    // (c) identifier-scoped entries anywhere in the store
    if let Some(id) = extract_entity_id(endpoint) {
        match Regex::new(&regex::escape(id)) {
            Ok(pattern) => removed += store.invalidate_matching(&pattern),
            Err(e) => debug!(id, error = %e, "Skipping identifier-scoped invalidation"),
        }
    }

    debug!(endpoint, removed, "Applied mutation invalidation");
    removed
}
