//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify store-level correctness properties.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use crate::cache::CacheStore;
use crate::key::derive_key;

// == Test Configuration ==
const TEST_TTL_MS: u64 = 300_000;

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "/[a-z]{1,12}(/[a-z0-9]{1,8})?".prop_map(|s| s)
}

/// Generates parameter names
fn param_name_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,10}".prop_map(|s| s)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: i64 },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), any::<i64>())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any sequence of operations, hit/miss counters reflect exactly the
    // GET outcomes that occurred.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store = CacheStore::new(1000);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    let _ = store.set(key, json!(value), TEST_TTL_MS, None);
                }
                CacheOp::Get { key } => {
                    match store.get(&key) {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    }
                }
                CacheOp::Delete { key } => {
                    let _ = store.delete(&key);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, store.len(), "Total entries mismatch");
    }

    // For any key-value pair, set-then-get before expiry returns the exact
    // value that was stored.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in any::<i64>()) {
        let mut store = CacheStore::new(1000);

        store.set(key.clone(), json!(value), TEST_TTL_MS, None).unwrap();

        let retrieved = store.get(&key).unwrap();
        prop_assert_eq!(retrieved, json!(value), "Round-trip value mismatch");
    }

    // For any sequence of SET operations, the store never exceeds its bound.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec(
            (valid_key_strategy(), any::<i64>()),
            1..200
        )
    ) {
        let max_entries = 50;
        let mut store = CacheStore::new(max_entries);

        for (key, value) in entries {
            let _ = store.set(key, json!(value), TEST_TTL_MS, None);
            prop_assert!(
                store.len() <= max_entries,
                "Store exceeded capacity: {} > {}",
                store.len(),
                max_entries
            );
        }
    }

    // For any parameter bag, key derivation is independent of insertion
    // order: the reversed-insertion map yields the same key.
    #[test]
    fn prop_key_order_independence(
        pairs in prop::collection::btree_map(param_name_strategy(), any::<i64>(), 1..8)
    ) {
        let forward: Map<String, Value> = pairs
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();
        let reversed: Map<String, Value> = pairs
            .iter()
            .rev()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();

        prop_assert_eq!(
            derive_key("/attendance", Some(&forward)),
            derive_key("/attendance", Some(&reversed))
        );
    }

    // For any stored keys, clearing an endpoint prefix removes exactly the
    // keys scoped under it.
    #[test]
    fn prop_prefix_invalidation_scope(
        hashes in prop::collection::hash_set("[a-f0-9]{8}", 1..10)
    ) {
        let mut store = CacheStore::new(1000);

        for hash in &hashes {
            store
                .set(format!("/finance/invoices:{}", hash), json!(1), TEST_TTL_MS, None)
                .unwrap();
            store
                .set(format!("/finance/reports:{}", hash), json!(2), TEST_TTL_MS, None)
                .unwrap();
        }

        let removed = store.clear_endpoint_prefix("/finance/invoices");

        prop_assert_eq!(removed, hashes.len());
        prop_assert_eq!(store.len(), hashes.len());
        for key in store.keys() {
            prop_assert!(key.starts_with("/finance/reports:"));
        }
    }
}
