//! TTL Policy Table
//!
//! Static mapping from endpoint-path prefixes to a time-to-live, scanned in a
//! fixed order with first-match semantics and a global default fallback.
//!
//! Durations are tiered by data volatility: near-static reference data
//! (academic years, class lists) lives for hours to a day, while frequently
//! mutated operational data (attendance, finance, activity feeds) lives for a
//! minute or two.

const SECOND_MS: u64 = 1_000;
const MINUTE_MS: u64 = 60 * SECOND_MS;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Fallback TTL when no rule matches.
const DEFAULT_TTL_MS: u64 = 5 * MINUTE_MS;

// == TTL Policy ==
/// Ordered `(path fragment, ttl)` table. Static for the process lifetime.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    rules: Vec<(&'static str, u64)>,
    default_ttl_ms: u64,
}

impl TtlPolicy {
    // == Constructor ==
    /// Creates a policy from an explicit rule table.
    ///
    /// Rules are scanned in the given order; the first rule whose fragment is
    /// contained in the endpoint wins, so more specific fragments must come
    /// before their parents (e.g. `/teachers/schemes` before `/teachers`).
    pub fn new(rules: Vec<(&'static str, u64)>, default_ttl_ms: u64) -> Self {
        Self {
            rules,
            default_ttl_ms,
        }
    }

    /// The standard table for the school administration API.
    pub fn school_defaults() -> Self {
        Self::new(
            vec![
                // Day-scale reference data
                ("/academic/years", DAY_MS),
                ("/academic/terms", DAY_MS),
                // Hour-scale, rarely edited
                ("/classes", 12 * HOUR_MS),
                ("/subjects", 12 * HOUR_MS),
                ("/fees/structures", HOUR_MS),
                ("/teachers/schemes", HOUR_MS),
                // Minute-scale operational data
                ("/teachers", 30 * MINUTE_MS),
                ("/students", 10 * MINUTE_MS),
                ("/assignments", 5 * MINUTE_MS),
                ("/dashboard", 2 * MINUTE_MS),
                ("/finance", 2 * MINUTE_MS),
                // Volatile feeds
                ("/attendance", MINUTE_MS),
                ("/activities", MINUTE_MS),
            ],
            DEFAULT_TTL_MS,
        )
    }

    // == Resolve ==
    /// Resolves the TTL for an endpoint in milliseconds.
    ///
    /// An explicit caller override always wins; otherwise the first matching
    /// rule applies, falling back to the table default.
    pub fn resolve(&self, endpoint: &str, override_ms: Option<u64>) -> u64 {
        if let Some(ttl) = override_ms {
            return ttl;
        }
        self.rules
            .iter()
            .find(|(fragment, _)| endpoint.contains(fragment))
            .map(|(_, ttl)| *ttl)
            .unwrap_or(self.default_ttl_ms)
    }

    /// The default TTL used when no rule matches.
    pub fn default_ttl_ms(&self) -> u64 {
        self.default_ttl_ms
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::school_defaults()
    }
}
