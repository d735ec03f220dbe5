//! Network-Boundary Worker
//!
//! The service-worker-equivalent: intercepts every outgoing GET and applies a
//! per-route-class caching strategy. Static assets and images are served
//! cache-first from separate buckets; whitelisted API routes go network-first
//! with a stamped cached fallback, served even when stale (with a marker)
//! because stale data beats no data when offline.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cache::current_timestamp_ms;
use crate::worker::buckets::{BucketKind, BucketStore};
use crate::worker::request::{
    Destination, FetchError, Fetcher, WorkerRequest, WorkerResponse, SW_CACHE_STALE,
    SW_CACHE_TIMESTAMP,
};
use crate::worker::routes::{api_whitelist, is_static_asset, match_api_route, ApiRoute};

// == Lifecycle State ==
/// Install/activate progression. `install` skips the waiting phase on
/// purpose so a new version takes effect without all pages closing first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installed,
    Active,
}

// == Network Worker ==
/// Owns the response buckets and the route tables; runs inside its own task
/// with no memory shared with the page side.
pub struct NetworkWorker {
    fetcher: Arc<dyn Fetcher>,
    buckets: BucketStore,
    routes: Vec<ApiRoute>,
    state: LifecycleState,
}

impl NetworkWorker {
    // == Constructor ==
    /// Opens the bucket directory and prepares the route tables.
    pub fn new(fetcher: Arc<dyn Fetcher>, bucket_dir: &Path) -> Result<Self> {
        Ok(Self {
            fetcher,
            buckets: BucketStore::open(bucket_dir)?,
            routes: api_whitelist(),
            state: LifecycleState::Installed,
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    // == Install ==
    /// Pre-populates the static bucket from the fixed asset list, then
    /// immediately proceeds to activation (skip-waiting semantics).
    ///
    /// Individual asset failures are logged and skipped; install itself is
    /// best-effort.
    pub async fn install(&mut self, base_url: &str) {
        info!(assets = crate::worker::routes::STATIC_ASSETS.len(), "Worker installing");
        for asset in crate::worker::routes::STATIC_ASSETS {
            let request = WorkerRequest::get(format!("{}{}", base_url, asset));
            match self.fetcher.fetch(&request).await {
                Ok(resp) if resp.is_success() => {
                    let stamped = resp
                        .with_header(SW_CACHE_TIMESTAMP, current_timestamp_ms().to_string());
                    if let Err(e) =
                        self.buckets
                            .put(BucketKind::Static, request.bucket_key(), stamped)
                    {
                        warn!(asset, error = %e, "Failed to persist pre-cached asset");
                    }
                }
                Ok(resp) => {
                    debug!(asset, status = resp.status, "Skipping asset during install");
                }
                Err(e) => {
                    debug!(asset, error = %e, "Asset unreachable during install");
                }
            }
        }
        self.activate();
    }

    // == Activate ==
    /// Deletes buckets left behind by previous versions and takes control.
    pub fn activate(&mut self) {
        match self.buckets.remove_stale_versions() {
            Ok(removed) if removed > 0 => info!(removed, "Removed stale bucket versions"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to clean stale bucket versions"),
        }
        self.state = LifecycleState::Active;
        info!("Worker active");
    }

    // == Clear ==
    /// Wipes every bucket. Used by the CLEAR_CACHE control message.
    pub fn clear_all_buckets(&mut self) -> bool {
        match self.buckets.wipe_all() {
            Ok(()) => {
                info!("All worker buckets cleared");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear worker buckets");
                false
            }
        }
    }

    // == Fetch Dispatch ==
    /// Routes an intercepted request to its strategy.
    ///
    /// Non-GET requests pass through untouched (transport errors propagate).
    /// Every GET path resolves to a response: cached, fetched, or a
    /// synthetic offline body - never a raw error.
    pub async fn handle_fetch(
        &mut self,
        request: &WorkerRequest,
    ) -> Result<WorkerResponse, FetchError> {
        if request.method != "GET" {
            return self.fetcher.fetch(request).await;
        }

        if request.destination == Destination::Image {
            return Ok(self.cache_first(BucketKind::Images, request).await);
        }

        let path = request.path().to_string();
        if is_static_asset(&path) {
            return Ok(self.cache_first(BucketKind::Static, request).await);
        }

        if let Some(route) = match_api_route(&self.routes, &path) {
            let max_age_ms = route.max_age_ms;
            return Ok(self.network_first(request, max_age_ms).await);
        }

        // Not cacheable at this layer: plain fetch, offline body on failure
        match self.fetcher.fetch(request).await {
            Ok(resp) => Ok(resp),
            Err(e) => {
                debug!(url = %request.url, error = %e, "Uncached route offline");
                Ok(WorkerResponse::offline_error("Network error"))
            }
        }
    }

    // == Cache-First Strategy ==
    /// Serve from the bucket; on miss fetch and store successful responses.
    /// Total failure (no network, no entry) yields an empty 404.
    ///
    /// Bucket hits are served without the internal stamp so the header
    /// surface matches a response that came straight from the network.
    async fn cache_first(&mut self, kind: BucketKind, request: &WorkerRequest) -> WorkerResponse {
        let key = request.bucket_key();

        if let Some(hit) = self.buckets.get(kind, &key) {
            debug!(%key, ?kind, "Cache-first hit");
            return hit.clone().without_header(SW_CACHE_TIMESTAMP);
        }

        match self.fetcher.fetch(request).await {
            Ok(resp) if resp.is_success() => {
                let stamped = resp
                    .clone()
                    .with_header(SW_CACHE_TIMESTAMP, current_timestamp_ms().to_string());
                if let Err(e) = self.buckets.put(kind, key, stamped) {
                    warn!(error = %e, "Failed to store cache-first response");
                }
                resp
            }
            Ok(resp) => resp,
            Err(e) => {
                debug!(url = %request.url, error = %e, "Cache-first total failure");
                WorkerResponse::empty_not_found()
            }
        }
    }

    // == Network-First Strategy ==
    /// Fetch; on success store a stamped clone and return the unstamped
    /// original. On failure (or a non-OK response) fall back to the stamped
    /// cached copy, marking it stale when older than the route's window; no
    /// copy at all yields the synthetic offline 503.
    async fn network_first(&mut self, request: &WorkerRequest, max_age_ms: u64) -> WorkerResponse {
        let key = request.bucket_key();

        match self.fetcher.fetch(request).await {
            Ok(resp) if resp.is_success() => {
                let stamped = resp
                    .clone()
                    .with_header(SW_CACHE_TIMESTAMP, current_timestamp_ms().to_string());
                if let Err(e) = self.buckets.put(BucketKind::Api, key, stamped) {
                    warn!(error = %e, "Failed to store network-first response");
                }
                resp
            }
            _ => self.serve_fallback(&key, max_age_ms),
        }
    }

    fn serve_fallback(&self, key: &str, max_age_ms: u64) -> WorkerResponse {
        match self.buckets.get(BucketKind::Api, key) {
            Some(cached) => {
                let mut response = cached.clone();
                let cached_at: u64 = response
                    .header(SW_CACHE_TIMESTAMP)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                let age = current_timestamp_ms().saturating_sub(cached_at);
                if age > max_age_ms {
                    debug!(%key, age_ms = age, "Serving stale cached fallback");
                    response = response.with_header(SW_CACHE_STALE, "true");
                }
                response
            }
            None => WorkerResponse::offline_error("No cached data available"),
        }
    }
}
