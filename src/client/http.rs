//! HTTP Client Wrapper
//!
//! Wraps outgoing requests to the school administration API. GET requests
//! consult the injected cache store before hitting the network and write
//! successful responses through; mutating verbs always hit the network and
//! invalidate related cache entries afterwards.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{CacheStore, EntryMetadata};
use crate::client::invalidate::apply_mutation_invalidation;
use crate::error::ClientError;
use crate::key::derive_key;
use crate::policy::TtlPolicy;

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

// == Cache Options ==
/// Per-request cache-control options.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Overrides the policy-table TTL for this request (milliseconds)
    pub ttl_ms: Option<u64>,
    /// Bypass the cache read; the response is still written through
    pub force_refresh: bool,
    /// Run the invalidation cascade after a successful mutation
    pub invalidate_on_write: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl_ms: None,
            force_refresh: false,
            invalidate_on_write: true,
        }
    }
}

// == Cached Response ==
/// A decoded response tagged with its origin.
#[derive(Debug, Clone)]
pub struct CachedResponse<T> {
    pub data: T,
    /// True when served from the cache store without a network call
    pub from_cache: bool,
}

// == API Client ==
/// Caching HTTP client for the school administration API.
///
/// The cache store is injected at construction time and shared with the
/// background maintenance tasks; there is no hidden global state. Clone is
/// cheap - reqwest::Client and the store handle are both reference counted.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    cache: Arc<RwLock<CacheStore>>,
    policy: TtlPolicy,
    token: Option<String>,
    /// Persisted session state removed on the 401 path, when configured
    session_path: Option<PathBuf>,
}

impl ApiClient {
    // == Constructor ==
    /// Creates a client against `base_url` using the given cache store.
    pub fn new(
        base_url: impl Into<String>,
        cache: Arc<RwLock<CacheStore>>,
    ) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache,
            policy: TtlPolicy::school_defaults(),
            token: None,
            session_path: None,
        })
    }

    /// Replaces the TTL policy table.
    pub fn with_policy(mut self, policy: TtlPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the bearer token for authenticated requests.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the persisted session file cleared on the 401 path.
    pub fn with_session_path(mut self, path: PathBuf) -> Self {
        self.session_path = Some(path);
        self
    }

    /// The injected cache store handle.
    pub fn cache(&self) -> Arc<RwLock<CacheStore>> {
        self.cache.clone()
    }

    // == GET ==
    /// Fetches `endpoint`, serving from cache when possible.
    ///
    /// On a cache hit the response is tagged `from_cache = true` and no
    /// network call is made. On a miss (or with `force_refresh`) exactly one
    /// network call is issued and a successful response is written through
    /// with the policy-resolved TTL (the request-level override wins).
    ///
    /// Concurrent GETs for the same key are not deduplicated: each proceeds
    /// independently and each writes through on completion.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Option<&Map<String, Value>>,
        opts: &CacheOptions,
    ) -> Result<CachedResponse<T>, ClientError> {
        let key = derive_key(endpoint, params);

        if !opts.force_refresh {
            let cached = {
                let mut cache = self.cache.write().await;
                cache.get(&key)
            };
            if let Some(value) = cached {
                debug!(%key, "Serving GET from cache");
                return Ok(CachedResponse {
                    data: serde_json::from_value(value)?,
                    from_cache: true,
                });
            }
        }

        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self.http.get(&url);
        if let Some(p) = params {
            request = request.query(&query_pairs(p));
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();

        if status == 401 {
            self.handle_unauthorized().await;
            return Err(ClientError::Unauthorized);
        }
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status, &body));
        }

        let value: Value = response.json().await?;
        let ttl = self.policy.resolve(endpoint, opts.ttl_ms);
        let metadata = EntryMetadata {
            source_url: url,
            params: params.map(|p| Value::Object(p.clone())),
            entity_tag: None,
        };

        {
            let mut cache = self.cache.write().await;
            if let Err(e) = cache.set(key.clone(), value.clone(), ttl, Some(metadata)) {
                // A write-through failure degrades caching, not the request
                warn!(%key, error = %e, "Failed to write response through to cache");
            }
        }

        Ok(CachedResponse {
            data: serde_json::from_value(value)?,
            from_cache: false,
        })
    }

    // == Mutations ==
    /// POST to `endpoint`; never served from cache.
    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &(impl Serialize + ?Sized),
        opts: &CacheOptions,
    ) -> Result<T, ClientError> {
        self.mutate(Method::POST, endpoint, Some(body), opts).await
    }

    /// PUT to `endpoint`; never served from cache.
    pub async fn put<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &(impl Serialize + ?Sized),
        opts: &CacheOptions,
    ) -> Result<T, ClientError> {
        self.mutate(Method::PUT, endpoint, Some(body), opts).await
    }

    /// DELETE `endpoint`; never served from cache.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        opts: &CacheOptions,
    ) -> Result<T, ClientError> {
        self.mutate::<T, Value>(Method::DELETE, endpoint, None, opts)
            .await
    }

    /// Shared mutation path: network first, invalidation only after a
    /// confirmed successful response. A failed mutation leaves the cache
    /// untouched.
    async fn mutate<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        opts: &CacheOptions,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(b) = body {
            request = request.json(b);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();

        if status == 401 {
            self.handle_unauthorized().await;
            return Err(ClientError::Unauthorized);
        }
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status, &body));
        }

        // Invalidation completes before this call returns, so a read issued
        // after the mutation resolves sees no stale data for these scopes.
        if opts.invalidate_on_write {
            let mut cache = self.cache.write().await;
            let removed = apply_mutation_invalidation(&mut cache, endpoint);
            debug!(%method, endpoint, removed, "Invalidated after mutation");
        }

        let text = response.text().await?;
        let value: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok(serde_json::from_value(value)?)
    }

    // == 401 Path ==
    /// One-shot terminal failure path for a rejected session: clear the
    /// whole cache store and the persisted session state. No retry; the
    /// caller receives `ClientError::Unauthorized` and owns the redirect to
    /// the login boundary.
    async fn handle_unauthorized(&self) {
        warn!("Received 401, clearing cache and session state");
        {
            let mut cache = self.cache.write().await;
            cache.clear();
        }
        if let Some(path) = &self.session_path {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "Failed to remove session file");
                }
            }
        }
    }
}

/// Flattens a parameter bag into query pairs, dropping nulls and stripping
/// the JSON quoting from string values.
fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let rendered = match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_string(),
            };
            (k.clone(), rendered)
        })
        .collect()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_client() -> ApiClient {
        let cache = Arc::new(RwLock::new(CacheStore::new(100)));
        ApiClient::new("http://localhost:9/api/", cache).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = test_client();
        assert_eq!(client.base_url, "http://localhost:9/api");
    }

    #[test]
    fn test_query_pairs_drop_nulls_and_unquote_strings() {
        let mut params = Map::new();
        params.insert("term".to_string(), json!("spring"));
        params.insert("year".to_string(), json!(2026));
        params.insert("week".to_string(), Value::Null);

        let mut pairs = query_pairs(&params);
        pairs.sort();

        assert_eq!(
            pairs,
            vec![
                ("term".to_string(), "spring".to_string()),
                ("year".to_string(), "2026".to_string()),
            ]
        );
    }

    #[test]
    fn test_cache_options_defaults() {
        let opts = CacheOptions::default();
        assert!(opts.ttl_ms.is_none());
        assert!(!opts.force_refresh);
        assert!(opts.invalidate_on_write);
    }
}
