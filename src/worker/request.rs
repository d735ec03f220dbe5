//! Worker Request/Response Types
//!
//! The intercepted-fetch protocol spoken between the page side and the
//! network-boundary worker, plus the `Fetcher` seam to the real network.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Header injected on stored responses carrying the cache time (unix ms).
pub const SW_CACHE_TIMESTAMP: &str = "sw-cache-timestamp";

/// Header flagging a fallback response older than its staleness window.
pub const SW_CACHE_STALE: &str = "sw-cache-stale";

// == Destination ==
/// What kind of resource a request is for, mirroring the fetch destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Other,
}

// == Worker Request ==
/// An outgoing request as seen by the worker.
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub method: String,
    pub url: String,
    pub destination: Destination,
}

impl WorkerRequest {
    /// A plain GET for a document/API resource.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            destination: Destination::Other,
        }
    }

    /// A GET with an explicit destination.
    pub fn get_with_destination(url: impl Into<String>, destination: Destination) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            destination,
        }
    }

    /// A non-GET request (passed through untouched by the worker).
    pub fn with_method(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            destination: Destination::Other,
        }
    }

    /// The path component of the URL (the URL itself when it is already a
    /// bare path).
    pub fn path(&self) -> &str {
        match self.url.find("://") {
            Some(scheme_end) => {
                let rest = &self.url[scheme_end + 3..];
                match rest.find('/') {
                    Some(idx) => &rest[idx..],
                    None => "/",
                }
            }
            None => &self.url,
        }
    }

    /// The bucket key for this request: method + URL, GET only by callers.
    pub fn bucket_key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

// == Worker Response ==
/// An HTTP-level response held by or passing through the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl WorkerResponse {
    /// A successful response with raw bytes.
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body,
        }
    }

    /// A JSON response with the given status.
    pub fn json(status: u16, value: &Value) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Self {
            status,
            headers,
            body: serde_json::to_vec(value).unwrap_or_default(),
        }
    }

    /// The empty 404-style response returned when a cache-first route has
    /// neither network nor a cached entry.
    pub fn empty_not_found() -> Self {
        Self {
            status: 404,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// The synthetic 503 offline body.
    pub fn offline_error(message: &str) -> Self {
        Self::json(503, &json!({ "error": message, "offline": true }))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a copy with the header set (builder style, used for stamping).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    /// Returns a copy with the header removed, case-insensitively.
    pub fn without_header(mut self, name: &str) -> Self {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
        self
    }

    /// Decodes the body as JSON, if it is JSON.
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

// == Fetch Error ==
/// Failures at the network boundary.
#[derive(Error, Debug)]
pub enum FetchError {
    /// No response at all (offline, DNS, refused connection)
    #[error("Network unreachable: {0}")]
    Unreachable(String),

    /// The worker task is gone and cannot answer
    #[error("Worker unavailable")]
    WorkerUnavailable,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Unreachable(e.to_string())
    }
}

// == Fetcher ==
/// The worker's seam to the real network; swapped for a fake in tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, FetchError>;
}

// == HTTP Fetcher ==
/// Production fetcher backed by reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, FetchError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| FetchError::Unreachable(format!("invalid method: {e}")))?;

        let response = self.client.request(method, &request.url).send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(WorkerResponse {
            status,
            headers,
            body,
        })
    }
}
