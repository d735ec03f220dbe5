//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror. `CacheError` covers the
//! in-memory store, `ClientError` is the normalized error surface the HTTP
//! client wrapper exposes to calling code.

use serde_json::Value;
use thiserror::Error;

// == Cache Error Enum ==
/// Errors raised by the in-memory cache store.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key failed validation (empty or too long)
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

/// Convenience Result type for store operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Maximum length for upstream error bodies kept in error messages.
const MAX_ERROR_BODY_LENGTH: usize = 500;

// == Client Error Enum ==
/// Normalized error surface of the HTTP client wrapper.
///
/// Upstream 4xx/5xx responses become `Http` with the status and any decoded
/// body; a 401 becomes `Unauthorized` after the one-shot cache-wipe path has
/// run. Transport failures (no response at all) become `Network`.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network unreachable or transport-level failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Session rejected; local cache and session state have been cleared
    #[error("Unauthorized - session is no longer valid")]
    Unauthorized,

    /// Upstream responded with a non-success status
    #[error("Request failed with status {status}: {message}")]
    Http {
        status: u16,
        message: String,
        /// Decoded response body, when the upstream sent JSON
        data: Option<Value>,
    },

    /// Response body could not be decoded into the requested type
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store-level failure (invalid derived key)
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ClientError {
    /// Truncate a response body to avoid carrying excessive data in errors.
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    /// Builds the normalized error for a non-success upstream status.
    ///
    /// Note: 401 is handled by the caller's wipe path before this is reached;
    /// when it does arrive here it still reports as an auth error.
    pub fn from_status(status: u16, body: &str) -> Self {
        let data = serde_json::from_str::<Value>(body).ok();
        let message = data
            .as_ref()
            .and_then(|v| v.get("message").or_else(|| v.get("error")))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| Self::truncate_body(body));
        ClientError::Http {
            status,
            message,
            data,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Unauthorized => Some(401),
            _ => None,
        }
    }

    /// True for 401/403 responses and the post-wipe unauthorized signal.
    pub fn is_auth_error(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// True for 400/422 validation failures.
    pub fn is_validation_error(&self) -> bool {
        matches!(self.status(), Some(400) | Some(422))
    }

    /// True for 5xx upstream failures.
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(s) if s >= 500)
    }

    /// True when no response was received at all.
    pub fn is_network_error(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }
}
