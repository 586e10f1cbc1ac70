//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Load Error ==
/// Failure reported by a backing store for a single key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct LoadError(pub String);

impl LoadError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// `Clone` is required: a single load outcome is delivered to every caller
/// that was deduplicated onto it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Backing store failed to produce a value
    #[error("Load failed for key '{key}': {reason}")]
    Load { key: String, reason: String },

    /// Invalid construction parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller deadline elapsed while waiting on a load
    #[error("Timed out after {after_ms}ms waiting for key '{key}'")]
    Timeout { key: String, after_ms: u64 },

    /// The load task went away without producing a result
    #[error("Load abandoned for key '{0}'")]
    LoadAbandoned(String),

    /// Key rejected before reaching the cache
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl CacheError {
    /// Wraps a backing store failure for `key`.
    pub fn load(key: impl Into<String>, err: LoadError) -> Self {
        CacheError::Load {
            key: key.into(),
            reason: err.0,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Load { .. } => StatusCode::BAD_GATEWAY,
            CacheError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            CacheError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            CacheError::Configuration(_) | CacheError::LoadAbandoned(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
