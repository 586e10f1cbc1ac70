//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::backing::MockDb;
use crate::cache::{Cache, MAX_KEY_LENGTH};
use crate::error::{CacheError, Result};
use crate::models::{GetResponse, HealthResponse, StatsResponse};

/// Application state shared across all handlers.
///
/// `Cache` is internally reference counted, so cloning the state is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Read-through cache in front of the database
    pub cache: Cache<MockDb>,
    /// How long a request waits on a load before giving up
    pub load_timeout: Duration,
}

impl AppState {
    /// Creates a new AppState with the given cache.
    pub fn new(cache: Cache<MockDb>, load_timeout: Duration) -> Self {
        Self {
            cache,
            load_timeout,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the mock database and cache with parameters from the Config.
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        let db = MockDb::new(config.db_latency());
        let cache = Cache::new(db, config.capacity)?;
        Ok(Self::new(cache, config.load_timeout()))
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Handler for GET /get/:key
///
/// Returns the cached value, loading it from the database on a miss.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    validate_key(&key)?;

    let value = state.cache.get_with_timeout(&key, state.load_timeout).await?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for GET /get/
///
/// `/get/:key` never matches an empty segment, so the empty key gets its
/// own route and the same validation.
pub async fn empty_key_handler(State(state): State<AppState>) -> Result<Json<GetResponse>> {
    get_handler(State(state), Path(String::new())).await
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats().await;

    Json(StatsResponse::new(&stats, state.cache.in_flight()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
