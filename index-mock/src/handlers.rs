/// Axum HTTP handlers for the index, fee and rate endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::types::*;

/// Fixture plus a log of index requests, shared by all handlers
#[derive(Default)]
pub struct MockState {
    fixture: RwLock<Fixture>,
    requests: RwLock<Vec<FirstBlockRequest>>,
}

impl MockState {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture: RwLock::new(fixture),
            requests: RwLock::new(Vec::new()),
        }
    }

    pub async fn set_fixture(&self, fixture: Fixture) {
        *self.fixture.write().await = fixture;
    }

    /// Every /wallet/first-block body received so far
    pub async fn requests(&self) -> Vec<FirstBlockRequest> {
        self.requests.read().await.clone()
    }

    async fn delay(&self) {
        let delay_ms = self.fixture.read().await.delay_ms;
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}

/// Shared application state
pub type AppState = Arc<MockState>;

/// Custom error type for handlers
pub enum ApiError {
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, message).into_response()
    }
}

/// POST /wallet/first-block
/// Returns blocks touching the requested addresses, and the tip if asked for
/// and nothing matched
pub async fn first_block(
    State(state): State<AppState>,
    Json(req): Json<FirstBlockRequest>,
) -> Result<Json<FirstBlockResponse>, ApiError> {
    state.delay().await;
    state.requests.write().await.push(req.clone());

    let fixture = state.fixture.read().await;
    if fixture.fail_first_block {
        return Err(ApiError::Internal("index backend unavailable".to_string()));
    }

    let blocks = fixture.blocks_for(&req.addresses);
    log::info!(
        "first-block: {} addresses, {} matching blocks",
        req.addresses.len(),
        blocks.len()
    );

    let best_block = if blocks.is_empty() && req.best_block_fallback && fixture.inline_best_block {
        fixture.tip.clone()
    } else {
        None
    };

    Ok(Json(FirstBlockResponse { blocks, best_block }))
}

/// GET /blocks/tip
/// Returns the current chain tip
pub async fn get_tip(State(state): State<AppState>) -> Result<Json<BlockRef>, ApiError> {
    state.delay().await;
    state
        .fixture
        .read()
        .await
        .tip
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no tip configured".to_string()))
}

/// GET /fee-levels
pub async fn get_fee_levels(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.delay().await;
    state
        .fixture
        .read()
        .await
        .fee_levels
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::Unavailable("fee levels unavailable".to_string()))
}

/// GET /rates
pub async fn get_rates(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    state.delay().await;
    state
        .fixture
        .read()
        .await
        .rates
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::Unavailable("rates unavailable".to_string()))
}

/// GET /rates-fallback
pub async fn get_fallback_rates(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.delay().await;
    state
        .fixture
        .read()
        .await
        .fallback_rates
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::Unavailable("fallback rates unavailable".to_string()))
}

// ============================================================================
// MOCK HELPER ENDPOINTS (not part of the index API)
// ============================================================================

/// POST /mock/fixture
/// Replace the served fixture
pub async fn put_fixture(
    State(state): State<AppState>,
    Json(fixture): Json<Fixture>,
) -> StatusCode {
    log::info!("Fixture replaced ({} addresses with history)", fixture.history.len());
    state.set_fixture(fixture).await;
    StatusCode::NO_CONTENT
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}
