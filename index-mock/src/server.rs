/// Axum HTTP server setup and routing

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::*;

pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow requests from wallet frontend/tests
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Index endpoints
        .route("/wallet/first-block", post(first_block))
        .route("/blocks/tip", get(get_tip))

        // Data fetcher endpoints
        .route("/fee-levels", get(get_fee_levels))
        .route("/rates", get(get_rates))
        .route("/rates-fallback", get(get_fallback_rates))

        // Mock helper endpoints
        .route("/mock/fixture", post(put_fixture))

        // Shared state
        .with_state(state)

        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(state: AppState, host: String, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("🚀 Index mock server listening on http://{}", addr);
    log::info!("🧪 Fixture endpoint: POST /mock/fixture");

    axum::serve(listener, app)
        .await?;

    Ok(())
}

/// Serve `state` on an ephemeral localhost port in a background task
pub async fn spawn_server(state: Arc<MockState>) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = create_router(state);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            log::error!("Index mock server stopped: {}", e);
        }
    });

    log::debug!("Index mock server spawned on http://{}", addr);
    Ok(addr)
}
