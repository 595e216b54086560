//! Router setup with all API routes and middleware.

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use plogger_core::config::PloggerConfig;
use plogger_core::error::PloggerError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
///
/// CORS is fully permissive: the browser client is served from arbitrary
/// origins.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;

    let flow_routes = Router::new()
        .route("/location/extract", post(handlers::extract_location))
        .route("/recommend/place", post(handlers::recommend_place))
        .route("/chat/image", post(handlers::image_chat))
        .route("/evaluate/trashbag", post(handlers::evaluate_trashbag))
        .route("/location/trashRAG", post(handlers::trash_locations));

    let session_routes = Router::new()
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/{id}/history",
            get(handlers::get_history).delete(handlers::clear_history),
        );

    Router::new()
        .route("/", get(handlers::root))
        .merge(flow_routes)
        .merge(session_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve on `server.host:server.port` until `shutdown` resolves.
pub async fn start_server<F>(
    config: &PloggerConfig,
    state: AppState,
    shutdown: F,
) -> Result<(), PloggerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PloggerError::Server(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| PloggerError::Server(format!("Server error: {}", e)))?;

    Ok(())
}
