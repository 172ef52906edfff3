use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::frontend;
use super::handlers;
use super::AppState;

/// Multipart framing on top of the file itself.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let v1 = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/extract", post(handlers::extract_document))
        .layer(DefaultBodyLimit::max(
            state.config.server.max_upload_bytes + BODY_LIMIT_SLACK,
        ));

    Router::new()
        .route("/", get(frontend::serve_root))
        .nest("/api/v1", v1)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
