pub mod health;

use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Router};

use crate::documents::handlers as documents;
use crate::refinement::handlers as refinement;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/applications",
            post(refinement::handle_create_application),
        )
        .route("/api/v1/render", post(documents::handle_render))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
