mod error;
mod handlers;
mod state;
mod views;

use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{EMPTY_QUERY_TOPIC, IMAGE_SEARCH_TITLE, RANDOM_FALLBACK_TOPIC};
pub use state::AppState;

/// Largest accepted search form, image upload included.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route(
            "/search",
            post(handlers::search).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/wiki/{topic}", get(handlers::wiki))
        .route("/article/{id}", get(handlers::article))
        .route("/report/{id}", post(handlers::report))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
