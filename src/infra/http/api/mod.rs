pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    routing::{delete, get},
};

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/markdown", get(handlers::render_markdown))
        .route("/api/readme", get(handlers::render_readme))
        .route("/api/cache", delete(handlers::invalidate_cache))
        .route("/api/cache/stats", get(handlers::cache_stats))
        .route("/_health", get(handlers::health))
        .fallback(handlers::not_found)
        .with_state(state)
}
