use axum::{routing::get, Router};

use crate::handler::{self, AppState};

/// Build the axum router with all node endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/object/:key", get(handler::object_handler))
        .route("/v1/statement/:id", get(handler::statement_handler))
        .with_state(state)
}
