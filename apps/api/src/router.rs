use std::sync::Arc;

use axum::{routing::get, Router};

use queue_cell::{create_queue_router, EngineState};

pub fn create_router(state: Arc<EngineState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic queue API is running!" }))
        .nest("/api/v1/queue", create_queue_router(state))
}
