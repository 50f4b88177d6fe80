pub mod batch;

use axum::{
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};

use crate::state::{AppState, HealthResponse};

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/options", get(batch::get_options))
        .route("/batch", get(batch::get_batch))
        .route("/batch/load", post(batch::load))
        .route("/batch/start", post(batch::start))
        .route("/batch/cancel/current", post(batch::cancel_current))
        .route("/batch/cancel/all", post(batch::cancel_all))
        .route("/batch/pending/remove", post(batch::remove_many))
        .route("/batch/pending/:artist/:album", delete(batch::remove_one))
        .route("/batch/gaps", post(batch::set_gap))
        .route("/batch/gaps/all", post(batch::set_all_gaps))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}
