use std::sync::Arc;

use axum::{routing::get, Router};

use booking_cell::router::booking_routes;
use patient_cell::router::patient_routes;
use schedule_cell::router::schedule_routes;
use shared_utils::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Delgado scheduling API is running!" }))
        .merge(schedule_routes(state.clone()))
        .merge(booking_routes(state.clone()))
        .merge(patient_routes(state))
}
