use std::sync::Arc;

use axum::{
    middleware,
    routing::get,
    Router,
};

use shared_utils::extractor::{auth_middleware, require_staff};
use shared_utils::state::AppState;

use crate::handlers;

pub fn schedule_routes(state: Arc<AppState>) -> Router {
    // The weekly view backs the public booking page; no authentication.
    let public_routes = Router::new().route(
        "/availability/{doctor_id}/week",
        get(handlers::week_availability),
    );

    // Daily agenda and schedule management are staff-only.
    let staff_routes = Router::new()
        .route("/availability/{doctor_id}/day", get(handlers::day_agenda))
        .route(
            "/schedule/{doctor_id}",
            get(handlers::get_schedule).put(handlers::update_schedule),
        )
        .layer(middleware::from_fn(require_staff))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(staff_routes)
        .with_state(state)
}
