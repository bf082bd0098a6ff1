use std::sync::Arc;

use axum::{
    middleware,
    routing::{patch, post},
    Router,
};

use shared_utils::extractor::{auth_middleware, require_staff};
use shared_utils::state::AppState;

use crate::handlers;

pub fn booking_routes(state: Arc<AppState>) -> Router {
    // Any authenticated patient can book; everything else is staff-only.
    let patient_routes = Router::new()
        .route("/bookings", post(handlers::book_slot))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let staff_routes = Router::new()
        .route("/agenda/block", post(handlers::create_block))
        .route(
            "/agenda/appointments/{id}",
            patch(handlers::edit_appointment).delete(handlers::delete_appointment),
        )
        .route("/agenda/block-day", post(handlers::block_day))
        .route("/agenda/unblock-day", post(handlers::unblock_day))
        .layer(middleware::from_fn(require_staff))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(patient_routes)
        .merge(staff_routes)
        .with_state(state)
}
