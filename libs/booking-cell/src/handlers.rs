use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Local;
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_utils::state::AppState;

use crate::models::{BlockDayRequest, BlockSlotRequest, BookSlotRequest, BookingError, EditAppointmentRequest};
use crate::services::agenda::AgendaService;
use crate::services::booking::BookingService;
use crate::services::notify::{EmailJsNotifier, NoopNotifier, NotificationSender};

fn notifier(state: &AppState) -> Arc<dyn NotificationSender> {
    if state.config.is_mail_configured() {
        Arc::new(EmailJsNotifier::new(&state.config))
    } else {
        Arc::new(NoopNotifier)
    }
}

#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookSlotRequest>,
) -> Result<(StatusCode, Json<Value>), BookingError> {
    let today = Local::now().date_naive();
    let service = BookingService::new(Arc::clone(&state.store), notifier(&state));
    let appointment = service.book(&user, &request, today).await?;

    Ok((StatusCode::CREATED, Json(json!({ "appointment": appointment }))))
}

#[axum::debug_handler]
pub async fn create_block(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BlockSlotRequest>,
) -> Result<(StatusCode, Json<Value>), BookingError> {
    let today = Local::now().date_naive();
    let service = AgendaService::new(Arc::clone(&state.store));
    let block = service.create_block(&request, today).await?;

    Ok((StatusCode::CREATED, Json(json!({ "appointment": block }))))
}

#[axum::debug_handler]
pub async fn edit_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<EditAppointmentRequest>,
) -> Result<Json<Value>, BookingError> {
    let today = Local::now().date_naive();
    let service = AgendaService::new(Arc::clone(&state.store));
    let appointment = service.edit_appointment(&id, &request, today).await?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, BookingError> {
    let service = AgendaService::new(Arc::clone(&state.store));
    service.delete_appointment(&id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn block_day(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BlockDayRequest>,
) -> Result<Json<Value>, BookingError> {
    let today = Local::now().date_naive();
    let service = AgendaService::new(Arc::clone(&state.store));
    let blocked = service.bulk_block_day(&request, today).await?;

    Ok(Json(json!({ "blocked": blocked })))
}

#[axum::debug_handler]
pub async fn unblock_day(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BlockDayRequest>,
) -> Result<Json<Value>, BookingError> {
    let service = AgendaService::new(Arc::clone(&state.store));
    let removed = service.bulk_unblock_day(&request).await?;

    Ok(Json(json!({ "unblocked": removed })))
}
