use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_models::appointment::is_known_doctor;
use shared_models::error::AppError;
use shared_utils::state::AppState;

use crate::models::{ScheduleError, UpdateScheduleRequest};
use crate::services::availability::AvailabilityService;
use crate::services::schedule::ScheduleService;
use crate::services::slots::format_slot;

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    /// Any date inside the requested week; defaults to the current week.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: NaiveDate,
}

impl From<ScheduleError> for AppError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::Validation(msg) => AppError::ValidationError(msg),
            ScheduleError::Storage(e) => AppError::Storage(e.to_string()),
        }
    }
}

fn check_doctor(doctor_id: &str) -> Result<(), AppError> {
    if !is_known_doctor(doctor_id) {
        return Err(AppError::NotFound(format!("Unknown doctor: {}", doctor_id)));
    }
    Ok(())
}

#[axum::debug_handler]
pub async fn week_availability(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<Value>, AppError> {
    check_doctor(&doctor_id)?;

    let today = Local::now().date_naive();
    let reference = query.date.unwrap_or(today);

    let service = AvailabilityService::new(Arc::clone(&state.store));
    let days = service.week_availability(&doctor_id, reference, today).await?;

    Ok(Json(json!({
        "doctor": doctor_id,
        "weekStart": AvailabilityService::week_start(reference),
        "days": days,
    })))
}

#[axum::debug_handler]
pub async fn day_agenda(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Value>, AppError> {
    check_doctor(&doctor_id)?;

    let today = Local::now().date_naive();
    let service = AvailabilityService::new(Arc::clone(&state.store));
    let agenda = service.day_agenda(&doctor_id, query.date, today).await?;

    Ok(Json(json!(agenda)))
}

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    check_doctor(&doctor_id)?;

    let service = ScheduleService::new(Arc::clone(&state.store));
    let resolved = service.resolve(&doctor_id).await;

    Ok(Json(resolved_to_json(&doctor_id, &resolved)))
}

#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    check_doctor(&doctor_id)?;

    let service = ScheduleService::new(Arc::clone(&state.store));
    let resolved = service.save(&doctor_id, request).await?;

    Ok(Json(resolved_to_json(&doctor_id, &resolved)))
}

fn resolved_to_json(doctor_id: &str, resolved: &crate::models::ResolvedSchedule) -> Value {
    let schedule: serde_json::Map<String, Value> = resolved
        .rules
        .iter()
        .enumerate()
        .map(|(day, rule)| {
            (
                day.to_string(),
                json!({
                    "active": rule.active,
                    "start": format_slot(rule.start),
                    "end": format_slot(rule.end),
                }),
            )
        })
        .collect();

    json!({
        "doctor": doctor_id,
        "schedule": schedule,
        "slotMinutes": resolved.slot_minutes,
        "maxBookingDays": resolved.max_booking_days,
    })
}
