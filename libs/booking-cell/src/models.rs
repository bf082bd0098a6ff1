use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use shared_models::appointment::AppointmentStatus;
use shared_storage::StorageError;

/// Why a booking or agenda mutation was refused. Each refusal maps to a
/// stable `kind` in the response body so the frontend can branch on it
/// without parsing messages.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("patient profile is incomplete")]
    ProfileIncomplete { missing: Vec<&'static str> },

    #[error("patient already has {current} active appointments")]
    QuotaExceeded { current: usize },

    #[error("slot is already taken")]
    SlotTaken,

    #[error("slot is not bookable: {0}")]
    ScheduleUnavailable(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("appointment not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let (status, kind, body) = match &self {
            BookingError::ProfileIncomplete { missing } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "profile_incomplete",
                json!({ "missingFields": missing }),
            ),
            BookingError::QuotaExceeded { current } => (
                StatusCode::CONFLICT,
                "quota_exceeded",
                json!({ "activeAppointments": current }),
            ),
            BookingError::SlotTaken => (StatusCode::CONFLICT, "slot_taken", json!({})),
            BookingError::ScheduleUnavailable(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "schedule_unavailable", json!({}))
            }
            BookingError::Validation(_) => (StatusCode::BAD_REQUEST, "validation", json!({})),
            BookingError::NotFound => (StatusCode::NOT_FOUND, "not_found", json!({})),
            BookingError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage", json!({}))
            }
        };

        tracing::error!("Booking error: {}: {}", status, self);

        let mut payload = json!({
            "error": self.to_string(),
            "kind": kind,
        });
        if let (Some(payload), Some(extra)) = (payload.as_object_mut(), body.as_object()) {
            for (key, value) in extra {
                payload.insert(key.clone(), value.clone());
            }
        }
        (status, Json(payload)).into_response()
    }
}

/// Body of `POST /bookings`. The slot is identified by doctor, date and
/// time; patient identity comes from the authenticated user plus the stored
/// profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSlotRequest {
    pub doctor: String,
    pub date: NaiveDate,
    pub time: String,
    /// Marks the patient as a returning visitor after a successful booking.
    #[serde(default)]
    pub repeat_visit: bool,
}

/// Staff request to overwrite an appointment's mutable fields: the slot,
/// the status, and the patient contact data written on the record. Absent
/// fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditAppointmentRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub patient_email: Option<String>,
    #[serde(default)]
    pub patient_phone: Option<String>,
    #[serde(default)]
    pub insurance: Option<String>,
}

/// Staff request to block a single slot so patients cannot book it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSlotRequest {
    pub doctor: String,
    pub date: NaiveDate,
    pub time: String,
}

/// Staff request to block or unblock every free slot of one day.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDayRequest {
    pub doctor: String,
    pub date: NaiveDate,
}
