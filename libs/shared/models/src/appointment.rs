use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the `appointments` collection. Field names follow the stored
/// document shape (camelCase), dates are local-naive `YYYY-MM-DD`, times are
/// `HH:MM` at slot granularity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub doctor: String,
    pub date: NaiveDate,
    pub time: String,
    #[serde(default)]
    pub status: AppointmentStatus,
    pub patient_name: String,
    #[serde(default)]
    pub patient_email: Option<String>,
    #[serde(default)]
    pub patient_phone: Option<String>,
    #[serde(default)]
    pub insurance: Option<String>,
    #[serde(default)]
    pub patient_uid: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Whether this row occupies its slot. Cancelled rows never block a
    /// slot; attended rows are kept for history but still hold their slot.
    pub fn occupies_slot(&self) -> bool {
        matches!(
            self.status,
            AppointmentStatus::Confirmed | AppointmentStatus::Blocked
        )
    }

    /// Active from the patient quota's point of view: neither cancelled nor
    /// already attended.
    pub fn counts_against_quota(&self) -> bool {
        !matches!(
            self.status,
            AppointmentStatus::Cancelled | AppointmentStatus::Attended
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Confirmed,
    Blocked,
    Cancelled,
    Attended,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Blocked => "blocked",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Attended => "attended",
        };
        write!(f, "{}", s)
    }
}

/// Display names for the practice's two doctors, used by agenda labels and
/// the confirmation mail.
pub fn doctor_display_name(doctor_id: &str) -> &str {
    match doctor_id {
        "secondi" => "Dra. Secondi",
        "capparelli" => "Dr. Capparelli",
        other => other,
    }
}

pub fn is_known_doctor(doctor_id: &str) -> bool {
    matches!(doctor_id, "secondi" | "capparelli")
}
