use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::appointment::Appointment;
use shared_storage::StorageError;

pub const DEFAULT_MAX_BOOKING_DAYS: u32 = 15;
pub const DEFAULT_SLOT_MINUTES: u32 = 20;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("invalid schedule: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One weekday's office hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayRule {
    pub active: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// A doctor's effective weekly configuration: stored overrides merged over
/// the practice defaults, per weekday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchedule {
    /// Indexed by weekday number, 0 = Sunday .. 6 = Saturday.
    pub rules: [WeekdayRule; 7],
    pub slot_minutes: u32,
    pub max_booking_days: u32,
}

impl ResolvedSchedule {
    pub fn rule_for(&self, date: NaiveDate) -> &WeekdayRule {
        &self.rules[date.weekday().num_days_from_sunday() as usize]
    }

    /// Last bookable date, inclusive.
    pub fn horizon_end(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::days(self.max_booking_days as i64)
    }
}

/// Stored shape of the `schedules` collection, one document per doctor.
/// Weekday keys are stringified numbers; absent days fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSchedule {
    #[serde(default)]
    pub doctor: Option<String>,
    #[serde(default)]
    pub schedule: HashMap<String, StoredRule>,
    #[serde(default)]
    pub max_booking_days: Option<i64>,
    #[serde(default)]
    pub slot_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredRule {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

/// Staff request to change a doctor's weekly hours. Only the provided
/// weekdays are touched; the rest of the stored document is preserved.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequest {
    #[serde(default)]
    pub schedule: HashMap<String, StoredRule>,
    #[serde(default)]
    pub max_booking_days: Option<i64>,
    #[serde(default)]
    pub slot_minutes: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Free,
    Taken,
    Past,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Open,
    Closed,
    BeyondHorizon,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub time: String,
    pub state: SlotState,
}

/// One column of the patient-facing weekly view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub slots: Vec<SlotView>,
}

/// Staff daily agenda entry: same slot classification, plus the full
/// appointment record behind an occupied slot.
#[derive(Debug, Clone, Serialize)]
pub struct DaySlotDetail {
    pub time: String,
    pub state: SlotState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment: Option<Appointment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayAgenda {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub slots: Vec<DaySlotDetail>,
}
