use std::sync::Arc;

use chrono::NaiveTime;
use serde_json::json;
use tracing::{debug, warn};

use shared_storage::{DocumentStore, Filter, StorageError};

use crate::models::{
    ResolvedSchedule, ScheduleError, StoredRule, StoredSchedule, UpdateScheduleRequest,
    WeekdayRule, DEFAULT_MAX_BOOKING_DAYS, DEFAULT_SLOT_MINUTES,
};
use crate::services::slots::generate_slots;

const SCHEDULES: &str = "schedules";

/// Reads and writes the per-doctor weekly configuration. Reads merge the
/// stored document over defaults per weekday and never fail the caller;
/// writes validate every provided rule before it lands.
#[derive(Clone)]
pub struct ScheduleService {
    store: Arc<dyn DocumentStore>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Built-in practice defaults: Monday to Friday 08:00-17:00, weekends
    /// closed, 20-minute slots, 15-day booking horizon.
    pub fn defaults() -> ResolvedSchedule {
        let open = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let close = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        let weekday = WeekdayRule {
            active: true,
            start: open,
            end: close,
        };
        let closed = WeekdayRule {
            active: false,
            start: open,
            end: open,
        };
        ResolvedSchedule {
            // 0 = Sunday .. 6 = Saturday
            rules: [closed, weekday, weekday, weekday, weekday, weekday, closed],
            slot_minutes: DEFAULT_SLOT_MINUTES,
            max_booking_days: DEFAULT_MAX_BOOKING_DAYS,
        }
    }

    /// Resolve the effective schedule for a doctor. A storage failure
    /// degrades to defaults with a warning: availability must keep working
    /// even when the configuration read does not.
    pub async fn resolve(&self, doctor_id: &str) -> ResolvedSchedule {
        match self.load(doctor_id).await {
            Ok(Some(stored)) => Self::merge(stored),
            Ok(None) => Self::defaults(),
            Err(e) => {
                warn!("Schedule read failed for {}, using defaults: {}", doctor_id, e);
                Self::defaults()
            }
        }
    }

    /// Staff update with merge semantics: only the provided weekdays and
    /// fields are overwritten. Every provided rule is validated through the
    /// slot generator so a misconfiguration surfaces here, at save time.
    pub async fn save(
        &self,
        doctor_id: &str,
        request: UpdateScheduleRequest,
    ) -> Result<ResolvedSchedule, ScheduleError> {
        debug!("Saving schedule for doctor {}", doctor_id);

        let slot_minutes = match request.slot_minutes {
            Some(m) if m <= 0 => {
                return Err(ScheduleError::Validation(
                    "slotMinutes must be positive".to_string(),
                ))
            }
            Some(m) => m as u32,
            None => DEFAULT_SLOT_MINUTES,
        };
        if let Some(days) = request.max_booking_days {
            if days <= 0 {
                return Err(ScheduleError::Validation(
                    "maxBookingDays must be positive".to_string(),
                ));
            }
        }
        for (day, rule) in &request.schedule {
            Self::validate_rule(day, rule, slot_minutes)?;
        }

        let mut stored = self.load(doctor_id).await?.unwrap_or_default();

        // Merge per weekday, never wholesale.
        for (day, rule) in request.schedule {
            stored.schedule.insert(day, rule);
        }
        if request.max_booking_days.is_some() {
            stored.max_booking_days = request.max_booking_days;
        }
        if request.slot_minutes.is_some() {
            stored.slot_minutes = request.slot_minutes;
        }
        stored.doctor = Some(doctor_id.to_string());

        let body = json!({
            "doctor": doctor_id,
            "schedule": stored.schedule,
            "maxBookingDays": stored.max_booking_days,
            "slotMinutes": stored.slot_minutes,
        });

        let existing = self
            .store
            .find(SCHEDULES, &Filter::new().eq("doctor", doctor_id))
            .await?;
        match existing.first() {
            Some(doc) => {
                self.store.update(SCHEDULES, &doc.id, body).await?;
            }
            None => {
                self.store.insert(SCHEDULES, body).await?;
            }
        }

        Ok(Self::merge(stored))
    }

    async fn load(&self, doctor_id: &str) -> Result<Option<StoredSchedule>, StorageError> {
        let docs = self
            .store
            .find(SCHEDULES, &Filter::new().eq("doctor", doctor_id))
            .await?;
        match docs.first() {
            Some(doc) => Ok(Some(doc.parse::<StoredSchedule>()?)),
            None => Ok(None),
        }
    }

    fn validate_rule(day: &str, rule: &StoredRule, slot_minutes: u32) -> Result<(), ScheduleError> {
        let weekday: usize = day
            .parse()
            .map_err(|_| ScheduleError::Validation(format!("invalid weekday key '{}'", day)))?;
        if weekday > 6 {
            return Err(ScheduleError::Validation(format!(
                "weekday must be 0 (Sunday) to 6 (Saturday), got {}",
                weekday
            )));
        }
        if !rule.active {
            return Ok(());
        }
        let start = Self::parse_time(rule.start.as_deref())
            .ok_or_else(|| ScheduleError::Validation(format!("day {}: invalid start time", day)))?;
        let end = Self::parse_time(rule.end.as_deref())
            .ok_or_else(|| ScheduleError::Validation(format!("day {}: invalid end time", day)))?;
        if start >= end {
            return Err(ScheduleError::Validation(format!(
                "day {}: start must be before end",
                day
            )));
        }
        // Surfaces the slot-cap error for absurd ranges/intervals.
        generate_slots(start, end, slot_minutes)?;
        Ok(())
    }

    fn merge(stored: StoredSchedule) -> ResolvedSchedule {
        let mut resolved = Self::defaults();

        for (day, rule) in &stored.schedule {
            let index = match day.parse::<usize>() {
                Ok(i) if i <= 6 => i,
                _ => {
                    warn!("Ignoring schedule entry with invalid weekday key '{}'", day);
                    continue;
                }
            };
            if !rule.active {
                resolved.rules[index].active = false;
                continue;
            }
            match (
                Self::parse_time(rule.start.as_deref()),
                Self::parse_time(rule.end.as_deref()),
            ) {
                (Some(start), Some(end)) => {
                    resolved.rules[index] = WeekdayRule {
                        active: true,
                        start,
                        end,
                    };
                }
                _ => {
                    warn!("Ignoring malformed stored rule for weekday {}", index);
                }
            }
        }

        if let Some(days) = stored.max_booking_days {
            if days > 0 {
                resolved.max_booking_days = days as u32;
            }
        }
        if let Some(minutes) = stored.slot_minutes {
            if minutes > 0 {
                resolved.slot_minutes = minutes as u32;
            }
        }

        resolved
    }

    fn parse_time(value: Option<&str>) -> Option<NaiveTime> {
        let value = value?;
        NaiveTime::parse_from_str(value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
            .ok()
    }
}
