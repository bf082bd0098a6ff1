use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use patient_cell::services::profile::ProfileService;
use schedule_cell::models::ResolvedSchedule;
use schedule_cell::services::schedule::ScheduleService;
use schedule_cell::services::slots::{format_slot, generate_slots};
use shared_models::appointment::{is_known_doctor, Appointment};
use shared_models::auth::User;
use shared_storage::{Document, DocumentStore, Filter, InsertOutcome};

use crate::models::{BookSlotRequest, BookingError};
use crate::services::notify::NotificationSender;

pub const APPOINTMENTS: &str = "appointments";

/// A patient may hold at most this many active appointments at once.
pub const MAX_ACTIVE_APPOINTMENTS: usize = 3;

/// Runs the booking transaction: precondition checks in a fixed order, then
/// a guarded insert so two patients racing for one slot get exactly one
/// confirmation.
pub struct BookingService {
    store: Arc<dyn DocumentStore>,
    schedules: ScheduleService,
    profiles: ProfileService,
    notifier: Arc<dyn NotificationSender>,
}

impl BookingService {
    pub fn new(store: Arc<dyn DocumentStore>, notifier: Arc<dyn NotificationSender>) -> Self {
        let schedules = ScheduleService::new(Arc::clone(&store));
        let profiles = ProfileService::new(Arc::clone(&store));
        Self {
            store,
            schedules,
            profiles,
            notifier,
        }
    }

    /// Books one slot for the authenticated patient.
    ///
    /// Checks run in order: profile completeness, slot validity against the
    /// doctor's schedule, the active-appointment quota, then the guarded
    /// insert. The first failed check wins; later ones are not evaluated.
    pub async fn book(
        &self,
        user: &User,
        request: &BookSlotRequest,
        today: NaiveDate,
    ) -> Result<Appointment, BookingError> {
        if !is_known_doctor(&request.doctor) {
            return Err(BookingError::Validation(format!(
                "Unknown doctor: {}",
                request.doctor
            )));
        }

        let profile = self.profiles.get_profile(&user.id).await?;
        let missing = profile.missing_fields();
        if !missing.is_empty() {
            debug!("Booking refused for {}: incomplete profile", user.id);
            return Err(BookingError::ProfileIncomplete { missing });
        }

        let schedule = self.schedules.resolve(&request.doctor).await;
        ensure_bookable_slot(&schedule, request.date, &request.time, today)?;

        let email = profile.email.clone().unwrap_or_default();
        let active = self.count_active_appointments(&email, &user.id, today).await?;
        if active >= MAX_ACTIVE_APPOINTMENTS {
            debug!("Booking refused for {}: {} active appointments", user.id, active);
            return Err(BookingError::QuotaExceeded { current: active });
        }

        let data = json!({
            "doctor": request.doctor,
            "date": request.date.format("%Y-%m-%d").to_string(),
            "time": request.time,
            "status": "confirmed",
            "patientName": profile.full_name(),
            "patientEmail": email,
            "patientPhone": profile.phone,
            "insurance": profile.insurance,
            "patientUid": user.id,
            "createdAt": Utc::now(),
        });

        let guard = slot_guard(&request.doctor, request.date, &request.time);
        let appointment = match self.store.insert_if_vacant(APPOINTMENTS, &guard, data).await? {
            InsertOutcome::Created(doc) => doc
                .parse::<Appointment>()
                .map_err(BookingError::Storage)?,
            InsertOutcome::Occupied => {
                debug!(
                    "Slot {} {} {} already held, refusing booking",
                    request.doctor, request.date, request.time
                );
                return Err(BookingError::SlotTaken);
            }
        };
        info!(
            "Booked {} for {} with {} on {} {}",
            appointment.id, user.id, request.doctor, request.date, request.time
        );

        if request.repeat_visit {
            if let Err(e) = self.profiles.mark_returning(&user.id).await {
                warn!("Could not flag {} as returning: {}", user.id, e);
            }
        }

        // Mail is best-effort: the slot is held regardless.
        if let Err(e) = self.notifier.send_confirmation(&appointment).await {
            warn!("Confirmation mail for {} failed: {}", appointment.id, e);
        }

        Ok(appointment)
    }

    /// Active appointments held by this patient, matched by stored email or
    /// by user id so pre-registration bookings still count.
    async fn count_active_appointments(
        &self,
        email: &str,
        uid: &str,
        today: NaiveDate,
    ) -> Result<usize, BookingError> {
        let mut docs = self
            .store
            .find(APPOINTMENTS, &Filter::new().eq("patientUid", uid))
            .await?;
        if !email.is_empty() {
            docs.extend(
                self.store
                    .find(APPOINTMENTS, &Filter::new().eq("patientEmail", email))
                    .await?,
            );
        }

        let mut seen = HashSet::new();
        let count = docs
            .iter()
            .filter(|doc| seen.insert(doc.id.clone()))
            .filter_map(|doc| doc.parse::<Appointment>().ok())
            .filter(|appointment| appointment.counts_against_quota() && appointment.date >= today)
            .count();
        Ok(count)
    }
}

/// Guard expression for one slot: any non-cancelled row on the same doctor,
/// date and time makes the insert report the slot as occupied. Rows without
/// a status count as confirmed.
pub fn slot_guard(doctor: &str, date: NaiveDate, time: &str) -> Filter {
    Filter::new()
        .eq("doctor", doctor)
        .eq("date", date.format("%Y-%m-%d"))
        .eq("time", time)
        .neq("status", "cancelled")
}

/// The slot must be a real slot of the doctor's schedule, on an open day,
/// not in the past and not beyond the booking horizon.
pub fn ensure_bookable_slot(
    schedule: &ResolvedSchedule,
    date: NaiveDate,
    time: &str,
    today: NaiveDate,
) -> Result<(), BookingError> {
    if date < today {
        return Err(BookingError::ScheduleUnavailable(
            "date is in the past".to_string(),
        ));
    }
    if date > schedule.horizon_end(today) {
        return Err(BookingError::ScheduleUnavailable(format!(
            "date is beyond the {}-day booking horizon",
            schedule.max_booking_days
        )));
    }
    let rule = schedule.rule_for(date);
    if !rule.active {
        return Err(BookingError::ScheduleUnavailable(
            "the practice is closed that day".to_string(),
        ));
    }

    let slots = generate_slots(rule.start, rule.end, schedule.slot_minutes)
        .map_err(|e| BookingError::ScheduleUnavailable(e.to_string()))?;
    if !slots.iter().any(|slot| format_slot(*slot) == time) {
        return Err(BookingError::ScheduleUnavailable(format!(
            "{} is not a bookable slot",
            time
        )));
    }
    Ok(())
}

/// Non-cancelled rows currently holding the given slot.
pub async fn slot_occupants(
    store: &dyn DocumentStore,
    doctor: &str,
    date: NaiveDate,
    time: &str,
) -> Result<Vec<Document>, BookingError> {
    let filter = slot_guard(doctor, date, time);
    Ok(store.find(APPOINTMENTS, &filter).await?)
}
