use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use schedule_cell::services::schedule::ScheduleService;
use schedule_cell::services::slots::{format_slot, generate_slots};
use shared_models::appointment::{is_known_doctor, Appointment, AppointmentStatus};
use shared_storage::{DocumentStore, Filter, InsertOutcome, WriteOp};

use crate::models::{BlockDayRequest, BlockSlotRequest, BookingError, EditAppointmentRequest};
use crate::services::booking::{ensure_bookable_slot, slot_guard, slot_occupants, APPOINTMENTS};

/// Name written on blocked placeholder rows, as the agenda displays them.
pub const BLOCKED_LABEL: &str = "Bloqueado";

/// Staff-side agenda mutations: blocking slots, rescheduling and removing
/// appointments, and whole-day block toggles.
pub struct AgendaService {
    store: Arc<dyn DocumentStore>,
    schedules: ScheduleService,
}

impl AgendaService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let schedules = ScheduleService::new(Arc::clone(&store));
        Self { store, schedules }
    }

    /// Holds one slot with a blocked placeholder. Blocking an already
    /// blocked slot succeeds and returns the existing row; a slot held by a
    /// patient is refused.
    pub async fn create_block(
        &self,
        request: &BlockSlotRequest,
        today: NaiveDate,
    ) -> Result<Appointment, BookingError> {
        check_doctor(&request.doctor)?;
        let schedule = self.schedules.resolve(&request.doctor).await;
        ensure_bookable_slot(&schedule, request.date, &request.time, today)?;

        let guard = slot_guard(&request.doctor, request.date, &request.time);
        let data = block_row(&request.doctor, request.date, &request.time);
        match self.store.insert_if_vacant(APPOINTMENTS, &guard, data).await? {
            InsertOutcome::Created(doc) => {
                info!("Blocked {} {} {}", request.doctor, request.date, request.time);
                Ok(doc.parse::<Appointment>().map_err(BookingError::Storage)?)
            }
            InsertOutcome::Occupied => {
                let occupants =
                    slot_occupants(&*self.store, &request.doctor, request.date, &request.time)
                        .await?;
                let existing = occupants
                    .iter()
                    .filter_map(|doc| doc.parse::<Appointment>().ok())
                    .find(|appointment| appointment.status == AppointmentStatus::Blocked);
                match existing {
                    Some(block) => {
                        debug!(
                            "Slot {} {} {} already blocked",
                            request.doctor, request.date, request.time
                        );
                        Ok(block)
                    }
                    None => Err(BookingError::SlotTaken),
                }
            }
        }
    }

    /// Reschedules or retags one appointment. Moving it to another slot
    /// revalidates the target against the schedule and its current
    /// occupancy.
    pub async fn edit_appointment(
        &self,
        id: &str,
        request: &EditAppointmentRequest,
        today: NaiveDate,
    ) -> Result<Appointment, BookingError> {
        let doc = self
            .store
            .get_by_id(APPOINTMENTS, id)
            .await?
            .ok_or(BookingError::NotFound)?;
        let current = doc.parse::<Appointment>().map_err(BookingError::Storage)?;

        let target_date = request.date.unwrap_or(current.date);
        let target_time = request.time.clone().unwrap_or_else(|| current.time.clone());
        let moved = target_date != current.date || target_time != current.time;

        if moved {
            let schedule = self.schedules.resolve(&current.doctor).await;
            ensure_bookable_slot(&schedule, target_date, &target_time, today)?;

            let occupants =
                slot_occupants(&*self.store, &current.doctor, target_date, &target_time).await?;
            if occupants.iter().any(|other| other.id != id) {
                return Err(BookingError::SlotTaken);
            }
        }

        let mut patch = Map::new();
        if let Some(date) = request.date {
            patch.insert("date".to_string(), json!(date.format("%Y-%m-%d").to_string()));
        }
        if let Some(time) = &request.time {
            patch.insert("time".to_string(), json!(time));
        }
        if let Some(status) = request.status {
            patch.insert("status".to_string(), json!(status.to_string()));
        }
        if let Some(name) = &request.patient_name {
            patch.insert("patientName".to_string(), json!(name));
        }
        if let Some(email) = &request.patient_email {
            patch.insert("patientEmail".to_string(), json!(email));
        }
        if let Some(phone) = &request.patient_phone {
            patch.insert("patientPhone".to_string(), json!(phone));
        }
        if let Some(insurance) = &request.insurance {
            patch.insert("insurance".to_string(), json!(insurance));
        }
        if patch.is_empty() {
            return Ok(current);
        }

        let updated = self.store.update(APPOINTMENTS, id, Value::Object(patch)).await?;
        info!("Edited appointment {}", id);
        updated.parse::<Appointment>().map_err(BookingError::Storage)
    }

    pub async fn delete_appointment(&self, id: &str) -> Result<(), BookingError> {
        match self.store.delete(APPOINTMENTS, id).await {
            Ok(()) => {
                info!("Deleted appointment {}", id);
                Ok(())
            }
            Err(shared_storage::StorageError::NotFound) => Err(BookingError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Blocks every free slot of the day in one batch. Slots already held,
    /// by patients or earlier blocks, are left alone, so repeating the call
    /// changes nothing.
    pub async fn bulk_block_day(
        &self,
        request: &BlockDayRequest,
        today: NaiveDate,
    ) -> Result<usize, BookingError> {
        check_doctor(&request.doctor)?;
        if request.date < today {
            return Err(BookingError::ScheduleUnavailable(
                "date is in the past".to_string(),
            ));
        }

        let schedule = self.schedules.resolve(&request.doctor).await;
        let rule = schedule.rule_for(request.date);
        if !rule.active {
            return Err(BookingError::ScheduleUnavailable(
                "the practice is closed that day".to_string(),
            ));
        }
        let slots = generate_slots(rule.start, rule.end, schedule.slot_minutes)
            .map_err(|e| BookingError::ScheduleUnavailable(e.to_string()))?;

        let taken: HashSet<String> = self
            .day_appointments(&request.doctor, request.date)
            .await?
            .into_iter()
            .filter(|appointment| appointment.occupies_slot())
            .map(|appointment| appointment.time)
            .collect();

        let ops: Vec<WriteOp> = slots
            .iter()
            .map(|slot| format_slot(*slot))
            .filter(|time| !taken.contains(time))
            .map(|time| WriteOp::Insert {
                collection: APPOINTMENTS.to_string(),
                data: block_row(&request.doctor, request.date, &time),
            })
            .collect();

        let blocked = ops.len();
        if blocked > 0 {
            self.store.batch_write(ops).await?;
        }
        info!("Blocked {} slots for {} on {}", blocked, request.doctor, request.date);
        Ok(blocked)
    }

    /// Removes every blocked placeholder of the day in one batch. Patient
    /// appointments are untouched.
    pub async fn bulk_unblock_day(&self, request: &BlockDayRequest) -> Result<usize, BookingError> {
        check_doctor(&request.doctor)?;

        let ops: Vec<WriteOp> = self
            .day_appointments(&request.doctor, request.date)
            .await?
            .into_iter()
            .filter(|appointment| appointment.status == AppointmentStatus::Blocked)
            .map(|appointment| WriteOp::Delete {
                collection: APPOINTMENTS.to_string(),
                id: appointment.id,
            })
            .collect();

        let removed = ops.len();
        if removed > 0 {
            self.store.batch_write(ops).await?;
        }
        info!("Unblocked {} slots for {} on {}", removed, request.doctor, request.date);
        Ok(removed)
    }

    async fn day_appointments(
        &self,
        doctor: &str,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, BookingError> {
        let filter = Filter::new()
            .eq("doctor", doctor)
            .eq("date", date.format("%Y-%m-%d"));
        let docs = self.store.find(APPOINTMENTS, &filter).await?;
        Ok(docs
            .iter()
            .filter_map(|doc| doc.parse::<Appointment>().ok())
            .collect())
    }
}

fn check_doctor(doctor: &str) -> Result<(), BookingError> {
    if !is_known_doctor(doctor) {
        return Err(BookingError::Validation(format!("Unknown doctor: {}", doctor)));
    }
    Ok(())
}

fn block_row(doctor: &str, date: NaiveDate, time: &str) -> Value {
    json!({
        "doctor": doctor,
        "date": date.format("%Y-%m-%d").to_string(),
        "time": time,
        "status": "blocked",
        "patientName": BLOCKED_LABEL,
        "createdAt": Utc::now(),
    })
}
