use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::{debug, warn};

use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_storage::{Document, DocumentStore, Filter};

use crate::models::{
    DayAgenda, DayAvailability, DaySlotDetail, DayStatus, ResolvedSchedule, ScheduleError,
    SlotState, SlotView,
};
use crate::services::schedule::ScheduleService;
use crate::services::slots::{format_slot, generate_slots};

const APPOINTMENTS: &str = "appointments";

/// Combines generated slots with stored appointments to classify every slot
/// of a day or a business week. Stateless between calls: the caller supplies
/// `today`, and every read is a fresh storage query.
pub struct AvailabilityService {
    store: Arc<dyn DocumentStore>,
    schedules: ScheduleService,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let schedules = ScheduleService::new(Arc::clone(&store));
        Self { store, schedules }
    }

    /// Monday of the week containing `date`.
    pub fn week_start(date: NaiveDate) -> NaiveDate {
        date - Duration::days(date.weekday().num_days_from_monday() as i64)
    }

    /// Patient-facing weekly view: Monday through Friday of the week
    /// containing `reference`, weekends never included.
    pub async fn week_availability(
        &self,
        doctor_id: &str,
        reference: NaiveDate,
        today: NaiveDate,
    ) -> Result<Vec<DayAvailability>, ScheduleError> {
        let monday = Self::week_start(reference);
        let friday = monday + Duration::days(4);
        debug!(
            "Computing week availability for {} from {} to {}",
            doctor_id, monday, friday
        );

        let schedule = self.schedules.resolve(doctor_id).await;
        let occupied = self
            .occupied_slots(doctor_id, monday, friday)
            .await?;

        let week = (0..5)
            .map(|offset| {
                let date = monday + Duration::days(offset);
                self.classify_day(date, today, &schedule, &occupied)
            })
            .collect();
        Ok(week)
    }

    /// Staff daily agenda: one date, full appointment record attached to
    /// each occupied slot.
    pub async fn day_agenda(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<DayAgenda, ScheduleError> {
        debug!("Computing day agenda for {} on {}", doctor_id, date);

        let schedule = self.schedules.resolve(doctor_id).await;

        if date > schedule.horizon_end(today) {
            return Ok(DayAgenda {
                date,
                status: DayStatus::BeyondHorizon,
                slots: vec![],
            });
        }
        let rule = schedule.rule_for(date);
        if !rule.active {
            return Ok(DayAgenda {
                date,
                status: DayStatus::Closed,
                slots: vec![],
            });
        }

        let filter = Filter::new()
            .eq("doctor", doctor_id)
            .eq("date", date.format("%Y-%m-%d"));
        let appointments = parse_appointments(self.store.find(APPOINTMENTS, &filter).await?);

        let mut by_time: HashMap<String, Appointment> = HashMap::new();
        for appointment in appointments {
            if appointment.status != AppointmentStatus::Cancelled {
                by_time.insert(appointment.time.clone(), appointment);
            }
        }

        let slots = match generate_slots(rule.start, rule.end, schedule.slot_minutes) {
            Ok(slots) => slots,
            Err(e) => {
                warn!("Unusable stored rule for {} on {}: {}", doctor_id, date, e);
                return Ok(DayAgenda {
                    date,
                    status: DayStatus::Closed,
                    slots: vec![],
                });
            }
        };

        let slots = slots
            .into_iter()
            .map(|slot| {
                let time = format_slot(slot);
                let appointment = by_time.remove(&time);
                let state = if date < today {
                    SlotState::Past
                } else if appointment.as_ref().map(Appointment::occupies_slot).unwrap_or(false) {
                    SlotState::Taken
                } else {
                    SlotState::Free
                };
                DaySlotDetail {
                    time,
                    state,
                    appointment,
                }
            })
            .collect();

        Ok(DayAgenda {
            date,
            status: DayStatus::Open,
            slots,
        })
    }

    fn classify_day(
        &self,
        date: NaiveDate,
        today: NaiveDate,
        schedule: &ResolvedSchedule,
        occupied: &HashMap<(NaiveDate, String), Appointment>,
    ) -> DayAvailability {
        if date > schedule.horizon_end(today) {
            return DayAvailability {
                date,
                status: DayStatus::BeyondHorizon,
                slots: vec![],
            };
        }
        let rule = schedule.rule_for(date);
        if !rule.active {
            return DayAvailability {
                date,
                status: DayStatus::Closed,
                slots: vec![],
            };
        }

        let slots = match generate_slots(rule.start, rule.end, schedule.slot_minutes) {
            Ok(slots) => slots,
            Err(e) => {
                warn!("Unusable stored rule for {}: {}", date, e);
                return DayAvailability {
                    date,
                    status: DayStatus::Closed,
                    slots: vec![],
                };
            }
        };

        let slots = slots
            .into_iter()
            .map(|slot| {
                let time = format_slot(slot);
                let state = if date < today {
                    SlotState::Past
                } else if occupied.contains_key(&(date, time.clone())) {
                    SlotState::Taken
                } else {
                    SlotState::Free
                };
                SlotView { time, state }
            })
            .collect();

        DayAvailability {
            date,
            status: DayStatus::Open,
            slots,
        }
    }

    /// Fetch the doctor's slot-holding appointments in `[start, end]`.
    /// Query strategy follows the store's capability flag: one
    /// compound range query when available, otherwise all the doctor's
    /// appointments filtered client-side. Results are identical either way.
    async fn occupied_slots(
        &self,
        doctor_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<(NaiveDate, String), Appointment>, ScheduleError> {
        let appointments = if self.store.supports_range_filters() {
            let filter = Filter::new()
                .eq("doctor", doctor_id)
                .gte("date", start.format("%Y-%m-%d"))
                .lte("date", end.format("%Y-%m-%d"));
            parse_appointments(self.store.find(APPOINTMENTS, &filter).await?)
        } else {
            debug!("Range filters unavailable, fetching all appointments for {}", doctor_id);
            let filter = Filter::new().eq("doctor", doctor_id);
            parse_appointments(self.store.find(APPOINTMENTS, &filter).await?)
                .into_iter()
                .filter(|a| a.date >= start && a.date <= end)
                .collect()
        };

        Ok(appointments
            .into_iter()
            .filter(Appointment::occupies_slot)
            .map(|a| ((a.date, a.time.clone()), a))
            .collect())
    }
}

/// Lenient decoding of stored rows: a malformed document is logged and
/// skipped, never fatal to the whole view.
fn parse_appointments(docs: Vec<Document>) -> Vec<Appointment> {
    docs.into_iter()
        .filter_map(|doc| match doc.parse::<Appointment>() {
            Ok(appointment) => Some(appointment),
            Err(e) => {
                warn!("Skipping malformed appointment {}: {}", doc.id, e);
                None
            }
        })
        .collect()
}
