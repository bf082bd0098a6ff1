use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;

use booking_cell::models::{BookSlotRequest, BookingError};
use booking_cell::services::booking::BookingService;
use booking_cell::services::notify::{NoopNotifier, NotificationSender};
use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::auth::User;
use shared_storage::{DocumentStore, Filter, MemoryStore};
use shared_utils::test_utils::{complete_profile_json, TestUser};

// Monday.
const TODAY: &str = "2025-03-10";

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn patient(email: &str) -> User {
    TestUser::patient(email).to_user()
}

async fn seed_profile(store: &dyn DocumentStore, uid: &str, email: &str) {
    let mut profile = complete_profile_json(email);
    profile["uid"] = json!(uid);
    store.insert("patients", profile).await.unwrap();
}

fn service(store: Arc<MemoryStore>) -> BookingService {
    BookingService::new(store, Arc::new(NoopNotifier))
}

fn request(doctor: &str, day: &str, time: &str) -> BookSlotRequest {
    BookSlotRequest {
        doctor: doctor.to_string(),
        date: date(day),
        time: time.to_string(),
        repeat_visit: false,
    }
}

#[tokio::test]
async fn books_a_free_slot_with_profile_data() {
    let store = Arc::new(MemoryStore::new());
    let user = patient("ana@example.com");
    seed_profile(&*store, &user.id, "ana@example.com").await;

    let appointment = service(Arc::clone(&store))
        .book(&user, &request("secondi", "2025-03-11", "08:20"), date(TODAY))
        .await
        .unwrap();

    assert_eq!(appointment.doctor, "secondi");
    assert_eq!(appointment.time, "08:20");
    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    assert_eq!(appointment.patient_name, "Ana Diaz");
    assert_eq!(appointment.patient_email.as_deref(), Some("ana@example.com"));
    assert_eq!(appointment.patient_uid.as_deref(), Some(user.id.as_str()));
    assert!(appointment.created_at.is_some());
}

#[tokio::test]
async fn incomplete_profile_is_refused_before_anything_else() {
    let store = Arc::new(MemoryStore::new());
    let user = patient("ana@example.com");
    let mut profile = complete_profile_json("ana@example.com");
    profile["phone"] = json!("");
    profile["uid"] = json!(user.id);
    store.insert("patients", profile).await.unwrap();

    let err = service(Arc::clone(&store))
        .book(&user, &request("secondi", "2025-03-11", "08:20"), date(TODAY))
        .await
        .unwrap_err();

    assert_matches!(err, BookingError::ProfileIncomplete { missing } => {
        assert_eq!(missing, vec!["phone"]);
    });
    let rows = store
        .find("appointments", &Filter::new().eq("doctor", "secondi"))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn unregistered_patient_gets_full_missing_list() {
    let store = Arc::new(MemoryStore::new());
    let user = patient("ghost@example.com");

    let err = service(store)
        .book(&user, &request("secondi", "2025-03-11", "08:20"), date(TODAY))
        .await
        .unwrap_err();

    assert_matches!(err, BookingError::ProfileIncomplete { missing } => {
        assert_eq!(missing.len(), 7);
    });
}

#[tokio::test]
async fn third_active_appointment_is_the_last_allowed() {
    let store = Arc::new(MemoryStore::new());
    let user = patient("ana@example.com");
    seed_profile(&*store, &user.id, "ana@example.com").await;

    let booking = service(Arc::clone(&store));
    for (day, time) in [("2025-03-11", "08:00"), ("2025-03-12", "08:00"), ("2025-03-13", "08:00")] {
        booking
            .book(&user, &request("secondi", day, time), date(TODAY))
            .await
            .unwrap();
    }

    let err = booking
        .book(&user, &request("secondi", "2025-03-14", "08:00"), date(TODAY))
        .await
        .unwrap_err();
    assert_matches!(err, BookingError::QuotaExceeded { current: 3 });
}

#[tokio::test]
async fn cancelled_attended_and_past_rows_do_not_count_against_quota() {
    let store = Arc::new(MemoryStore::new());
    let user = patient("ana@example.com");
    seed_profile(&*store, &user.id, "ana@example.com").await;

    for (day, status) in [
        ("2025-03-11", "cancelled"),
        ("2025-03-12", "attended"),
        ("2025-03-03", "confirmed"), // past week
    ] {
        store
            .insert(
                "appointments",
                json!({"doctor": "secondi", "date": day, "time": "09:00",
                       "status": status, "patientName": "Ana Diaz",
                       "patientEmail": "ana@example.com"}),
            )
            .await
            .unwrap();
    }

    let appointment = service(Arc::clone(&store))
        .book(&user, &request("secondi", "2025-03-13", "08:00"), date(TODAY))
        .await
        .unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn quota_matches_rows_by_email_or_uid_without_double_counting() {
    let store = Arc::new(MemoryStore::new());
    let user = patient("ana@example.com");
    seed_profile(&*store, &user.id, "ana@example.com").await;

    // One row by email only, one by uid only, one by both.
    store
        .insert(
            "appointments",
            json!({"doctor": "secondi", "date": "2025-03-11", "time": "08:00",
                   "patientName": "Ana Diaz", "patientEmail": "ana@example.com"}),
        )
        .await
        .unwrap();
    store
        .insert(
            "appointments",
            json!({"doctor": "secondi", "date": "2025-03-12", "time": "08:00",
                   "patientName": "Ana Diaz", "patientUid": user.id}),
        )
        .await
        .unwrap();
    store
        .insert(
            "appointments",
            json!({"doctor": "capparelli", "date": "2025-03-13", "time": "14:00",
                   "patientName": "Ana Diaz", "patientEmail": "ana@example.com",
                   "patientUid": user.id}),
        )
        .await
        .unwrap();

    // Three distinct active rows: the next booking must be refused.
    let err = service(Arc::clone(&store))
        .book(&user, &request("secondi", "2025-03-14", "08:00"), date(TODAY))
        .await
        .unwrap_err();
    assert_matches!(err, BookingError::QuotaExceeded { current: 3 });
}

#[tokio::test]
async fn occupied_slot_is_refused_but_cancelled_rows_free_it() {
    let store = Arc::new(MemoryStore::new());
    let ana = patient("ana@example.com");
    let luis = patient("luis@example.com");
    seed_profile(&*store, &ana.id, "ana@example.com").await;
    seed_profile(&*store, &luis.id, "luis@example.com").await;

    let booking = service(Arc::clone(&store));
    booking
        .book(&ana, &request("secondi", "2025-03-11", "08:20"), date(TODAY))
        .await
        .unwrap();

    let err = booking
        .book(&luis, &request("secondi", "2025-03-11", "08:20"), date(TODAY))
        .await
        .unwrap_err();
    assert_matches!(err, BookingError::SlotTaken);

    // A cancelled row on another slot does not hold it.
    store
        .insert(
            "appointments",
            json!({"doctor": "secondi", "date": "2025-03-11", "time": "08:40",
                   "status": "cancelled", "patientName": "Mia Ruiz"}),
        )
        .await
        .unwrap();
    let rebooked = booking
        .book(&luis, &request("secondi", "2025-03-11", "08:40"), date(TODAY))
        .await
        .unwrap();
    assert_eq!(rebooked.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn concurrent_bookings_for_one_slot_get_exactly_one_confirmation() {
    let store = Arc::new(MemoryStore::new());
    let ana = patient("ana@example.com");
    let luis = patient("luis@example.com");
    seed_profile(&*store, &ana.id, "ana@example.com").await;
    seed_profile(&*store, &luis.id, "luis@example.com").await;

    let booking = Arc::new(service(Arc::clone(&store)));
    let slot = request("secondi", "2025-03-11", "08:20");

    let (first, second) = tokio::join!(
        booking.book(&ana, &slot, date(TODAY)),
        booking.book(&luis, &slot, date(TODAY)),
    );

    let confirmations = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(confirmations, 1);
    let refusal = [first, second].into_iter().find(|r| r.is_err()).unwrap();
    assert_matches!(refusal.unwrap_err(), BookingError::SlotTaken);

    let rows = store
        .find(
            "appointments",
            &Filter::new()
                .eq("doctor", "secondi")
                .eq("date", "2025-03-11")
                .eq("time", "08:20"),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn slots_outside_the_schedule_are_refused() {
    let store = Arc::new(MemoryStore::new());
    let user = patient("ana@example.com");
    seed_profile(&*store, &user.id, "ana@example.com").await;
    let booking = service(store);

    // Past date.
    let err = booking
        .book(&user, &request("secondi", "2025-03-07", "08:00"), date(TODAY))
        .await
        .unwrap_err();
    assert_matches!(err, BookingError::ScheduleUnavailable(_));

    // Beyond the 15-day horizon.
    let err = booking
        .book(&user, &request("secondi", "2025-03-26", "08:00"), date(TODAY))
        .await
        .unwrap_err();
    assert_matches!(err, BookingError::ScheduleUnavailable(_));

    // Saturday is closed by default.
    let err = booking
        .book(&user, &request("secondi", "2025-03-15", "08:00"), date(TODAY))
        .await
        .unwrap_err();
    assert_matches!(err, BookingError::ScheduleUnavailable(_));

    // Off the slot grid.
    let err = booking
        .book(&user, &request("secondi", "2025-03-11", "08:15"), date(TODAY))
        .await
        .unwrap_err();
    assert_matches!(err, BookingError::ScheduleUnavailable(_));
}

#[tokio::test]
async fn repeat_visit_marks_the_patient_as_returning() {
    let store = Arc::new(MemoryStore::new());
    let user = patient("ana@example.com");
    seed_profile(&*store, &user.id, "ana@example.com").await;

    let mut slot = request("secondi", "2025-03-11", "08:20");
    slot.repeat_visit = true;
    service(Arc::clone(&store)).book(&user, &slot, date(TODAY)).await.unwrap();

    let docs = store
        .find("patients", &Filter::new().eq("uid", &user.id))
        .await
        .unwrap();
    assert_eq!(docs[0].data["returning"], json!(true));
}

struct FailingNotifier;

#[async_trait]
impl NotificationSender for FailingNotifier {
    async fn send_confirmation(&self, _: &Appointment) -> Result<(), String> {
        Err("mail gateway down".to_string())
    }
}

#[tokio::test]
async fn mail_failure_never_rolls_back_the_booking() {
    let store = Arc::new(MemoryStore::new());
    let user = patient("ana@example.com");
    seed_profile(&*store, &user.id, "ana@example.com").await;

    let booking = BookingService::new(
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        Arc::new(FailingNotifier),
    );
    let appointment = booking
        .book(&user, &request("secondi", "2025-03-11", "08:20"), date(TODAY))
        .await
        .unwrap();

    let row = store.get_by_id("appointments", &appointment.id).await.unwrap();
    assert!(row.is_some());
}
