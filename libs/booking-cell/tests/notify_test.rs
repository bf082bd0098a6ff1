use chrono::{NaiveDate, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::services::notify::{EmailJsNotifier, NotificationSender};
use shared_config::AppConfig;
use shared_models::appointment::{Appointment, AppointmentStatus};

fn mail_config(base_url: &str) -> AppConfig {
    AppConfig {
        store_url: "http://localhost:54321".to_string(),
        store_api_key: "test-api-key".to_string(),
        jwt_secret: "test-secret".to_string(),
        emailjs_service_id: "service_test".to_string(),
        emailjs_template_id: "template_test".to_string(),
        emailjs_public_key: "public_test".to_string(),
        emailjs_base_url: base_url.to_string(),
        store_range_filters: true,
    }
}

fn appointment(email: Option<&str>) -> Appointment {
    Appointment {
        id: "doc-1".to_string(),
        doctor: "secondi".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(),
        time: "08:20".to_string(),
        status: AppointmentStatus::Confirmed,
        patient_name: "Ana Diaz".to_string(),
        patient_email: email.map(String::from),
        patient_phone: None,
        insurance: None,
        patient_uid: None,
        created_at: Some(Utc::now()),
    }
}

#[tokio::test]
async fn confirmation_carries_template_params() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1.0/email/send"))
        .and(body_partial_json(json!({
            "service_id": "service_test",
            "template_id": "template_test",
            "user_id": "public_test",
            "template_params": {
                "email": "ana@example.com",
                "to_name": "Ana Diaz",
                "doctor_name": "Dra. Secondi",
                "date_time": "2025-03-11 08:20",
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = EmailJsNotifier::new(&mail_config(&server.uri()));
    notifier
        .send_confirmation(&appointment(Some("ana@example.com")))
        .await
        .unwrap();
}

#[tokio::test]
async fn gateway_rejection_surfaces_as_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1.0/email/send"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let notifier = EmailJsNotifier::new(&mail_config(&server.uri()));
    let err = notifier
        .send_confirmation(&appointment(Some("ana@example.com")))
        .await
        .unwrap_err();
    assert!(err.contains("403"));
}

#[tokio::test]
async fn appointment_without_email_sends_nothing() {
    let server = MockServer::start().await;
    // No mock mounted: any request would fail the test server.

    let notifier = EmailJsNotifier::new(&mail_config(&server.uri()));
    notifier.send_confirmation(&appointment(None)).await.unwrap();
}
