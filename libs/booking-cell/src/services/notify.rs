use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_models::appointment::{doctor_display_name, Appointment};

/// Outbound confirmation mail. Failures are reported but never roll back
/// the booking that triggered them.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_confirmation(&self, appointment: &Appointment) -> Result<(), String>;
}

/// Sends the confirmation through the EmailJS REST API using the practice's
/// stored template.
pub struct EmailJsNotifier {
    client: Client,
    service_id: String,
    template_id: String,
    public_key: String,
    base_url: String,
}

impl EmailJsNotifier {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            service_id: config.emailjs_service_id.clone(),
            template_id: config.emailjs_template_id.clone(),
            public_key: config.emailjs_public_key.clone(),
            base_url: config.emailjs_base_url.clone(),
        }
    }
}

#[async_trait]
impl NotificationSender for EmailJsNotifier {
    async fn send_confirmation(&self, appointment: &Appointment) -> Result<(), String> {
        let email = match appointment.patient_email.as_deref() {
            Some(email) if !email.is_empty() => email,
            _ => {
                debug!("No patient email on appointment {}, skipping mail", appointment.id);
                return Ok(());
            }
        };

        let body = json!({
            "service_id": self.service_id,
            "template_id": self.template_id,
            "user_id": self.public_key,
            "template_params": {
                "email": email,
                "to_name": appointment.patient_name,
                "doctor_name": doctor_display_name(&appointment.doctor),
                "date_time": format!("{} {}", appointment.date, appointment.time),
            }
        });

        let response = self
            .client
            .post(format!("{}/api/v1.0/email/send", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("EmailJS request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!("EmailJS rejected confirmation: {} {}", status, text);
            return Err(format!("EmailJS returned {}", status));
        }
        debug!("Confirmation mail queued for {}", email);
        Ok(())
    }
}

/// Stands in when mail credentials are absent, and in engine tests.
pub struct NoopNotifier;

#[async_trait]
impl NotificationSender for NoopNotifier {
    async fn send_confirmation(&self, appointment: &Appointment) -> Result<(), String> {
        debug!("Mail disabled, skipping confirmation for {}", appointment.id);
        Ok(())
    }
}
