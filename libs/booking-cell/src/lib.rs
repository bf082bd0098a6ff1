pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{BookSlotRequest, BookingError, EditAppointmentRequest};
pub use services::agenda::AgendaService;
pub use services::booking::BookingService;
pub use services::notify::{EmailJsNotifier, NoopNotifier, NotificationSender};
