pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use services::availability::AvailabilityService;
pub use services::schedule::ScheduleService;
pub use services::slots::{format_slot, generate_slots, MAX_SLOTS_PER_DAY};
