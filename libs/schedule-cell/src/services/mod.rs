pub mod availability;
pub mod schedule;
pub mod slots;
