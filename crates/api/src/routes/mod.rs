//! HTTP route handlers.

pub mod campaigns;
pub mod health;
pub mod schedules;
pub mod stats;
