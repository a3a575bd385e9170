//! Pure domain services.

pub mod recurrence;
pub mod report_builder;
pub mod targeting;
