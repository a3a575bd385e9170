//! Domain models and pure services for grant reporting and campaigns.
//!
//! This crate holds no I/O: report aggregation, recurrence math and
//! recipient resolution are plain functions over in-memory records so they
//! can be exercised without a database.

pub mod models;
pub mod services;
