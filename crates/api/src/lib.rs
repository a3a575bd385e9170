pub mod app;
pub mod config;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod providers;
pub mod queue;
pub mod routes;
pub mod services;
