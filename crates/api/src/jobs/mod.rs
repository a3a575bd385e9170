//! Background jobs.

pub mod campaign_dispatch;
pub mod pool_metrics;
pub mod queue_drain;
pub mod report_sweep;
pub mod runner;

pub use campaign_dispatch::CampaignDispatchJob;
pub use pool_metrics::PoolMetricsJob;
pub use queue_drain::QueueDrainJob;
pub use report_sweep::ReportSweepJob;
pub use runner::{Job, JobRunner, RunInterval};
