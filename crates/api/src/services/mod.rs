//! Application services wiring repositories, queue and providers.

pub mod campaign_dispatch;
pub mod delivery_tracking;
pub mod report_generation;

pub use campaign_dispatch::CampaignDispatchService;
pub use delivery_tracking::DeliveryTracker;
pub use report_generation::ReportGenerationService;
