//! Repository implementations for database operations.

pub mod audience;
pub mod campaign;
pub mod campaign_recipient;
pub mod delivery_log;
pub mod report_record;
pub mod schedule;

pub use audience::AudienceRepository;
pub use campaign::{CampaignRepository, NewCampaign};
pub use campaign_recipient::CampaignRecipientRepository;
pub use delivery_log::{DeliveryLogRepository, NewLogEntry};
pub use report_record::ReportRecordRepository;
pub use schedule::ScheduleRepository;
