//! Database entity definitions.
//!
//! Entities are direct mappings to database rows. Status columns are stored
//! as text and parsed into the closed domain enums at the edge.

pub mod campaign;
pub mod campaign_recipient;
pub mod delivery_log;
pub mod grant;
pub mod org_unit_admin;
pub mod report_record;
pub mod schedule;

pub use campaign::CampaignEntity;
pub use campaign_recipient::CampaignRecipientEntity;
pub use delivery_log::DeliveryLogEntity;
pub use grant::{GrantApplicationEntity, GrantEntity, GrantVoteEntity, UserEntity};
pub use org_unit_admin::OrgUnitAdminEntity;
pub use report_record::ReportRecordEntity;
pub use schedule::ScheduleEntity;
