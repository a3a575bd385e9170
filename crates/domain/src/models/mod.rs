//! Domain model types.

pub mod campaign;
pub mod delivery;
pub mod grant;
pub mod org_unit;
pub mod report;
pub mod schedule;
pub mod user;

pub use campaign::{
    CampaignCounters, CampaignStatus, CreateCampaignRequest, RecipientStatus, TargetAudience,
};
pub use delivery::{DeliveryStats, DeliveryStatus};
pub use grant::{ApplicationStatus, Grant, GrantApplication, Vote, VoteTally, VoteType};
pub use org_unit::{AdminRole, OrgUnitAdmin};
pub use report::{
    GenerationStatus, GrantReportDetail, ReportDeliveryStatus, ReportPayload, VotingSummary,
};
pub use schedule::{CreateScheduleRequest, ReportType, TimeOfDay};
pub use user::User;
