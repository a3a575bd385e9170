//! Campaign recipient entity definitions.
//!
//! One row per (campaign, distinct email): the frozen snapshot taken at
//! campaign creation.

use chrono::{DateTime, Utc};
use domain::models::RecipientStatus;
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for the campaign_recipients table.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignRecipientEntity {
    pub id: i64,
    pub campaign_id: i64,
    pub user_id: Uuid,
    pub email: String,
    pub status: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub bounced_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl CampaignRecipientEntity {
    pub fn status(&self) -> Result<RecipientStatus, String> {
        self.status.parse()
    }
}
