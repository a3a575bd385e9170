//! Campaign repository.

use chrono::{DateTime, Utc};
use domain::models::{CampaignStatus, TargetAudience};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::CampaignEntity;

const CAMPAIGN_COLUMNS: &str = "id, created_by, name, subject, body_content, template_type, \
     target_type, target_criteria, status, scheduled_at, sent_at, \
     total_recipients, sent_count, opened_count, clicked_count, bounced_count, created_at";

/// Fields for inserting a campaign.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub created_by: Uuid,
    pub name: String,
    pub subject: String,
    pub body_content: String,
    pub template_type: String,
    pub audience: TargetAudience,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Repository for campaign operations.
pub struct CampaignRepository {
    pool: PgPool,
}

impl CampaignRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a campaign. Starts scheduled when a send time is given,
    /// draft otherwise.
    pub async fn create(&self, campaign: &NewCampaign) -> Result<CampaignEntity, sqlx::Error> {
        let status = if campaign.scheduled_at.is_some() {
            CampaignStatus::Scheduled
        } else {
            CampaignStatus::Draft
        };
        let criteria = serde_json::to_value(&campaign.audience)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        sqlx::query_as::<_, CampaignEntity>(&format!(
            r#"
            INSERT INTO campaigns
                (created_by, name, subject, body_content, template_type,
                 target_type, target_criteria, status, scheduled_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        ))
        .bind(campaign.created_by)
        .bind(&campaign.name)
        .bind(&campaign.subject)
        .bind(&campaign.body_content)
        .bind(&campaign.template_type)
        .bind(campaign.audience.target_type())
        .bind(criteria)
        .bind(status.as_str())
        .bind(campaign.scheduled_at)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<CampaignEntity>, sqlx::Error> {
        sqlx::query_as::<_, CampaignEntity>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Scheduled campaigns whose send time has arrived.
    pub async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<CampaignEntity>, sqlx::Error> {
        sqlx::query_as::<_, CampaignEntity>(&format!(
            r#"
            SELECT {CAMPAIGN_COLUMNS}
            FROM campaigns
            WHERE status = 'scheduled' AND scheduled_at <= $1
            ORDER BY scheduled_at
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }

    /// Campaigns currently in the given status, oldest first.
    pub async fn find_in_status(
        &self,
        status: CampaignStatus,
    ) -> Result<Vec<CampaignEntity>, sqlx::Error> {
        sqlx::query_as::<_, CampaignEntity>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE status = $1 ORDER BY created_at"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
    }

    /// Compare-and-set status transition. Returns the updated row, or None
    /// when the campaign was not in `from` (lost race or admin action).
    pub async fn transition(
        &self,
        id: i64,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<Option<CampaignEntity>, sqlx::Error> {
        sqlx::query_as::<_, CampaignEntity>(&format!(
            r#"
            UPDATE campaigns
            SET status = $3,
                sent_at = CASE WHEN $3 = 'sent' THEN NOW() ELSE sent_at END
            WHERE id = $1 AND status = $2
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await
    }

    /// Current status only, the drain loop's send gate.
    pub async fn status(&self, id: i64) -> Result<Option<CampaignStatus>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT status FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|(s,)| s.parse().ok()))
    }

    /// Set total_recipients once the snapshot is frozen.
    pub async fn set_total_recipients(&self, id: i64, total: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaigns SET total_recipients = $2 WHERE id = $1")
            .bind(id)
            .bind(total as i32)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Recompute sent/bounced counters from the recipient snapshot.
    pub async fn refresh_counters(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE campaigns c
            SET sent_count = s.sent,
                opened_count = s.opened,
                clicked_count = s.clicked,
                bounced_count = s.bounced
            FROM (
                SELECT
                    COUNT(*) FILTER (WHERE status IN ('sent', 'opened', 'clicked')) AS sent,
                    COUNT(*) FILTER (WHERE status = 'opened') AS opened,
                    COUNT(*) FILTER (WHERE status = 'clicked') AS clicked,
                    COUNT(*) FILTER (WHERE status = 'bounced') AS bounced
                FROM campaign_recipients
                WHERE campaign_id = $1
            ) s
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
