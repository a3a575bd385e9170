//! Campaign recipient repository.
//!
//! The snapshot is written once at campaign creation; afterwards only the
//! delivery process mutates per-recipient status.

use chrono::Utc;
use domain::models::RecipientStatus;
use domain::services::targeting::ResolvedRecipient;
use sqlx::PgPool;

use crate::entities::CampaignRecipientEntity;

const RECIPIENT_COLUMNS: &str = "id, campaign_id, user_id, email, status, sent_at, opened_at, \
     clicked_at, bounced_at, failed_at, error_message";

/// Repository for campaign recipient snapshots.
pub struct CampaignRecipientRepository {
    pool: PgPool,
}

impl CampaignRecipientRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Freeze the resolved audience as the campaign's snapshot.
    ///
    /// The unique (campaign_id, email) constraint plus ON CONFLICT DO
    /// NOTHING makes this idempotent; re-running creation after a partial
    /// write cannot duplicate rows. Returns the number of rows stored.
    pub async fn freeze_snapshot(
        &self,
        campaign_id: i64,
        recipients: &[ResolvedRecipient],
    ) -> Result<u64, sqlx::Error> {
        let mut stored = 0u64;
        for recipient in recipients {
            let result = sqlx::query(
                r#"
                INSERT INTO campaign_recipients (campaign_id, user_id, email)
                VALUES ($1, $2, $3)
                ON CONFLICT (campaign_id, email) DO NOTHING
                "#,
            )
            .bind(campaign_id)
            .bind(recipient.user_id)
            .bind(&recipient.email)
            .execute(&self.pool)
            .await?;
            stored += result.rows_affected();
        }
        Ok(stored)
    }

    /// Recipients still awaiting a send attempt.
    pub async fn find_pending(
        &self,
        campaign_id: i64,
        limit: i64,
    ) -> Result<Vec<CampaignRecipientEntity>, sqlx::Error> {
        sqlx::query_as::<_, CampaignRecipientEntity>(&format!(
            r#"
            SELECT {RECIPIENT_COLUMNS}
            FROM campaign_recipients
            WHERE campaign_id = $1 AND status = 'pending'
            ORDER BY id
            LIMIT $2
            "#
        ))
        .bind(campaign_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Record the outcome of a send attempt for one recipient. The matching
    /// per-status timestamp column is stamped alongside the status.
    pub async fn set_status(
        &self,
        id: i64,
        status: RecipientStatus,
        error_message: Option<&str>,
    ) -> Result<Option<CampaignRecipientEntity>, sqlx::Error> {
        let now = Utc::now();
        let timestamp_column = match status {
            RecipientStatus::Sent => "sent_at",
            RecipientStatus::Opened => "opened_at",
            RecipientStatus::Clicked => "clicked_at",
            RecipientStatus::Bounced => "bounced_at",
            RecipientStatus::Failed => "failed_at",
            RecipientStatus::Pending => "sent_at", // pending stamps nothing meaningful
        };

        sqlx::query_as::<_, CampaignRecipientEntity>(&format!(
            r#"
            UPDATE campaign_recipients
            SET status = $2,
                {timestamp_column} = $3,
                error_message = $4
            WHERE id = $1
            RETURNING {RECIPIENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(now)
        .bind(error_message)
        .fetch_optional(&self.pool)
        .await
    }

    /// Count of recipients not yet in a terminal state.
    pub async fn pending_count(&self, campaign_id: i64) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM campaign_recipients WHERE campaign_id = $1 AND status = 'pending'",
        )
        .bind(campaign_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }
}
