//! Delivery log repository.
//!
//! The log is append-only: one row per outbound message, created at first
//! attempt and updated only for retry bookkeeping and the final status.

use chrono::Utc;
use domain::models::{DeliveryStats, DeliveryStatus};
use sqlx::PgPool;

use crate::entities::DeliveryLogEntity;

const LOG_COLUMNS: &str = "id, campaign_id, recipient_email, subject, provider_message_id, \
     provider, status, error_message, delivery_time_ms, attempts, last_attempt_at, created_at";

/// Fields for opening a delivery log entry.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub campaign_id: Option<i64>,
    pub recipient_email: String,
    pub subject: String,
    pub provider: String,
}

/// Repository for delivery log operations.
pub struct DeliveryLogRepository {
    pool: PgPool,
}

impl DeliveryLogRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pending log entry for a message about to be attempted.
    pub async fn open(&self, entry: &NewLogEntry) -> Result<DeliveryLogEntity, sqlx::Error> {
        sqlx::query_as::<_, DeliveryLogEntity>(&format!(
            r#"
            INSERT INTO delivery_log (campaign_id, recipient_email, subject, provider)
            VALUES ($1, $2, $3, $4)
            RETURNING {LOG_COLUMNS}
            "#
        ))
        .bind(entry.campaign_id)
        .bind(&entry.recipient_email)
        .bind(&entry.subject)
        .bind(&entry.provider)
        .fetch_one(&self.pool)
        .await
    }

    /// Record one send attempt: bumps the attempt counter, stamps
    /// last_attempt_at and sets the resulting status.
    pub async fn record_attempt(
        &self,
        id: i64,
        status: DeliveryStatus,
        provider_message_id: Option<&str>,
        error_message: Option<&str>,
        delivery_time_ms: Option<i64>,
    ) -> Result<DeliveryLogEntity, sqlx::Error> {
        sqlx::query_as::<_, DeliveryLogEntity>(&format!(
            r#"
            UPDATE delivery_log
            SET status = $2,
                provider_message_id = COALESCE($3, provider_message_id),
                error_message = $4,
                delivery_time_ms = $5,
                attempts = attempts + 1,
                last_attempt_at = $6
            WHERE id = $1
            RETURNING {LOG_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(provider_message_id)
        .bind(error_message)
        .bind(delivery_time_ms)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    /// Aggregate counts over the whole log, the dashboard source.
    pub async fn stats(&self) -> Result<DeliveryStats, sqlx::Error> {
        let row: (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status IN ('sent', 'opened', 'clicked')),
                COUNT(*) FILTER (WHERE status = 'failed'),
                COUNT(*) FILTER (WHERE status = 'bounced'),
                COUNT(*) FILTER (WHERE status = 'pending')
            FROM delivery_log
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DeliveryStats {
            total: row.0 as u64,
            sent: row.1 as u64,
            failed: row.2 as u64,
            bounced: row.3 as u64,
            pending: row.4 as u64,
        })
    }

    /// Per-provider (sent, failed) counts for the health view.
    pub async fn stats_by_provider(&self) -> Result<Vec<(String, i64, i64)>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT provider,
                   COUNT(*) FILTER (WHERE status IN ('sent', 'opened', 'clicked')),
                   COUNT(*) FILTER (WHERE status IN ('failed', 'bounced'))
            FROM delivery_log
            GROUP BY provider
            ORDER BY provider
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
