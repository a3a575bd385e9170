//! Report record repository.
//!
//! Provides guarded creation (one row per schedule and period) and the two
//! status state machines. The payload is written exactly once, at
//! generation completion, and is never updated afterwards.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::ReportRecordEntity;
use shared::period::Period;

const RECORD_COLUMNS: &str = "id, schedule_id, org_unit_id, period, year, month, payload, \
     generation_status, generation_error, generated_at, \
     delivery_status, delivery_error, delivered_at, delivered_to, created_at";

/// Repository for report record operations.
pub struct ReportRecordRepository {
    pool: PgPool,
}

impl ReportRecordRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch-or-create the record for (schedule, period).
    ///
    /// A sweep re-run after a crash hits the unique constraint instead of
    /// inserting a duplicate history row; the existing record is returned
    /// with whatever state it reached.
    pub async fn get_or_create(
        &self,
        schedule_id: i64,
        org_unit_id: Uuid,
        period: Period,
    ) -> Result<ReportRecordEntity, sqlx::Error> {
        if let Some(existing) = sqlx::query_as::<_, ReportRecordEntity>(&format!(
            "SELECT {RECORD_COLUMNS} FROM report_records WHERE schedule_id = $1 AND period = $2"
        ))
        .bind(schedule_id)
        .bind(period.to_string())
        .fetch_optional(&self.pool)
        .await?
        {
            return Ok(existing);
        }

        sqlx::query_as::<_, ReportRecordEntity>(&format!(
            r#"
            INSERT INTO report_records (schedule_id, org_unit_id, period, year, month)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ON CONSTRAINT uq_report_records_schedule_period DO UPDATE
                SET schedule_id = report_records.schedule_id
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(schedule_id)
        .bind(org_unit_id)
        .bind(period.to_string())
        .bind(period.year())
        .bind(period.month() as i32)
        .fetch_one(&self.pool)
        .await
    }

    /// pending -> generating. Returns None when the record is no longer
    /// pending (another process already picked it up).
    pub async fn mark_generating(
        &self,
        id: i64,
    ) -> Result<Option<ReportRecordEntity>, sqlx::Error> {
        sqlx::query_as::<_, ReportRecordEntity>(&format!(
            r#"
            UPDATE report_records
            SET generation_status = 'generating'
            WHERE id = $1 AND generation_status = 'pending'
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// generating -> completed, writing the immutable payload and
    /// generated_at. The status guard keeps completed payloads frozen.
    pub async fn complete_generation(
        &self,
        id: i64,
        payload: &serde_json::Value,
    ) -> Result<Option<ReportRecordEntity>, sqlx::Error> {
        sqlx::query_as::<_, ReportRecordEntity>(&format!(
            r#"
            UPDATE report_records
            SET generation_status = 'completed',
                payload = $2,
                generated_at = $3
            WHERE id = $1 AND generation_status = 'generating'
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(payload)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
    }

    /// generating -> failed with the captured error message.
    pub async fn fail_generation(
        &self,
        id: i64,
        error: &str,
    ) -> Result<Option<ReportRecordEntity>, sqlx::Error> {
        sqlx::query_as::<_, ReportRecordEntity>(&format!(
            r#"
            UPDATE report_records
            SET generation_status = 'failed',
                generation_error = $2
            WHERE id = $1 AND generation_status IN ('pending', 'generating')
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(error)
        .fetch_optional(&self.pool)
        .await
    }

    /// Completed reports whose delivery is still pending.
    pub async fn find_awaiting_delivery(
        &self,
        limit: i64,
    ) -> Result<Vec<ReportRecordEntity>, sqlx::Error> {
        sqlx::query_as::<_, ReportRecordEntity>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM report_records
            WHERE generation_status = 'completed' AND delivery_status = 'pending'
            ORDER BY generated_at
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// delivery pending -> sent. Guarded on completed generation, per the
    /// state-machine invariant.
    pub async fn mark_delivered(
        &self,
        id: i64,
        delivered_to: &[String],
    ) -> Result<Option<ReportRecordEntity>, sqlx::Error> {
        sqlx::query_as::<_, ReportRecordEntity>(&format!(
            r#"
            UPDATE report_records
            SET delivery_status = 'sent',
                delivered_at = $2,
                delivered_to = $3
            WHERE id = $1
              AND generation_status = 'completed'
              AND delivery_status = 'pending'
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(Utc::now())
        .bind(delivered_to)
        .fetch_optional(&self.pool)
        .await
    }

    /// delivery pending -> failed with the captured error message.
    pub async fn fail_delivery(
        &self,
        id: i64,
        error: &str,
    ) -> Result<Option<ReportRecordEntity>, sqlx::Error> {
        sqlx::query_as::<_, ReportRecordEntity>(&format!(
            r#"
            UPDATE report_records
            SET delivery_status = 'failed',
                delivery_error = $2
            WHERE id = $1
              AND generation_status = 'completed'
              AND delivery_status = 'pending'
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(error)
        .fetch_optional(&self.pool)
        .await
    }
}
