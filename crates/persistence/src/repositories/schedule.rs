//! Report schedule repository.
//!
//! Schedules are created administratively; the sweep mutates only
//! next_scheduled_at and last_generated_at via `advance`.

use chrono::{DateTime, Utc};
use domain::models::CreateScheduleRequest;
use sqlx::PgPool;

use crate::entities::ScheduleEntity;

const SCHEDULE_COLUMNS: &str = "id, org_unit_id, report_type, day_of_period, time_of_day, active, \
     last_generated_at, next_scheduled_at, created_at, updated_at";

/// Repository for report schedule operations.
pub struct ScheduleRepository {
    pool: PgPool,
}

impl ScheduleRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a schedule. `next_scheduled_at` is computed by the caller
    /// from the recurrence fields so the invariant (strictly future,
    /// clamped day) lives in one place.
    pub async fn create(
        &self,
        request: &CreateScheduleRequest,
        next_scheduled_at: DateTime<Utc>,
    ) -> Result<ScheduleEntity, sqlx::Error> {
        let entity = sqlx::query_as::<_, ScheduleEntity>(&format!(
            r#"
            INSERT INTO report_schedules
                (org_unit_id, report_type, day_of_period, time_of_day, active, next_scheduled_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SCHEDULE_COLUMNS}
            "#
        ))
        .bind(request.org_unit_id)
        .bind(request.report_type.as_str())
        .bind(request.day_of_period as i32)
        .bind(request.time_of_day.to_string())
        .bind(request.active)
        .bind(next_scheduled_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(entity)
    }

    /// All active schedules whose next run is due at or before `now`.
    pub async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduleEntity>, sqlx::Error> {
        sqlx::query_as::<_, ScheduleEntity>(&format!(
            r#"
            SELECT {SCHEDULE_COLUMNS}
            FROM report_schedules
            WHERE active AND next_scheduled_at <= $1
            ORDER BY next_scheduled_at
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }

    /// Record a completed generation: stamp last_generated_at and move
    /// next_scheduled_at forward. The new instant is recomputed from the
    /// stored recurrence fields, never by incrementing the old value.
    pub async fn advance(
        &self,
        id: i64,
        next_scheduled_at: DateTime<Utc>,
        generated_at: DateTime<Utc>,
    ) -> Result<ScheduleEntity, sqlx::Error> {
        sqlx::query_as::<_, ScheduleEntity>(&format!(
            r#"
            UPDATE report_schedules
            SET next_scheduled_at = $2,
                last_generated_at = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SCHEDULE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(next_scheduled_at)
        .bind(generated_at)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<ScheduleEntity>, sqlx::Error> {
        sqlx::query_as::<_, ScheduleEntity>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM report_schedules WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Enable or disable a schedule (admin edit path).
    pub async fn set_active(&self, id: i64, active: bool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE report_schedules SET active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
