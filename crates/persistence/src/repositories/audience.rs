//! Read-side queries over grant-platform tables.
//!
//! Supplies the record sets consumed by the pure aggregation and targeting
//! functions in the domain crate, plus the opted-in admin addresses for
//! report delivery.

use chrono::{DateTime, Utc};
use domain::models::{Grant, GrantApplication, User, Vote};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{
    GrantApplicationEntity, GrantEntity, GrantVoteEntity, OrgUnitAdminEntity, UserEntity,
};

/// Repository for audience and aggregation inputs.
pub struct AudienceRepository {
    pool: PgPool,
}

impl AudienceRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grants attributed to an org unit within a time window
    /// (attribution is by grant creation date).
    pub async fn grants_for_unit(
        &self,
        org_unit_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Grant>, sqlx::Error> {
        let rows = sqlx::query_as::<_, GrantEntity>(
            r#"
            SELECT id, org_unit_id, title, category, budget_cents, created_at
            FROM grants
            WHERE org_unit_id = $1 AND created_at >= $2 AND created_at < $3
            ORDER BY id
            "#,
        )
        .bind(org_unit_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(GrantEntity::to_domain).collect())
    }

    /// All applications for the given grants.
    pub async fn applications_for_grants(
        &self,
        grant_ids: &[Uuid],
    ) -> Result<Vec<GrantApplication>, sqlx::Error> {
        let rows = sqlx::query_as::<_, GrantApplicationEntity>(
            r#"
            SELECT id, grant_id, applicant_id, status, requested_amount_cents, created_at
            FROM grant_applications
            WHERE grant_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(grant_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().filter_map(GrantApplicationEntity::to_domain).collect())
    }

    /// All votes for the given grants.
    pub async fn votes_for_grants(&self, grant_ids: &[Uuid]) -> Result<Vec<Vote>, sqlx::Error> {
        let rows = sqlx::query_as::<_, GrantVoteEntity>(
            r#"
            SELECT id, grant_id, voter_id, vote_type, created_at
            FROM grant_votes
            WHERE grant_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(grant_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().filter_map(GrantVoteEntity::to_domain).collect())
    }

    /// Every user, for audience resolution.
    pub async fn all_users(&self) -> Result<Vec<User>, sqlx::Error> {
        let rows = sqlx::query_as::<_, UserEntity>(
            "SELECT id, name, email, role FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(UserEntity::to_domain).collect())
    }

    /// Every application, for by-status and by-category targeting.
    pub async fn all_applications(&self) -> Result<Vec<GrantApplication>, sqlx::Error> {
        let rows = sqlx::query_as::<_, GrantApplicationEntity>(
            r#"
            SELECT id, grant_id, applicant_id, status, requested_amount_cents, created_at
            FROM grant_applications
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().filter_map(GrantApplicationEntity::to_domain).collect())
    }

    /// Every grant, for by-category targeting.
    pub async fn all_grants(&self) -> Result<Vec<Grant>, sqlx::Error> {
        let rows = sqlx::query_as::<_, GrantEntity>(
            "SELECT id, org_unit_id, title, category, budget_cents, created_at FROM grants ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(GrantEntity::to_domain).collect())
    }

    /// Admins who should receive an org unit's reports: primary/secondary
    /// role, opted in, with a non-empty address.
    pub async fn report_recipients(
        &self,
        org_unit_id: Uuid,
    ) -> Result<Vec<OrgUnitAdminEntity>, sqlx::Error> {
        sqlx::query_as::<_, OrgUnitAdminEntity>(
            r#"
            SELECT a.org_unit_id, a.user_id, a.role, a.email_reports, u.name, u.email
            FROM org_unit_admins a
            JOIN users u ON u.id = a.user_id
            WHERE a.org_unit_id = $1
              AND a.email_reports
              AND a.role IN ('primary', 'secondary')
              AND u.email IS NOT NULL
              AND u.email <> ''
            ORDER BY u.email
            "#,
        )
        .bind(org_unit_id)
        .fetch_all(&self.pool)
        .await
    }
}
