//! Grant-platform entities read by aggregation and targeting.
//!
//! These tables are owned by the grants platform; this service only reads
//! them. Conversion into domain records drops rows whose status/vote text
//! fails to parse, logging rather than aborting a whole aggregation.

use chrono::{DateTime, Utc};
use domain::models::{Grant, GrantApplication, User, Vote};
use sqlx::FromRow;
use tracing::warn;
use uuid::Uuid;

/// Database entity for the grants table.
#[derive(Debug, Clone, FromRow)]
pub struct GrantEntity {
    pub id: Uuid,
    pub org_unit_id: Uuid,
    pub title: String,
    pub category: String,
    pub budget_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl GrantEntity {
    pub fn to_domain(&self) -> Grant {
        Grant {
            id: self.id,
            title: self.title.clone(),
            category: self.category.clone(),
            budget_cents: self.budget_cents,
            created_at: self.created_at,
        }
    }
}

/// Database entity for the grant_applications table.
#[derive(Debug, Clone, FromRow)]
pub struct GrantApplicationEntity {
    pub id: Uuid,
    pub grant_id: Uuid,
    pub applicant_id: Uuid,
    pub status: String,
    pub requested_amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl GrantApplicationEntity {
    pub fn to_domain(&self) -> Option<GrantApplication> {
        let status = match self.status.parse() {
            Ok(s) => s,
            Err(e) => {
                warn!(application_id = %self.id, error = %e, "Skipping application with unknown status");
                return None;
            }
        };
        Some(GrantApplication {
            id: self.id,
            grant_id: self.grant_id,
            applicant_id: self.applicant_id,
            status,
            requested_amount_cents: self.requested_amount_cents,
            created_at: self.created_at,
        })
    }
}

/// Database entity for the grant_votes table.
#[derive(Debug, Clone, FromRow)]
pub struct GrantVoteEntity {
    pub id: Uuid,
    pub grant_id: Uuid,
    pub voter_id: Uuid,
    pub vote_type: String,
    pub created_at: DateTime<Utc>,
}

impl GrantVoteEntity {
    pub fn to_domain(&self) -> Option<Vote> {
        let vote_type = match self.vote_type.parse() {
            Ok(v) => v,
            Err(e) => {
                warn!(vote_id = %self.id, error = %e, "Skipping vote with unknown type");
                return None;
            }
        };
        Some(Vote {
            id: self.id,
            grant_id: self.grant_id,
            voter_id: self.voter_id,
            vote_type,
            created_at: self.created_at,
        })
    }
}

/// Database entity for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub role: String,
}

impl UserEntity {
    pub fn to_domain(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{ApplicationStatus, VoteType};

    #[test]
    fn test_application_conversion() {
        let entity = GrantApplicationEntity {
            id: Uuid::new_v4(),
            grant_id: Uuid::new_v4(),
            applicant_id: Uuid::new_v4(),
            status: "under_review".to_string(),
            requested_amount_cents: 5_000,
            created_at: Utc::now(),
        };
        let app = entity.to_domain().unwrap();
        assert_eq!(app.status, ApplicationStatus::UnderReview);
    }

    #[test]
    fn test_unknown_status_skipped() {
        let entity = GrantApplicationEntity {
            id: Uuid::new_v4(),
            grant_id: Uuid::new_v4(),
            applicant_id: Uuid::new_v4(),
            status: "withdrawn".to_string(),
            requested_amount_cents: 0,
            created_at: Utc::now(),
        };
        assert!(entity.to_domain().is_none());
    }

    #[test]
    fn test_vote_conversion() {
        let entity = GrantVoteEntity {
            id: Uuid::new_v4(),
            grant_id: Uuid::new_v4(),
            voter_id: Uuid::new_v4(),
            vote_type: "oppose".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(entity.to_domain().unwrap().vote_type, VoteType::Oppose);
    }
}
