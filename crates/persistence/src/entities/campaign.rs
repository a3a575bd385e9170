//! Campaign entity definitions.

use chrono::{DateTime, Utc};
use domain::models::{CampaignCounters, CampaignStatus, TargetAudience};
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for the campaigns table.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignEntity {
    pub id: i64,
    pub created_by: Uuid,
    pub name: String,
    pub subject: String,
    pub body_content: String,
    pub template_type: String,
    pub target_type: String,
    pub target_criteria: serde_json::Value,
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub total_recipients: i32,
    pub sent_count: i32,
    pub opened_count: i32,
    pub clicked_count: i32,
    pub bounced_count: i32,
    pub created_at: DateTime<Utc>,
}

impl CampaignEntity {
    pub fn status(&self) -> Result<CampaignStatus, String> {
        self.status.parse()
    }

    /// Deserialize the stored targeting descriptor. The criteria column
    /// holds the full tagged form, target_type is denormalized for queries.
    pub fn audience(&self) -> Result<TargetAudience, serde_json::Error> {
        serde_json::from_value(self.target_criteria.clone())
    }

    pub fn counters(&self) -> CampaignCounters {
        CampaignCounters {
            total: self.total_recipients.max(0) as u64,
            sent: self.sent_count.max(0) as u64,
            opened: self.opened_count.max(0) as u64,
            clicked: self.clicked_count.max(0) as u64,
            bounced: self.bounced_count.max(0) as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_audience_round_trip() {
        let entity = CampaignEntity {
            id: 1,
            created_by: Uuid::new_v4(),
            name: "Spring round".to_string(),
            subject: "New grants open".to_string(),
            body_content: "Hello ${name}".to_string(),
            template_type: "announcement".to_string(),
            target_type: "by_role".to_string(),
            target_criteria: json!({"target_type": "by_role", "roles": ["reviewer"]}),
            status: "scheduled".to_string(),
            scheduled_at: None,
            sent_at: None,
            total_recipients: 3,
            sent_count: 1,
            opened_count: 0,
            clicked_count: 0,
            bounced_count: 0,
            created_at: Utc::now(),
        };
        assert_eq!(entity.status().unwrap(), CampaignStatus::Scheduled);
        assert_eq!(
            entity.audience().unwrap(),
            TargetAudience::ByRole {
                roles: vec!["reviewer".to_string()]
            }
        );
        assert_eq!(entity.counters().total, 3);
        assert_eq!(entity.counters().sent, 1);
    }
}
