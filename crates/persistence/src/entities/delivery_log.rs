//! Delivery log entity definitions.
//!
//! Append-only audit trail of every send attempt; rows are updated only for
//! retry bookkeeping (attempts, last_attempt_at, final status).

use chrono::{DateTime, Utc};
use domain::models::DeliveryStatus;
use sqlx::FromRow;

/// Database entity for the delivery_log table.
#[derive(Debug, Clone, FromRow)]
pub struct DeliveryLogEntity {
    pub id: i64,
    pub campaign_id: Option<i64>,
    pub recipient_email: String,
    pub subject: String,
    pub provider_message_id: Option<String>,
    pub provider: String,
    pub status: String,
    pub error_message: Option<String>,
    pub delivery_time_ms: Option<i64>,
    pub attempts: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DeliveryLogEntity {
    pub fn status(&self) -> Result<DeliveryStatus, String> {
        self.status.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::SafeEmail;
    use fake::Fake;

    #[test]
    fn test_status_parsing() {
        let entity = DeliveryLogEntity {
            id: 1,
            campaign_id: None,
            recipient_email: SafeEmail().fake(),
            subject: "Monthly report".to_string(),
            provider_message_id: Some("msg-1".to_string()),
            provider: "console".to_string(),
            status: "sent".to_string(),
            error_message: None,
            delivery_time_ms: Some(12),
            attempts: 1,
            last_attempt_at: Some(Utc::now()),
            created_at: Utc::now(),
        };
        assert_eq!(entity.status().unwrap(), DeliveryStatus::Sent);
    }
}
