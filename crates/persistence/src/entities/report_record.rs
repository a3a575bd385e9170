//! Report record entity definitions.
//!
//! Maps to the report_records table: one durable row per (schedule, period)
//! carrying both the generation and delivery state machines.

use chrono::{DateTime, Utc};
use domain::models::{GenerationStatus, ReportDeliveryStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for the report_records table.
#[derive(Debug, Clone, FromRow)]
pub struct ReportRecordEntity {
    pub id: i64,
    pub schedule_id: i64,
    pub org_unit_id: Uuid,
    pub period: String,
    pub year: i32,
    pub month: i32,
    pub payload: Option<serde_json::Value>,
    pub generation_status: String,
    pub generation_error: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
    pub delivery_status: String,
    pub delivery_error: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub delivered_to: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ReportRecordEntity {
    pub fn generation_status(&self) -> Result<GenerationStatus, String> {
        self.generation_status.parse()
    }

    pub fn delivery_status(&self) -> Result<ReportDeliveryStatus, String> {
        self.delivery_status.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        let entity = ReportRecordEntity {
            id: 1,
            schedule_id: 1,
            org_unit_id: Uuid::new_v4(),
            period: "2025-02".to_string(),
            year: 2025,
            month: 2,
            payload: None,
            generation_status: "generating".to_string(),
            generation_error: None,
            generated_at: None,
            delivery_status: "pending".to_string(),
            delivery_error: None,
            delivered_at: None,
            delivered_to: vec![],
            created_at: Utc::now(),
        };
        assert_eq!(entity.generation_status().unwrap(), GenerationStatus::Generating);
        assert_eq!(entity.delivery_status().unwrap(), ReportDeliveryStatus::Pending);
    }
}
