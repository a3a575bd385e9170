//! Report schedule entity definitions.
//!
//! Maps to the report_schedules table.

use chrono::{DateTime, Utc};
use domain::models::schedule::ScheduleParseError;
use domain::models::{ReportType, TimeOfDay};
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for the report_schedules table.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduleEntity {
    pub id: i64,
    pub org_unit_id: Uuid,
    pub report_type: String,
    pub day_of_period: i32,
    pub time_of_day: String,
    pub active: bool,
    pub last_generated_at: Option<DateTime<Utc>>,
    pub next_scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleEntity {
    /// Parsed report type; rows are constrained by the schema, so a parse
    /// failure means a migration bug.
    pub fn report_type(&self) -> Result<ReportType, ScheduleParseError> {
        self.report_type.parse()
    }

    /// Parsed "HH:MM" time of day.
    pub fn time_of_day(&self) -> Result<TimeOfDay, ScheduleParseError> {
        self.time_of_day.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> ScheduleEntity {
        ScheduleEntity {
            id: 1,
            org_unit_id: Uuid::new_v4(),
            report_type: "monthly".to_string(),
            day_of_period: 31,
            time_of_day: "02:00".to_string(),
            active: true,
            last_generated_at: None,
            next_scheduled_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_parses_stored_fields() {
        let e = entity();
        assert_eq!(e.report_type().unwrap(), ReportType::Monthly);
        let t = e.time_of_day().unwrap();
        assert_eq!((t.hour, t.minute), (2, 0));
    }

    #[test]
    fn test_corrupt_row_reports_error() {
        let mut e = entity();
        e.report_type = "biweekly".to_string();
        assert!(e.report_type().is_err());
        e.time_of_day = "2am".to_string();
        assert!(e.time_of_day().is_err());
    }
}
