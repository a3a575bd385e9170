//! Report schedule domain models.
//!
//! A schedule is a recurrence definition owned by an org unit: which day of
//! the period and what UTC time a report should be generated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

/// Report cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Monthly,
    Quarterly,
    Annual,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Monthly => "monthly",
            ReportType::Quarterly => "quarterly",
            ReportType::Annual => "annual",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = ScheduleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(ReportType::Monthly),
            "quarterly" => Ok(ReportType::Quarterly),
            "annual" => Ok(ReportType::Annual),
            other => Err(ScheduleParseError::UnknownReportType(other.to_string())),
        }
    }
}

/// Errors from parsing persisted schedule fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleParseError {
    #[error("unknown report type: {0}")]
    UnknownReportType(String),

    #[error("invalid time of day, expected HH:MM: {0}")]
    InvalidTimeOfDay(String),
}

/// A wall-clock time of day in UTC, stored as "HH:MM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleParseError::InvalidTimeOfDay(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        TimeOfDay::new(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ScheduleParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

/// Request to create a report schedule for an org unit.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateScheduleRequest {
    pub org_unit_id: Uuid,

    pub report_type: ReportType,

    /// Day of the period (1-31). Days past the end of a short month clamp
    /// to the month's last day at scheduling time.
    #[validate(range(min = 1, max = 31))]
    pub day_of_period: u32,

    /// "HH:MM" in UTC.
    pub time_of_day: TimeOfDay,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_type_round_trip() {
        for t in [ReportType::Monthly, ReportType::Quarterly, ReportType::Annual] {
            assert_eq!(t.as_str().parse::<ReportType>().unwrap(), t);
        }
        assert!("weekly".parse::<ReportType>().is_err());
    }

    #[test]
    fn test_time_of_day_parse() {
        let t: TimeOfDay = "02:00".parse().unwrap();
        assert_eq!((t.hour, t.minute), (2, 0));
        assert_eq!(t.to_string(), "02:00");

        let t: TimeOfDay = "23:59".parse().unwrap();
        assert_eq!((t.hour, t.minute), (23, 59));
    }

    #[test]
    fn test_time_of_day_rejects_out_of_range() {
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("noon".parse::<TimeOfDay>().is_err());
        assert!("12".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_create_schedule_request_validates_day() {
        let mut req = CreateScheduleRequest {
            org_unit_id: Uuid::new_v4(),
            report_type: ReportType::Monthly,
            day_of_period: 15,
            time_of_day: "08:30".parse().unwrap(),
            active: true,
        };
        assert!(validator::Validate::validate(&req).is_ok());

        req.day_of_period = 0;
        assert!(validator::Validate::validate(&req).is_err());

        req.day_of_period = 32;
        assert!(validator::Validate::validate(&req).is_err());
    }
}
