//! Report record state machines and the aggregated report payload.
//!
//! A report record tracks two independent lifecycles: generation
//! (pending -> generating -> completed | failed) and delivery
//! (pending -> sent | failed). Delivery may only leave pending once
//! generation has completed, and a completed payload is immutable.

use serde::{Deserialize, Serialize};
use shared::period::Period;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::grant::VoteTally;

/// Generation lifecycle of a report record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Generating => "generating",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }

    /// Completed and failed are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Failed)
    }

    /// Whether moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: GenerationStatus) -> bool {
        matches!(
            (self, next),
            (GenerationStatus::Pending, GenerationStatus::Generating)
                | (GenerationStatus::Generating, GenerationStatus::Completed)
                | (GenerationStatus::Generating, GenerationStatus::Failed)
        )
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(GenerationStatus::Pending),
            "generating" => Ok(GenerationStatus::Generating),
            "completed" => Ok(GenerationStatus::Completed),
            "failed" => Ok(GenerationStatus::Failed),
            other => Err(format!("unknown generation status: {other}")),
        }
    }
}

/// Delivery lifecycle of a report record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportDeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl ReportDeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportDeliveryStatus::Pending => "pending",
            ReportDeliveryStatus::Sent => "sent",
            ReportDeliveryStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportDeliveryStatus::Sent | ReportDeliveryStatus::Failed)
    }

    /// Delivery may only leave pending when generation has completed.
    pub fn can_transition_to(
        &self,
        next: ReportDeliveryStatus,
        generation: GenerationStatus,
    ) -> bool {
        *self == ReportDeliveryStatus::Pending
            && next != ReportDeliveryStatus::Pending
            && generation == GenerationStatus::Completed
    }
}

impl fmt::Display for ReportDeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportDeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReportDeliveryStatus::Pending),
            "sent" => Ok(ReportDeliveryStatus::Sent),
            "failed" => Ok(ReportDeliveryStatus::Failed),
            other => Err(format!("unknown delivery status: {other}")),
        }
    }
}

/// Vote counts plus per-type percentages, as exposed in the payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingSummary {
    pub total_votes: u64,
    pub support_votes: u64,
    pub oppose_votes: u64,
    pub neutral_votes: u64,
    pub support_percentage: u32,
    pub oppose_percentage: u32,
    pub neutral_percentage: u32,
}

impl VotingSummary {
    /// Build a summary from a raw tally, rounding each percentage.
    pub fn from_tally(tally: &VoteTally) -> Self {
        let total = tally.total();
        let pct = |count: u64| -> u32 {
            if total == 0 {
                0
            } else {
                ((count as f64 / total as f64) * 100.0).round() as u32
            }
        };
        Self {
            total_votes: total,
            support_votes: tally.support,
            oppose_votes: tally.oppose,
            neutral_votes: tally.neutral,
            support_percentage: pct(tally.support),
            oppose_percentage: pct(tally.oppose),
            neutral_percentage: pct(tally.neutral),
        }
    }
}

/// Per-grant breakdown inside a report payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantReportDetail {
    pub grant_id: Uuid,
    pub title: String,
    pub category: String,
    pub budget_cents: i64,
    pub total_applications: u64,
    pub approved_applications: u64,
    pub rejected_applications: u64,
    /// Rounded percentage in 0..=100; 0 when there are no applications.
    pub success_rate: u32,
    pub voting: VotingSummary,
}

/// The aggregated report for one org unit and period.
///
/// Consumed by the export/formatting collaborator; field names follow the
/// exchange contract (camelCase). Always fully populated: an empty period
/// yields zeros, never nulls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub org_unit: Uuid,
    pub period: Period,
    pub total_grants: u64,
    pub total_applications: u64,
    pub approved_applications: u64,
    pub rejected_applications: u64,
    pub success_rate: u32,
    pub total_funding_allocated_cents: i64,
    pub total_funding_awarded_cents: i64,
    pub community_voting: VotingSummary,
    pub grant_details: Vec<GrantReportDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_legal_transitions() {
        use GenerationStatus::*;
        assert!(Pending.can_transition_to(Generating));
        assert!(Generating.can_transition_to(Completed));
        assert!(Generating.can_transition_to(Failed));
    }

    #[test]
    fn test_generation_illegal_transitions() {
        use GenerationStatus::*;
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Generating));
        assert!(!Failed.can_transition_to(Generating));
        assert!(!Completed.can_transition_to(Failed));
    }

    #[test]
    fn test_delivery_requires_completed_generation() {
        use ReportDeliveryStatus::*;
        assert!(Pending.can_transition_to(Sent, GenerationStatus::Completed));
        assert!(Pending.can_transition_to(Failed, GenerationStatus::Completed));
        assert!(!Pending.can_transition_to(Sent, GenerationStatus::Pending));
        assert!(!Pending.can_transition_to(Sent, GenerationStatus::Generating));
        assert!(!Pending.can_transition_to(Sent, GenerationStatus::Failed));
    }

    #[test]
    fn test_delivery_terminal_states_frozen() {
        use ReportDeliveryStatus::*;
        assert!(!Sent.can_transition_to(Failed, GenerationStatus::Completed));
        assert!(!Failed.can_transition_to(Sent, GenerationStatus::Completed));
        assert!(Sent.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn test_voting_summary_percentages() {
        let tally = VoteTally {
            support: 2,
            oppose: 1,
            neutral: 1,
        };
        let summary = VotingSummary::from_tally(&tally);
        assert_eq!(summary.total_votes, 4);
        assert_eq!(summary.support_percentage, 50);
        assert_eq!(summary.oppose_percentage, 25);
        assert_eq!(summary.neutral_percentage, 25);
    }

    #[test]
    fn test_voting_summary_empty_is_all_zero() {
        let summary = VotingSummary::from_tally(&VoteTally::default());
        assert_eq!(summary, VotingSummary::default());
    }

    #[test]
    fn test_voting_summary_rounding() {
        // 1/3 -> 33, 2/3 -> 67
        let tally = VoteTally {
            support: 2,
            oppose: 1,
            neutral: 0,
        };
        let summary = VotingSummary::from_tally(&tally);
        assert_eq!(summary.support_percentage, 67);
        assert_eq!(summary.oppose_percentage, 33);
        assert_eq!(summary.neutral_percentage, 0);
    }

    #[test]
    fn test_payload_serializes_camel_case() {
        let payload = ReportPayload {
            org_unit: Uuid::nil(),
            period: "2025-02".parse().unwrap(),
            total_grants: 0,
            total_applications: 0,
            approved_applications: 0,
            rejected_applications: 0,
            success_rate: 0,
            total_funding_allocated_cents: 0,
            total_funding_awarded_cents: 0,
            community_voting: VotingSummary::default(),
            grant_details: vec![],
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"totalGrants\":0"));
        assert!(json.contains("\"communityVoting\""));
        assert!(json.contains("\"grantDetails\":[]"));
        assert!(json.contains("\"period\":\"2025-02\""));
    }
}
