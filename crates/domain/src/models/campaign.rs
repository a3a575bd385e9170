//! Campaign domain models: lifecycle status, targeting descriptors and the
//! frozen recipient snapshot states.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::grant::ApplicationStatus;

/// Campaign lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sending,
    Sent,
    Paused,
    Cancelled,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Sent => "sent",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the drain loop may send messages for this campaign.
    /// Paused and cancelled campaigns are skipped, not sent.
    pub fn is_sendable(&self) -> bool {
        matches!(self, CampaignStatus::Sending)
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CampaignStatus::Draft),
            "scheduled" => Ok(CampaignStatus::Scheduled),
            "sending" => Ok(CampaignStatus::Sending),
            "sent" => Ok(CampaignStatus::Sent),
            "paused" => Ok(CampaignStatus::Paused),
            "cancelled" => Ok(CampaignStatus::Cancelled),
            other => Err(format!("unknown campaign status: {other}")),
        }
    }
}

/// Targeting descriptor. The criteria payload shape depends on the target
/// type, so this is a closed tagged enum rather than type + loose fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target_type", rename_all = "snake_case")]
pub enum TargetAudience {
    /// Every user with a non-empty email.
    AllUsers,
    /// Users with at least one application to a grant in these categories.
    ByCategory { categories: Vec<String> },
    /// Users with at least one application in these statuses.
    ByStatus { statuses: Vec<ApplicationStatus> },
    /// Users whose role matches.
    ByRole { roles: Vec<String> },
    /// An explicit user-id list.
    CustomList { user_ids: Vec<Uuid> },
}

impl TargetAudience {
    pub fn target_type(&self) -> &'static str {
        match self {
            TargetAudience::AllUsers => "all_users",
            TargetAudience::ByCategory { .. } => "by_category",
            TargetAudience::ByStatus { .. } => "by_status",
            TargetAudience::ByRole { .. } => "by_role",
            TargetAudience::CustomList { .. } => "custom_list",
        }
    }
}

/// Per-recipient delivery state inside a campaign snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientStatus {
    Pending,
    Sent,
    Opened,
    Clicked,
    Bounced,
    Failed,
}

impl RecipientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientStatus::Pending => "pending",
            RecipientStatus::Sent => "sent",
            RecipientStatus::Opened => "opened",
            RecipientStatus::Clicked => "clicked",
            RecipientStatus::Bounced => "bounced",
            RecipientStatus::Failed => "failed",
        }
    }

    /// A recipient needing no further send attempt.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RecipientStatus::Pending)
    }
}

impl fmt::Display for RecipientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecipientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RecipientStatus::Pending),
            "sent" => Ok(RecipientStatus::Sent),
            "opened" => Ok(RecipientStatus::Opened),
            "clicked" => Ok(RecipientStatus::Clicked),
            "bounced" => Ok(RecipientStatus::Bounced),
            "failed" => Ok(RecipientStatus::Failed),
            other => Err(format!("unknown recipient status: {other}")),
        }
    }
}

/// Aggregate send counters on a campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignCounters {
    pub total: u64,
    pub sent: u64,
    pub opened: u64,
    pub clicked: u64,
    pub bounced: u64,
}

/// Request to create a campaign. The recipient snapshot is frozen once at
/// creation from the audience descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCampaignRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(min = 1, max = 500))]
    pub subject: String,

    #[validate(length(min = 1))]
    pub body_content: String,

    /// Template key understood by the rendering collaborator.
    #[validate(length(min = 1, max = 100))]
    pub template_type: String,

    #[serde(flatten)]
    pub audience: TargetAudience,

    /// When set, the campaign starts as scheduled; otherwise draft.
    pub scheduled_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_sending_is_sendable() {
        use CampaignStatus::*;
        assert!(Sending.is_sendable());
        for status in [Draft, Scheduled, Sent, Paused, Cancelled] {
            assert!(!status.is_sendable(), "{status} must not be sendable");
        }
    }

    #[test]
    fn test_campaign_status_round_trip() {
        use CampaignStatus::*;
        for s in [Draft, Scheduled, Sending, Sent, Paused, Cancelled] {
            assert_eq!(s.as_str().parse::<CampaignStatus>().unwrap(), s);
        }
    }

    #[test]
    fn test_audience_serde_tagging() {
        let audience = TargetAudience::ByStatus {
            statuses: vec![ApplicationStatus::Approved, ApplicationStatus::Rejected],
        };
        let json = serde_json::to_string(&audience).unwrap();
        assert!(json.contains("\"target_type\":\"by_status\""));
        assert!(json.contains("\"approved\""));

        let back: TargetAudience = serde_json::from_str(&json).unwrap();
        assert_eq!(back, audience);
    }

    #[test]
    fn test_audience_all_users_round_trip() {
        let json = serde_json::to_string(&TargetAudience::AllUsers).unwrap();
        assert_eq!(json, "{\"target_type\":\"all_users\"}");
        let back: TargetAudience = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TargetAudience::AllUsers);
    }

    #[test]
    fn test_recipient_terminal_states() {
        use RecipientStatus::*;
        assert!(!Pending.is_terminal());
        for s in [Sent, Opened, Clicked, Bounced, Failed] {
            assert!(s.is_terminal());
        }
    }
}
