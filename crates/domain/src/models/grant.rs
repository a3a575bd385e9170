//! Grant, application and community-vote records consumed by report
//! aggregation and campaign targeting.
//!
//! These are read-only inputs here; grant CRUD lives outside this service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A grant program owned by an org unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    /// Allocated budget in minor currency units (cents).
    pub budget_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Application review status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ApplicationStatus::Draft),
            "submitted" => Ok(ApplicationStatus::Submitted),
            "under_review" => Ok(ApplicationStatus::UnderReview),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(format!("unknown application status: {other}")),
        }
    }
}

/// An application submitted by a user against a grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantApplication {
    pub id: Uuid,
    pub grant_id: Uuid,
    pub applicant_id: Uuid,
    pub status: ApplicationStatus,
    /// Requested amount in minor currency units (cents).
    pub requested_amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Community vote kind. Closed set; votes never carry free-form kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteType {
    Support,
    Oppose,
    Neutral,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Support => "support",
            VoteType::Oppose => "oppose",
            VoteType::Neutral => "neutral",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "support" => Ok(VoteType::Support),
            "oppose" => Ok(VoteType::Oppose),
            "neutral" => Ok(VoteType::Neutral),
            other => Err(format!("unknown vote type: {other}")),
        }
    }
}

/// A community vote on a grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub grant_id: Uuid,
    pub voter_id: Uuid,
    pub vote_type: VoteType,
    pub created_at: DateTime<Utc>,
}

/// Vote counts by type for one grant or summed across an org unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub support: u64,
    pub oppose: u64,
    pub neutral: u64,
}

impl VoteTally {
    pub fn total(&self) -> u64 {
        self.support + self.oppose + self.neutral
    }

    /// Count one vote.
    pub fn record(&mut self, vote_type: VoteType) {
        match vote_type {
            VoteType::Support => self.support += 1,
            VoteType::Oppose => self.oppose += 1,
            VoteType::Neutral => self.neutral += 1,
        }
    }

    /// Sum two tallies (org-unit aggregation over grants).
    pub fn add(&mut self, other: &VoteTally) {
        self.support += other.support;
        self.oppose += other.oppose;
        self.neutral += other.neutral;
    }
}
