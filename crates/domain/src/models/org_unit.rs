//! Org-unit administrator models, used only for report-delivery targeting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role of an administrator within an org unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Primary,
    Secondary,
    Viewer,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::Primary => "primary",
            AdminRole::Secondary => "secondary",
            AdminRole::Viewer => "viewer",
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(AdminRole::Primary),
            "secondary" => Ok(AdminRole::Secondary),
            "viewer" => Ok(AdminRole::Viewer),
            other => Err(format!("unknown admin role: {other}")),
        }
    }
}

/// Membership of a user in an org unit's admin team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgUnitAdmin {
    pub org_unit_id: Uuid,
    pub user_id: Uuid,
    pub role: AdminRole,
    /// Opt-in flag for emailed reports.
    pub email_reports: bool,
}

impl OrgUnitAdmin {
    /// Whether this admin should receive generated reports by email.
    /// Viewers never receive reports; primary/secondary must have opted in.
    pub fn receives_reports(&self) -> bool {
        self.email_reports && !matches!(self.role, AdminRole::Viewer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin(role: AdminRole, email_reports: bool) -> OrgUnitAdmin {
        OrgUnitAdmin {
            org_unit_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role,
            email_reports,
        }
    }

    #[test]
    fn test_opted_in_admins_receive_reports() {
        assert!(admin(AdminRole::Primary, true).receives_reports());
        assert!(admin(AdminRole::Secondary, true).receives_reports());
    }

    #[test]
    fn test_opt_out_and_viewers_excluded() {
        assert!(!admin(AdminRole::Primary, false).receives_reports());
        assert!(!admin(AdminRole::Viewer, true).receives_reports());
        assert!(!admin(AdminRole::Viewer, false).receives_reports());
    }

    #[test]
    fn test_admin_role_round_trip() {
        for role in [AdminRole::Primary, AdminRole::Secondary, AdminRole::Viewer] {
            assert_eq!(role.as_str().parse::<AdminRole>().unwrap(), role);
        }
    }
}
