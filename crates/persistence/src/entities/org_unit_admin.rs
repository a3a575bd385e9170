//! Org-unit admin entity definitions.

use domain::models::{AdminRole, OrgUnitAdmin};
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for the org_unit_admins table, joined with the admin's
/// name and email for report delivery.
#[derive(Debug, Clone, FromRow)]
pub struct OrgUnitAdminEntity {
    pub org_unit_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub email_reports: bool,
    pub name: String,
    pub email: Option<String>,
}

impl OrgUnitAdminEntity {
    pub fn role(&self) -> Result<AdminRole, String> {
        self.role.parse()
    }

    /// Convert to the domain model, dropping rows with unknown roles.
    pub fn to_domain(&self) -> Option<OrgUnitAdmin> {
        Some(OrgUnitAdmin {
            org_unit_id: self.org_unit_id,
            user_id: self.user_id,
            role: self.role().ok()?,
            email_reports: self.email_reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_domain() {
        let entity = OrgUnitAdminEntity {
            org_unit_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: "primary".to_string(),
            email_reports: true,
            name: "Ada Admin".to_string(),
            email: Some("admin@example.org".to_string()),
        };
        let admin = entity.to_domain().unwrap();
        assert_eq!(admin.role, AdminRole::Primary);
        assert!(admin.receives_reports());
    }

    #[test]
    fn test_unknown_role_dropped() {
        let entity = OrgUnitAdminEntity {
            org_unit_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: "owner".to_string(),
            email_reports: true,
            name: "Nameless Owner".to_string(),
            email: None,
        };
        assert!(entity.to_domain().is_none());
    }
}
