//! User records as seen by campaign targeting.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A platform user. Only the fields targeting needs are modeled here;
/// account management lives outside this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// May be absent or empty; such users are excluded from every audience.
    pub email: Option<String>,
    pub role: String,
}

impl User {
    /// The deliverable email address, if any.
    pub fn deliverable_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: email.map(String::from),
            role: "applicant".to_string(),
        }
    }

    #[test]
    fn test_deliverable_email() {
        assert_eq!(user(Some("a@b.c")).deliverable_email(), Some("a@b.c"));
        assert_eq!(user(None).deliverable_email(), None);
        assert_eq!(user(Some("")).deliverable_email(), None);
        assert_eq!(user(Some("   ")).deliverable_email(), None);
    }
}
