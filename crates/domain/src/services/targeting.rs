//! Campaign audience resolution.
//!
//! Resolves a targeting descriptor into a deduplicated (user, email) set.
//! The result is what gets frozen into CampaignRecipient rows at campaign
//! creation; later data changes never alter an existing snapshot.

use std::collections::HashSet;
use uuid::Uuid;

use crate::models::{Grant, GrantApplication, TargetAudience, User};

/// One resolved audience member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecipient {
    pub user_id: Uuid,
    pub email: String,
}

/// Resolve `audience` against the given records.
///
/// Users without a deliverable email are excluded under every target type.
/// The output is deduplicated by email (case as stored) and sorted by
/// (email, user id), so resolution is idempotent and independent of input
/// ordering; when two users share an email the lowest user id wins.
pub fn resolve(
    audience: &TargetAudience,
    users: &[User],
    applications: &[GrantApplication],
    grants: &[Grant],
) -> Vec<ResolvedRecipient> {
    let matched: Vec<&User> = match audience {
        TargetAudience::AllUsers => users.iter().collect(),
        TargetAudience::ByCategory { categories } => {
            let category_grants: HashSet<Uuid> = grants
                .iter()
                .filter(|g| categories.contains(&g.category))
                .map(|g| g.id)
                .collect();
            let applicants: HashSet<Uuid> = applications
                .iter()
                .filter(|a| category_grants.contains(&a.grant_id))
                .map(|a| a.applicant_id)
                .collect();
            users.iter().filter(|u| applicants.contains(&u.id)).collect()
        }
        TargetAudience::ByStatus { statuses } => {
            let applicants: HashSet<Uuid> = applications
                .iter()
                .filter(|a| statuses.contains(&a.status))
                .map(|a| a.applicant_id)
                .collect();
            users.iter().filter(|u| applicants.contains(&u.id)).collect()
        }
        TargetAudience::ByRole { roles } => {
            users.iter().filter(|u| roles.contains(&u.role)).collect()
        }
        TargetAudience::CustomList { user_ids } => {
            let wanted: HashSet<&Uuid> = user_ids.iter().collect();
            users.iter().filter(|u| wanted.contains(&u.id)).collect()
        }
    };

    let mut recipients: Vec<ResolvedRecipient> = matched
        .into_iter()
        .filter_map(|u| {
            u.deliverable_email().map(|email| ResolvedRecipient {
                user_id: u.id,
                email: email.to_string(),
            })
        })
        .collect();

    // Email-major order puts duplicates adjacent, so dedup keeps the
    // lowest user id for each shared address.
    recipients.sort_by(|a, b| a.email.cmp(&b.email).then(a.user_id.cmp(&b.user_id)));
    recipients.dedup_by(|a, b| a.email == b.email);
    recipients
}
