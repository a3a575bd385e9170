//! Pure report aggregation for one org unit and calendar month.
//!
//! The builder is deterministic: identical inputs always produce an
//! identical payload (grant details sorted by id), because a completed
//! report payload is persisted immutably for audit. It never returns an
//! empty or partial payload; a period with no grants yields all-zero
//! counts and percentages.

use std::collections::HashMap;
use uuid::Uuid;

use shared::period::Period;

use crate::models::{
    ApplicationStatus, Grant, GrantApplication, GrantReportDetail, ReportPayload, Vote, VoteTally,
    VotingSummary,
};

/// Build the report payload for `org_unit_id` over `period`.
///
/// Grants are attributed to the period by creation date falling inside the
/// month window. Applications and votes are counted per included grant
/// regardless of their own timestamps.
pub fn build_report(
    org_unit_id: Uuid,
    period: Period,
    grants: &[Grant],
    applications: &[GrantApplication],
    votes: &[Vote],
) -> ReportPayload {
    let (window_start, window_end) = period.window();

    let mut included: Vec<&Grant> = grants
        .iter()
        .filter(|g| g.created_at >= window_start && g.created_at < window_end)
        .collect();
    // Sort by id so repeated runs against unchanged data are byte-identical.
    included.sort_by_key(|g| g.id);

    let mut apps_by_grant: HashMap<Uuid, Vec<&GrantApplication>> = HashMap::new();
    for app in applications {
        apps_by_grant.entry(app.grant_id).or_default().push(app);
    }
    let mut votes_by_grant: HashMap<Uuid, VoteTally> = HashMap::new();
    for vote in votes {
        votes_by_grant
            .entry(vote.grant_id)
            .or_default()
            .record(vote.vote_type);
    }

    let mut total_applications = 0u64;
    let mut approved_applications = 0u64;
    let mut rejected_applications = 0u64;
    let mut total_funding_allocated = 0i64;
    let mut total_funding_awarded = 0i64;
    let mut unit_tally = VoteTally::default();
    let mut grant_details = Vec::with_capacity(included.len());

    for grant in included.iter() {
        let apps = apps_by_grant.get(&grant.id).map_or(&[][..], Vec::as_slice);
        let total = apps.len() as u64;
        let approved = count_status(apps, ApplicationStatus::Approved);
        let rejected = count_status(apps, ApplicationStatus::Rejected);
        // Awarded tracks requested, not disbursed, funds: the sum of every
        // application's requested amount regardless of status.
        let awarded: i64 = apps.iter().map(|a| a.requested_amount_cents).sum();

        let tally = votes_by_grant.get(&grant.id).copied().unwrap_or_default();
        unit_tally.add(&tally);

        total_applications += total;
        approved_applications += approved;
        rejected_applications += rejected;
        total_funding_allocated += grant.budget_cents;
        total_funding_awarded += awarded;

        grant_details.push(GrantReportDetail {
            grant_id: grant.id,
            title: grant.title.clone(),
            category: grant.category.clone(),
            budget_cents: grant.budget_cents,
            total_applications: total,
            approved_applications: approved,
            rejected_applications: rejected,
            success_rate: success_rate(approved, total),
            voting: VotingSummary::from_tally(&tally),
        });
    }

    ReportPayload {
        org_unit: org_unit_id,
        period,
        total_grants: included.len() as u64,
        total_applications,
        approved_applications,
        rejected_applications,
        success_rate: success_rate(approved_applications, total_applications),
        total_funding_allocated_cents: total_funding_allocated,
        total_funding_awarded_cents: total_funding_awarded,
        community_voting: VotingSummary::from_tally(&unit_tally),
        grant_details,
    }
}

fn count_status(apps: &[&GrantApplication], status: ApplicationStatus) -> u64 {
    apps.iter().filter(|a| a.status == status).count() as u64
}

/// Rounded approval percentage; 0 when there are no applications.
fn success_rate(approved: u64, total: u64) -> u32 {
    if total == 0 {
        0
    } else {
        ((approved as f64 / total as f64) * 100.0).round() as u32
    }
}
