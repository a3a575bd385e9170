//! Scheduled report generation and delivery.
//!
//! The sweep walks due schedules, builds the previous-month payload per
//! org unit, advances the schedule, and hands completed reports to the
//! delivery queue addressed to opted-in unit admins. One schedule failing
//! never stops the others: its record is marked failed and the sweep
//! moves on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::models::{CreateScheduleRequest, ReportPayload};
use domain::services::recurrence;
use persistence::entities::{OrgUnitAdminEntity, ReportRecordEntity, ScheduleEntity};
use persistence::repositories::{
    AudienceRepository, DeliveryLogRepository, NewLogEntry, ReportRecordRepository,
    ScheduleRepository,
};
use shared::period::Period;
use shared::template;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::providers::{OutboundMessage, ProviderHandle};
use crate::queue::{DeliveryKind, DeliveryQueue, ReportBatchToken};

const REPORT_SUBJECT: &str = "Grant activity report for ${period}";
const REPORT_BODY: &str = "\
Hello ${name},

The grant activity report for ${period} is ready.

Grants this period: ${total_grants}
Applications: ${total_applications} (${approved} approved, ${rejected} rejected)
Application success rate: ${success_rate}%
Community votes cast: ${total_votes}

Regards,
Grantbridge";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("schedule {0} not found")]
    NotFound(i64),

    #[error("schedule {id} has unusable recurrence fields: {source}")]
    BadSchedule {
        id: i64,
        #[source]
        source: domain::models::schedule::ScheduleParseError,
    },

    #[error("payload serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("validation: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Counts for one sweep pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct SweepSummary {
    pub due: usize,
    pub generated: usize,
    pub failed: usize,
    pub deliveries_enqueued: usize,
}

pub struct ReportGenerationService {
    schedules: ScheduleRepository,
    records: ReportRecordRepository,
    audience: AudienceRepository,
    logs: DeliveryLogRepository,
    queue: Arc<DeliveryQueue>,
    providers: Arc<ProviderHandle>,
}

impl ReportGenerationService {
    pub fn new(pool: PgPool, queue: Arc<DeliveryQueue>, providers: Arc<ProviderHandle>) -> Self {
        Self {
            schedules: ScheduleRepository::new(pool.clone()),
            records: ReportRecordRepository::new(pool.clone()),
            audience: AudienceRepository::new(pool.clone()),
            logs: DeliveryLogRepository::new(pool),
            queue,
            providers,
        }
    }

    /// Validate and store a schedule with its first run computed.
    pub async fn create_schedule(
        &self,
        request: CreateScheduleRequest,
    ) -> Result<ScheduleEntity, ReportError> {
        request.validate()?;
        let next = recurrence::next_run(request.day_of_period, request.time_of_day, Utc::now());
        Ok(self.schedules.create(&request, next).await?)
    }

    /// Enable or disable a schedule and return the updated row.
    pub async fn set_schedule_active(
        &self,
        id: i64,
        active: bool,
    ) -> Result<ScheduleEntity, ReportError> {
        if self.schedules.set_active(id, active).await? == 0 {
            return Err(ReportError::NotFound(id));
        }
        self.schedules
            .find_by_id(id)
            .await?
            .ok_or(ReportError::NotFound(id))
    }

    /// One sweep: generate due reports, then enqueue delivery of completed
    /// ones.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepSummary, ReportError> {
        let due = self.schedules.find_due(now).await?;
        let mut summary = SweepSummary {
            due: due.len(),
            ..SweepSummary::default()
        };

        for schedule in due {
            match self.generate_for_schedule(&schedule, now).await {
                Ok(true) => summary.generated += 1,
                Ok(false) => {}
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        schedule_id = schedule.id,
                        org_unit_id = %schedule.org_unit_id,
                        error = %e,
                        "Report generation failed"
                    );
                }
            }
        }

        summary.deliveries_enqueued = self.enqueue_completed(now).await?;
        if summary.due > 0 || summary.deliveries_enqueued > 0 {
            info!(
                due = summary.due,
                generated = summary.generated,
                failed = summary.failed,
                deliveries = summary.deliveries_enqueued,
                "Report sweep finished"
            );
        }
        Ok(summary)
    }

    /// Generate one schedule's report. Returns false when the record was
    /// already picked up (idempotent re-run after a crash or a competing
    /// sweep). The schedule is advanced in every non-error path so a stuck
    /// record cannot make the schedule due forever.
    async fn generate_for_schedule(
        &self,
        schedule: &ScheduleEntity,
        now: DateTime<Utc>,
    ) -> Result<bool, ReportError> {
        let time_of_day = schedule
            .time_of_day()
            .map_err(|source| ReportError::BadSchedule {
                id: schedule.id,
                source,
            })?;

        // Reports cover the calendar month before the run.
        let period = Period::containing(now).previous();
        let record = self
            .records
            .get_or_create(schedule.id, schedule.org_unit_id, period)
            .await?;

        let claimed = match self.records.mark_generating(record.id).await? {
            Some(claimed) => claimed,
            None => {
                self.advance(schedule, time_of_day, now).await?;
                return Ok(false);
            }
        };

        match self.build_payload(schedule.org_unit_id, period).await {
            Ok(payload) => {
                let json = serde_json::to_value(&payload)?;
                self.records.complete_generation(claimed.id, &json).await?;
            }
            Err(e) => {
                self.records
                    .fail_generation(claimed.id, &e.to_string())
                    .await?;
                self.advance(schedule, time_of_day, now).await?;
                return Err(e);
            }
        }

        self.advance(schedule, time_of_day, now).await?;
        Ok(true)
    }

    async fn advance(
        &self,
        schedule: &ScheduleEntity,
        time_of_day: domain::models::TimeOfDay,
        now: DateTime<Utc>,
    ) -> Result<(), ReportError> {
        let next = recurrence::next_run(schedule.day_of_period as u32, time_of_day, now);
        self.schedules.advance(schedule.id, next, now).await?;
        Ok(())
    }

    async fn build_payload(
        &self,
        org_unit_id: Uuid,
        period: Period,
    ) -> Result<ReportPayload, ReportError> {
        let (window_start, window_end) = period.window();
        let grants = self
            .audience
            .grants_for_unit(org_unit_id, window_start, window_end)
            .await?;
        let grant_ids: Vec<Uuid> = grants.iter().map(|g| g.id).collect();
        let applications = self.audience.applications_for_grants(&grant_ids).await?;
        let votes = self.audience.votes_for_grants(&grant_ids).await?;

        Ok(domain::services::report_builder::build_report(
            org_unit_id,
            period,
            &grants,
            &applications,
            &votes,
        ))
    }

    /// Queue delivery of completed reports to the unit's opted-in admins.
    /// A report with no recipients is marked delivered to nobody rather
    /// than staying pending forever.
    async fn enqueue_completed(&self, _now: DateTime<Utc>) -> Result<usize, ReportError> {
        // Records stay delivery-pending until the drain settles their
        // batch; re-enqueueing while the queue is busy would double-send.
        let queue_status = self.queue.status();
        if queue_status.pending > 0 || queue_status.draining {
            return Ok(0);
        }

        let awaiting = self.records.find_awaiting_delivery(50).await?;
        let mut enqueued = 0;

        for record in awaiting {
            let recipients = self
                .audience
                .report_recipients(record.org_unit_id)
                .await?;
            if recipients.is_empty() {
                warn!(
                    record_id = record.id,
                    org_unit_id = %record.org_unit_id,
                    "Report has no opted-in admins, marking delivered without mail"
                );
                self.records.mark_delivered(record.id, &[]).await?;
                continue;
            }
            enqueued += self.enqueue_record(&record, &recipients).await?;
        }
        Ok(enqueued)
    }

    async fn enqueue_record(
        &self,
        record: &ReportRecordEntity,
        admins: &[OrgUnitAdminEntity],
    ) -> Result<usize, ReportError> {
        let provider_name = self.providers.get().await.name();
        let recipients: Vec<(&str, &str)> = admins
            .iter()
            .filter(|a| a.to_domain().is_some_and(|d| d.receives_reports()))
            .filter_map(|a| a.email.as_deref().map(|email| (a.name.as_str(), email)))
            .collect();
        if recipients.is_empty() {
            self.records.mark_delivered(record.id, &[]).await?;
            return Ok(0);
        }
        let batch = ReportBatchToken::new(record.id, recipients.len());

        let payload: Option<ReportPayload> = record
            .payload
            .as_ref()
            .and_then(|p| serde_json::from_value(p.clone()).ok());

        for (name, email) in &recipients {
            let context = report_context(&record.period, email, name, payload.as_ref());
            let message = OutboundMessage {
                to: (*email).to_string(),
                to_name: Some((*name).to_string()),
                subject: template::render(REPORT_SUBJECT, &context),
                body: template::render(REPORT_BODY, &context),
            };
            let log = self
                .logs
                .open(&NewLogEntry {
                    campaign_id: None,
                    recipient_email: (*email).to_string(),
                    subject: message.subject.clone(),
                    provider: provider_name.to_string(),
                })
                .await?;
            self.queue.enqueue(
                DeliveryKind::Report {
                    log_id: log.id,
                    batch: batch.clone(),
                },
                message,
            );
        }
        Ok(recipients.len())
    }
}

fn report_context(
    period: &str,
    email: &str,
    name: &str,
    payload: Option<&ReportPayload>,
) -> template::TemplateContext {
    let mut context = template::context_from([
        ("period", period),
        ("email", email),
        ("name", name),
    ]);
    if let Some(p) = payload {
        context.insert("total_grants".into(), p.total_grants.to_string());
        context.insert(
            "total_applications".into(),
            p.total_applications.to_string(),
        );
        context.insert("approved".into(), p.approved_applications.to_string());
        context.insert("rejected".into(), p.rejected_applications.to_string());
        context.insert("success_rate".into(), p.success_rate.to_string());
        context.insert(
            "total_votes".into(),
            p.community_voting.total_votes.to_string(),
        );
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{GrantReportDetail, VotingSummary};

    fn payload() -> ReportPayload {
        ReportPayload {
            org_unit: Uuid::new_v4(),
            period: Period::new(2026, 7).unwrap(),
            total_grants: 3,
            total_applications: 10,
            approved_applications: 4,
            rejected_applications: 2,
            success_rate: 40,
            total_funding_allocated_cents: 500_000,
            total_funding_awarded_cents: 120_000,
            community_voting: VotingSummary {
                total_votes: 25,
                support_votes: 15,
                oppose_votes: 5,
                neutral_votes: 5,
                support_percentage: 60,
                oppose_percentage: 20,
                neutral_percentage: 20,
            },
            grant_details: Vec::<GrantReportDetail>::new(),
        }
    }

    #[test]
    fn test_report_context_fills_all_tokens() {
        let payload = payload();
        let context = report_context("2026-07", "admin@example.com", "Ada Admin", Some(&payload));
        let body = template::render(REPORT_BODY, &context);
        assert!(!body.contains("${"));
        assert!(body.contains("Hello Ada Admin,"));
        assert!(body.contains("Grants this period: 3"));
        assert!(body.contains("40%"));
    }

    #[test]
    fn test_report_subject_includes_period() {
        let context = report_context("2026-07", "admin@example.com", "Ada Admin", None);
        assert_eq!(
            template::render(REPORT_SUBJECT, &context),
            "Grant activity report for 2026-07"
        );
    }
}
