//! Campaign creation, dispatch and finalization.
//!
//! Creation freezes the recipient snapshot exactly once; dispatch moves
//! due scheduled campaigns into sending and enqueues their pending
//! recipients; finalization marks a sending campaign sent when every
//! recipient reached a terminal state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::models::{CampaignStatus, CreateCampaignRequest};
use domain::services::targeting;
use persistence::entities::CampaignEntity;
use persistence::repositories::{
    AudienceRepository, CampaignRecipientRepository, CampaignRepository, DeliveryLogRepository,
    NewCampaign, NewLogEntry,
};
use shared::template;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::providers::{OutboundMessage, ProviderHandle};
use crate::queue::{DeliveryKind, DeliveryQueue};

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("campaign {0} not found")]
    NotFound(i64),

    #[error("campaign {id} cannot go from {from} to {to}")]
    IllegalTransition {
        id: i64,
        from: CampaignStatus,
        to: CampaignStatus,
    },

    #[error("validation: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Counts for one dispatch pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct DispatchSummary {
    pub started: usize,
    pub enqueued: usize,
    pub finalized: usize,
}

pub struct CampaignDispatchService {
    campaigns: CampaignRepository,
    recipients: CampaignRecipientRepository,
    audience: AudienceRepository,
    logs: DeliveryLogRepository,
    queue: Arc<DeliveryQueue>,
    providers: Arc<ProviderHandle>,
    batch_size: i64,
}

impl CampaignDispatchService {
    pub fn new(
        pool: PgPool,
        queue: Arc<DeliveryQueue>,
        providers: Arc<ProviderHandle>,
        batch_size: i64,
    ) -> Self {
        Self {
            campaigns: CampaignRepository::new(pool.clone()),
            recipients: CampaignRecipientRepository::new(pool.clone()),
            audience: AudienceRepository::new(pool.clone()),
            logs: DeliveryLogRepository::new(pool),
            queue,
            providers,
            batch_size,
        }
    }

    /// Validate, store and snapshot a campaign. The audience is resolved
    /// and frozen here; later sends never re-run targeting.
    pub async fn create_campaign(
        &self,
        created_by: Uuid,
        request: CreateCampaignRequest,
    ) -> Result<CampaignEntity, CampaignError> {
        request.validate()?;

        let campaign = self
            .campaigns
            .create(&NewCampaign {
                created_by,
                name: request.name,
                subject: request.subject,
                body_content: request.body_content,
                template_type: request.template_type,
                audience: request.audience.clone(),
                scheduled_at: request.scheduled_at,
            })
            .await?;

        let resolved = {
            let users = self.audience.all_users().await?;
            let applications = self.audience.all_applications().await?;
            let grants = self.audience.all_grants().await?;
            targeting::resolve(&request.audience, &users, &applications, &grants)
        };
        let stored = self
            .recipients
            .freeze_snapshot(campaign.id, &resolved)
            .await?;
        self.campaigns
            .set_total_recipients(campaign.id, stored as i64)
            .await?;

        info!(
            campaign_id = campaign.id,
            recipients = stored,
            scheduled = campaign.scheduled_at.is_some(),
            "Campaign created"
        );
        self.campaigns
            .find_by_id(campaign.id)
            .await?
            .ok_or(CampaignError::NotFound(campaign.id))
    }

    /// Admin transition (pause, resume, cancel). CAS against the expected
    /// current status; a lost race surfaces as IllegalTransition.
    pub async fn transition(
        &self,
        id: i64,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<CampaignEntity, CampaignError> {
        match self.campaigns.transition(id, from, to).await? {
            Some(updated) => Ok(updated),
            None => match self.campaigns.find_by_id(id).await? {
                Some(_) => Err(CampaignError::IllegalTransition { id, from, to }),
                None => Err(CampaignError::NotFound(id)),
            },
        }
    }

    /// One dispatch pass: start due campaigns, enqueue pending recipients
    /// of everything sending, finalize finished campaigns.
    pub async fn dispatch_due(&self, now: DateTime<Utc>) -> Result<DispatchSummary, CampaignError> {
        let mut summary = DispatchSummary::default();

        for campaign in self.campaigns.find_due(now).await? {
            match self
                .campaigns
                .transition(campaign.id, CampaignStatus::Scheduled, CampaignStatus::Sending)
                .await?
            {
                Some(_) => {
                    summary.started += 1;
                    info!(campaign_id = campaign.id, "Campaign dispatch started");
                }
                // Lost the race to another pass or an admin action.
                None => continue,
            }
        }

        // Recipients already handed to the in-process queue stay pending in
        // the table until the drain settles them; enqueueing again while the
        // queue is busy would duplicate sends. Enqueue only into an idle
        // queue.
        let queue_status = self.queue.status();
        if queue_status.pending == 0 && !queue_status.draining {
            for campaign in self
                .campaigns
                .find_in_status(CampaignStatus::Sending)
                .await?
            {
                match self.enqueue_pending(&campaign).await {
                    Ok(count) => summary.enqueued += count,
                    Err(e) => warn!(
                        campaign_id = campaign.id,
                        error = %e,
                        "Failed to enqueue campaign recipients"
                    ),
                }
            }
        }

        summary.finalized = self.finalize_finished().await?;
        Ok(summary)
    }

    /// Enqueue one batch of this campaign's pending recipients with the
    /// per-recipient template context rendered.
    async fn enqueue_pending(&self, campaign: &CampaignEntity) -> Result<usize, CampaignError> {
        let pending = self
            .recipients
            .find_pending(campaign.id, self.batch_size)
            .await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let provider_name = self.providers.get().await.name();
        let names: HashMap<Uuid, String> = self
            .audience
            .all_users()
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        let mut enqueued = 0;
        for recipient in pending {
            let name = names
                .get(&recipient.user_id)
                .cloned()
                .unwrap_or_else(|| recipient.email.clone());
            let context = template::context_from([
                ("name", name.as_str()),
                ("email", recipient.email.as_str()),
                ("campaign", campaign.name.as_str()),
            ]);
            let message = OutboundMessage {
                to: recipient.email.clone(),
                to_name: Some(name),
                subject: template::render(&campaign.subject, &context),
                body: template::render(&campaign.body_content, &context),
            };
            let log = self
                .logs
                .open(&NewLogEntry {
                    campaign_id: Some(campaign.id),
                    recipient_email: recipient.email.clone(),
                    subject: message.subject.clone(),
                    provider: provider_name.to_string(),
                })
                .await?;
            self.queue.enqueue(
                DeliveryKind::Campaign {
                    campaign_id: campaign.id,
                    recipient_id: recipient.id,
                    log_id: log.id,
                },
                message,
            );
            enqueued += 1;
        }
        Ok(enqueued)
    }

    /// sending -> sent for campaigns with no pending recipients left,
    /// refreshing counters from the snapshot on the way.
    async fn finalize_finished(&self) -> Result<usize, CampaignError> {
        let mut finalized = 0;
        for campaign in self
            .campaigns
            .find_in_status(CampaignStatus::Sending)
            .await?
        {
            if self.recipients.pending_count(campaign.id).await? > 0 {
                continue;
            }
            if self.queue.status().pending > 0 {
                continue;
            }
            self.campaigns.refresh_counters(campaign.id).await?;
            if self
                .campaigns
                .transition(campaign.id, CampaignStatus::Sending, CampaignStatus::Sent)
                .await?
                .is_some()
            {
                finalized += 1;
                info!(campaign_id = campaign.id, "Campaign finished");
            }
        }
        Ok(finalized)
    }
}
