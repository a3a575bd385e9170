//! Persistence-backed queue outcome handler.
//!
//! Translates each queue outcome into delivery log rows and record status
//! updates. Database errors here are logged and swallowed: the send already
//! happened (or already failed), so aborting the drain would only lose more
//! bookkeeping.

use domain::models::{DeliveryStatus, RecipientStatus};
use persistence::repositories::{
    CampaignRecipientRepository, CampaignRepository, DeliveryLogRepository, ReportRecordRepository,
};
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::providers::{OutboundMessage, ProviderError};
use crate::queue::{DeliveryKind, DeliveryOutcomeHandler, ReportBatchResult, SendClearance};

pub struct DeliveryTracker {
    campaigns: CampaignRepository,
    recipients: CampaignRecipientRepository,
    records: ReportRecordRepository,
    logs: DeliveryLogRepository,
}

impl DeliveryTracker {
    pub fn new(pool: PgPool) -> Self {
        Self {
            campaigns: CampaignRepository::new(pool.clone()),
            recipients: CampaignRecipientRepository::new(pool.clone()),
            records: ReportRecordRepository::new(pool.clone()),
            logs: DeliveryLogRepository::new(pool),
        }
    }

    async fn log_attempt(
        &self,
        log_id: i64,
        status: DeliveryStatus,
        provider_message_id: Option<&str>,
        error: Option<&str>,
        elapsed_ms: Option<i64>,
    ) {
        if let Err(e) = self
            .logs
            .record_attempt(log_id, status, provider_message_id, error, elapsed_ms)
            .await
        {
            warn!(log_id, error = %e, "Failed to record delivery attempt");
        }
    }

    /// Settle the report record once its whole batch has finished.
    async fn finalize_report(&self, result: ReportBatchResult) {
        let outcome = if result.failures == 0 {
            self.records
                .mark_delivered(result.record_id, &result.delivered)
                .await
        } else {
            self.records
                .fail_delivery(
                    result.record_id,
                    &format!("{} recipient(s) undeliverable", result.failures),
                )
                .await
        };
        match outcome {
            Ok(Some(_)) => debug!(
                record_id = result.record_id,
                delivered = result.delivered.len(),
                failures = result.failures,
                "Report delivery finalized"
            ),
            Ok(None) => warn!(
                record_id = result.record_id,
                "Report record not in a finalizable state"
            ),
            Err(e) => warn!(
                record_id = result.record_id,
                error = %e,
                "Failed to finalize report delivery"
            ),
        }
    }
}

#[async_trait::async_trait]
impl DeliveryOutcomeHandler for DeliveryTracker {
    async fn clearance(&self, kind: &DeliveryKind) -> SendClearance {
        match kind {
            DeliveryKind::Campaign { campaign_id, .. } => {
                match self.campaigns.status(*campaign_id).await {
                    Ok(Some(status)) if status.is_sendable() => SendClearance::Proceed,
                    Ok(Some(status)) => {
                        debug!(campaign_id, status = %status, "Campaign not sendable, skipping");
                        SendClearance::Skip
                    }
                    Ok(None) => {
                        warn!(campaign_id, "Campaign vanished, skipping send");
                        SendClearance::Skip
                    }
                    // On a read failure, attempt the send rather than
                    // silently dropping the message.
                    Err(e) => {
                        warn!(campaign_id, error = %e, "Campaign status check failed");
                        SendClearance::Proceed
                    }
                }
            }
            DeliveryKind::Report { .. } => SendClearance::Proceed,
        }
    }

    async fn delivered(
        &self,
        kind: &DeliveryKind,
        message: &OutboundMessage,
        provider_message_id: Option<&str>,
        elapsed_ms: i64,
    ) {
        match kind {
            DeliveryKind::Campaign {
                recipient_id,
                log_id,
                ..
            } => {
                self.log_attempt(
                    *log_id,
                    DeliveryStatus::Sent,
                    provider_message_id,
                    None,
                    Some(elapsed_ms),
                )
                .await;
                if let Err(e) = self
                    .recipients
                    .set_status(*recipient_id, RecipientStatus::Sent, None)
                    .await
                {
                    warn!(recipient_id, error = %e, "Failed to mark recipient sent");
                }
            }
            DeliveryKind::Report { log_id, batch } => {
                self.log_attempt(
                    *log_id,
                    DeliveryStatus::Sent,
                    provider_message_id,
                    None,
                    Some(elapsed_ms),
                )
                .await;
                if let Some(result) = batch.complete_one(&message.to, true) {
                    self.finalize_report(result).await;
                }
            }
        }
    }

    async fn retrying(&self, kind: &DeliveryKind, attempts: u32, error: &ProviderError) {
        let log_id = match kind {
            DeliveryKind::Campaign { log_id, .. } | DeliveryKind::Report { log_id, .. } => *log_id,
        };
        debug!(log_id, attempts, error = %error, "Recording retry attempt");
        // Status stays pending; the attempt counter and error move.
        self.log_attempt(
            log_id,
            DeliveryStatus::Pending,
            None,
            Some(&error.to_string()),
            None,
        )
        .await;
    }

    async fn exhausted(
        &self,
        kind: &DeliveryKind,
        message: &OutboundMessage,
        error: &ProviderError,
    ) {
        let error_text = error.to_string();
        match kind {
            DeliveryKind::Campaign {
                recipient_id,
                log_id,
                ..
            } => {
                self.log_attempt(*log_id, DeliveryStatus::Failed, None, Some(&error_text), None)
                    .await;
                if let Err(e) = self
                    .recipients
                    .set_status(*recipient_id, RecipientStatus::Failed, Some(&error_text))
                    .await
                {
                    warn!(recipient_id, error = %e, "Failed to mark recipient failed");
                }
            }
            DeliveryKind::Report { log_id, batch } => {
                self.log_attempt(*log_id, DeliveryStatus::Failed, None, Some(&error_text), None)
                    .await;
                if let Some(result) = batch.complete_one(&message.to, false) {
                    self.finalize_report(result).await;
                }
            }
        }
    }

    async fn skipped(&self, kind: &DeliveryKind, message: &OutboundMessage) {
        debug!(to = %message.to, "Delivery skipped");
        match kind {
            // The recipient row stays pending so a resumed campaign
            // re-enqueues it on the next dispatch pass, with a fresh log
            // entry; this attempt's row is closed out.
            DeliveryKind::Campaign { log_id, .. } => {
                self.log_attempt(
                    *log_id,
                    DeliveryStatus::Failed,
                    None,
                    Some("skipped: campaign not sendable"),
                    None,
                )
                .await;
            }
            DeliveryKind::Report { log_id, batch } => {
                self.log_attempt(*log_id, DeliveryStatus::Failed, None, Some("skipped"), None)
                    .await;
                if let Some(result) = batch.complete_one(&message.to, false) {
                    self.finalize_report(result).await;
                }
            }
        }
    }
}
