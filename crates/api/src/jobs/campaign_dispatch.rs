//! Periodic campaign dispatch job.

use std::sync::Arc;

use chrono::Utc;

use super::{Job, RunInterval};
use crate::services::CampaignDispatchService;

pub struct CampaignDispatchJob {
    service: Arc<CampaignDispatchService>,
    interval_secs: u64,
}

impl CampaignDispatchJob {
    pub fn new(service: Arc<CampaignDispatchService>, interval_secs: u64) -> Self {
        Self {
            service,
            interval_secs,
        }
    }
}

#[async_trait::async_trait]
impl Job for CampaignDispatchJob {
    fn name(&self) -> &'static str {
        "campaign_dispatch"
    }

    fn interval(&self) -> RunInterval {
        RunInterval::Seconds(self.interval_secs)
    }

    async fn run(&self) -> anyhow::Result<()> {
        let summary = self.service.dispatch_due(Utc::now()).await?;
        metrics::counter!("campaigns_started_total").increment(summary.started as u64);
        metrics::counter!("campaigns_finished_total").increment(summary.finalized as u64);
        Ok(())
    }
}
