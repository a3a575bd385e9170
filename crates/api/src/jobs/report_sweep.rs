//! Periodic report sweep job.

use std::sync::Arc;

use chrono::Utc;

use super::{Job, RunInterval};
use crate::services::ReportGenerationService;

pub struct ReportSweepJob {
    service: Arc<ReportGenerationService>,
    interval_secs: u64,
}

impl ReportSweepJob {
    pub fn new(service: Arc<ReportGenerationService>, interval_secs: u64) -> Self {
        Self {
            service,
            interval_secs,
        }
    }
}

#[async_trait::async_trait]
impl Job for ReportSweepJob {
    fn name(&self) -> &'static str {
        "report_sweep"
    }

    fn interval(&self) -> RunInterval {
        RunInterval::Seconds(self.interval_secs)
    }

    async fn run(&self) -> anyhow::Result<()> {
        let summary = self.service.sweep(Utc::now()).await?;
        metrics::counter!("reports_generated_total").increment(summary.generated as u64);
        metrics::counter!("reports_failed_total").increment(summary.failed as u64);
        Ok(())
    }
}
