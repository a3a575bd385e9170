//! Periodic delivery queue drain trigger.
//!
//! The queue itself guarantees single-drain semantics; this job only kicks
//! it. A kick while a drain is running is a no-op.

use std::sync::Arc;

use super::{Job, RunInterval};
use crate::providers::ProviderHandle;
use crate::queue::DeliveryQueue;
use crate::services::DeliveryTracker;

pub struct QueueDrainJob {
    queue: Arc<DeliveryQueue>,
    providers: Arc<ProviderHandle>,
    tracker: Arc<DeliveryTracker>,
    interval_secs: u64,
}

impl QueueDrainJob {
    pub fn new(
        queue: Arc<DeliveryQueue>,
        providers: Arc<ProviderHandle>,
        tracker: Arc<DeliveryTracker>,
        interval_secs: u64,
    ) -> Self {
        Self {
            queue,
            providers,
            tracker,
            interval_secs,
        }
    }
}

#[async_trait::async_trait]
impl Job for QueueDrainJob {
    fn name(&self) -> &'static str {
        "queue_drain"
    }

    fn interval(&self) -> RunInterval {
        RunInterval::Seconds(self.interval_secs)
    }

    async fn run(&self) -> anyhow::Result<()> {
        if self.queue.status().pending == 0 {
            return Ok(());
        }
        let provider = self.providers.get().await;
        self.queue
            .drain(provider.as_ref(), self.tracker.as_ref())
            .await;
        Ok(())
    }
}
