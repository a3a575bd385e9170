//! Background job recording pool and queue gauges.

use std::sync::Arc;

use sqlx::PgPool;

use super::{Job, RunInterval};
use crate::queue::DeliveryQueue;

pub struct PoolMetricsJob {
    pool: PgPool,
    queue: Arc<DeliveryQueue>,
}

impl PoolMetricsJob {
    pub fn new(pool: PgPool, queue: Arc<DeliveryQueue>) -> Self {
        Self { pool, queue }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "pool_metrics"
    }

    fn interval(&self) -> RunInterval {
        RunInterval::Seconds(10)
    }

    async fn run(&self) -> anyhow::Result<()> {
        persistence::metrics::record_pool_metrics(&self.pool);
        let status = self.queue.status();
        metrics::gauge!("delivery_queue_depth").set(status.pending as f64);
        Ok(())
    }
}
