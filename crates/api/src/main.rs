use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use grantbridge_api::jobs::{
    CampaignDispatchJob, JobRunner, PoolMetricsJob, QueueDrainJob, ReportSweepJob,
};
use grantbridge_api::services::DeliveryTracker;
use grantbridge_api::{app, config, middleware};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics();

    info!("Starting Grantbridge v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.pool_settings()).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let jobs_config = config.jobs.clone();
    let state = app::AppState::new(config, pool.clone());

    let tracker = Arc::new(DeliveryTracker::new(pool.clone()));
    let mut runner = JobRunner::new();
    runner.register(ReportSweepJob::new(
        Arc::clone(&state.reports),
        jobs_config.report_sweep_interval_secs,
    ));
    runner.register(CampaignDispatchJob::new(
        Arc::clone(&state.campaigns),
        jobs_config.campaign_dispatch_interval_secs,
    ));
    runner.register(QueueDrainJob::new(
        Arc::clone(&state.queue),
        Arc::clone(&state.providers),
        tracker,
        jobs_config.queue_drain_interval_secs,
    ));
    runner.register(PoolMetricsJob::new(pool, Arc::clone(&state.queue)));
    runner.start();

    let addr = state.config.socket_addr();
    let router = app::create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    runner.shutdown();
    runner.wait_for_shutdown(Duration::from_secs(10)).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
