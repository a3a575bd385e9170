use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware};
use crate::providers::ProviderHandle;
use crate::queue::DeliveryQueue;
use crate::routes::{campaigns, health, schedules, stats};
use crate::services::{CampaignDispatchService, ReportGenerationService};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub queue: Arc<DeliveryQueue>,
    pub providers: Arc<ProviderHandle>,
    pub reports: Arc<ReportGenerationService>,
    pub campaigns: Arc<CampaignDispatchService>,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Self {
        let config = Arc::new(config);
        let queue = Arc::new(DeliveryQueue::new(
            config.jobs.max_retries,
            Duration::from_secs(config.jobs.retry_delay_secs),
        ));
        let providers = Arc::new(ProviderHandle::new(config.email.clone()));
        let reports = Arc::new(ReportGenerationService::new(
            pool.clone(),
            Arc::clone(&queue),
            Arc::clone(&providers),
        ));
        let campaigns = Arc::new(CampaignDispatchService::new(
            pool.clone(),
            Arc::clone(&queue),
            Arc::clone(&providers),
            config.jobs.dispatch_batch_size,
        ));

        Self {
            pool,
            config,
            queue,
            providers,
            reports,
            campaigns,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/stats/delivery", get(stats::delivery_stats))
        .route("/api/v1/schedules", post(schedules::create_schedule))
        .route(
            "/api/v1/schedules/:id/activate",
            post(schedules::activate_schedule),
        )
        .route(
            "/api/v1/schedules/:id/deactivate",
            post(schedules::deactivate_schedule),
        )
        .route("/api/v1/campaigns", post(campaigns::create_campaign))
        .route("/api/v1/campaigns/:id/pause", post(campaigns::pause_campaign))
        .route(
            "/api/v1/campaigns/:id/resume",
            post(campaigns::resume_campaign),
        )
        .route(
            "/api/v1/campaigns/:id/cancel",
            post(campaigns::cancel_campaign),
        )
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn test_state() -> AppState {
        let config = Config::load_for_test(&[]).unwrap();
        let pool = persistence::db::create_lazy_pool(&config.database.pool_settings()).unwrap();
        AppState::new(config, pool)
    }

    #[tokio::test]
    async fn test_liveness_route() {
        let app = create_app(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = create_app(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
