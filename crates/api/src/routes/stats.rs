//! Delivery statistics endpoint.

use axum::{extract::State, Json};
use domain::models::DeliveryStats;
use persistence::repositories::DeliveryLogRepository;
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::queue::QueueStatus;

/// Delivery stats response. Provider entries carry names and counts only,
/// never configuration or credentials.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DeliveryStatsResponse {
    pub totals: DeliveryStats,
    pub success_rate: u32,
    pub by_provider: Vec<ProviderStats>,
    pub queue: QueueStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ProviderStats {
    pub provider: String,
    pub sent: i64,
    pub failed: i64,
}

pub async fn delivery_stats(
    State(state): State<AppState>,
) -> Result<Json<DeliveryStatsResponse>, ApiError> {
    let logs = DeliveryLogRepository::new(state.pool.clone());
    let totals = logs.stats().await?;
    let by_provider = logs
        .stats_by_provider()
        .await?
        .into_iter()
        .map(|(provider, sent, failed)| ProviderStats {
            provider,
            sent,
            failed,
        })
        .collect();

    Ok(Json(DeliveryStatsResponse {
        totals,
        success_rate: totals.success_rate(),
        by_provider,
        queue: state.queue.status(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serialization_has_no_credentials() {
        let response = DeliveryStatsResponse {
            totals: DeliveryStats {
                total: 10,
                sent: 8,
                failed: 1,
                bounced: 1,
                pending: 0,
            },
            success_rate: 80,
            by_provider: vec![ProviderStats {
                provider: "sendgrid".into(),
                sent: 8,
                failed: 2,
            }],
            queue: QueueStatus {
                pending: 0,
                attempts: 0,
                draining: false,
            },
        };
        let json = serde_json::to_string(&response).unwrap();
        for secret in ["api_key", "password", "username", "smtp_host"] {
            assert!(!json.contains(secret), "stats response leaked {secret}");
        }
        assert!(json.contains("\"success_rate\":80"));
    }
}
