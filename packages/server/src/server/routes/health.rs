use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use tracing::error;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    challenge_store: StoreHealth,
    sms: String,
}

#[derive(Serialize)]
pub struct StoreHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Checks:
/// - Challenge store connectivity and responsiveness
/// - Whether an SMS gateway is configured (informational only)
///
/// Returns 200 OK if the store is healthy, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let store_health = match tokio::time::timeout(
        state.deps.otp.call_timeout,
        state.deps.challenge_store.health_check(),
    )
    .await
    {
        Ok(Ok(())) => StoreHealth {
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => {
            error!(error = %format!("{:#}", e), "Challenge store health check failed");
            StoreHealth {
                status: "error".to_string(),
                error: Some("Query failed".to_string()),
            }
        }
        Err(_) => {
            error!(timeout = ?state.deps.otp.call_timeout, "Challenge store health check timed out");
            StoreHealth {
                status: "error".to_string(),
                error: Some("Query timeout".to_string()),
            }
        }
    };

    // SMS is optional; without it codes go through the fallback channel
    let sms = if state.deps.sms_notifier.is_some() {
        "configured"
    } else {
        "not_configured"
    };

    let is_healthy = store_health.status == "ok";
    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            challenge_store: store_health,
            sms: sms.to_string(),
        }),
    )
}
