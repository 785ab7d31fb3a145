//! Health, readiness and metrics handlers
//!
//! None of these require authentication.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ErrorCode};
use crate::server::AppState;

/// Response for the basic health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// Basic health check endpoint.
///
/// Does not touch storage. Use this for liveness probes.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "terraverify",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Readiness check endpoint.
///
/// Pings PostgreSQL when configured. In-memory storage is always ready.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(pool) = &state.pool else {
        return Ok(Json(serde_json::json!({
            "status": "ready",
            "storage": "memory",
        })));
    };

    let start = std::time::Instant::now();
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => Ok(Json(serde_json::json!({
            "status": "ready",
            "storage": "postgres",
            "database": {
                "connected": true,
                "response_time_ms": start.elapsed().as_millis() as u64,
                "pool_size": pool.size(),
                "idle_connections": pool.num_idle(),
            },
        }))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            Err(ApiError::new(
                ErrorCode::ServiceUnavailable,
                "Database unavailable",
            ))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    /// `json` for the JSON snapshot; Prometheus text otherwise
    pub format: Option<String>,
}

/// Metrics endpoint.
pub async fn metrics_handler(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Response {
    if query.format.as_deref() == Some("json") {
        return Json(state.metrics.to_json().await).into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus().await,
    )
        .into_response()
}
