//! REST routes for the verification service.

use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers::{
    health_check, metrics_handler, readiness_check, verification_details, verification_history,
    verify_land,
};
use crate::server::AppState;

/// Build the authenticated `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/verification/verify", post(verify_land))
        .route("/v1/verification/history", get(verification_history))
        .route("/v1/verification/:id", get(verification_details))
}

/// Unauthenticated operational routes.
pub fn ops_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
}
