//! Verification endpoints

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use tracing::debug;
use uuid::Uuid;

use crate::api::error::{verification_not_found, ApiError};
use crate::api::types::{HistoryQuery, VerificationDetails, VerificationResult, VerifyRequest};
use crate::auth::AuthContextExt;
use crate::domain::{Submission, VerificationId, VerificationSummary};
use crate::server::AppState;

/// `POST /v1/verification/verify`
///
/// Malformed submissions are rejected with 400 before anything is persisted.
/// Every accepted submission yields a terminal verdict.
pub async fn verify_land(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerificationResult>, ApiError> {
    let Json(request) = payload?;
    let submission = Submission::from(request).normalized().map_err(|e| {
        debug!(principal_id = %auth.principal_id, error = %e, "Rejected submission");
        ApiError::from(e)
    })?;

    let record = state.engine.verify(&auth.principal_id, submission).await?;
    Ok(Json(VerificationResult::from(&record)))
}

/// `GET /v1/verification/history?limit=N`
pub async fn verification_history(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<VerificationSummary>>, ApiError> {
    let Query(query) = query?;
    let items = state.history.list(&auth.principal_id, query.limit).await?;
    Ok(Json(items))
}

/// `GET /v1/verification/:id`
pub async fn verification_details(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<VerificationDetails>, ApiError> {
    let Path(id) = id?;
    let id = VerificationId::from_uuid(id);

    match state.history.get(&auth.principal_id, id).await? {
        Some(record) => Ok(Json(VerificationDetails::from(record))),
        None => Err(verification_not_found(id)),
    }
}
