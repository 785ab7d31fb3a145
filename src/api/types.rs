//! Request and response types for the verification endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    LocationKey, Polygon, Submission, VerificationId, VerificationRecord, VerificationStatus,
};

// ============================================================================
// Verify
// ============================================================================

/// Request body for `POST /verification/verify`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifyRequest {
    pub town: String,
    pub layout: String,
    pub block_number: String,
    pub plot_number: String,
    pub coordinates: Polygon,
}

impl From<VerifyRequest> for Submission {
    fn from(req: VerifyRequest) -> Self {
        Submission::new(
            LocationKey::new(req.town, req.layout, req.block_number, req.plot_number),
            req.coordinates,
        )
    }
}

/// Verdict returned by `POST /verification/verify`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerificationResult {
    pub verification_id: VerificationId,
    pub status: VerificationStatus,
    pub is_verified: bool,
    pub message: String,

    pub location_match: Option<bool>,
    pub coordinates_match: Option<bool>,
    /// Area ratio of the two polygons, in [0, 1]
    pub overlap_percent: Option<f64>,
    pub distance_meters: Option<f64>,

    pub is_fraud: bool,
    pub fraud_reason: Option<String>,

    pub official_owner: Option<String>,
    pub official_area: Option<f64>,
}

impl From<&VerificationRecord> for VerificationResult {
    fn from(record: &VerificationRecord) -> Self {
        Self {
            verification_id: record.id,
            status: record.status,
            is_verified: record.is_verified,
            message: record.message.clone().unwrap_or_default(),
            location_match: record.location_match,
            coordinates_match: record.coordinates_match,
            overlap_percent: record.overlap_score,
            distance_meters: record.distance_meters,
            is_fraud: record.is_fraud,
            fraud_reason: record.fraud_reason.clone(),
            official_owner: record.official_owner.clone(),
            official_area: record.official_area,
        }
    }
}

// ============================================================================
// History
// ============================================================================

/// Query parameters for `GET /verification/history`.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

// ============================================================================
// Details
// ============================================================================

/// Full view of one verification, as returned by `GET /verification/:id`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerificationDetails {
    pub id: VerificationId,
    pub status: VerificationStatus,
    pub is_verified: bool,
    pub is_fraud: bool,
    pub fraud_reason: Option<String>,
    pub message: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub submitted_data: SubmittedData,
    pub match_details: MatchDetails,
    pub official_data: OfficialData,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmittedData {
    pub town: String,
    pub layout: String,
    pub block: String,
    pub plot: String,
    pub coordinates: Polygon,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchDetails {
    pub location_match: Option<bool>,
    pub coordinates_match: Option<bool>,
    pub overlap_score: Option<f64>,
    pub distance_meters: Option<f64>,
}

/// Official snapshot; all `None` unless the verification was verified
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OfficialData {
    pub owner: Option<String>,
    pub area: Option<f64>,
    pub coordinates: Option<Polygon>,
}

impl From<VerificationRecord> for VerificationDetails {
    fn from(record: VerificationRecord) -> Self {
        Self {
            id: record.id,
            status: record.status,
            is_verified: record.is_verified,
            is_fraud: record.is_fraud,
            fraud_reason: record.fraud_reason,
            message: record.message,
            requested_at: record.requested_at,
            verified_at: record.verified_at,
            submitted_data: SubmittedData {
                town: record.submitted.town,
                layout: record.submitted.layout,
                block: record.submitted.block_number,
                plot: record.submitted.plot_number,
                coordinates: record.submitted_coords,
            },
            match_details: MatchDetails {
                location_match: record.location_match,
                coordinates_match: record.coordinates_match,
                overlap_score: record.overlap_score,
                distance_meters: record.distance_meters,
            },
            official_data: OfficialData {
                owner: record.official_owner,
                area: record.official_area,
                coordinates: record.official_coords,
            },
        }
    }
}
