//! Verification submissions and records
//!
//! A [`VerificationRecord`] is created `pending` for every attempt and moves
//! exactly once to a terminal status. After that it is never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{
    Coordinate, LocationKey, OfficialRecord, Polygon, PrincipalId, VerificationId,
    MIN_POLYGON_VERTICES,
};

pub const MSG_NOT_IN_REGISTRY: &str = "Land not found in registry";
pub const MSG_LOCATION_MISMATCH: &str = "Location does not match registry";
pub const MSG_COORDINATES_MISMATCH: &str = "Coordinates do not match official records";
pub const MSG_VERIFIED: &str = "Land verification successful";
pub const MSG_INTERNAL_ERROR: &str = "Internal verification error";
pub const REASON_LOCATION_MISMATCH: &str = "Location information mismatch";

/// Fraud reason for a polygon that does not line up with the official one
pub fn coordinates_mismatch_reason(distance_meters: f64) -> String {
    format!("Coordinates mismatch (distance: {:.1}m)", distance_meters)
}

// ============================================================================
// Submission
// ============================================================================

/// Rejection of a malformed submission, raised before verification runs
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("need at least {MIN_POLYGON_VERTICES} points for polygon, got {0}")]
    TooFewVertices(usize),

    #[error("coordinate {index} out of range: lat={lat}, lng={lng}")]
    InvalidCoordinate { index: usize, lat: f64, lng: f64 },
}

/// User-provided parcel description awaiting verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(flatten)]
    pub location: LocationKey,
    pub coordinates: Polygon,
}

impl Submission {
    pub fn new(location: LocationKey, coordinates: Polygon) -> Self {
        Self {
            location,
            coordinates,
        }
    }

    /// Check the boundary contract the engine relies on
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("town", &self.location.town),
            ("layout", &self.location.layout),
            ("block_number", &self.location.block_number),
            ("plot_number", &self.location.plot_number),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ValidationError::EmptyField(name));
            }
        }

        if self.coordinates.len() < MIN_POLYGON_VERTICES {
            return Err(ValidationError::TooFewVertices(self.coordinates.len()));
        }

        if let Some((index, c)) = self
            .coordinates
            .iter()
            .enumerate()
            .find(|(_, c)| !c.is_valid())
        {
            return Err(ValidationError::InvalidCoordinate {
                index,
                lat: c.lat,
                lng: c.lng,
            });
        }

        Ok(())
    }

    /// Trim the key fields, then validate
    pub fn normalized(self) -> Result<Self, ValidationError> {
        let location = LocationKey {
            town: self.location.town.trim().to_string(),
            layout: self.location.layout.trim().to_string(),
            block_number: self.location.block_number.trim().to_string(),
            plot_number: self.location.plot_number.trim().to_string(),
        };
        let submission = Self {
            location,
            coordinates: self.coordinates,
        };
        submission.validate()?;
        Ok(submission)
    }
}

// ============================================================================
// Status
// ============================================================================

/// Verdict state of a verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Fraudulent,
    Failed,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Fraudulent => "fraudulent",
            VerificationStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, VerificationStatus::Pending)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VerificationStatus::Pending),
            "verified" => Ok(VerificationStatus::Verified),
            "fraudulent" => Ok(VerificationStatus::Fraudulent),
            "failed" => Ok(VerificationStatus::Failed),
            other => Err(format!("unknown verification status: {other}")),
        }
    }
}

/// Attempted transition out of a terminal state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid verification transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: VerificationStatus,
    pub to: VerificationStatus,
}

// ============================================================================
// Record
// ============================================================================

/// One verification attempt and its outcome.
///
/// Holds a verbatim copy of the submission so the audit trail does not depend
/// on later registry changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: VerificationId,
    pub principal_id: PrincipalId,

    pub submitted: LocationKey,
    pub submitted_coords: Polygon,

    pub status: VerificationStatus,
    pub is_verified: bool,
    pub message: Option<String>,

    pub location_match: Option<bool>,
    pub coordinates_match: Option<bool>,

    /// Area ratio in [0, 1]
    pub overlap_score: Option<f64>,
    pub distance_meters: Option<f64>,

    pub is_fraud: bool,
    pub fraud_reason: Option<String>,

    /// Point-in-time snapshot of the matched official data (verified only)
    pub official_owner: Option<String>,
    pub official_coords: Option<Polygon>,
    pub official_area: Option<f64>,

    pub requested_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl VerificationRecord {
    /// Create a pending record for a submission
    pub fn pending(principal_id: PrincipalId, submission: &Submission) -> Self {
        Self {
            id: VerificationId::new(),
            principal_id,
            submitted: submission.location.clone(),
            submitted_coords: submission.coordinates.clone(),
            status: VerificationStatus::Pending,
            is_verified: false,
            message: None,
            location_match: None,
            coordinates_match: None,
            overlap_score: None,
            distance_meters: None,
            is_fraud: false,
            fraud_reason: None,
            official_owner: None,
            official_coords: None,
            official_area: None,
            requested_at: Utc::now(),
            verified_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == VerificationStatus::Pending
    }

    fn ensure_pending(&self, to: VerificationStatus) -> Result<(), InvalidTransition> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self.status,
                to,
            })
        }
    }

    fn finish(&mut self, status: VerificationStatus, message: &str) {
        self.status = status;
        self.message = Some(message.to_string());
        self.verified_at = Some(Utc::now());
    }

    /// No registry match, or an internal fault
    pub fn mark_failed(&mut self, message: &str) -> Result<(), InvalidTransition> {
        self.ensure_pending(VerificationStatus::Failed)?;
        self.finish(VerificationStatus::Failed, message);
        Ok(())
    }

    /// Declared identity disagrees with the located record
    pub fn mark_location_mismatch(&mut self) -> Result<(), InvalidTransition> {
        self.ensure_pending(VerificationStatus::Fraudulent)?;
        self.location_match = Some(false);
        self.is_fraud = true;
        self.fraud_reason = Some(REASON_LOCATION_MISMATCH.to_string());
        self.finish(VerificationStatus::Fraudulent, MSG_LOCATION_MISMATCH);
        Ok(())
    }

    /// Record the geometry measurements of a location-matched record
    pub fn record_measurements(
        &mut self,
        coordinates_match: bool,
        overlap_score: f64,
        distance_meters: f64,
    ) -> Result<(), InvalidTransition> {
        self.ensure_pending(VerificationStatus::Pending)?;
        self.location_match = Some(true);
        self.coordinates_match = Some(coordinates_match);
        self.overlap_score = Some(overlap_score);
        self.distance_meters = Some(distance_meters);
        Ok(())
    }

    /// Location matched but the polygon does not
    pub fn mark_coordinates_mismatch(
        &mut self,
        distance_meters: f64,
    ) -> Result<(), InvalidTransition> {
        self.ensure_pending(VerificationStatus::Fraudulent)?;
        self.is_fraud = true;
        self.fraud_reason = Some(coordinates_mismatch_reason(distance_meters));
        self.finish(VerificationStatus::Fraudulent, MSG_COORDINATES_MISMATCH);
        Ok(())
    }

    /// Both identity and geometry agree; snapshot the official data
    pub fn mark_verified(&mut self, official: &OfficialRecord) -> Result<(), InvalidTransition> {
        self.ensure_pending(VerificationStatus::Verified)?;
        self.is_verified = true;
        self.official_owner = Some(official.owner_name.clone());
        self.official_coords = Some(official.coordinates.clone());
        self.official_area = official.area_square_meters;
        self.finish(VerificationStatus::Verified, MSG_VERIFIED);
        Ok(())
    }

    pub fn summary(&self) -> VerificationSummary {
        VerificationSummary::from(self)
    }
}

/// History list item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub id: VerificationId,
    pub status: VerificationStatus,
    pub town: String,
    pub layout: String,
    pub block: String,
    pub plot: String,
    pub is_verified: bool,
    pub is_fraud: bool,
    pub requested_at: DateTime<Utc>,
}

impl From<&VerificationRecord> for VerificationSummary {
    fn from(record: &VerificationRecord) -> Self {
        Self {
            id: record.id,
            status: record.status,
            town: record.submitted.town.clone(),
            layout: record.submitted.layout.clone(),
            block: record.submitted.block_number.clone(),
            plot: record.submitted.plot_number.clone(),
            is_verified: record.is_verified,
            is_fraud: record.is_fraud,
            requested_at: record.requested_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        vec![
            Coordinate::new(6.4300, 3.4200),
            Coordinate::new(6.4300, 3.4203),
            Coordinate::new(6.4303, 3.4203),
            Coordinate::new(6.4303, 3.4200),
        ]
    }

    fn submission() -> Submission {
        Submission::new(LocationKey::new("Lekki", "Phase1", "5", "12"), square())
    }

    #[test]
    fn test_validate_accepts_well_formed_submission() {
        assert!(submission().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_polygon() {
        let mut s = submission();
        s.coordinates.truncate(2);
        assert_eq!(s.validate(), Err(ValidationError::TooFewVertices(2)));
    }

    #[test]
    fn test_validate_rejects_out_of_range_vertex() {
        let mut s = submission();
        s.coordinates[1] = Coordinate::new(6.43, 181.0);
        assert!(matches!(
            s.validate(),
            Err(ValidationError::InvalidCoordinate { index: 1, .. })
        ));
    }

    #[test]
    fn test_normalized_trims_and_rejects_blank_fields() {
        let mut s = submission();
        s.location.town = "  Lekki ".to_string();
        assert_eq!(s.normalized().unwrap().location.town, "Lekki");

        let mut s = submission();
        s.location.plot_number = "   ".to_string();
        assert_eq!(
            s.normalized(),
            Err(ValidationError::EmptyField("plot_number"))
        );
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            VerificationStatus::Pending,
            VerificationStatus::Verified,
            VerificationStatus::Fraudulent,
            VerificationStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<VerificationStatus>(), Ok(status));
        }
        assert!("approved".parse::<VerificationStatus>().is_err());
    }

    #[test]
    fn test_pending_record_copies_submission() {
        let s = submission();
        let record = VerificationRecord::pending(PrincipalId::new("user-1"), &s);

        assert!(record.is_pending());
        assert_eq!(record.submitted, s.location);
        assert_eq!(record.submitted_coords, s.coordinates);
        assert!(record.verified_at.is_none());
        assert!(record.location_match.is_none());
    }

    #[test]
    fn test_terminal_record_refuses_further_transitions() {
        let mut record = VerificationRecord::pending(PrincipalId::new("user-1"), &submission());
        record.mark_failed(MSG_NOT_IN_REGISTRY).unwrap();

        assert_eq!(record.status, VerificationStatus::Failed);
        assert!(record.verified_at.is_some());

        let err = record.mark_location_mismatch().unwrap_err();
        assert_eq!(err.from, VerificationStatus::Failed);
        assert_eq!(err.to, VerificationStatus::Fraudulent);
        assert_eq!(record.status, VerificationStatus::Failed);
        assert!(!record.is_fraud);
    }

    #[test]
    fn test_verified_snapshots_official_data() {
        let official = OfficialRecord::new(
            "CERT-001",
            LocationKey::new("Lekki", "Phase1", "5", "12"),
            square(),
            "Ada Obi",
        )
        .with_area(1_100.0);

        let mut record = VerificationRecord::pending(PrincipalId::new("user-1"), &submission());
        record.record_measurements(true, 1.0, 0.0).unwrap();
        record.mark_verified(&official).unwrap();

        assert!(record.is_verified);
        assert_eq!(record.official_owner.as_deref(), Some("Ada Obi"));
        assert_eq!(record.official_area, Some(1_100.0));
        assert_eq!(record.official_coords.as_ref(), Some(&official.coordinates));
        assert_eq!(record.location_match, Some(true));
    }

    #[test]
    fn test_coordinates_mismatch_reason_formats_distance() {
        assert_eq!(
            coordinates_mismatch_reason(83.44),
            "Coordinates mismatch (distance: 83.4m)"
        );
    }
}
