//! Official land registry records
//!
//! Registry records are authoritative reference data. The verification
//! service only ever reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{LocationKey, Polygon};

/// An official, authoritative land-parcel entry.
///
/// Invariant: the location key is unique among active records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficialRecord {
    /// Registry row identifier
    pub id: Uuid,

    /// Unique certificate identifier
    pub certificate_number: String,

    /// Location of the scanned certificate
    #[serde(default)]
    pub certificate_pdf_url: String,

    /// Town/layout/block/plot key used for exact matching
    #[serde(flatten)]
    pub location: LocationKey,

    /// Official boundary polygon (lat/lng vertices)
    pub coordinates: Polygon,

    /// Surveyed area in square meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_square_meters: Option<f64>,

    pub owner_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_national_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub land_use: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_date: Option<DateTime<Utc>>,

    #[serde(default = "Utc::now")]
    pub registration_date: DateTime<Utc>,

    /// Inactive records are never matched
    #[serde(default = "default_active")]
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_active() -> bool {
    true
}

impl OfficialRecord {
    /// Create an active record with the mandatory fields set
    pub fn new(
        certificate_number: impl Into<String>,
        location: LocationKey,
        coordinates: Polygon,
        owner_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            certificate_number: certificate_number.into(),
            certificate_pdf_url: String::new(),
            location,
            coordinates,
            area_square_meters: None,
            owner_name: owner_name.into(),
            owner_national_id: None,
            owner_phone: None,
            owner_email: None,
            land_use: None,
            acquisition_date: None,
            registration_date: Utc::now(),
            is_active: true,
            notes: None,
        }
    }

    pub fn with_area(mut self, area_square_meters: f64) -> Self {
        self.area_square_meters = Some(area_square_meters);
        self
    }

    pub fn with_owner_phone(mut self, phone: impl Into<String>) -> Self {
        self.owner_phone = Some(phone.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
