//! Core type definitions for the verification service
//!
//! Identifiers, coordinates and the parcel location key.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Minimum number of vertices a boundary polygon must carry
pub const MIN_POLYGON_VERTICES: usize = 3;

/// A single boundary vertex in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether the vertex lies within the valid WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Ordered boundary vertices. Not required to be closed.
pub type Polygon = Vec<Coordinate>;

/// Administrative location of a parcel.
///
/// Town and layout are free text; block and plot form the canonical parcel key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationKey {
    pub town: String,
    pub layout: String,
    pub block_number: String,
    pub plot_number: String,
}

impl LocationKey {
    pub fn new(
        town: impl Into<String>,
        layout: impl Into<String>,
        block_number: impl Into<String>,
        plot_number: impl Into<String>,
    ) -> Self {
        Self {
            town: town.into(),
            layout: layout.into(),
            block_number: block_number.into(),
            plot_number: plot_number.into(),
        }
    }

    /// Strict identity check: case-insensitive town/layout, exact block/plot.
    pub fn identity_matches(&self, other: &LocationKey) -> bool {
        self.town.to_lowercase() == other.town.to_lowercase()
            && self.layout.to_lowercase() == other.layout.to_lowercase()
            && self.block_number == other.block_number
            && self.plot_number == other.plot_number
    }

    /// Loose lookup predicate used by the registry's exact phase.
    ///
    /// `self` is the stored key; the query's town/layout only need to be
    /// contained in it, ignoring case.
    pub fn lookup_matches(&self, query: &LocationKey) -> bool {
        contains_ignore_case(&self.town, &query.town)
            && contains_ignore_case(&self.layout, &query.layout)
            && self.block_number == query.block_number
            && self.plot_number == query.plot_number
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.town, self.layout, self.block_number, self.plot_number
        )
    }
}

/// Case-insensitive substring test, the in-process equivalent of `ILIKE '%needle%'`.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Authenticated principal identifier (opaque, supplied by the auth layer)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Verification attempt identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationId(pub Uuid);

impl VerificationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for VerificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VerificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
