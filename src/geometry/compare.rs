//! Composite polygon comparison

use serde::{Deserialize, Serialize};

use super::{area_ratio, bounding_box_overlap, centroid, haversine_distance, polygon_area};
use crate::domain::Coordinate;

/// Default maximum centroid separation for a passing distance check
pub const DEFAULT_MAX_CENTROID_DISTANCE_M: f64 = 10.0;

/// Default minimum area ratio for a passing area check
pub const DEFAULT_MIN_AREA_RATIO: f64 = 0.90;

/// Number of checks that must pass for a match
pub const REQUIRED_PASSES: u8 = 2;

/// Pass thresholds for [`GeometryComparator`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonThresholds {
    pub max_centroid_distance_m: f64,
    pub min_area_ratio: f64,
}

impl Default for ComparisonThresholds {
    fn default() -> Self {
        Self {
            max_centroid_distance_m: DEFAULT_MAX_CENTROID_DISTANCE_M,
            min_area_ratio: DEFAULT_MIN_AREA_RATIO,
        }
    }
}

/// Result of comparing a submitted polygon against an official one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolygonComparison {
    /// At least [`REQUIRED_PASSES`] of the three checks passed
    #[serde(rename = "match")]
    pub is_match: bool,
    pub distance_meters: f64,
    pub area_ratio: f64,
    pub bbox_overlap: bool,
    pub pass_count: u8,
}

/// Stateless 2-of-3 polygon comparator.
///
/// Checks centroid distance, area ratio and bounding-box overlap
/// independently; one noisy signal (e.g. GPS drift) is tolerated.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryComparator {
    thresholds: ComparisonThresholds,
}

impl GeometryComparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: ComparisonThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ComparisonThresholds {
        &self.thresholds
    }

    pub fn compare(&self, poly1: &[Coordinate], poly2: &[Coordinate]) -> PolygonComparison {
        let distance_meters = haversine_distance(centroid(poly1), centroid(poly2));
        let ratio = area_ratio(polygon_area(poly1), polygon_area(poly2));
        let bbox_overlap = bounding_box_overlap(poly1, poly2);

        let pass_count = [
            distance_meters <= self.thresholds.max_centroid_distance_m,
            ratio >= self.thresholds.min_area_ratio,
            bbox_overlap,
        ]
        .into_iter()
        .filter(|passed| *passed)
        .count() as u8;

        PolygonComparison {
            is_match: pass_count >= REQUIRED_PASSES,
            distance_meters,
            area_ratio: ratio,
            bbox_overlap,
            pass_count,
        }
    }
}
