//! Verification engine
//!
//! - [`RegistryLocator`]: exact-key lookup with a proximity fallback
//! - [`VerificationEngine`]: runs one verification to a terminal verdict
//! - [`HistoryReader`]: owner-scoped reads of past verifications

mod history;
mod locator;
mod verifier;

pub use history::{HistoryReader, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
pub use locator::{LocatedRecord, MatchPhase, RegistryLocator};
pub use verifier::VerificationEngine;

use serde::{Deserialize, Serialize};

use crate::geometry::{ComparisonThresholds, DEFAULT_MAX_CENTROID_DISTANCE_M, DEFAULT_MIN_AREA_RATIO};

/// Default radius for the proximity phase, exclusive
pub const DEFAULT_PROXIMITY_RADIUS_M: f64 = 50.0;

/// Default number of same-town candidates inspected by the proximity phase
pub const DEFAULT_PROXIMITY_CANDIDATES: usize = 20;

/// Tunable thresholds for a verification run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub max_centroid_distance_m: f64,
    pub min_area_ratio: f64,
    pub proximity_radius_m: f64,
    pub proximity_candidates: usize,
}

impl EngineConfig {
    pub fn comparison_thresholds(&self) -> ComparisonThresholds {
        ComparisonThresholds {
            max_centroid_distance_m: self.max_centroid_distance_m,
            min_area_ratio: self.min_area_ratio,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_centroid_distance_m: DEFAULT_MAX_CENTROID_DISTANCE_M,
            min_area_ratio: DEFAULT_MIN_AREA_RATIO,
            proximity_radius_m: DEFAULT_PROXIMITY_RADIUS_M,
            proximity_candidates: DEFAULT_PROXIMITY_CANDIDATES,
        }
    }
}
