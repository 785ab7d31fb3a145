//! Registry lookup: exact key first, then nearest same-town parcel

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::{OfficialRecord, Submission};
use crate::geometry::{centroid, haversine_distance};
use crate::infra::{RegistryStore, Result};

use super::EngineConfig;

/// Which lookup phase produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Exact,
    Proximity,
}

/// An official record located for a submission
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedRecord {
    pub record: OfficialRecord,
    pub phase: MatchPhase,
    /// Centroid distance, only measured by the proximity phase
    pub distance_meters: Option<f64>,
}

/// Finds the official record a submission refers to
pub struct RegistryLocator {
    registry: Arc<dyn RegistryStore>,
    proximity_radius_m: f64,
    proximity_candidates: usize,
}

impl RegistryLocator {
    pub fn new(registry: Arc<dyn RegistryStore>, config: &EngineConfig) -> Self {
        Self {
            registry,
            proximity_radius_m: config.proximity_radius_m,
            proximity_candidates: config.proximity_candidates,
        }
    }

    /// Locate the record for `submission`.
    ///
    /// `Ok(None)` is the normal "not in registry" outcome; `Err` means the
    /// registry itself failed.
    #[instrument(skip(self, submission), fields(location = %submission.location))]
    pub async fn find(&self, submission: &Submission) -> Result<Option<LocatedRecord>> {
        if let Some(record) = self.registry.find_exact(&submission.location).await? {
            debug!(certificate = %record.certificate_number, "Exact registry match");
            return Ok(Some(LocatedRecord {
                record,
                phase: MatchPhase::Exact,
                distance_meters: None,
            }));
        }

        if submission.coordinates.is_empty() {
            return Ok(None);
        }

        self.find_nearby(submission).await
    }

    async fn find_nearby(&self, submission: &Submission) -> Result<Option<LocatedRecord>> {
        let candidates = self
            .registry
            .list_active_in_town(&submission.location.town, self.proximity_candidates)
            .await?;

        let submitted_centroid = centroid(&submission.coordinates);
        let mut best: Option<(OfficialRecord, f64)> = None;

        for candidate in candidates {
            if candidate.coordinates.is_empty() {
                continue;
            }

            let distance = haversine_distance(submitted_centroid, centroid(&candidate.coordinates));
            debug!(
                certificate = %candidate.certificate_number,
                distance_m = distance,
                "Proximity candidate"
            );

            if distance >= self.proximity_radius_m {
                continue;
            }
            // Strictly closer only, so the first of equally near candidates wins
            if best.as_ref().map_or(true, |(_, d)| distance < *d) {
                best = Some((candidate, distance));
            }
        }

        Ok(best.map(|(record, distance)| {
            debug!(
                certificate = %record.certificate_number,
                distance_m = distance,
                "Proximity registry match"
            );
            LocatedRecord {
                record,
                phase: MatchPhase::Proximity,
                distance_meters: Some(distance),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, LocationKey, Polygon};
    use crate::engine::DEFAULT_PROXIMITY_CANDIDATES;
    use crate::infra::{MemoryRegistry, MockRegistryStore, VerifierError};

    const METERS_PER_DEG_LAT: f64 = 111_195.0;

    fn square_at(lat: f64, lng: f64) -> Polygon {
        let side = 0.0003;
        vec![
            Coordinate::new(lat, lng),
            Coordinate::new(lat, lng + side),
            Coordinate::new(lat + side, lng + side),
            Coordinate::new(lat + side, lng),
        ]
    }

    fn north_of(meters: f64) -> Polygon {
        square_at(6.4300 + meters / METERS_PER_DEG_LAT, 3.4200)
    }

    fn official(block: &str, plot: &str, coords: Polygon) -> OfficialRecord {
        OfficialRecord::new(
            format!("CERT-{block}-{plot}"),
            LocationKey::new("Lekki", "Phase1", block, plot),
            coords,
            "Owner",
        )
    }

    fn submission(block: &str, plot: &str, coords: Polygon) -> Submission {
        Submission::new(LocationKey::new("Lekki", "Phase1", block, plot), coords)
    }

    fn locator(registry: impl RegistryStore + 'static) -> RegistryLocator {
        RegistryLocator::new(Arc::new(registry), &EngineConfig::default())
    }

    #[tokio::test]
    async fn test_exact_match_wins_over_closer_candidate() {
        let registry = MemoryRegistry::with_records([
            official("9", "9", north_of(0.0)),
            official("5", "12", north_of(40.0)),
        ]);

        let located = locator(registry)
            .find(&submission("5", "12", north_of(0.0)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(located.phase, MatchPhase::Exact);
        assert_eq!(located.record.location.plot_number, "12");
        assert!(located.distance_meters.is_none());
    }

    #[tokio::test]
    async fn test_proximity_picks_nearest_within_radius() {
        let registry = MemoryRegistry::with_records([
            official("1", "1", north_of(30.0)),
            official("1", "2", north_of(8.0)),
            official("1", "3", north_of(20.0)),
        ]);

        let located = locator(registry)
            .find(&submission("7", "3", north_of(0.0)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(located.phase, MatchPhase::Proximity);
        assert_eq!(located.record.location.plot_number, "2");
        let distance = located.distance_meters.unwrap();
        assert!((distance - 8.0).abs() < 0.5, "distance was {distance}");
    }

    #[tokio::test]
    async fn test_proximity_ignores_candidates_outside_radius() {
        let registry = MemoryRegistry::with_records([
            official("1", "1", north_of(50.5)),
            official("1", "2", north_of(1_000.0)),
        ]);

        let located = locator(registry)
            .find(&submission("7", "3", north_of(0.0)))
            .await
            .unwrap();

        assert!(located.is_none());
    }

    #[tokio::test]
    async fn test_proximity_skips_empty_polygons() {
        let registry = MemoryRegistry::with_records([official("1", "1", Vec::new())]);

        let located = locator(registry)
            .find(&submission("7", "3", north_of(0.0)))
            .await
            .unwrap();

        assert!(located.is_none());
    }

    #[tokio::test]
    async fn test_proximity_not_queried_after_exact_match() {
        let mut registry = MockRegistryStore::new();
        registry
            .expect_find_exact()
            .returning(|_| Ok(Some(official("5", "12", north_of(0.0)))));
        registry.expect_list_active_in_town().never();

        let located = locator(registry)
            .find(&submission("5", "12", north_of(0.0)))
            .await
            .unwrap();

        assert!(located.is_some());
    }

    #[tokio::test]
    async fn test_candidate_limit_is_passed_to_registry() {
        let mut registry = MockRegistryStore::new();
        registry.expect_find_exact().returning(|_| Ok(None));
        registry
            .expect_list_active_in_town()
            .withf(|town, limit| {
                town.eq_ignore_ascii_case("lekki") && *limit == DEFAULT_PROXIMITY_CANDIDATES
            })
            .times(1)
            .returning(|_, _| Ok(Vec::new()));

        let located = locator(registry)
            .find(&submission("7", "3", north_of(0.0)))
            .await
            .unwrap();

        assert!(located.is_none());
    }

    #[tokio::test]
    async fn test_registry_failure_propagates() {
        let mut registry = MockRegistryStore::new();
        registry
            .expect_find_exact()
            .returning(|_| Err(VerifierError::Internal("registry offline".into())));

        let result = locator(registry)
            .find(&submission("5", "12", north_of(0.0)))
            .await;

        assert!(matches!(result, Err(VerifierError::Internal(_))));
    }
}
